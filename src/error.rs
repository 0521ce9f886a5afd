//! Error types for the two fallible seams: the remote collaborator and the
//! history store. Invalid state-machine transitions are deliberately NOT
//! errors (they are benign event races, ignored at the orchestrator).

use thiserror::Error;

/// Failures talking to the question-generation / analysis collaborator.
#[derive(Debug, Error)]
pub enum CollabError {
  /// No access configured. Checked before any request is attempted.
  #[error("no collaborator credential configured (OPENAI_API_KEY missing)")]
  MissingCredential,

  #[error("collaborator request failed: {0}")]
  Transport(String),

  #[error("collaborator HTTP {status}: {message}")]
  Http { status: u16, message: String },

  /// Shape mismatch: wrong batch size, category/payload mismatch, bad JSON.
  /// Always rejects the whole batch; partial batches are never accepted.
  #[error("malformed collaborator response: {0}")]
  Malformed(String),
}

/// Failures loading or appending the persisted assessment history.
#[derive(Debug, Error)]
pub enum HistoryError {
  #[error("history io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("history serialization error: {0}")]
  Serde(#[from] serde_json::Error),
}
