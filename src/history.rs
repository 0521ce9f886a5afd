//! Persisted assessment history: an append-only list of completed runs.
//!
//! The file is read once at startup and appended to on each completed run.
//! Records are never mutated or deleted by the core. Writes go through a
//! temp file + rename so a crash mid-write cannot truncate the log.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn, instrument};

use crate::domain::AssessmentRecord;
use crate::error::HistoryError;

#[derive(Clone)]
pub struct HistoryStore {
  path: PathBuf,
  records: Arc<RwLock<Vec<AssessmentRecord>>>,
}

impl HistoryStore {
  /// Open the store, reading any existing log. A missing file is an empty
  /// history; an unreadable file is logged and treated as empty rather
  /// than blocking startup.
  pub fn open(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let records = match std::fs::read_to_string(&path) {
      Ok(s) => match serde_json::from_str::<Vec<AssessmentRecord>>(&s) {
        Ok(list) => {
          info!(target: "acuity_backend", path = %path.display(), records = list.len(), "Loaded assessment history");
          list
        }
        Err(e) => {
          warn!(target: "acuity_backend", path = %path.display(), error = %e, "History file unparsable; starting empty");
          vec![]
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => vec![],
      Err(e) => {
        warn!(target: "acuity_backend", path = %path.display(), error = %e, "History file unreadable; starting empty");
        vec![]
      }
    };

    Self { path, records: Arc::new(RwLock::new(records)) }
  }

  /// Append one completed run and persist the whole log.
  #[instrument(level = "info", skip(self, record), fields(id = %record.id, score = record.score))]
  pub async fn append(&self, record: AssessmentRecord) -> Result<(), HistoryError> {
    let mut records = self.records.write().await;
    records.push(record);

    let body = serde_json::to_string_pretty(&*records)?;
    let tmp = self.path.with_extension("json.tmp");
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, &self.path)?;
    info!(target: "acuity_backend", path = %self.path.display(), records = records.len(), "History appended");
    Ok(())
  }

  /// Snapshot of all records, oldest first.
  pub async fn all(&self) -> Vec<AssessmentRecord> {
    self.records.read().await.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::AssessmentMode;
  use uuid::Uuid;

  fn record(score: u32) -> AssessmentRecord {
    AssessmentRecord {
      id: Uuid::new_v4().to_string(),
      date: chrono::Utc::now(),
      mode: AssessmentMode::Practice,
      score,
      total_questions: 5,
      analysis_summary: "summary".into(),
    }
  }

  fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("acuity-history-{}.json", Uuid::new_v4()))
  }

  #[tokio::test]
  async fn append_then_reload_round_trips() {
    let path = temp_path();
    let store = HistoryStore::open(&path);
    store.append(record(80)).await.expect("append");
    store.append(record(60)).await.expect("append");

    let reloaded = HistoryStore::open(&path);
    let all = reloaded.all().await;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].score, 80);
    assert_eq!(all[1].score, 60);
    let _ = std::fs::remove_file(&path);
  }

  #[tokio::test]
  async fn missing_file_is_empty_history() {
    let store = HistoryStore::open(temp_path());
    assert!(store.all().await.is_empty());
  }
}
