//! Application state shared across connections: configuration, the
//! collaborator client, and the persisted assessment history.
//!
//! Per-session state (phase, questions, timers, ledgers) deliberately does
//! NOT live here: each WebSocket connection owns its own orchestrator, so
//! concurrent sessions are simply independent instances.

use tracing::{info, instrument};

use crate::config::{load_assessment_config_from_env, Prompts, RunSettings};
use crate::error::CollabError;
use crate::history::HistoryStore;
use crate::openai::OpenAI;

#[derive(Clone)]
pub struct AppState {
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub settings: RunSettings,
    pub history: HistoryStore,
}

impl AppState {
    /// Build state from env: load config, open the history log, init the
    /// collaborator client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_assessment_config_from_env().unwrap_or_default();
        let prompts = cfg.prompts;
        let mut settings = cfg.settings;
        if let Ok(path) = std::env::var("HISTORY_PATH") {
            settings.history_path = path;
        }

        let history = HistoryStore::open(&settings.history_path);

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "acuity_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
        } else {
            info!(target: "acuity_backend", "OpenAI disabled (no OPENAI_API_KEY). Sessions cannot load questions.");
        }
        info!(
            target: "acuity_backend",
            questions_per_category = settings.questions_per_category,
            time_limit_seconds = settings.time_limit_seconds,
            history_path = %settings.history_path,
            "Assessment settings"
        );

        Self { openai, prompts, settings, history }
    }

    /// The collaborator client, or the fatal precondition failure. Checked
    /// before any request is attempted.
    pub fn collab(&self) -> Result<&OpenAI, CollabError> {
        self.openai.as_ref().ok_or(CollabError::MissingCredential)
    }
}
