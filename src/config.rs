//! Loading assessment configuration (prompts + run settings) from TOML.
//!
//! See `AssessmentConfig`, `Prompts` and `RunSettings` for expected schema.

use serde::Deserialize;
use tracing::{info, error};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AssessmentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub settings: RunSettings,
}

/// Knobs of a run. The per-question time limit is a single constant for
/// all categories in the current assessment design.
#[derive(Clone, Debug, Deserialize)]
pub struct RunSettings {
  #[serde(default = "default_questions_per_category")]
  pub questions_per_category: usize,
  #[serde(default = "default_time_limit_seconds")]
  pub time_limit_seconds: u32,
  #[serde(default = "default_history_path")]
  pub history_path: String,
}

fn default_questions_per_category() -> usize { 5 }
fn default_time_limit_seconds() -> u32 { 5 }
fn default_history_path() -> String { "./assessment_history.json".into() }

impl Default for RunSettings {
  fn default() -> Self {
    Self {
      questions_per_category: default_questions_per_category(),
      time_limit_seconds: default_time_limit_seconds(),
      history_path: default_history_path(),
    }
  }
}

/// Prompts used by the collaborator client. Defaults are sensible for the
/// five built-in categories. Override them in TOML to tune tone/shape.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  // Question-batch generation
  pub generation_system: String,
  pub generation_user_template: String,
  // Result analysis
  pub analysis_system: String,
  pub analysis_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_system: "You are a cognitive assessment content generator. Respond ONLY with strict JSON.".into(),
      generation_user_template: concat!(
        "Generate exactly {count} questions for the '{category}' cognitive test category. ",
        "Return JSON: {\"questions\": [...]}. Each question object has fields: ",
        "\"category\" (must be \"{category}\"), \"correct_answer\" (string), and \"payload\" ",
        "tagged {\"kind\": \"{category}\"} with the category's fields: ",
        "memory -> symbols (array of emoji, some appearing exactly twice; correct_answer is the pair count as a string); ",
        "attention -> items (strings, exactly one outlier; correct_answer is the outlier value); ",
        "reasoning -> statement, question, options (correct_answer is one of options); ",
        "spatial -> base_symbol, options (rotated variants, exactly one mirrored; correct_answer is that option); ",
        "math -> expression, options (correct_answer is the evaluated result, present in options). ",
        "Each question must be answerable in about 5 seconds."
      ).into(),
      analysis_system: "You are a cognitive assessment analyst. Be concise and encouraging. Output JSON only.".into(),
      analysis_user_template: concat!(
        "Responses (JSON lines, presentation order):\n{responses}\n\n",
        "Return JSON with fields: \"summary\" (2-3 sentences incl. an approximate percentile), ",
        "\"strengths\", \"weaknesses\", \"recommendations\" (string arrays), ",
        "\"category_scores\" (array of {\"category\", \"correct\", \"total\"}), ",
        "\"explanations\" (array of {\"question_context\", \"explanation\"}, one per incorrect response, ",
        "keyed by the question_context string exactly as given)."
      ).into(),
    }
  }
}

/// Attempt to load `AssessmentConfig` from ASSESSMENT_CONFIG_PATH. On any
/// parsing/IO error, returns None and the compiled-in defaults apply.
pub fn load_assessment_config_from_env() -> Option<AssessmentConfig> {
  let path = std::env::var("ASSESSMENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AssessmentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "acuity_backend", %path, "Loaded assessment config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "acuity_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "acuity_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_falls_back_to_defaults() {
    let cfg: AssessmentConfig = toml::from_str(
      "[settings]\nquestions_per_category = 3\n"
    ).expect("toml");
    assert_eq!(cfg.settings.questions_per_category, 3);
    assert_eq!(cfg.settings.time_limit_seconds, 5);
    assert!(!cfg.prompts.generation_system.is_empty());
  }
}
