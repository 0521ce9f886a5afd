//! Minimal OpenAI-compatible client for our two collaborator calls:
//! question-batch generation and result analysis.
//!
//! We only call chat.completions and always request a strict JSON object.
//! Calls are instrumented and log model names, latencies, and response
//! sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{instrument, info, error};
use uuid::Uuid;

use crate::config::Prompts;
use crate::domain::{AnalysisReport, Category, Question, QuestionPayload, UserResponse};
use crate::error::CollabError;
use crate::util::fill_template;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

/// One question as returned by the generation collaborator, before ids and
/// the time limit are stamped on.
#[derive(Deserialize)]
struct GenQuestion {
  category: Category,
  correct_answer: String,
  payload: QuestionPayload,
}

#[derive(Deserialize)]
struct GenBatch {
  questions: Vec<GenQuestion>,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, CollabError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "acuity-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| CollabError::Transport(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(CollabError::Http { status, message });
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| CollabError::Transport(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text)
      .map_err(|e| CollabError::Malformed(format!("JSON parse error: {}", e)))
  }

  // --- High-level helpers (domain-specialized) ---

  /// Generate one category's full question batch. Strict: the response must
  /// contain exactly `count` questions of `category`, each with a matching
  /// payload shape, or the whole batch is rejected.
  #[instrument(
    level = "info",
    skip(self, prompts),
    fields(%category, count, model = %self.strong_model)
  )]
  pub async fn generate_section(
    &self,
    prompts: &Prompts,
    category: Category,
    count: usize,
    time_limit_seconds: u32,
  ) -> Result<Vec<Question>, CollabError> {
    let count_s = count.to_string();
    let system = fill_template(&prompts.generation_system, &[("category", category.label())]);
    let user = fill_template(
      &prompts.generation_user_template,
      &[("category", category.label()), ("count", &count_s)],
    );

    let start = std::time::Instant::now();
    let result = self.chat_json::<GenBatch>(&self.strong_model, &system, &user, 0.9).await;
    let elapsed = start.elapsed();

    let batch = match result {
      Ok(b) => {
        info!(?elapsed, "Model response received successfully");
        b
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during section generation");
        return Err(e);
      }
    };

    let questions = validate_batch(batch.questions, category, count, time_limit_seconds)?;
    info!(%category, count = questions.len(), "Section batch validated and stamped");
    Ok(questions)
  }

  /// Run the analysis collaborator over the full ordered response ledger.
  #[instrument(level = "info", skip(self, prompts, responses), fields(responses = responses.len(), model = %self.strong_model))]
  pub async fn analyze_responses(
    &self,
    prompts: &Prompts,
    responses: &[UserResponse],
  ) -> Result<AnalysisReport, CollabError> {
    let lines: Vec<String> = responses
      .iter()
      .map(|r| serde_json::to_string(r).unwrap_or_default())
      .collect();
    let user = fill_template(&prompts.analysis_user_template, &[("responses", &lines.join("\n"))]);
    self.chat_json::<AnalysisReport>(&self.strong_model, &prompts.analysis_system, &user, 0.3).await
  }
}

/// Whole-batch validation: exact count, category tag, payload/category
/// agreement, non-empty answers. Never accepts a partial batch. Ids and
/// the per-question time limit are stamped here, at issue time.
fn validate_batch(
  raw: Vec<GenQuestion>,
  category: Category,
  count: usize,
  time_limit_seconds: u32,
) -> Result<Vec<Question>, CollabError> {
  if raw.len() != count {
    return Err(CollabError::Malformed(format!(
      "expected {} questions, got {}", count, raw.len()
    )));
  }
  let mut out = Vec::with_capacity(count);
  for (i, g) in raw.into_iter().enumerate() {
    if g.category != category {
      return Err(CollabError::Malformed(format!(
        "question {} tagged {:?}, expected {:?}", i, g.category, category
      )));
    }
    if !g.payload.matches(category) {
      return Err(CollabError::Malformed(format!(
        "question {} payload shape does not match category {:?}", i, category
      )));
    }
    if g.correct_answer.trim().is_empty() {
      return Err(CollabError::Malformed(format!("question {} has an empty correct_answer", i)));
    }
    out.push(Question {
      id: Uuid::new_v4().to_string(),
      category,
      payload: g.payload,
      correct_answer: g.correct_answer,
      time_limit_seconds,
    });
  }
  Ok(out)
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gen(category: Category, payload: QuestionPayload, answer: &str) -> GenQuestion {
    GenQuestion { category, correct_answer: answer.into(), payload }
  }

  #[test]
  fn batch_of_wrong_size_is_rejected_whole() {
    let raw = vec![gen(
      Category::Math,
      QuestionPayload::Math { expression: "2+2".into(), options: vec!["4".into()] },
      "4",
    )];
    let err = validate_batch(raw, Category::Math, 2, 5).unwrap_err();
    assert!(matches!(err, CollabError::Malformed(_)));
  }

  #[test]
  fn category_mismatch_is_rejected() {
    let raw = vec![gen(
      Category::Memory,
      QuestionPayload::Memory { symbols: vec!["a".into(), "a".into()] },
      "1",
    )];
    let err = validate_batch(raw, Category::Math, 1, 5).unwrap_err();
    assert!(matches!(err, CollabError::Malformed(_)));
  }

  #[test]
  fn payload_shape_must_agree_with_category() {
    // Tagged as math but carrying a memory payload.
    let raw = vec![GenQuestion {
      category: Category::Math,
      correct_answer: "4".into(),
      payload: QuestionPayload::Memory { symbols: vec!["a".into()] },
    }];
    let err = validate_batch(raw, Category::Math, 1, 5).unwrap_err();
    assert!(matches!(err, CollabError::Malformed(_)));
  }

  #[test]
  fn empty_correct_answer_is_rejected() {
    let raw = vec![gen(
      Category::Attention,
      QuestionPayload::Attention { items: vec!["a".into(), "b".into()] },
      "  ",
    )];
    let err = validate_batch(raw, Category::Attention, 1, 5).unwrap_err();
    assert!(matches!(err, CollabError::Malformed(_)));
  }

  #[test]
  fn valid_batch_gets_ids_and_time_limit_stamped() {
    let raw = vec![
      gen(
        Category::Spatial,
        QuestionPayload::Spatial { base_symbol: "⌘".into(), options: vec!["a".into(), "b".into()] },
        "b",
      ),
      gen(
        Category::Spatial,
        QuestionPayload::Spatial { base_symbol: "⌥".into(), options: vec!["c".into(), "d".into()] },
        "c",
      ),
    ];
    let qs = validate_batch(raw, Category::Spatial, 2, 5).expect("batch");
    assert_eq!(qs.len(), 2);
    assert_ne!(qs[0].id, qs[1].id);
    assert!(qs.iter().all(|q| q.time_limit_seconds == 5));
  }

  #[test]
  fn wire_shape_parses_tagged_payloads() {
    let json = r#"{"questions":[{"category":"reasoning","correct_answer":"Tom",
      "payload":{"kind":"reasoning","statement":"Tom is taller than Jim","question":"Who is tallest?","options":["Tom","Jim"]}}]}"#;
    let batch: GenBatch = serde_json::from_str(json).expect("parse");
    assert_eq!(batch.questions.len(), 1);
    assert!(batch.questions[0].payload.matches(Category::Reasoning));
  }
}
