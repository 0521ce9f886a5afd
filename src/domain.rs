//! Domain models: categories, question payloads, questions, responses,
//! assessment records, and the analysis report shape.

use serde::{Deserialize, Serialize};

use crate::util::answers_match;

/// The five fixed test categories. A full run enumerates them in this order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  Memory,
  Attention,
  Reasoning,
  Spatial,
  Math,
}

/// Fixed order of a full assessment run.
pub const FULL_RUN_ORDER: [Category; 5] = [
  Category::Memory,
  Category::Attention,
  Category::Reasoning,
  Category::Spatial,
  Category::Math,
];

impl Category {
  pub fn label(&self) -> &'static str {
    match self {
      Category::Memory => "memory",
      Category::Attention => "attention",
      Category::Reasoning => "reasoning",
      Category::Spatial => "spatial",
      Category::Math => "math",
    }
  }
}

impl std::fmt::Display for Category {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

/// Category-specific question content. One payload shape per category, so
/// answer matching and context derivation are exhaustive matches rather
/// than optional-field guesses.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionPayload {
  /// A briefly shown symbol grid; the expected answer is the count of
  /// matching pairs, as a string.
  Memory { symbols: Vec<String> },
  /// A list of items where one value does not belong; the expected answer
  /// is the outlier value.
  Attention { items: Vec<String> },
  /// Two-stage reveal: the statement is shown untimed, then the question
  /// with its options under the clock.
  Reasoning { statement: String, question: String, options: Vec<String> },
  /// Rotated variants of a base symbol; exactly one option is mirrored.
  Spatial { base_symbol: String, options: Vec<String> },
  /// Quick arithmetic with answer options.
  Math { expression: String, options: Vec<String> },
}

impl QuestionPayload {
  /// True when the payload variant belongs to `category`. Used by batch
  /// validation to reject collaborator output that mixes shapes.
  pub fn matches(&self, category: Category) -> bool {
    matches!(
      (self, category),
      (QuestionPayload::Memory { .. }, Category::Memory)
        | (QuestionPayload::Attention { .. }, Category::Attention)
        | (QuestionPayload::Reasoning { .. }, Category::Reasoning)
        | (QuestionPayload::Spatial { .. }, Category::Spatial)
        | (QuestionPayload::Math { .. }, Category::Math)
    )
  }
}

/// A single issued question. Immutable once issued; the id is assigned at
/// generation time and is unique per issued question.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  pub id: String,
  pub category: Category,
  pub payload: QuestionPayload,
  /// Compared case-insensitively against the user's submitted string.
  pub correct_answer: String,
  pub time_limit_seconds: u32,
}

impl Question {
  /// Human-readable snapshot of the question content, derived from the
  /// payload alone. Captured into each response at answer time; the
  /// analysis collaborator keys its per-question explanations on it.
  pub fn context_line(&self) -> String {
    match &self.payload {
      QuestionPayload::Memory { symbols } =>
        format!("Matching pairs among: {}", symbols.join(" ")),
      QuestionPayload::Attention { items } =>
        format!("Odd one out of: {}", items.join(", ")),
      QuestionPayload::Reasoning { statement, question, .. } =>
        format!("{} / {}", statement, question),
      QuestionPayload::Spatial { base_symbol, .. } =>
        format!("Mirrored rotation of {}", base_symbol),
      QuestionPayload::Math { expression, .. } =>
        format!("Evaluate {}", expression),
    }
  }
}

/// Created exactly once per answered question, in presentation order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserResponse {
  pub question_id: String,
  pub category: Category,
  pub selected_answer: String,
  pub correct_answer: String,
  /// Wall-clock ms since the answerable question was displayed. When the
  /// buzzer fired first this still measures from display, not from the
  /// buzzer.
  pub time_taken_ms: u64,
  pub is_correct: bool,
  /// Whether the per-question time limit expired before this answer.
  pub timed_out: bool,
  pub question_context: String,
}

impl UserResponse {
  pub fn build(question: &Question, selected: &str, time_taken_ms: u64, timed_out: bool) -> Self {
    Self {
      question_id: question.id.clone(),
      category: question.category,
      selected_answer: selected.to_string(),
      correct_answer: question.correct_answer.clone(),
      time_taken_ms,
      is_correct: answers_match(selected, &question.correct_answer),
      timed_out,
      question_context: question.context_line(),
    }
  }
}

/// Full (all five categories) vs. practice (a single chosen category).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentMode {
  Full,
  Practice,
}

/// One completed run, appended to the persisted history. Never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssessmentRecord {
  pub id: String,
  /// RFC 3339 timestamp of completion.
  pub date: chrono::DateTime<chrono::Utc>,
  pub mode: AssessmentMode,
  /// Rounded percentage correct.
  pub score: u32,
  pub total_questions: usize,
  /// Truncated excerpt of the analysis summary.
  pub analysis_summary: String,
}

/// Per-category tally inside an analysis report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryScore {
  pub category: Category,
  pub correct: usize,
  pub total: usize,
}

/// Explanation for one incorrectly answered question, keyed by the
/// context string captured at answer time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncorrectExplanation {
  pub question_context: String,
  pub explanation: String,
}

/// Structured result of the analysis collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisReport {
  pub summary: String,
  #[serde(default)]
  pub strengths: Vec<String>,
  #[serde(default)]
  pub weaknesses: Vec<String>,
  #[serde(default)]
  pub recommendations: Vec<String>,
  #[serde(default)]
  pub category_scores: Vec<CategoryScore>,
  #[serde(default)]
  pub explanations: Vec<IncorrectExplanation>,
}

/// Deterministic stand-in when the analysis collaborator fails. Derived
/// purely from the ledger so the analysis phase always has something to
/// render.
pub fn placeholder_report(responses: &[UserResponse]) -> AnalysisReport {
  let category_scores = tally_by_category(responses);
  let correct = responses.iter().filter(|r| r.is_correct).count();
  let total = responses.len();

  let mut strengths = vec![];
  let mut weaknesses = vec![];
  for cs in &category_scores {
    if cs.total == 0 { continue; }
    if cs.correct * 2 >= cs.total {
      strengths.push(format!("{} ({}/{})", cs.category, cs.correct, cs.total));
    } else {
      weaknesses.push(format!("{} ({}/{})", cs.category, cs.correct, cs.total));
    }
  }

  AnalysisReport {
    summary: format!(
      "Automated summary: {} of {} answers correct. Detailed analysis was unavailable for this run.",
      correct, total
    ),
    strengths,
    weaknesses,
    recommendations: vec!["Retake the assessment when the analysis service is reachable.".into()],
    category_scores,
    explanations: vec![],
  }
}

/// Count correct/total per category, in first-seen (presentation) order.
pub fn tally_by_category(responses: &[UserResponse]) -> Vec<CategoryScore> {
  let mut out: Vec<CategoryScore> = vec![];
  for r in responses {
    match out.iter_mut().find(|cs| cs.category == r.category) {
      Some(cs) => {
        cs.total += 1;
        if r.is_correct { cs.correct += 1; }
      }
      None => out.push(CategoryScore {
        category: r.category,
        correct: r.is_correct as usize,
        total: 1,
      }),
    }
  }
  out
}
