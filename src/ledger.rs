//! Response ledger: the ordered, loss-free record of every answer.
//!
//! Appends only, in presentation order. Entries are removed in exactly two
//! places: a per-section restart strips that category's entries, and quit
//! clears the whole ledger.

use crate::domain::{Category, UserResponse};

#[derive(Debug, Default)]
pub struct ResponseLedger {
  responses: Vec<UserResponse>,
}

impl ResponseLedger {
  pub fn new() -> Self {
    Self { responses: vec![] }
  }

  /// Append in presentation order. Question ids are unique per issued
  /// question, so no dedup is needed or wanted.
  pub fn record(&mut self, response: UserResponse) {
    self.responses.push(response);
  }

  /// Fraction correct, or None while the ledger is empty.
  pub fn accuracy(&self) -> Option<f64> {
    if self.responses.is_empty() {
      return None;
    }
    let correct = self.responses.iter().filter(|r| r.is_correct).count();
    Some(correct as f64 / self.responses.len() as f64)
  }

  /// Rounded percentage correct, as persisted in an AssessmentRecord.
  pub fn score_percent(&self) -> Option<u32> {
    self.accuracy().map(|a| (a * 100.0).round() as u32)
  }

  /// This category's responses, preserving order.
  #[allow(dead_code)]
  pub fn for_category(&self, category: Category) -> Vec<&UserResponse> {
    self.responses.iter().filter(|r| r.category == category).collect()
  }

  /// Strip one category's entries (per-section restart).
  pub fn clear_category(&mut self, category: Category) {
    self.responses.retain(|r| r.category != category);
  }

  /// Clear everything (quit).
  pub fn clear(&mut self) {
    self.responses.clear();
  }

  pub fn len(&self) -> usize {
    self.responses.len()
  }

  #[allow(dead_code)]
  pub fn is_empty(&self) -> bool {
    self.responses.is_empty()
  }

  pub fn responses(&self) -> &[UserResponse] {
    &self.responses
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Question, QuestionPayload};

  fn response(category: Category, id: &str, correct: bool) -> UserResponse {
    let q = Question {
      id: id.into(),
      category,
      payload: QuestionPayload::Attention { items: vec!["a".into(), "b".into()] },
      correct_answer: "a".into(),
      time_limit_seconds: 5,
    };
    UserResponse::build(&q, if correct { "a" } else { "b" }, 1000, false)
  }

  #[test]
  fn order_is_presentation_order() {
    let mut ledger = ResponseLedger::new();
    ledger.record(response(Category::Memory, "q1", true));
    ledger.record(response(Category::Memory, "q2", false));
    ledger.record(response(Category::Math, "q3", true));
    let ids: Vec<&str> = ledger.responses().iter().map(|r| r.question_id.as_str()).collect();
    assert_eq!(ids, vec!["q1", "q2", "q3"]);
  }

  #[test]
  fn accuracy_is_undefined_on_an_empty_ledger() {
    let ledger = ResponseLedger::new();
    assert!(ledger.accuracy().is_none());
    assert!(ledger.score_percent().is_none());
  }

  #[test]
  fn score_percent_matches_rounded_accuracy() {
    let mut ledger = ResponseLedger::new();
    ledger.record(response(Category::Memory, "q1", true));
    ledger.record(response(Category::Memory, "q2", true));
    ledger.record(response(Category::Memory, "q3", false));
    // 2/3 => 66.67 => 67
    assert_eq!(ledger.score_percent(), Some(67));
  }

  #[test]
  fn clear_category_strips_only_that_category() {
    let mut ledger = ResponseLedger::new();
    ledger.record(response(Category::Memory, "q1", true));
    ledger.record(response(Category::Math, "q2", true));
    ledger.record(response(Category::Memory, "q3", false));
    ledger.clear_category(Category::Memory);
    assert_eq!(ledger.len(), 1);
    assert!(ledger.for_category(Category::Memory).is_empty());
    assert_eq!(ledger.for_category(Category::Math).len(), 1);
  }
}
