//! Category queue: which section runs next. Holds category identity only;
//! question data is loaded per-section by the collaborator, so "which test
//! is next" stays decoupled from "is the next test's data ready".

use crate::domain::{Category, AssessmentMode, FULL_RUN_ORDER};

/// Ordered list of categories for one run plus the cursor into it.
/// The list is set once per session and immutable during the run.
#[derive(Clone, Debug)]
pub struct CategoryQueue {
  categories: Vec<Category>,
  index: usize,
}

impl CategoryQueue {
  /// All five categories in the fixed assessment order.
  pub fn full_run() -> Self {
    Self { categories: FULL_RUN_ORDER.to_vec(), index: 0 }
  }

  /// Singleton queue for practicing one category.
  pub fn practice(category: Category) -> Self {
    Self { categories: vec![category], index: 0 }
  }

  /// Category currently being run, or None once exhausted.
  pub fn current(&self) -> Option<Category> {
    self.categories.get(self.index).copied()
  }

  /// Move to the next category. Returns whether one exists.
  pub fn advance(&mut self) -> bool {
    self.index += 1;
    self.index < self.categories.len()
  }

  /// Restart the same run from its first category (retake).
  pub fn rewind(&mut self) {
    self.index = 0;
  }

  pub fn mode(&self) -> AssessmentMode {
    if self.categories.len() > 1 { AssessmentMode::Full } else { AssessmentMode::Practice }
  }

  #[allow(dead_code)]
  pub fn len(&self) -> usize {
    self.categories.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_run_sequences_all_five_in_order() {
    let mut q = CategoryQueue::full_run();
    assert_eq!(q.mode(), AssessmentMode::Full);
    let mut seen = vec![q.current().unwrap()];
    while q.advance() {
      seen.push(q.current().unwrap());
    }
    assert_eq!(seen, FULL_RUN_ORDER.to_vec());
    assert_eq!(q.current(), None);
  }

  #[test]
  fn practice_queue_is_a_singleton() {
    let mut q = CategoryQueue::practice(Category::Reasoning);
    assert_eq!(q.mode(), AssessmentMode::Practice);
    assert_eq!(q.current(), Some(Category::Reasoning));
    assert!(!q.advance());
    assert_eq!(q.current(), None);
  }

  #[test]
  fn rewind_restarts_the_same_queue() {
    let mut q = CategoryQueue::full_run();
    q.advance();
    q.advance();
    q.rewind();
    assert_eq!(q.current(), Some(Category::Memory));
  }
}
