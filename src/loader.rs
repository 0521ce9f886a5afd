//! Section load tracking. The actual collaborator call runs in the
//! connection layer; this state machine only decides whether a completion
//! event still belongs to the session's current load. Exactly one load is
//! meaningful at a time: beginning a new one supersedes (without actively
//! cancelling) anything still in flight, and the stale result is dropped
//! by the generation check when it eventually lands.

use crate::domain::Category;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
  Idle,
  Pending(Category),
}

#[derive(Debug)]
pub struct SectionLoader {
  generation: u64,
  state: LoadState,
}

impl SectionLoader {
  pub fn new() -> Self {
    Self { generation: 0, state: LoadState::Idle }
  }

  /// Start tracking a fresh load for `category`. Returns the generation
  /// the eventual completion event must carry.
  pub fn begin(&mut self, category: Category) -> u64 {
    self.generation += 1;
    self.state = LoadState::Pending(category);
    self.generation
  }

  /// True when `generation` identifies the load we are still waiting for.
  /// Accepting moves the loader back to idle.
  pub fn accept(&mut self, generation: u64) -> bool {
    if generation != self.generation || !self.is_pending() {
      return false;
    }
    self.state = LoadState::Idle;
    true
  }

  /// Mark any outstanding load as stale (restart/quit).
  pub fn invalidate(&mut self) {
    self.generation += 1;
    self.state = LoadState::Idle;
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, LoadState::Pending(_))
  }

  #[allow(dead_code)]
  pub fn pending_category(&self) -> Option<Category> {
    match self.state {
      LoadState::Pending(c) => Some(c),
      LoadState::Idle => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn completion_for_the_current_load_is_accepted_once() {
    let mut loader = SectionLoader::new();
    let gen = loader.begin(Category::Memory);
    assert!(loader.is_pending());
    assert!(loader.accept(gen));
    assert!(!loader.is_pending());
    // A duplicate completion is stale.
    assert!(!loader.accept(gen));
  }

  #[test]
  fn a_new_load_supersedes_the_old_one() {
    let mut loader = SectionLoader::new();
    let old = loader.begin(Category::Memory);
    let fresh = loader.begin(Category::Attention);
    assert!(!loader.accept(old));
    assert_eq!(loader.pending_category(), Some(Category::Attention));
    assert!(loader.accept(fresh));
  }

  #[test]
  fn invalidate_drops_the_outstanding_load() {
    let mut loader = SectionLoader::new();
    let gen = loader.begin(Category::Spatial);
    loader.invalidate();
    assert!(!loader.accept(gen));
    assert!(!loader.is_pending());
  }
}
