//! Per-question countdown with second-granularity ticks.
//!
//! The timer itself is synchronous state: every `arm`/`disarm` bumps a
//! generation marker, and a tick carrying any other generation is discarded
//! without touching state. The asynchronous wake-ups live in small spawned
//! tasks (`spawn_ticker`, `spawn_alert_window`) that only ever send events
//! back into the session channel; they never mutate the timer directly.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::orchestrator::SessionEvent;

/// How long the timeout flash stays up. While it is displayed, answer
/// events are rejected; the connection layer schedules the matching
/// `AlertElapsed` event.
pub const ALERT_FLASH_MS: u64 = 900;

/// Outcome of applying one tick to the timer.
#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
  /// Tick belonged to a superseded instance (or no instance is armed).
  Stale,
  /// Countdown still running; payload is the remaining seconds.
  Running(u32),
  /// The countdown crossed zero just now. Edge-triggered: fires at most
  /// once per armed instance.
  Timeout,
}

#[derive(Debug)]
pub struct QuestionTimer {
  generation: u64,
  remaining: u32,
  armed: bool,
  timed_out: bool,
}

impl QuestionTimer {
  pub fn new() -> Self {
    Self { generation: 0, remaining: 0, armed: false, timed_out: false }
  }

  /// Start a fresh countdown for a new question instance. Bumping the
  /// generation invalidates every tick scheduled against a prior instance.
  pub fn arm(&mut self, limit_seconds: u32) -> u64 {
    self.generation += 1;
    self.remaining = limit_seconds;
    self.armed = true;
    self.timed_out = false;
    self.generation
  }

  /// Stop delivery of further ticks and timeout signals for the current
  /// instance (question answered, section restarted, session quit).
  pub fn disarm(&mut self) {
    self.generation += 1;
    self.armed = false;
  }

  /// Apply one 1 Hz tick. Stale generations never mutate state; the zero
  /// crossing reports `Timeout` exactly once.
  pub fn on_tick(&mut self, generation: u64) -> TickOutcome {
    if !self.armed || generation != self.generation {
      debug!(target: "assessment", generation, current = self.generation, "Discarding stale tick");
      return TickOutcome::Stale;
    }
    if self.remaining == 0 {
      // Already at zero: the timeout edge has fired, stay quiet.
      return TickOutcome::Stale;
    }
    self.remaining -= 1;
    if self.remaining == 0 {
      self.timed_out = true;
      TickOutcome::Timeout
    } else {
      TickOutcome::Running(self.remaining)
    }
  }

  pub fn generation(&self) -> u64 { self.generation }
  #[allow(dead_code)]
  pub fn remaining(&self) -> u32 { self.remaining }
  pub fn timed_out(&self) -> bool { self.timed_out }
}

/// Drive an armed timer instance: one `Tick` per elapsed second, at most
/// `limit_seconds` of them. Stops early if the session channel closes.
pub fn spawn_ticker(tx: UnboundedSender<SessionEvent>, generation: u64, limit_seconds: u32) {
  tokio::spawn(async move {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // First tick completes immediately; skip it so ticks land at 1s, 2s, ...
    interval.tick().await;
    for _ in 0..limit_seconds {
      interval.tick().await;
      if tx.send(SessionEvent::Tick { generation }).is_err() {
        break;
      }
    }
  });
}

/// Schedule the end of the timeout flash for the given timer instance.
pub fn spawn_alert_window(tx: UnboundedSender<SessionEvent>, generation: u64) {
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(ALERT_FLASH_MS)).await;
    let _ = tx.send(SessionEvent::AlertElapsed { generation });
  });
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ticks_count_down_to_an_edge_triggered_timeout() {
    let mut t = QuestionTimer::new();
    let gen = t.arm(3);
    assert_eq!(t.on_tick(gen), TickOutcome::Running(2));
    assert_eq!(t.on_tick(gen), TickOutcome::Running(1));
    assert_eq!(t.on_tick(gen), TickOutcome::Timeout);
    // Repeated zero-ticks must not re-fire.
    assert_eq!(t.on_tick(gen), TickOutcome::Stale);
    assert_eq!(t.on_tick(gen), TickOutcome::Stale);
    assert!(t.timed_out());
  }

  #[test]
  fn stale_generation_never_mutates_state() {
    let mut t = QuestionTimer::new();
    let old = t.arm(5);
    let fresh = t.arm(5);
    assert_ne!(old, fresh);
    assert_eq!(t.on_tick(old), TickOutcome::Stale);
    assert_eq!(t.remaining(), 5);
    assert_eq!(t.on_tick(fresh), TickOutcome::Running(4));
  }

  #[test]
  fn disarm_stops_delivery() {
    let mut t = QuestionTimer::new();
    let gen = t.arm(5);
    t.disarm();
    assert_eq!(t.on_tick(gen), TickOutcome::Stale);
    assert_eq!(t.remaining(), 5);
  }

  #[test]
  fn rearm_clears_the_timeout_flag() {
    let mut t = QuestionTimer::new();
    let gen = t.arm(1);
    assert_eq!(t.on_tick(gen), TickOutcome::Timeout);
    assert!(t.timed_out());
    t.arm(5);
    assert!(!t.timed_out());
  }
}
