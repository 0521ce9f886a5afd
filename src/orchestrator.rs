//! The assessment orchestrator: a single-owner state machine coordinating
//! the timer, section loader, category queue and response ledger.
//!
//! Everything here is synchronous. External happenings (a socket message,
//! a 1 Hz tick, an expired alert window, a finished collaborator call)
//! arrive as `SessionEvent`s; `apply` mutates the session atomically and
//! returns `Command`s for the connection layer to execute (spawn a load,
//! start a ticker, run the analysis, notify the client). Stale async
//! results are discarded by the timer/loader generation markers before
//! they can touch state.
//!
//! Invalid transitions are benign event races (a click landing after a
//! phase change), so they are ignored rather than surfaced as errors.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::{AssessmentMode, Category, Question, QuestionPayload, UserResponse};
use crate::ledger::ResponseLedger;
use crate::loader::SectionLoader;
use crate::queue::CategoryQueue;
use crate::timer::{QuestionTimer, TickOutcome};

/// Top-level mode of the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
  Intro,
  Instructions,
  Test,
  Analysis,
  History,
}

/// Sub-state for the reasoning category's two-stage reveal. The statement
/// is shown untimed; the clock only starts once the question is visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReasoningStep {
  Statement,
  Question,
}

/// Everything that can happen to a session, from any source.
#[derive(Debug)]
pub enum SessionEvent {
  Start { queue: CategoryQueue },
  DismissInstructions,
  /// Reasoning only: advance from the statement to the timed question.
  RevealQuestion,
  Answer { selected: String },
  Tick { generation: u64 },
  AlertElapsed { generation: u64 },
  SectionLoaded { generation: u64, result: Result<Vec<Question>, String> },
  RestartSection,
  Quit,
  OpenHistory,
  CloseHistory,
  Retake,
  FinishAnalysis,
}

/// Work the connection layer performs after a transition.
#[derive(Debug, PartialEq)]
pub enum Command {
  BeginLoad { generation: u64, category: Category, count: usize },
  StartTicker { generation: u64, limit_seconds: u32 },
  StartAlertWindow { generation: u64 },
  /// Present the current question (or the reasoning statement).
  ShowQuestion,
  TickDown { remaining: u32 },
  /// Flash + audible cue. Never auto-submits an answer.
  TimeoutAlert,
  SectionPending { category: Category },
  SectionReady { category: Category },
  LoadFailed { message: String },
  /// Run the analysis collaborator over the full ledger.
  Analyze,
  EnterIntro,
  ShowHistory,
}

pub struct Orchestrator {
  phase: Phase,
  queue: Option<CategoryQueue>,
  questions: Vec<Question>,
  question_index: usize,
  ledger: ResponseLedger,
  timer: QuestionTimer,
  loader: SectionLoader,
  reasoning_step: ReasoningStep,
  /// True while the timeout flash is up; answer events are rejected until
  /// the matching AlertElapsed lands.
  alert_active: bool,
  /// When the answerable question was displayed. Latency measures from
  /// here, even for answers landing after the buzzer.
  shown_at: Option<Instant>,
  questions_per_category: usize,
}

impl Orchestrator {
  pub fn new(questions_per_category: usize) -> Self {
    Self {
      phase: Phase::Intro,
      queue: None,
      questions: vec![],
      question_index: 0,
      ledger: ResponseLedger::new(),
      timer: QuestionTimer::new(),
      loader: SectionLoader::new(),
      reasoning_step: ReasoningStep::Statement,
      alert_active: false,
      shown_at: None,
      questions_per_category,
    }
  }

  /// Apply one event. Runs synchronously and atomically with respect to
  /// the session's suspension points.
  pub fn apply(&mut self, event: SessionEvent) -> Vec<Command> {
    match event {
      SessionEvent::Start { queue } => self.handle_start(queue),
      SessionEvent::DismissInstructions => self.handle_dismiss_instructions(),
      SessionEvent::RevealQuestion => self.handle_reveal_question(),
      SessionEvent::Answer { selected } => self.handle_answer(&selected),
      SessionEvent::Tick { generation } => self.handle_tick(generation),
      SessionEvent::AlertElapsed { generation } => self.handle_alert_elapsed(generation),
      SessionEvent::SectionLoaded { generation, result } => {
        self.handle_section_loaded(generation, result)
      }
      SessionEvent::RestartSection => self.handle_restart_section(),
      SessionEvent::Quit => self.handle_quit(),
      SessionEvent::OpenHistory => self.handle_open_history(),
      SessionEvent::CloseHistory => self.handle_close_history(),
      SessionEvent::Retake => self.handle_retake(),
      SessionEvent::FinishAnalysis => self.handle_finish_analysis(),
    }
  }

  // --- Transition handlers ---

  fn handle_start(&mut self, queue: CategoryQueue) -> Vec<Command> {
    if self.phase != Phase::Intro {
      return self.ignore("start");
    }
    let Some(category) = queue.current() else {
      return self.ignore("start with empty queue");
    };
    self.queue = Some(queue);
    self.ledger.clear();
    self.questions.clear();
    self.question_index = 0;
    self.phase = Phase::Instructions;
    let generation = self.loader.begin(category);
    info!(target: "assessment", %category, "Session started; loading first section");
    vec![
      Command::SectionPending { category },
      Command::BeginLoad { generation, category, count: self.questions_per_category },
    ]
  }

  fn handle_section_loaded(
    &mut self,
    generation: u64,
    result: Result<Vec<Question>, String>,
  ) -> Vec<Command> {
    if !self.loader.accept(generation) {
      debug!(target: "assessment", generation, "Discarding stale section load");
      return vec![];
    }
    match result {
      Ok(questions) if !questions.is_empty() => {
        let category = questions[0].category;
        info!(target: "assessment", %category, count = questions.len(), "Section ready");
        self.questions = questions;
        vec![Command::SectionReady { category }]
      }
      Ok(_) => self.fail_load("question service returned an empty section".into()),
      Err(message) => self.fail_load(message),
    }
  }

  /// A load failure never leaves the machine in `test` with stale or empty
  /// questions: the whole session returns to intro with a surfaced error.
  fn fail_load(&mut self, message: String) -> Vec<Command> {
    warn!(target: "assessment", error = %message, "Section load failed; returning to intro");
    self.reset_session();
    vec![Command::LoadFailed { message }, Command::EnterIntro]
  }

  fn handle_dismiss_instructions(&mut self) -> Vec<Command> {
    if self.phase != Phase::Instructions || self.loader.is_pending() || self.questions.is_empty() {
      return self.ignore("dismiss_instructions");
    }
    self.phase = Phase::Test;
    self.question_index = 0;
    self.enter_question()
  }

  /// Present the question at `question_index`: reset the per-question
  /// flags and either arm the timer, or hold it for the reasoning
  /// statement sub-step (untimed by design).
  fn enter_question(&mut self) -> Vec<Command> {
    self.alert_active = false;
    let Some(question) = self.questions.get(self.question_index) else {
      return vec![];
    };
    let two_stage = matches!(question.payload, QuestionPayload::Reasoning { .. });
    if two_stage {
      self.reasoning_step = ReasoningStep::Statement;
      self.shown_at = None;
      vec![Command::ShowQuestion]
    } else {
      self.reasoning_step = ReasoningStep::Question;
      let limit_seconds = question.time_limit_seconds;
      let generation = self.timer.arm(limit_seconds);
      self.shown_at = Some(Instant::now());
      vec![
        Command::ShowQuestion,
        Command::StartTicker { generation, limit_seconds },
      ]
    }
  }

  fn handle_reveal_question(&mut self) -> Vec<Command> {
    if self.phase != Phase::Test || self.reasoning_step != ReasoningStep::Statement {
      return self.ignore("reveal_question");
    }
    let Some(question) = self.questions.get(self.question_index) else {
      return self.ignore("reveal_question without a question");
    };
    self.reasoning_step = ReasoningStep::Question;
    let limit_seconds = question.time_limit_seconds;
    let generation = self.timer.arm(limit_seconds);
    self.shown_at = Some(Instant::now());
    vec![
      Command::ShowQuestion,
      Command::StartTicker { generation, limit_seconds },
    ]
  }

  fn handle_tick(&mut self, generation: u64) -> Vec<Command> {
    if self.phase != Phase::Test {
      return vec![];
    }
    match self.timer.on_tick(generation) {
      TickOutcome::Stale => vec![],
      TickOutcome::Running(remaining) => vec![Command::TickDown { remaining }],
      TickOutcome::Timeout => {
        info!(target: "assessment", question_index = self.question_index, "Question timed out");
        self.alert_active = true;
        vec![
          Command::TickDown { remaining: 0 },
          Command::TimeoutAlert,
          Command::StartAlertWindow { generation: self.timer.generation() },
        ]
      }
    }
  }

  fn handle_alert_elapsed(&mut self, generation: u64) -> Vec<Command> {
    if generation == self.timer.generation() && self.alert_active {
      self.alert_active = false;
    }
    vec![]
  }

  fn handle_answer(&mut self, selected: &str) -> Vec<Command> {
    if self.phase != Phase::Test {
      return self.ignore("answer");
    }
    if self.alert_active {
      // Clicks landing during the timeout flash are dropped; the user can
      // still answer once the flash clears.
      return self.ignore("answer during timeout flash");
    }
    if self.reasoning_step == ReasoningStep::Statement {
      return self.ignore("answer before question reveal");
    }
    let Some(question) = self.questions.get(self.question_index) else {
      return self.ignore("answer without a question");
    };

    let time_taken_ms = self
      .shown_at
      .map(|t| t.elapsed().as_millis() as u64)
      .unwrap_or(0);
    let response = UserResponse::build(question, selected, time_taken_ms, self.timer.timed_out());
    info!(
      target: "assessment",
      question_id = %response.question_id,
      correct = response.is_correct,
      timed_out = response.timed_out,
      time_taken_ms,
      "Answer recorded"
    );
    self.timer.disarm();
    self.ledger.record(response);
    self.advance()
  }

  /// After a recorded answer: next question, next section, or analysis.
  fn advance(&mut self) -> Vec<Command> {
    if self.question_index + 1 < self.questions.len() {
      self.question_index += 1;
      return self.enter_question();
    }

    // Section exhausted; ask the queue whether a category remains.
    let Some(queue) = self.queue.as_mut() else {
      return vec![];
    };
    if queue.advance() {
      let category = queue.current().expect("advance returned true");
      self.questions.clear();
      self.question_index = 0;
      self.phase = Phase::Instructions;
      let generation = self.loader.begin(category);
      info!(target: "assessment", %category, "Section complete; loading next");
      vec![
        Command::SectionPending { category },
        Command::BeginLoad { generation, category, count: self.questions_per_category },
      ]
    } else {
      info!(target: "assessment", responses = self.ledger.len(), "Run complete; entering analysis");
      self.phase = Phase::Analysis;
      vec![Command::Analyze]
    }
  }

  fn handle_restart_section(&mut self) -> Vec<Command> {
    if self.phase != Phase::Test && self.phase != Phase::Instructions {
      return self.ignore("restart_section");
    }
    let Some(category) = self.queue.as_ref().and_then(|q| q.current()) else {
      return self.ignore("restart_section without a category");
    };
    // Stop the timer and invalidate any outstanding load synchronously,
    // before the fresh load starts.
    self.timer.disarm();
    self.loader.invalidate();
    self.alert_active = false;
    self.ledger.clear_category(category);
    self.questions.clear();
    self.question_index = 0;
    self.phase = Phase::Instructions;
    let generation = self.loader.begin(category);
    info!(target: "assessment", %category, "Section restarted");
    vec![
      Command::SectionPending { category },
      Command::BeginLoad { generation, category, count: self.questions_per_category },
    ]
  }

  fn handle_quit(&mut self) -> Vec<Command> {
    if self.phase != Phase::Test && self.phase != Phase::Instructions {
      return self.ignore("quit");
    }
    info!(target: "assessment", "Session quit");
    self.reset_session();
    vec![Command::EnterIntro]
  }

  fn handle_open_history(&mut self) -> Vec<Command> {
    if self.phase != Phase::Intro {
      return self.ignore("open_history");
    }
    self.phase = Phase::History;
    vec![Command::ShowHistory]
  }

  fn handle_close_history(&mut self) -> Vec<Command> {
    if self.phase != Phase::History {
      return self.ignore("close_history");
    }
    self.phase = Phase::Intro;
    vec![Command::EnterIntro]
  }

  /// Re-run the same queue from its first category.
  fn handle_retake(&mut self) -> Vec<Command> {
    if self.phase != Phase::Analysis {
      return self.ignore("retake");
    }
    let Some(queue) = self.queue.as_mut() else {
      return self.ignore("retake without a queue");
    };
    queue.rewind();
    let category = queue.current().expect("rewound queue has a head");
    self.ledger.clear();
    self.questions.clear();
    self.question_index = 0;
    self.phase = Phase::Instructions;
    let generation = self.loader.begin(category);
    info!(target: "assessment", %category, "Retake started");
    vec![
      Command::SectionPending { category },
      Command::BeginLoad { generation, category, count: self.questions_per_category },
    ]
  }

  fn handle_finish_analysis(&mut self) -> Vec<Command> {
    if self.phase != Phase::Analysis {
      return self.ignore("finish_analysis");
    }
    self.reset_session();
    vec![Command::EnterIntro]
  }

  /// Back to the idle intro state. Stops the timer and marks any
  /// outstanding load stale before dropping session data.
  fn reset_session(&mut self) {
    self.timer.disarm();
    self.loader.invalidate();
    self.queue = None;
    self.questions.clear();
    self.question_index = 0;
    self.ledger.clear();
    self.reasoning_step = ReasoningStep::Statement;
    self.alert_active = false;
    self.shown_at = None;
    self.phase = Phase::Intro;
  }

  fn ignore(&self, what: &str) -> Vec<Command> {
    debug!(target: "assessment", phase = ?self.phase, what, "Ignoring event outside its valid phase");
    vec![]
  }

  // --- Read accessors for the connection layer ---

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn current_question(&self) -> Option<&Question> {
    if self.phase == Phase::Test { self.questions.get(self.question_index) } else { None }
  }

  pub fn question_number(&self) -> usize {
    self.question_index + 1
  }

  pub fn section_len(&self) -> usize {
    self.questions.len()
  }

  pub fn reasoning_step(&self) -> ReasoningStep {
    self.reasoning_step
  }

  pub fn responses(&self) -> &[UserResponse] {
    self.ledger.responses()
  }

  pub fn score_percent(&self) -> Option<u32> {
    self.ledger.score_percent()
  }

  pub fn mode(&self) -> Option<AssessmentMode> {
    self.queue.as_ref().map(|q| q.mode())
  }

  #[cfg(test)]
  pub fn ledger(&self) -> &ResponseLedger {
    &self.ledger
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const LIMIT: u32 = 5;

  fn question(category: Category, id: &str, answer: &str) -> Question {
    let payload = match category {
      Category::Memory => QuestionPayload::Memory {
        symbols: vec!["🐝".into(), "🐝".into(), "🌲".into()],
      },
      Category::Attention => QuestionPayload::Attention {
        items: vec!["7".into(), "7".into(), "1".into()],
      },
      Category::Reasoning => QuestionPayload::Reasoning {
        statement: "Tom is taller than Jim".into(),
        question: "Who is tallest?".into(),
        options: vec!["Tom".into(), "Jim".into()],
      },
      Category::Spatial => QuestionPayload::Spatial {
        base_symbol: "⌘".into(),
        options: vec!["a".into(), "b".into()],
      },
      Category::Math => QuestionPayload::Math {
        expression: "2+2".into(),
        options: vec!["4".into(), "5".into()],
      },
    };
    Question {
      id: id.into(),
      category,
      payload,
      correct_answer: answer.into(),
      time_limit_seconds: LIMIT,
    }
  }

  fn begin_load_generation(cmds: &[Command]) -> u64 {
    cmds.iter()
      .find_map(|c| match c {
        Command::BeginLoad { generation, .. } => Some(*generation),
        _ => None,
      })
      .expect("a BeginLoad command")
  }

  fn ticker_generation(cmds: &[Command]) -> u64 {
    cmds.iter()
      .find_map(|c| match c {
        Command::StartTicker { generation, .. } => Some(*generation),
        _ => None,
      })
      .expect("a StartTicker command")
  }

  /// Start a session and feed it one loaded section.
  fn start_with_section(
    orch: &mut Orchestrator,
    queue: CategoryQueue,
    questions: Vec<Question>,
  ) -> Vec<Command> {
    let cmds = orch.apply(SessionEvent::Start { queue });
    let generation = begin_load_generation(&cmds);
    orch.apply(SessionEvent::SectionLoaded { generation, result: Ok(questions) })
  }

  #[test]
  fn start_enters_instructions_without_waiting_for_the_load() {
    let mut orch = Orchestrator::new(1);
    let cmds = orch.apply(SessionEvent::Start { queue: CategoryQueue::practice(Category::Math) });
    assert_eq!(orch.phase(), Phase::Instructions);
    assert!(matches!(cmds[0], Command::SectionPending { category: Category::Math }));
    // Dismissing while the load is pending is a no-op.
    assert!(orch.apply(SessionEvent::DismissInstructions).is_empty());
    assert_eq!(orch.phase(), Phase::Instructions);
  }

  #[test]
  fn timeout_fires_once_then_answer_still_counts() {
    // Queue = [Reasoning], 1 question, limit 5s.
    let mut orch = Orchestrator::new(1);
    start_with_section(
      &mut orch,
      CategoryQueue::practice(Category::Reasoning),
      vec![question(Category::Reasoning, "q1", "Tom")],
    );
    orch.apply(SessionEvent::DismissInstructions);
    assert_eq!(orch.phase(), Phase::Test);
    assert_eq!(orch.reasoning_step(), ReasoningStep::Statement);

    // Statement step is untimed; answers are rejected there.
    assert!(orch.apply(SessionEvent::Answer { selected: "Tom".into() }).is_empty());

    let cmds = orch.apply(SessionEvent::RevealQuestion);
    let generation = ticker_generation(&cmds);

    // Five ticks: four countdowns, then the timeout edge.
    for _ in 0..4 {
      let cmds = orch.apply(SessionEvent::Tick { generation });
      assert!(matches!(cmds[0], Command::TickDown { .. }));
    }
    let cmds = orch.apply(SessionEvent::Tick { generation });
    assert!(cmds.contains(&Command::TimeoutAlert));
    assert_eq!(orch.phase(), Phase::Test);
    assert!(orch.responses().is_empty());

    // The edge never re-fires.
    assert!(orch.apply(SessionEvent::Tick { generation }).is_empty());

    // During the flash, answers are rejected.
    assert!(orch.apply(SessionEvent::Answer { selected: "Tom".into() }).is_empty());
    orch.apply(SessionEvent::AlertElapsed { generation });

    // A timed-out-then-correct answer still counts as a normal answer.
    let cmds = orch.apply(SessionEvent::Answer { selected: "Tom".into() });
    assert!(cmds.contains(&Command::Analyze));
    assert_eq!(orch.phase(), Phase::Analysis);
    assert_eq!(orch.responses().len(), 1);
    assert!(orch.responses()[0].is_correct);
    assert!(orch.responses()[0].timed_out);
  }

  #[test]
  fn stale_tick_after_answer_mutates_nothing() {
    let mut orch = Orchestrator::new(2);
    start_with_section(
      &mut orch,
      CategoryQueue::practice(Category::Math),
      vec![question(Category::Math, "q1", "4"), question(Category::Math, "q2", "6")],
    );
    let cmds = orch.apply(SessionEvent::DismissInstructions);
    let old_generation = ticker_generation(&cmds);

    orch.apply(SessionEvent::Answer { selected: "4".into() });
    assert_eq!(orch.responses().len(), 1);
    assert_eq!(orch.question_number(), 2);

    // A tick scheduled against question 1 lands after the advance.
    let cmds = orch.apply(SessionEvent::Tick { generation: old_generation });
    assert!(cmds.is_empty());
    assert_eq!(orch.responses().len(), 1);
    assert_eq!(orch.question_number(), 2);
  }

  #[test]
  fn full_run_advances_between_sections_and_analyzes_after_the_last() {
    let mut orch = Orchestrator::new(1);
    let cmds = orch.apply(SessionEvent::Start { queue: CategoryQueue::full_run() });
    let generation = begin_load_generation(&cmds);
    orch.apply(SessionEvent::SectionLoaded {
      generation,
      result: Ok(vec![question(Category::Memory, "m1", "1")]),
    });
    orch.apply(SessionEvent::DismissInstructions);
    let cmds = orch.apply(SessionEvent::Answer { selected: "1".into() });

    // Section exhausted: the queue advanced exactly once, next load begins.
    assert_eq!(orch.phase(), Phase::Instructions);
    assert!(matches!(cmds[0], Command::SectionPending { category: Category::Attention }));
    let generation = begin_load_generation(&cmds);
    orch.apply(SessionEvent::SectionLoaded {
      generation,
      result: Ok(vec![question(Category::Attention, "a1", "1")]),
    });
    orch.apply(SessionEvent::DismissInstructions);

    // Remaining three categories of the full run.
    for (cat, id) in [
      (Category::Reasoning, "r1"),
      (Category::Spatial, "s1"),
      (Category::Math, "x1"),
    ] {
      let cmds = orch.apply(SessionEvent::Answer { selected: "1".into() });
      let generation = begin_load_generation(&cmds);
      orch.apply(SessionEvent::SectionLoaded {
        generation,
        result: Ok(vec![question(cat, id, "1")]),
      });
      orch.apply(SessionEvent::DismissInstructions);
      if cat == Category::Reasoning {
        orch.apply(SessionEvent::RevealQuestion);
      }
    }
    let cmds = orch.apply(SessionEvent::Answer { selected: "1".into() });
    assert!(cmds.contains(&Command::Analyze));
    assert_eq!(orch.phase(), Phase::Analysis);
    // One response per category of the full queue.
    assert_eq!(orch.responses().len(), 5);
  }

  #[test]
  fn restart_mid_section_strips_the_category_and_reloads() {
    let mut orch = Orchestrator::new(5);
    start_with_section(
      &mut orch,
      CategoryQueue::practice(Category::Attention),
      (0..5).map(|i| question(Category::Attention, &format!("q{i}"), "1")).collect(),
    );
    orch.apply(SessionEvent::DismissInstructions);
    for _ in 0..3 {
      orch.apply(SessionEvent::Answer { selected: "1".into() });
    }
    assert_eq!(orch.ledger().for_category(Category::Attention).len(), 3);

    let cmds = orch.apply(SessionEvent::RestartSection);
    assert_eq!(orch.phase(), Phase::Instructions);
    // Pending state is announced before the fresh load begins.
    assert!(matches!(cmds[0], Command::SectionPending { category: Category::Attention }));
    assert!(matches!(cmds[1], Command::BeginLoad { category: Category::Attention, count: 5, .. }));
    assert!(orch.ledger().for_category(Category::Attention).is_empty());
  }

  #[test]
  fn stale_section_load_is_discarded() {
    let mut orch = Orchestrator::new(1);
    let cmds = orch.apply(SessionEvent::Start { queue: CategoryQueue::practice(Category::Math) });
    let old_generation = begin_load_generation(&cmds);
    let cmds = orch.apply(SessionEvent::RestartSection);
    let fresh_generation = begin_load_generation(&cmds);
    assert_ne!(old_generation, fresh_generation);

    // The superseded load completes late and is dropped.
    let cmds = orch.apply(SessionEvent::SectionLoaded {
      generation: old_generation,
      result: Ok(vec![question(Category::Math, "old", "4")]),
    });
    assert!(cmds.is_empty());
    assert_eq!(orch.section_len(), 0);

    orch.apply(SessionEvent::SectionLoaded {
      generation: fresh_generation,
      result: Ok(vec![question(Category::Math, "fresh", "4")]),
    });
    assert_eq!(orch.section_len(), 1);
  }

  #[test]
  fn load_failure_returns_the_whole_session_to_intro() {
    let mut orch = Orchestrator::new(1);
    let cmds = orch.apply(SessionEvent::Start { queue: CategoryQueue::full_run() });
    let generation = begin_load_generation(&cmds);
    let cmds = orch.apply(SessionEvent::SectionLoaded {
      generation,
      result: Err("upstream unreachable".into()),
    });
    assert_eq!(orch.phase(), Phase::Intro);
    assert!(cmds.iter().any(|c| matches!(c, Command::LoadFailed { .. })));
    assert!(cmds.contains(&Command::EnterIntro));
  }

  #[test]
  fn quit_clears_everything() {
    let mut orch = Orchestrator::new(1);
    start_with_section(
      &mut orch,
      CategoryQueue::practice(Category::Math),
      vec![question(Category::Math, "q1", "4")],
    );
    orch.apply(SessionEvent::DismissInstructions);
    let cmds = orch.apply(SessionEvent::Quit);
    assert_eq!(orch.phase(), Phase::Intro);
    assert!(cmds.contains(&Command::EnterIntro));
    assert!(orch.responses().is_empty());
    assert_eq!(orch.mode(), None);
  }

  #[test]
  fn answer_outside_test_is_a_no_op() {
    let mut orch = Orchestrator::new(1);
    assert!(orch.apply(SessionEvent::Answer { selected: "4".into() }).is_empty());
    assert_eq!(orch.phase(), Phase::Intro);
    assert!(orch.responses().is_empty());
  }

  #[test]
  fn history_is_reachable_from_intro_only() {
    let mut orch = Orchestrator::new(1);
    let cmds = orch.apply(SessionEvent::OpenHistory);
    assert_eq!(orch.phase(), Phase::History);
    assert!(cmds.contains(&Command::ShowHistory));
    orch.apply(SessionEvent::CloseHistory);
    assert_eq!(orch.phase(), Phase::Intro);

    // Mid-run, history is not a supported transition.
    orch.apply(SessionEvent::Start { queue: CategoryQueue::practice(Category::Math) });
    assert!(orch.apply(SessionEvent::OpenHistory).is_empty());
    assert_eq!(orch.phase(), Phase::Instructions);
  }

  #[test]
  fn retake_reruns_the_same_queue() {
    let mut orch = Orchestrator::new(1);
    start_with_section(
      &mut orch,
      CategoryQueue::practice(Category::Spatial),
      vec![question(Category::Spatial, "q1", "a")],
    );
    orch.apply(SessionEvent::DismissInstructions);
    orch.apply(SessionEvent::Answer { selected: "a".into() });
    assert_eq!(orch.phase(), Phase::Analysis);

    let cmds = orch.apply(SessionEvent::Retake);
    assert_eq!(orch.phase(), Phase::Instructions);
    assert!(orch.responses().is_empty());
    assert!(matches!(cmds[0], Command::SectionPending { category: Category::Spatial }));
  }

  #[test]
  fn score_percent_round_trips_into_the_record_value() {
    let mut orch = Orchestrator::new(2);
    start_with_section(
      &mut orch,
      CategoryQueue::practice(Category::Math),
      vec![question(Category::Math, "q1", "4"), question(Category::Math, "q2", "6")],
    );
    orch.apply(SessionEvent::DismissInstructions);
    orch.apply(SessionEvent::Answer { selected: "4".into() });
    orch.apply(SessionEvent::Answer { selected: "wrong".into() });
    assert_eq!(orch.score_percent(), Some(50));
  }
}
