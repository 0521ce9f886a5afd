//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{
    AnalysisReport, AssessmentRecord, Category, Question, QuestionPayload,
};
use crate::orchestrator::ReasoningStep;

/// Messages the client can send over WebSocket. Restart and quit are
/// confirmation-gated in the UI; receiving one here means "confirmed".
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartFull,
    StartPractice {
        category: Category,
    },
    DismissInstructions,
    RevealQuestion,
    Answer {
        selected: String,
    },
    RestartSection,
    Quit,
    OpenHistory,
    CloseHistory,
    Retake,
    FinishAnalysis,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    /// A section load is in flight; render the pending instructions state.
    SectionPending {
        category: Category,
    },
    /// The section batch arrived; instructions may now be dismissed.
    SectionReady {
        category: Category,
    },
    Question {
        question: QuestionOut,
        number: usize,
        total: usize,
        reasoning_step: ReasoningStepOut,
    },
    Tick {
        remaining: u32,
    },
    /// Flash + audible cue; no answer is auto-submitted.
    TimeoutAlert,
    LoadFailed {
        message: String,
    },
    EnterIntro,
    Analysis {
        report: AnalysisReport,
        record: AssessmentRecord,
    },
    History {
        records: Vec<AssessmentRecord>,
    },
    Error {
        message: String,
    },
}

/// Wire form of the reasoning sub-state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStepOut {
    Statement,
    Question,
}

impl From<ReasoningStep> for ReasoningStepOut {
    fn from(step: ReasoningStep) -> Self {
        match step {
            ReasoningStep::Statement => ReasoningStepOut::Statement,
            ReasoningStep::Question => ReasoningStepOut::Question,
        }
    }
}

/// DTO for question delivery. Deliberately omits `correct_answer`:
/// scoring happens server-side only.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub category: Category,
    pub payload: QuestionPayload,
    pub time_limit_seconds: u32,
}

/// Convert a full `Question` (internal) to the public DTO.
pub fn to_out(q: &Question) -> QuestionOut {
    QuestionOut {
        id: q.id.clone(),
        category: q.category,
        payload: q.payload.clone(),
        time_limit_seconds: q.time_limit_seconds,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct HistoryOut {
    pub records: Vec<AssessmentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_out_never_carries_the_correct_answer() {
        let q = Question {
            id: "q1".into(),
            category: Category::Math,
            payload: QuestionPayload::Math {
                expression: "2+2".into(),
                options: vec!["4".into(), "5".into()],
            },
            correct_answer: "4".into(),
            time_limit_seconds: 5,
        };
        let wire = serde_json::to_string(&to_out(&q)).expect("serialize");
        assert!(!wire.contains("correct_answer"));
        assert!(wire.contains("\"expression\":\"2+2\""));
    }

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let m: ClientWsMessage =
            serde_json::from_str(r#"{"type":"start_practice","category":"reasoning"}"#)
                .expect("parse");
        assert!(matches!(m, ClientWsMessage::StartPractice { category: Category::Reasoning }));
        let m: ClientWsMessage =
            serde_json::from_str(r#"{"type":"answer","selected":"Tom"}"#).expect("parse");
        assert!(matches!(m, ClientWsMessage::Answer { .. }));
    }
}
