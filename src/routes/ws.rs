//! WebSocket upgrade + per-connection session loop.
//!
//! One connection == one assessment session. The loop owns the
//! orchestrator and funnels everything through a single event channel:
//! client frames are parsed into `SessionEvent`s, and the spawned ticker /
//! alert / load tasks send their completions into the same channel. Each
//! event is applied synchronously; the returned commands spawn the next
//! round of asynchronous work and the client notifications.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, error, instrument, debug};
use uuid::Uuid;

use crate::domain::{placeholder_report, AssessmentMode, AssessmentRecord};
use crate::orchestrator::{Command, Orchestrator, SessionEvent};
use crate::protocol::{to_out, ClientWsMessage, ServerWsMessage};
use crate::queue::CategoryQueue;
use crate::state::AppState;
use crate::timer::{spawn_alert_window, spawn_ticker};
use crate::util::excerpt;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "acuity_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "acuity_backend", "WebSocket connected; session created");
  let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SessionEvent>();
  let mut orchestrator = Orchestrator::new(state.settings.questions_per_category);

  loop {
    let event = tokio::select! {
      incoming = socket.recv() => {
        match incoming {
          Some(Ok(Message::Text(txt))) => {
            match serde_json::from_str::<ClientWsMessage>(&txt) {
              Ok(msg) => {
                debug!(target: "acuity_backend", "WS received: {:?}", &msg);
                match client_event(msg) {
                  Some(ev) => ev,
                  None => {
                    if send_msg(&mut socket, &ServerWsMessage::Pong).await.is_err() { break; }
                    continue;
                  }
                }
              }
              Err(e) => {
                let reply = ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) };
                if send_msg(&mut socket, &reply).await.is_err() { break; }
                continue;
              }
            }
          }
          Some(Ok(Message::Ping(payload))) => {
            let _ = socket.send(Message::Pong(payload)).await;
            continue;
          }
          Some(Ok(Message::Close(_))) | None => break,
          Some(Ok(_)) => continue,
          Some(Err(e)) => {
            error!(target: "acuity_backend", error = %e, "WS receive error");
            break;
          }
        }
      }
      Some(ev) = events_rx.recv() => ev,
    };

    let commands = orchestrator.apply(event);
    if run_commands(commands, &mut socket, &state, &events_tx, &orchestrator).await.is_err() {
      break;
    }
  }
  info!(target: "acuity_backend", "WebSocket disconnected; session dropped");
}

/// Map a parsed client frame onto a session event. `None` means the frame
/// was a ping answered inline.
fn client_event(msg: ClientWsMessage) -> Option<SessionEvent> {
  match msg {
    ClientWsMessage::Ping => None,
    ClientWsMessage::StartFull =>
      Some(SessionEvent::Start { queue: CategoryQueue::full_run() }),
    ClientWsMessage::StartPractice { category } =>
      Some(SessionEvent::Start { queue: CategoryQueue::practice(category) }),
    ClientWsMessage::DismissInstructions => Some(SessionEvent::DismissInstructions),
    ClientWsMessage::RevealQuestion => Some(SessionEvent::RevealQuestion),
    ClientWsMessage::Answer { selected } => Some(SessionEvent::Answer { selected }),
    ClientWsMessage::RestartSection => Some(SessionEvent::RestartSection),
    ClientWsMessage::Quit => Some(SessionEvent::Quit),
    ClientWsMessage::OpenHistory => Some(SessionEvent::OpenHistory),
    ClientWsMessage::CloseHistory => Some(SessionEvent::CloseHistory),
    ClientWsMessage::Retake => Some(SessionEvent::Retake),
    ClientWsMessage::FinishAnalysis => Some(SessionEvent::FinishAnalysis),
  }
}

/// Execute the commands one transition produced: spawn async work, notify
/// the client. Err means the socket is gone and the loop should end.
async fn run_commands(
  commands: Vec<Command>,
  socket: &mut WebSocket,
  state: &Arc<AppState>,
  events_tx: &UnboundedSender<SessionEvent>,
  orchestrator: &Orchestrator,
) -> Result<(), ()> {
  for command in commands {
    match command {
      Command::BeginLoad { generation, category, count } => {
        let tx = events_tx.clone();
        let state = state.clone();
        tokio::spawn(async move {
          // Missing credential fails before any request is attempted.
          let result = match state.collab() {
            Ok(oa) => oa
              .generate_section(&state.prompts, category, count, state.settings.time_limit_seconds)
              .await
              .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
          };
          let _ = tx.send(SessionEvent::SectionLoaded { generation, result });
        });
      }

      Command::StartTicker { generation, limit_seconds } => {
        spawn_ticker(events_tx.clone(), generation, limit_seconds);
      }

      Command::StartAlertWindow { generation } => {
        spawn_alert_window(events_tx.clone(), generation);
      }

      Command::ShowQuestion => {
        let Some(question) = orchestrator.current_question() else { continue };
        let reply = ServerWsMessage::Question {
          question: to_out(question),
          number: orchestrator.question_number(),
          total: orchestrator.section_len(),
          reasoning_step: orchestrator.reasoning_step().into(),
        };
        send_msg(socket, &reply).await?;
      }

      Command::TickDown { remaining } => {
        send_msg(socket, &ServerWsMessage::Tick { remaining }).await?;
      }

      Command::TimeoutAlert => {
        send_msg(socket, &ServerWsMessage::TimeoutAlert).await?;
      }

      Command::SectionPending { category } => {
        send_msg(socket, &ServerWsMessage::SectionPending { category }).await?;
      }

      Command::SectionReady { category } => {
        send_msg(socket, &ServerWsMessage::SectionReady { category }).await?;
      }

      Command::LoadFailed { message } => {
        send_msg(socket, &ServerWsMessage::LoadFailed { message }).await?;
      }

      Command::EnterIntro => {
        send_msg(socket, &ServerWsMessage::EnterIntro).await?;
      }

      Command::ShowHistory => {
        let records = state.history.all().await;
        send_msg(socket, &ServerWsMessage::History { records }).await?;
      }

      Command::Analyze => {
        let reply = analyze_and_record(state, orchestrator).await;
        send_msg(socket, &reply).await?;
      }
    }
  }
  Ok(())
}

/// Run the analysis collaborator over the full ledger, falling back to the
/// deterministic placeholder so the analysis phase can always render, then
/// persist the run into history. A history write failure is logged but
/// does not abort the completed run.
#[instrument(level = "info", skip(state, orchestrator), fields(responses = orchestrator.responses().len()))]
async fn analyze_and_record(state: &Arc<AppState>, orchestrator: &Orchestrator) -> ServerWsMessage {
  let responses = orchestrator.responses().to_vec();

  let report = match state.collab() {
    Ok(oa) => match oa.analyze_responses(&state.prompts, &responses).await {
      Ok(r) => r,
      Err(e) => {
        error!(target: "assessment", error = %e, "Analysis collaborator failed; using placeholder");
        placeholder_report(&responses)
      }
    },
    Err(e) => {
      error!(target: "assessment", error = %e, "Analysis collaborator unavailable; using placeholder");
      placeholder_report(&responses)
    }
  };

  let record = AssessmentRecord {
    id: Uuid::new_v4().to_string(),
    date: chrono::Utc::now(),
    mode: orchestrator.mode().unwrap_or(AssessmentMode::Practice),
    score: orchestrator.score_percent().unwrap_or(0),
    total_questions: responses.len(),
    analysis_summary: excerpt(&report.summary, 140),
  };
  if let Err(e) = state.history.append(record.clone()).await {
    error!(target: "acuity_backend", error = %e, "History append failed; run result still delivered");
  }

  ServerWsMessage::Analysis { report, record }
}

/// Serialize and send one server message.
async fn send_msg(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), ()> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "acuity_backend", error = %e, "WS send error");
  })
}
