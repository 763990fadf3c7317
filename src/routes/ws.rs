//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{info, error, instrument, debug};

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::state::AppState;

const WAV_MIME: &str = "audio/wav";

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "codebuddy_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "codebuddy_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "codebuddy_backend", kind = incoming.kind(), payload_len = incoming.payload_len(), "WS received");
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "codebuddy_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "codebuddy_backend", "WebSocket disconnected");
}

fn error_reply(e: impl std::fmt::Display) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string() }
}

/// Dispatch one parsed client message. Also used directly by tests.
#[instrument(level = "info", skip(msg, state), fields(kind = msg.kind(), payload_len = msg.payload_len()))]
pub async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::GetSession => ServerWsMessage::Session { session: session_snapshot(state).await },

    ClientWsMessage::Navigate { screen } => ServerWsMessage::Session { session: navigate(state, screen).await },

    ClientWsMessage::SelectCourse { course_id } => match select_course(state, &course_id).await {
      Ok(session) => ServerWsMessage::Session { session },
      Err(e) => error_reply(e),
    },

    ClientWsMessage::SelectChapter { chapter_id } => match select_chapter(state, chapter_id.as_deref()).await {
      Ok(session) => ServerWsMessage::Session { session },
      Err(e) => error_reply(e),
    },

    ClientWsMessage::AdvanceChapter => ServerWsMessage::Session { session: advance_chapter(state).await },

    ClientWsMessage::SubmitPractice { answer } => match submit_practice(state, &answer).await {
      Ok(result) => {
        info!(target: "practice", course_id = %result.course_id, chapter_id = %result.chapter_id, passed = result.passed, "WS practice evaluated");
        ServerWsMessage::PracticeResult { result }
      }
      Err(e) => error_reply(e),
    },

    ClientWsMessage::Explain { output_language } => match explain_chapter(state, output_language.as_deref()).await {
      Ok(explanation) => ServerWsMessage::Explanation { explanation },
      Err(e) => error_reply(e),
    },

    ClientWsMessage::CheckCode { code, output_language } => {
      let review = review_playground_code(state, &code, output_language.as_deref()).await;
      ServerWsMessage::CodeReview { feedback: review.feedback, error_line: review.error_line }
    }

    ClientWsMessage::AnalyzeImage { image_base64, mime } => match decode_image(&image_base64) {
      Ok(image) => ServerWsMessage::ImageAnalysis { text: analyze_playground_image(state, &image, mime.as_deref()).await },
      Err(e) => error_reply(format!("Invalid image payload: {e}")),
    },

    ClientWsMessage::Speak { text } => {
      let audio_base64 = speak(state, &text).await.map(|clip| BASE64.encode(clip.to_wav()));
      ServerWsMessage::Speech { audio_base64, mime: WAV_MIME.into() }
    }

    ClientWsMessage::Chat { text } => ServerWsMessage::ChatReply { message: chat_reply(state, &text).await },

    ClientWsMessage::SetTheme { theme } => ServerWsMessage::Session { session: set_theme(state, theme).await },

    ClientWsMessage::GetProgress => ServerWsMessage::Progress { summary: profile_summary(state).await },
  }
}
