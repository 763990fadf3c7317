//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Navigation transitions and session snapshots
//!   - Checking practice answers locally and recording first completions
//!   - Chapter explanations (AI, cached per chapter)
//!   - Playground code review and image analysis (AI, counted as usage)
//!   - Speech, chat, theme, progress summary and tips

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::audio::SpeechClip;
use crate::domain::{ProgressRecord, Screen, Theme};
use crate::gateway::{CodeReview, DEFAULT_IMAGE_MIME, DEFAULT_OUTPUT_LANGUAGE};
use crate::progress::ProgressSummary;
use crate::protocol::{ChatMessage, ExplanationOut, PracticeResultOut, SessionOut};
use crate::session::SessionError;
use crate::state::AppState;
use crate::util::{speech_text, strip_data_url};

pub const PRACTICE_SUCCESS: &str = "🎉 Great job! You got it right!";
pub const PRACTICE_RETRY: &str = "🤔 Not quite. Check the hint or use the Playground for AI help.";

const PLAYGROUND_TASK: &str = "Free Playground Experiment";
const PLAYGROUND_CODING_LANGUAGE: &str = "General";

// -------- Navigation --------

pub async fn session_snapshot(state: &AppState) -> SessionOut {
  let (current_screen, selected_course_id, selected_chapter_id) = {
    let s = state.session.lock().await;
    (
      s.current_screen(),
      s.selected_course_id().map(str::to_string),
      s.selected_chapter_id().map(str::to_string),
    )
  };
  let (theme, playground_usage) = {
    let p = state.progress.lock().await;
    (p.theme(), p.playground_usage())
  };
  SessionOut { current_screen, selected_course_id, selected_chapter_id, theme, playground_usage }
}

#[instrument(level = "info", skip(state))]
pub async fn navigate(state: &AppState, screen: Screen) -> SessionOut {
  state.session.lock().await.navigate(screen);
  session_snapshot(state).await
}

#[instrument(level = "info", skip(state))]
pub async fn select_course(state: &AppState, course_id: &str) -> Result<SessionOut, SessionError> {
  state.session.lock().await.select_course(&state.catalog, course_id)?;
  Ok(session_snapshot(state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn select_chapter(state: &AppState, chapter_id: Option<&str>) -> Result<SessionOut, SessionError> {
  state.session.lock().await.select_chapter(&state.catalog, chapter_id)?;
  Ok(session_snapshot(state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn advance_chapter(state: &AppState) -> SessionOut {
  state.session.lock().await.advance_chapter(&state.catalog);
  session_snapshot(state).await
}

// -------- Practice --------

/// Check an answer against the open chapter's rule. Every pass reports
/// success; only the first pass per chapter is recorded as a completion.
#[instrument(level = "info", skip(state, answer), fields(answer_len = answer.len()))]
pub async fn submit_practice(state: &AppState, answer: &str) -> Result<PracticeResultOut, SessionError> {
  let (course_id, chapter_id, passed, hint) = {
    let session = state.session.lock().await;
    let (course, chapter) = session.current_chapter(&state.catalog)?;
    let passed = chapter.practice.rule.evaluate(answer);
    (course.id.clone(), chapter.id.clone(), passed, chapter.practice.hint.clone())
  };

  let newly_completed = passed && state.progress.lock().await.mark_chapter_complete(&course_id, &chapter_id);
  info!(target: "practice", %course_id, %chapter_id, passed, newly_completed, "Practice answer checked");

  Ok(PracticeResultOut {
    course_id,
    chapter_id,
    passed,
    message: if passed { PRACTICE_SUCCESS } else { PRACTICE_RETRY }.to_string(),
    hint: if passed { None } else { Some(hint) },
    newly_completed,
  })
}

// -------- Explanations --------

/// Cached explanation for the open chapter, without calling the AI service.
pub async fn cached_explanation(state: &AppState) -> Result<ExplanationOut, SessionError> {
  let (course_id, chapter_id) = open_chapter_ids(state).await?;
  let text = state
    .progress
    .lock()
    .await
    .cached_ai_response(&course_id, &chapter_id)
    .map(str::to_string);
  Ok(ExplanationOut { course_id, chapter_id, text })
}

/// Ask the AI service to explain the open chapter and overwrite the cache with the answer.
#[instrument(level = "info", skip(state))]
pub async fn explain_chapter(state: &AppState, output_language: Option<&str>) -> Result<ExplanationOut, SessionError> {
  let (course_id, chapter_id, concept, context) = {
    let session = state.session.lock().await;
    let (course, chapter) = session.current_chapter(&state.catalog)?;
    (
      course.id.clone(),
      chapter.id.clone(),
      chapter.title.clone(),
      format!("{}: {}", course.name, chapter.definition),
    )
  };
  let language = output_language.filter(|l| !l.trim().is_empty()).unwrap_or(DEFAULT_OUTPUT_LANGUAGE);

  let text = state.gateway.explain(&concept, &context, language).await;
  state.progress.lock().await.cache_ai_response(&course_id, &chapter_id, &text);
  debug!(target: "practice", %course_id, %chapter_id, text_len = text.len(), "Explanation cached");

  Ok(ExplanationOut { course_id, chapter_id, text: Some(text) })
}

async fn open_chapter_ids(state: &AppState) -> Result<(String, String), SessionError> {
  let session = state.session.lock().await;
  let (course, chapter) = session.current_chapter(&state.catalog)?;
  Ok((course.id.clone(), chapter.id.clone()))
}

// -------- Playground --------

#[instrument(level = "info", skip(state, code), fields(code_len = code.len()))]
pub async fn review_playground_code(state: &AppState, code: &str, output_language: Option<&str>) -> CodeReview {
  let usage = state.progress.lock().await.increment_playground_usage();
  debug!(target: "practice", usage, "Playground usage");
  let language = output_language.filter(|l| !l.trim().is_empty()).unwrap_or(DEFAULT_OUTPUT_LANGUAGE);
  state
    .gateway
    .check_code(code, PLAYGROUND_TASK, PLAYGROUND_CODING_LANGUAGE, language)
    .await
}

/// Decode a base64 image upload (optionally a `data:` URL).
pub fn decode_image(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
  BASE64.decode(strip_data_url(payload))
}

#[instrument(level = "info", skip(state, image), fields(image_len = image.len()))]
pub async fn analyze_playground_image(state: &AppState, image: &[u8], mime: Option<&str>) -> String {
  let usage = state.progress.lock().await.increment_playground_usage();
  debug!(target: "practice", usage, "Playground usage");
  let mime = mime.filter(|m| !m.trim().is_empty()).unwrap_or(DEFAULT_IMAGE_MIME);
  state.gateway.analyze_image(image, mime).await
}

// -------- Speech, chat, profile --------

/// Read markdown aloud. None when there is nothing to read or no audio came back.
#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn speak(state: &AppState, text: &str) -> Option<SpeechClip> {
  let prepared = speech_text(text);
  if prepared.trim().is_empty() {
    return None;
  }
  state.gateway.synthesize_speech(&prepared).await
}

#[instrument(level = "info", skip(state, message), fields(message_len = message.len()))]
pub async fn chat_reply(state: &AppState, message: &str) -> ChatMessage {
  let text = state.gateway.chat(message).await;
  ChatMessage {
    id: Uuid::new_v4().to_string(),
    role: "model".into(),
    text,
    timestamp: chrono::Utc::now().timestamp_millis(),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn set_theme(state: &AppState, theme: Theme) -> SessionOut {
  state.progress.lock().await.set_theme(theme);
  session_snapshot(state).await
}

pub async fn course_progress(state: &AppState, course_id: &str) -> ProgressRecord {
  state.progress.lock().await.progress(course_id)
}

pub async fn profile_summary(state: &AppState) -> ProgressSummary {
  state.progress.lock().await.summary(&state.catalog)
}

pub fn tip(state: &AppState) -> String {
  state.catalog.random_tip().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::Catalog;
  use crate::config::Prompts;
  use crate::gateway::testing::{gateway_with, ScriptedModel};
  use crate::gateway::AiGateway;
  use crate::progress::{ProfileStorage, ProgressStore};
  use tempfile::TempDir;

  fn state_with(gateway: AiGateway) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = ProgressStore::open(ProfileStorage::new(dir.path().join("profile.json")));
    (AppState::from_parts(Catalog::builtin().unwrap(), store, gateway), dir)
  }

  async fn open(state: &AppState, course: &str, chapter: &str) {
    select_course(state, course).await.unwrap();
    select_chapter(state, Some(chapter)).await.unwrap();
  }

  #[tokio::test]
  async fn passing_answer_completes_once_but_reports_success_every_time() {
    let (state, _dir) = state_with(AiGateway::disabled(Prompts::default()));
    open(&state, "python", "py-1").await;

    let first = submit_practice(&state, r#"print("Ada")"#).await.unwrap();
    assert!(first.passed && first.newly_completed);
    assert_eq!(first.message, PRACTICE_SUCCESS);

    let second = submit_practice(&state, r#"print("Ada")"#).await.unwrap();
    assert!(second.passed);
    assert!(!second.newly_completed);
    assert_eq!(second.message, PRACTICE_SUCCESS);

    assert_eq!(course_progress(&state, "python").await.completed_chapters, vec!["py-1".to_string()]);
  }

  #[tokio::test]
  async fn failing_answer_returns_hint_and_records_nothing() {
    let (state, _dir) = state_with(AiGateway::disabled(Prompts::default()));
    open(&state, "python", "py-1").await;

    let out = submit_practice(&state, "printhi").await.unwrap();
    assert!(!out.passed);
    assert_eq!(out.message, PRACTICE_RETRY);
    assert_eq!(out.hint.as_deref(), Some("Use the print() function with quotes."));
    assert!(course_progress(&state, "python").await.completed_chapters.is_empty());
  }

  #[tokio::test]
  async fn practice_needs_an_open_chapter() {
    let (state, _dir) = state_with(AiGateway::disabled(Prompts::default()));
    assert_eq!(submit_practice(&state, "x").await.unwrap_err(), SessionError::NoCourseSelected);
    select_course(&state, "python").await.unwrap();
    assert_eq!(submit_practice(&state, "x").await.unwrap_err(), SessionError::NoChapterSelected);
  }

  #[tokio::test]
  async fn explanation_is_cached_per_chapter() {
    let (gateway, model) = gateway_with(ScriptedModel::replying("### 💡 Concept Recap\nVariables are boxes."));
    let (state, _dir) = state_with(gateway);
    open(&state, "python", "py-2").await;

    assert_eq!(cached_explanation(&state).await.unwrap().text, None);
    let out = explain_chapter(&state, Some("Hindi")).await.unwrap();
    assert_eq!(out.text.as_deref(), Some("### 💡 Concept Recap\nVariables are boxes."));
    assert_eq!(cached_explanation(&state).await.unwrap().text, out.text);

    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains(r#""Variables""#));
    assert!(prompts[0].contains("Python: Think of a variable"));
    assert!(prompts[0].contains("**Hindi**"));
  }

  #[tokio::test]
  async fn playground_calls_count_as_usage() {
    let (state, _dir) = state_with(AiGateway::disabled(Prompts::default()));
    let review = review_playground_code(&state, "print(1)", None).await;
    assert_eq!(review.feedback, "API Key missing.");
    analyze_playground_image(&state, b"\xff\xd8", None).await;
    assert_eq!(session_snapshot(&state).await.playground_usage, 2);
  }

  #[tokio::test]
  async fn speak_skips_blank_text() {
    let (gateway, model) = gateway_with(ScriptedModel { audio: Some(vec![0, 0]), ..ScriptedModel::default() });
    let (state, _dir) = state_with(gateway);
    assert!(speak(&state, "## **").await.is_none());
    assert!(model.prompts.lock().unwrap().is_empty());

    assert!(speak(&state, "### Loops repeat code").await.is_some());
    assert_eq!(model.prompts.lock().unwrap()[0], " Loops repeat code");
  }

  #[tokio::test]
  async fn chat_reply_is_a_model_message() {
    let (gateway, _) = gateway_with(ScriptedModel::replying("Loops repeat things! 🔁"));
    let (state, _dir) = state_with(gateway);
    let msg = chat_reply(&state, "what is a loop?").await;
    assert_eq!(msg.role, "model");
    assert_eq!(msg.text, "Loops repeat things! 🔁");
    assert!(Uuid::parse_str(&msg.id).is_ok());
    assert!(msg.timestamp > 0);
  }

  #[test]
  fn decodes_plain_and_data_url_images() {
    assert_eq!(decode_image("QUJD").unwrap(), b"ABC");
    assert_eq!(decode_image("data:image/jpeg;base64,QUJD").unwrap(), b"ABC");
    assert!(decode_image("not base64!").is_err());
  }
}
