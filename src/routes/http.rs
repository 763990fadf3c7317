//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::{header::CONTENT_TYPE, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::logic::*;
use crate::protocol::*;
use crate::session::SessionError;
use crate::state::AppState;

/// An error body `{ "error": "..." }` with a status code.
#[derive(Debug)]
pub struct ApiError {
  status: StatusCode,
  message: String,
}

impl ApiError {
  fn new(status: StatusCode, message: impl Into<String>) -> Self {
    Self { status, message: message.into() }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status, Json(ErrorOut { error: self.message })).into_response()
  }
}

/// Unknown ids are 404; operations that need a selection are 409.
impl From<SessionError> for ApiError {
  fn from(e: SessionError) -> Self {
    let status = match e {
      SessionError::UnknownCourse(_) | SessionError::UnknownChapter { .. } => StatusCode::NOT_FOUND,
      SessionError::NoCourseSelected | SessionError::NoChapterSelected => StatusCode::CONFLICT,
    };
    Self::new(status, e.to_string())
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, ai_enabled: state.gateway.is_enabled() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let courses: Vec<CourseSummaryOut> = state.catalog.courses().iter().map(course_summary).collect();
  Json(courses)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_course(
  State(state): State<Arc<AppState>>,
  Path(course_id): Path<String>,
) -> ApiResult<CourseOut> {
  let course = state
    .catalog
    .course(&course_id)
    .ok_or_else(|| ApiError::from(SessionError::UnknownCourse(course_id.clone())))?;
  Ok(Json(to_out(course)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_tip(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(TipOut { tip: tip(&state) })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(session_snapshot(&state).await)
}

#[instrument(level = "info", skip(state, body), fields(screen = ?body.screen))]
pub async fn http_post_navigate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<NavigateIn>,
) -> impl IntoResponse {
  Json(navigate(&state, body.screen).await)
}

#[instrument(level = "info", skip(state, body), fields(course_id = %body.course_id))]
pub async fn http_post_select_course(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SelectCourseIn>,
) -> ApiResult<SessionOut> {
  Ok(Json(select_course(&state, &body.course_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(chapter_id = ?body.chapter_id))]
pub async fn http_post_select_chapter(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SelectChapterIn>,
) -> ApiResult<SessionOut> {
  Ok(Json(select_chapter(&state, body.chapter_id.as_deref()).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_advance(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(advance_chapter(&state).await)
}

#[instrument(level = "info", skip(state, body), fields(answer_len = body.answer.len()))]
pub async fn http_post_practice(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PracticeIn>,
) -> ApiResult<PracticeResultOut> {
  let result = submit_practice(&state, &body.answer).await?;
  info!(target: "practice", course_id = %result.course_id, chapter_id = %result.chapter_id, passed = result.passed, "HTTP practice evaluated");
  Ok(Json(result))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_explain(State(state): State<Arc<AppState>>) -> ApiResult<ExplanationOut> {
  Ok(Json(cached_explanation(&state).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_explain(
  State(state): State<Arc<AppState>>,
  body: Option<Json<ExplainIn>>,
) -> ApiResult<ExplanationOut> {
  let output_language = body.and_then(|Json(b)| b.output_language);
  Ok(Json(explain_chapter(&state, output_language.as_deref()).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(profile_summary(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_course_progress(
  State(state): State<Arc<AppState>>,
  Path(course_id): Path<String>,
) -> impl IntoResponse {
  Json(course_progress(&state, &course_id).await)
}

#[instrument(level = "info", skip(state, body), fields(theme = body.theme.as_str()))]
pub async fn http_post_theme(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ThemeIn>,
) -> impl IntoResponse {
  Json(set_theme(&state, body.theme).await)
}

#[instrument(level = "info", skip(state, body), fields(code_len = body.code.len()))]
pub async fn http_post_check_code(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CheckCodeIn>,
) -> impl IntoResponse {
  let review = review_playground_code(&state, &body.code, body.output_language.as_deref()).await;
  Json(CodeReviewOut { feedback: review.feedback, error_line: review.error_line })
}

#[instrument(level = "info", skip(state, body), fields(payload_len = body.image_base64.len()))]
pub async fn http_post_image(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ImageIn>,
) -> ApiResult<ImageAnalysisOut> {
  let image = decode_image(&body.image_base64).map_err(|e| {
    warn!(target: "practice", error = %e, "Rejected image upload");
    ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid image payload: {e}"))
  })?;
  let text = analyze_playground_image(&state, &image, body.mime.as_deref()).await;
  Ok(Json(ImageAnalysisOut { text }))
}

/// WAV bytes, or 204 when no audio is available.
#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_speech(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SpeechIn>,
) -> Response {
  match speak(&state, &body.text).await {
    Some(clip) => {
      info!(target: "gateway", duration_ms = clip.duration_ms(), "HTTP speech served");
      ([(CONTENT_TYPE, "audio/wav")], clip.to_wav()).into_response()
    }
    None => StatusCode::NO_CONTENT.into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(message_len = body.message.len()))]
pub async fn http_post_chat(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ChatIn>,
) -> impl IntoResponse {
  Json(chat_reply(&state, &body.message).await)
}
