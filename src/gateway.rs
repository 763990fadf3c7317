//! AI gateway: the only boundary to the generative-AI service.
//!
//! Transport lives behind the `GenerativeModel` trait (the Gemini client in
//! production, scripted fakes in tests). Every public operation goes through
//! `execute`, which times the call and turns any failure into the operation's
//! placeholder. Callers always get a usable value and never see an error.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::audio::SpeechClip;
use crate::config::Prompts;
use crate::util::{fill_template, trunc_for_log};

pub const DEFAULT_OUTPUT_LANGUAGE: &str = "English";
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

const EXPLAIN_UNAVAILABLE: &str = "API Key missing. Please configure it.";
const EXPLAIN_EMPTY: &str = "Sorry, I couldn't generate an explanation right now.";
const EXPLAIN_FAILED: &str = "Oops! My brain is tired. Try again later.";
const CHECK_UNAVAILABLE: &str = "API Key missing.";
const CHECK_EMPTY: &str = "Could not evaluate code.";
const CHECK_FAILED: &str = "Error checking code.";
const IMAGE_UNAVAILABLE: &str = "API Key missing.";
const IMAGE_EMPTY: &str = "Could not analyze image.";
const IMAGE_FAILED: &str = "Failed to analyze image. Please try again.";
const CHAT_UNAVAILABLE: &str = "Please configure your API Key to chat with me.";
const CHAT_EMPTY: &str = "I'm not sure how to answer that right now, but keep coding!";
const CHAT_FAILED: &str = "I'm having a little trouble thinking right now. Ask me again in a moment!";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("AI service returned HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("AI service returned no usable content")]
  EmptyResponse,
  #[error("JSON parse error: {0}")]
  Json(#[from] serde_json::Error),
  #[error("invalid base64 payload: {0}")]
  Base64(#[from] base64::DecodeError),
}

/// Raw capabilities of a generative model. Implementations may fail; the
/// gateway normalizes failures.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
  async fn generate_text(&self, prompt: &str) -> Result<String, GatewayError>;
  /// Text constrained to a JSON object matching `schema`.
  async fn generate_json(&self, prompt: &str, schema: serde_json::Value) -> Result<String, GatewayError>;
  async fn describe_image(&self, image: &[u8], mime_type: &str, instruction: &str) -> Result<String, GatewayError>;
  /// Raw mono 16-bit PCM at 24 kHz.
  async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>, GatewayError>;
}

/// Feedback on a code snippet. `error_line` is 1-based into the submitted code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeReview {
  pub feedback: String,
  pub error_line: Option<u32>,
}

impl CodeReview {
  fn placeholder(text: &str) -> Self {
    Self { feedback: text.to_string(), error_line: None }
  }
}

#[derive(Clone)]
pub struct AiGateway {
  model: Option<Arc<dyn GenerativeModel>>,
  prompts: Prompts,
}

impl AiGateway {
  pub fn new(model: Option<Arc<dyn GenerativeModel>>, prompts: Prompts) -> Self {
    Self { model, prompts }
  }

  /// A gateway with no model configured; every call returns its "not configured" placeholder.
  pub fn disabled(prompts: Prompts) -> Self {
    Self::new(None, prompts)
  }

  pub fn is_enabled(&self) -> bool {
    self.model.is_some()
  }

  /// Run one call against the model and normalize the outcome.
  async fn execute<T, F, Fut>(&self, op: &'static str, unavailable: T, failed: T, call: F) -> T
  where
    F: FnOnce(Arc<dyn GenerativeModel>) -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
  {
    let Some(model) = self.model.clone() else {
      warn!(target: "gateway", op, "AI service not configured; returning placeholder");
      return unavailable;
    };
    let start = Instant::now();
    match call(model).await {
      Ok(value) => {
        info!(target: "gateway", op, elapsed = ?start.elapsed(), "AI call succeeded");
        value
      }
      Err(e) => {
        error!(target: "gateway", op, elapsed = ?start.elapsed(), error = %e, "AI call failed; returning placeholder");
        failed
      }
    }
  }

  /// Beginner-friendly markdown explanation of `concept` in `output_language`.
  pub async fn explain(&self, concept: &str, context: &str, output_language: &str) -> String {
    let prompt = fill_template(
      &self.prompts.explain_template,
      &[("concept", concept), ("context", context), ("language", output_language)],
    );
    self
      .execute("explain", EXPLAIN_UNAVAILABLE.to_string(), EXPLAIN_FAILED.to_string(), |m| async move {
        let text = m.generate_text(&prompt).await?;
        Ok::<_, GatewayError>(non_empty(text, EXPLAIN_EMPTY))
      })
      .await
  }

  /// Review `code` written for `task`.
  pub async fn check_code(&self, code: &str, task: &str, coding_language: &str, output_language: &str) -> CodeReview {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Review {
      #[serde(default)]
      feedback: Option<String>,
      #[serde(default)]
      error_line: Option<i64>,
    }

    let prompt = fill_template(
      &self.prompts.check_code_template,
      &[("coding_language", coding_language), ("task", task), ("code", code), ("language", output_language)],
    );
    let schema = json!({
      "type": "OBJECT",
      "properties": {
        "feedback": { "type": "STRING" },
        "errorLine": { "type": "INTEGER" }
      },
      "required": ["feedback"]
    });

    self
      .execute(
        "check_code",
        CodeReview::placeholder(CHECK_UNAVAILABLE),
        CodeReview::placeholder(CHECK_FAILED),
        |m| async move {
          let raw = m.generate_json(&prompt, schema).await?;
          let raw = if raw.trim().is_empty() { "{}".to_string() } else { raw };
          let review: Review = serde_json::from_str(&raw).map_err(|e| {
            warn!(target: "gateway", body = %trunc_for_log(&raw, 200), "Code review was not valid JSON");
            e
          })?;
          Ok::<_, GatewayError>(CodeReview {
            feedback: non_empty(review.feedback.unwrap_or_default(), CHECK_EMPTY),
            error_line: review.error_line.filter(|l| *l > 0).and_then(|l| u32::try_from(l).ok()),
          })
        },
      )
      .await
  }

  /// Extract code from a photo or screenshot and explain any fix.
  pub async fn analyze_image(&self, image: &[u8], mime_type: &str) -> String {
    let image = image.to_vec();
    let mime_type = mime_type.to_string();
    let instruction = self.prompts.image_instruction.clone();
    self
      .execute("analyze_image", IMAGE_UNAVAILABLE.to_string(), IMAGE_FAILED.to_string(), |m| async move {
        let text = m.describe_image(&image, &mime_type, &instruction).await?;
        Ok::<_, GatewayError>(non_empty(text, IMAGE_EMPTY))
      })
      .await
  }

  /// Speech audio for `text`, or None when unavailable.
  pub async fn synthesize_speech(&self, text: &str) -> Option<SpeechClip> {
    let text = text.to_string();
    self
      .execute("synthesize_speech", None, None, |m| async move {
        let pcm = m.synthesize_speech(&text).await?;
        if pcm.is_empty() {
          return Err(GatewayError::EmptyResponse);
        }
        Ok::<_, GatewayError>(Some(SpeechClip::from_pcm(pcm)))
      })
      .await
  }

  pub async fn chat(&self, message: &str) -> String {
    let prompt = fill_template(&self.prompts.chat_template, &[("message", message)]);
    self
      .execute("chat", CHAT_UNAVAILABLE.to_string(), CHAT_FAILED.to_string(), |m| async move {
        let text = m.generate_text(&prompt).await?;
        Ok::<_, GatewayError>(non_empty(text, CHAT_EMPTY))
      })
      .await
  }
}

fn non_empty(text: String, placeholder: &str) -> String {
  if text.trim().is_empty() { placeholder.to_string() } else { text }
}


#[cfg(test)]
mod tests {
  use super::testing::{gateway_with, ScriptedModel};
  use super::*;

  #[tokio::test]
  async fn disabled_gateway_returns_configuration_placeholders() {
    let gw = AiGateway::disabled(Prompts::default());
    assert!(!gw.is_enabled());
    assert_eq!(gw.explain("Loops", "Python: loops", "English").await, EXPLAIN_UNAVAILABLE);
    assert_eq!(gw.check_code("x", "t", "General", "English").await, CodeReview::placeholder(CHECK_UNAVAILABLE));
    assert_eq!(gw.analyze_image(b"img", DEFAULT_IMAGE_MIME).await, IMAGE_UNAVAILABLE);
    assert_eq!(gw.synthesize_speech("hello").await, None);
    assert_eq!(gw.chat("hi").await, CHAT_UNAVAILABLE);
  }

  #[tokio::test]
  async fn explain_fills_prompt_and_returns_text() {
    let (gw, model) = gateway_with(ScriptedModel::replying("### 💡 Concept Recap\nLoops repeat."));
    let out = gw.explain("Basic Loops", "Python: Loops repeat code", "Spanish").await;
    assert_eq!(out, "### 💡 Concept Recap\nLoops repeat.");

    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains(r#"Explain the concept: "Basic Loops""#));
    assert!(prompts[0].contains("**Spanish**"));
  }

  #[tokio::test]
  async fn failures_become_placeholders() {
    let (gw, _) = gateway_with(ScriptedModel::failing());
    assert_eq!(gw.explain("a", "b", "English").await, EXPLAIN_FAILED);
    assert_eq!(gw.check_code("x", "t", "General", "English").await.feedback, CHECK_FAILED);
    assert_eq!(gw.analyze_image(b"img", DEFAULT_IMAGE_MIME).await, IMAGE_FAILED);
    assert_eq!(gw.synthesize_speech("hello").await, None);
    assert_eq!(gw.chat("hi").await, CHAT_FAILED);
  }

  #[tokio::test]
  async fn empty_replies_become_placeholders() {
    let (gw, _) = gateway_with(ScriptedModel::replying("   "));
    assert_eq!(gw.explain("a", "b", "English").await, EXPLAIN_EMPTY);
    assert_eq!(gw.analyze_image(b"img", DEFAULT_IMAGE_MIME).await, IMAGE_EMPTY);
    assert_eq!(gw.chat("hi").await, CHAT_EMPTY);
    assert_eq!(gw.check_code("x", "t", "General", "English").await.feedback, CHECK_EMPTY);
  }

  #[tokio::test]
  async fn check_code_reports_positive_error_lines_only() {
    let (gw, _) = gateway_with(ScriptedModel {
      json: Some(r#"{ "feedback": "Missing colon.", "errorLine": 2 }"#.into()),
      ..ScriptedModel::default()
    });
    let review = gw.check_code("if x > 1\n  print(x)", "t", "General", "English").await;
    assert_eq!(review, CodeReview { feedback: "Missing colon.".into(), error_line: Some(2) });

    let (gw, _) = gateway_with(ScriptedModel {
      json: Some(r#"{ "feedback": "All good!", "errorLine": 0 }"#.into()),
      ..ScriptedModel::default()
    });
    assert_eq!(gw.check_code("print(1)", "t", "General", "English").await.error_line, None);
  }

  #[tokio::test]
  async fn check_code_with_garbage_json_uses_failure_placeholder() {
    let (gw, _) = gateway_with(ScriptedModel { json: Some("not json".into()), ..ScriptedModel::default() });
    assert_eq!(gw.check_code("x", "t", "General", "English").await, CodeReview::placeholder(CHECK_FAILED));
  }

  #[tokio::test]
  async fn speech_wraps_pcm() {
    let (gw, _) = gateway_with(ScriptedModel { audio: Some(vec![0, 0, 1, 0]), ..ScriptedModel::default() });
    let clip = gw.synthesize_speech("hello").await.unwrap();
    assert_eq!(clip.sample_count(), 2);

    let (gw, _) = gateway_with(ScriptedModel { audio: Some(vec![]), ..ScriptedModel::default() });
    assert_eq!(gw.synthesize_speech("hello").await, None);
  }
}
