//! Minimal Gemini client for our use-cases.
//!
//! We only call `models/{model}:generateContent` and ask for plain text, a
//! strict JSON object, or audio. Calls are instrumented and log model names,
//! latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key. It travels in the `x-goog-api-key` header.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::gateway::{GatewayError, GenerativeModel};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub text_model: String,
  pub speech_model: String,
  pub voice: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY (or API_KEY); otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY")
      .or_else(|_| std::env::var("API_KEY"))
      .ok()
      .filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let text_model =
      std::env::var("GEMINI_TEXT_MODEL").unwrap_or_else(|_| "gemini-3-flash-preview".into());
    let speech_model =
      std::env::var("GEMINI_TTS_MODEL").unwrap_or_else(|_| "gemini-2.5-flash-preview-tts".into());
    let voice = std::env::var("GEMINI_VOICE").unwrap_or_else(|_| "Puck".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, text_model, speech_model, voice })
  }

  #[instrument(level = "info", skip(self, req), fields(model = %model))]
  async fn generate(&self, model: &str, req: &GenerateContentRequest) -> Result<GenerateContentResponse, GatewayError> {
    let url = format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), model);

    let res = self.client.post(&url)
      .header(USER_AGENT, "codebuddy-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, &self.api_key)
      .json(req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_gemini_error(&body).unwrap_or(body);
      return Err(GatewayError::Status { status, message });
    }

    let body: GenerateContentResponse = res.json().await?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    Ok(body)
  }

  async fn generate_text_with(&self, parts: Vec<Part>, config: Option<GenerationConfig>) -> Result<String, GatewayError> {
    let req = GenerateContentRequest { contents: vec![Content::user(parts)], generation_config: config };
    let body = self.generate(&self.text_model, &req).await?;
    Ok(body.text())
  }
}

#[async_trait]
impl GenerativeModel for Gemini {
  async fn generate_text(&self, prompt: &str) -> Result<String, GatewayError> {
    self.generate_text_with(vec![Part::text(prompt)], None).await
  }

  async fn generate_json(&self, prompt: &str, schema: serde_json::Value) -> Result<String, GatewayError> {
    let config = GenerationConfig {
      response_mime_type: Some("application/json".into()),
      response_schema: Some(schema),
      ..GenerationConfig::default()
    };
    self.generate_text_with(vec![Part::text(prompt)], Some(config)).await
  }

  async fn describe_image(&self, image: &[u8], mime_type: &str, instruction: &str) -> Result<String, GatewayError> {
    let parts = vec![
      Part::inline(mime_type, BASE64.encode(image)),
      Part::text(instruction),
    ];
    self.generate_text_with(parts, None).await
  }

  async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>, GatewayError> {
    let config = GenerationConfig {
      response_modalities: Some(vec!["AUDIO".into()]),
      speech_config: Some(SpeechConfig {
        voice_config: VoiceConfig {
          prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: self.voice.clone() },
        },
      }),
      ..GenerationConfig::default()
    };
    let req = GenerateContentRequest { contents: vec![Content::user(vec![Part::text(text)])], generation_config: Some(config) };
    let body = self.generate(&self.speech_model, &req).await?;
    let data = body.inline_data().ok_or(GatewayError::EmptyResponse)?;
    Ok(BASE64.decode(data)?)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  #[serde(skip_serializing_if = "Option::is_none")]
  generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}

impl Content {
  fn user(parts: Vec<Part>) -> Self {
    Self { role: Some("user".into()), parts }
  }
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  text: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  inline_data: Option<InlineData>,
}

impl Part {
  fn text(s: &str) -> Self {
    Self { text: Some(s.to_string()), ..Self::default() }
  }

  fn inline(mime_type: &str, data: String) -> Self {
    Self { inline_data: Some(InlineData { mime_type: mime_type.to_string(), data }), ..Self::default() }
  }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
  #[serde(default)]
  mime_type: String,
  data: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  response_mime_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_schema: Option<serde_json::Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_modalities: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  speech_config: Option<SpeechConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig { voice_config: VoiceConfig }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig { prebuilt_voice_config: PrebuiltVoiceConfig }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig { voice_name: String }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(default)]
  usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
  /// Concatenated text of the first candidate (empty if none).
  fn text(&self) -> String {
    self
      .candidates
      .first()
      .and_then(|c| c.content.as_ref())
      .map(|content| content.parts.iter().filter_map(|p| p.text.as_deref()).collect::<String>())
      .unwrap_or_default()
      .trim()
      .to_string()
  }

  /// Base64 payload of the first inline-data part of the first candidate.
  fn inline_data(&self) -> Option<&str> {
    self
      .candidates
      .first()?
      .content
      .as_ref()?
      .parts
      .iter()
      .find_map(|p| p.inline_data.as_ref())
      .map(|d| d.data.as_str())
  }
}

#[derive(Deserialize)]
struct Candidate {
  #[serde(default)]
  content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn response_text_joins_parts() {
    let body: GenerateContentResponse = serde_json::from_str(
      r#"{ "candidates": [{ "content": { "role": "model", "parts": [{ "text": "Hi\n" }, { "text": "there " }] } }],
           "usageMetadata": { "promptTokenCount": 3, "totalTokenCount": 9 } }"#,
    )
    .unwrap();
    assert_eq!(body.text(), "Hi\nthere");
  }

  #[test]
  fn response_inline_audio_is_found() {
    let body: GenerateContentResponse = serde_json::from_str(
      r#"{ "candidates": [{ "content": { "parts": [{ "inlineData": { "mimeType": "audio/L16;rate=24000", "data": "AAEC" } }] } }] }"#,
    )
    .unwrap();
    assert_eq!(body.inline_data(), Some("AAEC"));
    assert_eq!(body.text(), "");
  }

  #[test]
  fn empty_candidates_yield_nothing() {
    let body: GenerateContentResponse = serde_json::from_str("{}").unwrap();
    assert_eq!(body.text(), "");
    assert!(body.inline_data().is_none());
  }

  #[test]
  fn request_serializes_camel_case() {
    let req = GenerateContentRequest {
      contents: vec![Content::user(vec![Part::inline("image/jpeg", "QUJD".into()), Part::text("Extract the code")])],
      generation_config: Some(GenerationConfig {
        response_mime_type: Some("application/json".into()),
        ..GenerationConfig::default()
      }),
    };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["contents"][0]["role"], "user");
    assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(json["contents"][0]["parts"][1]["text"], "Extract the code");
    assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    assert!(json["generationConfig"].get("speechConfig").is_none());
  }

  #[test]
  fn extracts_error_message() {
    let body = r#"{ "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" } }"#;
    assert_eq!(extract_gemini_error(body).as_deref(), Some("Quota exceeded"));
    assert_eq!(extract_gemini_error("<html>"), None);
  }
}
