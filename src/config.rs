//! Loading app configuration (prompts, storage location, extra courses) from TOML.
//!
//! See `AppConfig` and `Prompts` for expected schema.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::catalog::CourseCfg;

const PROFILE_FILE_NAME: &str = "codebuddy_progress_v2.json";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub storage: StorageCfg,
  #[serde(default)]
  pub courses: Vec<CourseCfg>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct StorageCfg {
  #[serde(default)]
  pub profile_path: Option<PathBuf>,
}

/// Prompts sent to the AI service. Defaults target absolute beginners.
/// Any subset can be overridden in TOML.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// Placeholders: {concept}, {context}, {language}
  pub explain_template: String,
  /// Placeholders: {coding_language}, {task}, {code}, {language}
  pub check_code_template: String,
  pub image_instruction: String,
  /// Placeholders: {message}
  pub chat_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      explain_template: r#"You are a friendly, patient programming tutor for absolute beginners.
Explain the concept: "{concept}" within the context of "{context}".

IMPORTANT: Provide the explanation in **{language}**.

Format your response EXACTLY as follows using Markdown:
### 💡 Concept Recap
(Simple explanation in 1-2 sentences in {language})

### 🌟 Example
(A very simple code example or analogy)

### ✅ Do's & ❌ Don'ts
(1 Do and 1 Don't tip in {language})

### 🚀 Mini Challenge
(A fun optional 1-line challenge in {language})

Keep it short, game-like, and encouraging. No complex jargon."#
        .into(),
      check_code_template: r#"You are a coding tutor. A beginner wrote this {coding_language} code for the task: "{task}".
Code:
```
{code}
```

Analyze the code.
Return a JSON object with:
1. feedback: string (Use Markdown. Be kind. 1. Say what is right. 2. Explain mistake. 3. Show fix. Output in {language}.)
2. errorLine: integer (The 1-based line number of the error. Return 0 if code is correct or error is general.)"#
        .into(),
      image_instruction: "Extract the code from this image. Identify any errors. Explain the fix simply for a beginner. Provide the correct runnable code.".into(),
      chat_template: r#"You are 'CodeBuddy', a friendly, enthusiastic, and encouraging AI programming tutor.
The user is a beginner.

User's Question: "{message}"

Guidelines:
- Keep answers concise (under 3 paragraphs).
- Use simple analogies.
- Use Markdown for formatting (bold, code blocks).
- Be encouraging and fun (use emojis).
- If they ask about something not related to coding, politely steer them back to programming."#
        .into(),
    }
  }
}

/// Attempt to load `AppConfig` from CODEBUDDY_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("CODEBUDDY_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "codebuddy_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "codebuddy_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "codebuddy_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// Where the learner profile lives: CODEBUDDY_PROFILE_PATH, then `[storage] profile_path`,
/// then the platform data directory.
pub fn resolve_profile_path(cfg: Option<&AppConfig>) -> PathBuf {
  if let Ok(p) = std::env::var("CODEBUDDY_PROFILE_PATH") {
    if !p.trim().is_empty() {
      return PathBuf::from(p);
    }
  }
  if let Some(p) = cfg.and_then(|c| c.storage.profile_path.clone()) {
    return p;
  }
  dirs::data_local_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("codebuddy")
    .join(PROFILE_FILE_NAME)
}
