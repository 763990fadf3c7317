//! Domain models used by the backend: courses and chapters, screens and themes,
//! and the persisted learner profile.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::validation::ValidationRule;

/// Colour theme chosen on the profile screen. Persisted with the profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
  Classic,
  Ocean,
  #[default]
  Sunset,
  Forest,
  Midnight,
}

impl Theme {
  pub fn as_str(&self) -> &'static str {
    match self {
      Theme::Classic => "classic",
      Theme::Ocean => "ocean",
      Theme::Sunset => "sunset",
      Theme::Forest => "forest",
      Theme::Midnight => "midnight",
    }
  }
}

/// Top-level screens of the tutorial app. Transient, never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Screen {
  #[default]
  Home,
  Course,
  Playground,
  Profile,
}

/// A named subject with an ordered, fixed sequence of chapters.
#[derive(Clone, Debug)]
pub struct Course {
  pub id: String,
  pub name: String,
  pub icon: String,
  pub description: String,
  pub chapters: Vec<Chapter>,
}

impl Course {
  pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
    self.chapters.iter().find(|c| c.id == chapter_id)
  }

  /// Ordinal position of a chapter inside this course.
  pub fn position(&self, chapter_id: &str) -> Option<usize> {
    self.chapters.iter().position(|c| c.id == chapter_id)
  }

  /// The chapter following `chapter_id`, or None when it is the last one (no wraparound).
  pub fn next_after(&self, chapter_id: &str) -> Option<&Chapter> {
    let idx = self.position(chapter_id)?;
    self.chapters.get(idx + 1)
  }
}

/// A lesson unit: explanatory content plus one practice question.
#[derive(Clone, Debug)]
pub struct Chapter {
  pub id: String,
  pub title: String,
  pub definition: String,
  pub why_it_matters: String,
  pub key_points: Vec<String>,
  pub sample_code: String,
  pub common_mistakes: Vec<String>,
  pub practice: PracticeQuestion,
}

#[derive(Clone, Debug)]
pub struct PracticeQuestion {
  pub question: String,
  pub starter_code: String,
  pub hint: String,
  pub rule: ValidationRule,
}

/// Per-course learner state: completed chapters and cached AI explanations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
  #[serde(default)]
  pub completed_chapters: Vec<String>,
  #[serde(default)]
  pub chapter_ai_cache: BTreeMap<String, String>,
}

impl ProgressRecord {
  pub fn is_completed(&self, chapter_id: &str) -> bool {
    self.completed_chapters.iter().any(|c| c == chapter_id)
  }

  /// Drop repeated chapter ids, keeping first occurrences in order.
  pub(crate) fn dedup_completed(&mut self) {
    let mut seen = std::collections::HashSet::new();
    self.completed_chapters.retain(|id| seen.insert(id.clone()));
  }
}

/// The durable learner profile, stored as one JSON document.
///
/// Navigation state lives in `Session` and is deliberately absent here.
/// Each field tolerates garbage on load and falls back to its default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  #[serde(default, deserialize_with = "lenient")]
  pub theme: Theme,
  #[serde(default, deserialize_with = "lenient")]
  pub playground_usage: u64,
  #[serde(default, deserialize_with = "lenient_progress")]
  pub progress: BTreeMap<String, ProgressRecord>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned + Default,
{
  let value = serde_json::Value::deserialize(deserializer)?;
  Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Per-course recovery: a malformed record is dropped, the others are kept.
fn lenient_progress<'de, D>(deserializer: D) -> Result<BTreeMap<String, ProgressRecord>, D::Error>
where
  D: Deserializer<'de>,
{
  let serde_json::Value::Object(entries) = serde_json::Value::deserialize(deserializer)? else {
    return Ok(BTreeMap::new());
  };
  Ok(
    entries
      .into_iter()
      .filter_map(|(course_id, record)| match serde_json::from_value::<ProgressRecord>(record) {
        Ok(record) => Some((course_id, record)),
        Err(e) => {
          warn!(target: "progress", %course_id, error = %e, "Dropping malformed course progress");
          None
        }
      })
      .collect(),
  )
}
