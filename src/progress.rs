//! Durable learner state: per-course completion, the AI explanation cache,
//! theme and playground usage.
//!
//! The whole profile is one JSON file. It is read once when the store opens and
//! rewritten in full after every mutation that changes something. A missing or
//! corrupt file means "no prior state"; a failed write is logged and otherwise
//! ignored, and the previous file stays intact because writes go through a
//! temp file that is renamed into place.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::catalog::Catalog;
use crate::domain::{Profile, ProgressRecord, Theme};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  #[error("profile I/O failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("profile serialization failed: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// Location of the persisted profile.
#[derive(Clone, Debug)]
pub struct ProfileStorage {
  path: PathBuf,
}

impl ProfileStorage {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Best-effort load. Never fails: missing or unreadable data yields the default profile.
  pub fn load(&self) -> Profile {
    let raw = match std::fs::read_to_string(&self.path) {
      Ok(s) => s,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        info!(target: "progress", path = %self.path.display(), "No saved profile; starting fresh");
        return Profile::default();
      }
      Err(e) => {
        warn!(target: "progress", path = %self.path.display(), error = %e, "Failed to read profile; starting fresh");
        return Profile::default();
      }
    };

    match serde_json::from_str::<Profile>(&raw) {
      Ok(mut profile) => {
        for record in profile.progress.values_mut() {
          record.dedup_completed();
        }
        info!(target: "progress", path = %self.path.display(), courses = profile.progress.len(), "Loaded profile");
        profile
      }
      Err(e) => {
        warn!(target: "progress", path = %self.path.display(), error = %e, "Saved profile is malformed; starting fresh");
        Profile::default()
      }
    }
  }

  /// Write the full profile atomically (temp file in the same directory, then rename).
  pub fn save(&self, profile: &Profile) -> Result<(), StorageError> {
    let dir = match self.path.parent() {
      Some(p) if !p.as_os_str().is_empty() => p,
      _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let body = serde_json::to_vec_pretty(profile)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&self.path).map_err(|e| e.error)?;
    Ok(())
  }
}

/// Single source of truth for the durable profile.
#[derive(Debug)]
pub struct ProgressStore {
  profile: Profile,
  storage: ProfileStorage,
}

impl ProgressStore {
  /// Open the store, loading whatever the storage holds.
  pub fn open(storage: ProfileStorage) -> Self {
    let profile = storage.load();
    Self { profile, storage }
  }

  pub fn profile(&self) -> &Profile {
    &self.profile
  }

  pub fn storage(&self) -> &ProfileStorage {
    &self.storage
  }

  /// The record for a course, or the empty default (which is not stored).
  pub fn progress(&self, course_id: &str) -> ProgressRecord {
    self.profile.progress.get(course_id).cloned().unwrap_or_default()
  }

  pub fn is_completed(&self, course_id: &str, chapter_id: &str) -> bool {
    self
      .profile
      .progress
      .get(course_id)
      .is_some_and(|r| r.is_completed(chapter_id))
  }

  /// Record a completion. Returns true when the chapter was newly added;
  /// repeats are no-ops and do not touch storage.
  #[instrument(level = "debug", skip(self))]
  pub fn mark_chapter_complete(&mut self, course_id: &str, chapter_id: &str) -> bool {
    if self.is_completed(course_id, chapter_id) {
      debug!(target: "progress", course_id, chapter_id, "Chapter already completed");
      return false;
    }
    self
      .profile
      .progress
      .entry(course_id.to_string())
      .or_default()
      .completed_chapters
      .push(chapter_id.to_string());
    info!(target: "progress", course_id, chapter_id, "Chapter completed");
    self.persist();
    true
  }

  /// Overwrite the cached AI explanation for a chapter.
  #[instrument(level = "debug", skip(self, content), fields(content_len = content.len()))]
  pub fn cache_ai_response(&mut self, course_id: &str, chapter_id: &str, content: &str) {
    self
      .profile
      .progress
      .entry(course_id.to_string())
      .or_default()
      .chapter_ai_cache
      .insert(chapter_id.to_string(), content.to_string());
    self.persist();
  }

  pub fn cached_ai_response(&self, course_id: &str, chapter_id: &str) -> Option<&str> {
    self
      .profile
      .progress
      .get(course_id)?
      .chapter_ai_cache
      .get(chapter_id)
      .map(String::as_str)
  }

  pub fn theme(&self) -> Theme {
    self.profile.theme
  }

  pub fn set_theme(&mut self, theme: Theme) {
    self.profile.theme = theme;
    info!(target: "progress", theme = theme.as_str(), "Theme changed");
    self.persist();
  }

  pub fn playground_usage(&self) -> u64 {
    self.profile.playground_usage
  }

  /// Bump the playground usage counter by one and return the new value.
  pub fn increment_playground_usage(&mut self) -> u64 {
    self.profile.playground_usage += 1;
    self.persist();
    self.profile.playground_usage
  }

  /// Aggregate numbers for the profile screen.
  pub fn summary(&self, catalog: &Catalog) -> ProgressSummary {
    let courses: Vec<CourseProgress> = catalog
      .courses()
      .iter()
      .map(|course| {
        let completed = self
          .profile
          .progress
          .get(&course.id)
          .map(|r| r.completed_chapters.len())
          .unwrap_or(0);
        CourseProgress {
          course_id: course.id.clone(),
          name: course.name.clone(),
          completed,
          total: course.chapters.len(),
          percent: percent(completed, course.chapters.len()),
        }
      })
      .collect();

    let chapters_completed = self.profile.progress.values().map(|r| r.completed_chapters.len()).sum();
    let total_chapters = catalog.total_chapters();

    ProgressSummary {
      chapters_completed,
      total_chapters,
      completion_percent: percent(chapters_completed, total_chapters),
      active_courses: self.profile.progress.len(),
      playground_usage: self.profile.playground_usage,
      theme: self.profile.theme,
      courses,
    }
  }

  fn persist(&self) {
    match self.storage.save(&self.profile) {
      Ok(()) => debug!(target: "progress", path = %self.storage.path.display(), "Profile saved"),
      Err(e) => warn!(target: "progress", path = %self.storage.path.display(), error = %e, "Failed to save profile"),
    }
  }
}

fn percent(part: usize, whole: usize) -> u32 {
  if whole == 0 {
    return 0;
  }
  ((part as f64 / whole as f64) * 100.0).round() as u32
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
  pub chapters_completed: usize,
  pub total_chapters: usize,
  pub completion_percent: u32,
  pub active_courses: usize,
  pub playground_usage: u64,
  pub theme: Theme,
  pub courses: Vec<CourseProgress>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
  pub course_id: String,
  pub name: String,
  pub completed: usize,
  pub total: usize,
  pub percent: u32,
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn store_in(dir: &TempDir) -> ProgressStore {
    ProgressStore::open(ProfileStorage::new(dir.path().join("profile.json")))
  }

  #[test]
  fn missing_course_reads_as_empty_default_without_storing() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert_eq!(store.progress("python"), ProgressRecord::default());
    assert!(store.profile().progress.is_empty());
    assert!(!store.storage().path().exists());
  }

  #[test]
  fn mark_complete_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    assert!(store.mark_chapter_complete("python", "py-1"));
    assert!(!store.mark_chapter_complete("python", "py-1"));
    assert_eq!(store.progress("python").completed_chapters, vec!["py-1".to_string()]);
  }

  #[test]
  fn repeated_completion_does_not_rewrite_storage() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    store.mark_chapter_complete("python", "py-1");
    std::fs::remove_file(store.storage().path()).unwrap();

    store.mark_chapter_complete("python", "py-1");
    assert!(!store.storage().path().exists());
  }

  #[test]
  fn completed_sets_never_shrink() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    let mut previous = 0;
    for (course, chapter) in [("python", "py-1"), ("python", "py-2"), ("java", "java-1"), ("python", "py-1")] {
      store.mark_chapter_complete(course, chapter);
      store.cache_ai_response(course, chapter, "cached");
      store.set_theme(Theme::Ocean);
      store.increment_playground_usage();
      let total: usize = store.profile().progress.values().map(|r| r.completed_chapters.len()).sum();
      assert!(total >= previous);
      previous = total;
    }
    assert_eq!(previous, 3);
  }

  #[test]
  fn cache_overwrites_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    store.cache_ai_response("python", "py-1", "first");
    store.cache_ai_response("python", "py-1", "second");
    assert_eq!(store.cached_ai_response("python", "py-1"), Some("second"));
    assert_eq!(store.cached_ai_response("python", "py-2"), None);
    // Caching alone creates a record but completes nothing.
    assert!(store.progress("python").completed_chapters.is_empty());
  }

  #[test]
  fn usage_counts_by_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    assert_eq!(store.increment_playground_usage(), 1);
    assert_eq!(store.increment_playground_usage(), 2);
  }

  #[test]
  fn profile_round_trips_through_storage() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    store.mark_chapter_complete("python", "py-1");
    store.mark_chapter_complete("css", "css-3");
    store.cache_ai_response("python", "py-1", "### Concept Recap\nPrint shows text.");
    store.set_theme(Theme::Midnight);
    store.increment_playground_usage();
    let before = store.profile().clone();

    let reopened = store_in(&dir);
    assert_eq!(reopened.profile(), &before);
    assert_eq!(reopened.theme(), Theme::Midnight);
    assert_eq!(reopened.playground_usage(), 1);
  }

  #[test]
  fn persisted_layout_uses_camel_case_keys() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    store.mark_chapter_complete("python", "py-1");

    let raw = std::fs::read_to_string(store.storage().path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["theme"], "sunset");
    assert_eq!(json["playgroundUsage"], 0);
    assert_eq!(json["progress"]["python"]["completedChapters"][0], "py-1");
    assert!(json["progress"]["python"]["chapterAiCache"].is_object());
    assert!(json.get("currentScreen").is_none());
  }

  #[test]
  fn malformed_json_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");
    std::fs::write(&path, "{ not json").unwrap();
    let store = ProgressStore::open(ProfileStorage::new(&path));
    assert_eq!(store.profile(), &Profile::default());
    assert_eq!(store.theme(), Theme::Sunset);
  }

  #[test]
  fn bad_fields_fall_back_individually() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");
    std::fs::write(
      &path,
      r#"{ "theme": "neon", "playgroundUsage": -4,
           "progress": { "python": { "completedChapters": ["py-1", "py-1", "py-2"] } } }"#,
    )
    .unwrap();
    let store = ProgressStore::open(ProfileStorage::new(&path));
    assert_eq!(store.theme(), Theme::Sunset);
    assert_eq!(store.playground_usage(), 0);
    assert_eq!(store.progress("python").completed_chapters, vec!["py-1".to_string(), "py-2".to_string()]);
    assert!(store.progress("python").chapter_ai_cache.is_empty());
  }

  #[test]
  fn one_bad_course_record_keeps_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");
    std::fs::write(
      &path,
      r#"{ "theme": "ocean",
           "progress": { "python": { "completedChapters": ["py-1", "py-2"], "chapterAiCache": { "py-1": "Recap" } },
                         "java": { "completedChapters": [1] } } }"#,
    )
    .unwrap();

    let mut store = ProgressStore::open(ProfileStorage::new(&path));
    assert_eq!(store.progress("python").completed_chapters, vec!["py-1".to_string(), "py-2".to_string()]);
    assert_eq!(store.cached_ai_response("python", "py-1"), Some("Recap"));
    assert!(store.progress("java").completed_chapters.is_empty());

    store.set_theme(Theme::Forest);
    let reopened = ProgressStore::open(ProfileStorage::new(&path));
    assert_eq!(reopened.progress("python").completed_chapters, vec!["py-1".to_string(), "py-2".to_string()]);
    assert!(!reopened.profile().progress.contains_key("java"));
  }

  #[test]
  fn non_object_progress_falls_back_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");
    std::fs::write(&path, r#"{ "theme": "forest", "progress": ["python"] }"#).unwrap();
    let store = ProgressStore::open(ProfileStorage::new(&path));
    assert_eq!(store.theme(), Theme::Forest);
    assert!(store.profile().progress.is_empty());
  }

  #[test]
  fn save_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("profile.json");
    let mut store = ProgressStore::open(ProfileStorage::new(&path));
    store.set_theme(Theme::Forest);
    assert!(path.exists());
  }

  #[test]
  fn summary_counts_completion() {
    let catalog = Catalog::builtin().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    store.mark_chapter_complete("python", "py-1");
    store.mark_chapter_complete("python", "py-2");
    store.cache_ai_response("java", "java-1", "cached");

    let summary = store.summary(&catalog);
    assert_eq!(summary.chapters_completed, 2);
    assert_eq!(summary.total_chapters, 63);
    assert_eq!(summary.completion_percent, 3);
    assert_eq!(summary.active_courses, 2);

    let python = summary.courses.iter().find(|c| c.course_id == "python").unwrap();
    assert_eq!((python.completed, python.total, python.percent), (2, 15, 13));
  }
}
