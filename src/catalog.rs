//! Lesson content: the built-in course catalog and study tips.
//!
//! Content ships as an embedded JSON document parsed once at startup. Extra
//! courses from the TOML config are merged on top, skipping bad entries.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Chapter, Course, PracticeQuestion};
use crate::validation::{PatternSpec, RuleError, ValidationRule};

const BUILTIN_CATALOG: &str = include_str!("../data/courses.json");

const DEFAULT_TIP: &str = "Code a little bit every day.";

/// Course entry as authored (embedded JSON or `[[courses]]` in TOML).
#[derive(Clone, Debug, Deserialize)]
pub struct CourseCfg {
  pub id: String,
  pub name: String,
  #[serde(default)] pub icon: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub chapters: Vec<ChapterCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChapterCfg {
  pub id: String,
  pub title: String,
  #[serde(default)] pub definition: String,
  #[serde(default)] pub why_it_matters: String,
  #[serde(default)] pub key_points: Vec<String>,
  #[serde(default)] pub sample_code: String,
  #[serde(default)] pub common_mistakes: Vec<String>,
  pub practice: PracticeCfg,
}

/// Only one of `pattern` / `keywords` may be filled.
#[derive(Clone, Debug, Deserialize)]
pub struct PracticeCfg {
  pub question: String,
  #[serde(default)] pub starter_code: String,
  #[serde(default)] pub hint: String,
  #[serde(default)] pub pattern: Option<PatternSpec>,
  #[serde(default)] pub keywords: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct CatalogFile {
  #[serde(default)]
  tips: Vec<String>,
  courses: Vec<CourseCfg>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
  #[error("catalog JSON is malformed: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("chapter '{chapter}' in course '{course}' has an invalid practice rule: {source}")]
  InvalidRule { course: String, chapter: String, source: RuleError },
  #[error("course '{0}' is defined more than once")]
  DuplicateCourse(String),
  #[error("chapter '{chapter}' appears more than once in course '{course}'")]
  DuplicateChapter { course: String, chapter: String },
}

/// Immutable registry of courses → chapters → practice rules.
#[derive(Debug, Default)]
pub struct Catalog {
  courses: Vec<Course>,
  tips: Vec<String>,
}

impl Catalog {
  /// The catalog compiled into the binary.
  pub fn builtin() -> Result<Self, CatalogError> {
    let catalog = Self::from_json(BUILTIN_CATALOG)?;
    info!(target: "catalog", courses = catalog.courses.len(), chapters = catalog.total_chapters(), "Loaded built-in catalog");
    Ok(catalog)
  }

  pub fn from_json(json: &str) -> Result<Self, CatalogError> {
    let file: CatalogFile = serde_json::from_str(json)?;
    let mut catalog = Self { courses: Vec::with_capacity(file.courses.len()), tips: file.tips };
    for cfg in file.courses {
      catalog.push(cfg)?;
    }
    Ok(catalog)
  }

  /// Merge extra courses. Invalid entries and id collisions are logged and skipped.
  pub fn extend(&mut self, extra: Vec<CourseCfg>) {
    for cfg in extra {
      let id = cfg.id.clone();
      match self.push(cfg) {
        Ok(()) => info!(target: "catalog", course = %id, "Added course from config"),
        Err(e) => error!(target: "catalog", course = %id, error = %e, "Skipping config course"),
      }
    }
  }

  fn push(&mut self, cfg: CourseCfg) -> Result<(), CatalogError> {
    if self.course(&cfg.id).is_some() {
      return Err(CatalogError::DuplicateCourse(cfg.id));
    }
    let course = build_course(cfg)?;
    self.courses.push(course);
    Ok(())
  }

  pub fn courses(&self) -> &[Course] {
    &self.courses
  }

  pub fn course(&self, course_id: &str) -> Option<&Course> {
    self.courses.iter().find(|c| c.id == course_id)
  }

  pub fn chapter(&self, course_id: &str, chapter_id: &str) -> Option<&Chapter> {
    self.course(course_id)?.chapter(chapter_id)
  }

  pub fn total_chapters(&self) -> usize {
    self.courses.iter().map(|c| c.chapters.len()).sum()
  }

  pub fn tips(&self) -> &[String] {
    &self.tips
  }

  /// One random study tip for the home screen.
  pub fn random_tip(&self) -> &str {
    self
      .tips
      .choose(&mut rand::thread_rng())
      .map(String::as_str)
      .unwrap_or(DEFAULT_TIP)
  }
}

fn build_course(cfg: CourseCfg) -> Result<Course, CatalogError> {
  let mut seen = HashSet::new();
  let mut chapters = Vec::with_capacity(cfg.chapters.len());
  for ch in cfg.chapters {
    if !seen.insert(ch.id.clone()) {
      return Err(CatalogError::DuplicateChapter { course: cfg.id, chapter: ch.id });
    }
    let rule = ValidationRule::from_parts(ch.practice.pattern, ch.practice.keywords).map_err(|source| {
      CatalogError::InvalidRule { course: cfg.id.clone(), chapter: ch.id.clone(), source }
    })?;
    chapters.push(Chapter {
      id: ch.id,
      title: ch.title,
      definition: ch.definition,
      why_it_matters: ch.why_it_matters,
      key_points: ch.key_points,
      sample_code: ch.sample_code,
      common_mistakes: ch.common_mistakes,
      practice: PracticeQuestion {
        question: ch.practice.question,
        starter_code: ch.practice.starter_code,
        hint: ch.practice.hint,
        rule,
      },
    });
  }
  Ok(Course { id: cfg.id, name: cfg.name, icon: cfg.icon, description: cfg.description, chapters })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::validation::RuleKind;

  const TINY: &str = r#"{
    "tips": ["Take breaks if you get stuck."],
    "courses": [{
      "id": "python",
      "name": "Python",
      "chapters": [
        { "id": "py-1", "title": "Print", "practice": { "question": "Print it", "pattern": { "pattern": "print\\s*\\(" } } },
        { "id": "py-2", "title": "Project", "practice": { "question": "Build it", "keywords": ["input", "if"] } },
        { "id": "py-3", "title": "Free", "practice": { "question": "Anything" } }
      ]
    }]
  }"#;

  #[test]
  fn builtin_catalog_loads_every_course() {
    let catalog = Catalog::builtin().unwrap();
    let ids: Vec<&str> = catalog.courses().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["python", "java", "javascript", "html", "css"]);
    assert_eq!(catalog.total_chapters(), 63);
    assert!(!catalog.tips().is_empty());
  }

  #[test]
  fn builtin_rules_compile() {
    let catalog = Catalog::builtin().unwrap();
    for course in catalog.courses() {
      for ch in &course.chapters {
        assert_ne!(ch.practice.rule.kind(), RuleKind::Fallback, "{} has no usable rule", ch.id);
      }
    }
    let project = catalog.chapter("python", "py-10").unwrap();
    assert_eq!(project.practice.rule.kind(), RuleKind::Keywords);
  }

  #[test]
  fn builtin_multiline_rule_spans_lines() {
    let catalog = Catalog::builtin().unwrap();
    let rule = &catalog.chapter("python", "py-13").unwrap().practice.rule;
    assert!(rule.evaluate("try:\n  print(1 / 0)\nexcept:\n  print('oops')"));
  }

  #[test]
  fn parses_all_rule_variants() {
    let catalog = Catalog::from_json(TINY).unwrap();
    let course = catalog.course("python").unwrap();
    let kinds: Vec<RuleKind> = course.chapters.iter().map(|c| c.practice.rule.kind()).collect();
    assert_eq!(kinds, [RuleKind::Pattern, RuleKind::Keywords, RuleKind::Fallback]);
    assert_eq!(catalog.random_tip(), "Take breaks if you get stuck.");
  }

  #[test]
  fn rejects_rule_with_both_variants() {
    let json = r#"{ "courses": [{ "id": "c", "name": "C", "chapters": [
      { "id": "c-1", "title": "T", "practice": { "question": "Q", "pattern": { "pattern": "x" }, "keywords": ["x"] } }
    ]}]}"#;
    match Catalog::from_json(json) {
      Err(CatalogError::InvalidRule { chapter, .. }) => assert_eq!(chapter, "c-1"),
      other => panic!("expected InvalidRule, got {other:?}"),
    }
  }

  #[test]
  fn rejects_duplicate_chapters() {
    let json = r#"{ "courses": [{ "id": "c", "name": "C", "chapters": [
      { "id": "c-1", "title": "T", "practice": { "question": "Q" } },
      { "id": "c-1", "title": "T", "practice": { "question": "Q" } }
    ]}]}"#;
    assert!(matches!(Catalog::from_json(json), Err(CatalogError::DuplicateChapter { .. })));
  }

  #[test]
  fn extend_skips_collisions_and_keeps_valid_courses() {
    let mut catalog = Catalog::from_json(TINY).unwrap();
    let extra: CatalogFile = serde_json::from_str(
      r#"{ "courses": [
        { "id": "python", "name": "Python again" },
        { "id": "rust", "name": "Rust", "chapters": [
          { "id": "rs-1", "title": "Hello", "practice": { "question": "Q", "pattern": { "pattern": "println!" } } }
        ]}
      ]}"#,
    )
    .unwrap();
    catalog.extend(extra.courses);

    assert_eq!(catalog.courses().len(), 2);
    assert_eq!(catalog.course("python").unwrap().name, "Python");
    assert!(catalog.chapter("rust", "rs-1").is_some());
  }

  #[test]
  fn empty_tip_list_uses_default() {
    assert_eq!(Catalog::default().random_tip(), DEFAULT_TIP);
  }
}
