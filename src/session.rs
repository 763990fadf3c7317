//! Transient navigation state: which screen is shown and which course/chapter
//! is selected. Lives for the process lifetime and is never persisted.
//!
//! Transitions:
//! - `navigate(screen)` always clears the course and chapter selection, even
//!   when the target is `COURSE`.
//! - `select_course(id)` works from any screen and lands on `COURSE` with no chapter.
//! - `select_chapter(Some(id) | None)` needs a selected course; `None` returns to
//!   the chapter list.
//! - `advance_chapter()` moves to the next chapter, or back to the chapter list
//!   after the last one.

use serde::Serialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::domain::{Chapter, Course, Screen};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
  #[error("unknown course '{0}'")]
  UnknownCourse(String),
  #[error("unknown chapter '{chapter}' in course '{course}'")]
  UnknownChapter { course: String, chapter: String },
  #[error("no course is selected")]
  NoCourseSelected,
  #[error("no chapter is selected")]
  NoChapterSelected,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  current_screen: Screen,
  selected_course_id: Option<String>,
  selected_chapter_id: Option<String>,
}

impl Session {
  /// Initial state: `HOME`, nothing selected.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn current_screen(&self) -> Screen {
    self.current_screen
  }

  pub fn selected_course_id(&self) -> Option<&str> {
    self.selected_course_id.as_deref()
  }

  pub fn selected_chapter_id(&self) -> Option<&str> {
    self.selected_chapter_id.as_deref()
  }

  pub fn navigate(&mut self, screen: Screen) {
    self.current_screen = screen;
    self.selected_course_id = None;
    self.selected_chapter_id = None;
    debug!(target: "session", ?screen, "Navigated");
  }

  pub fn select_course(&mut self, catalog: &Catalog, course_id: &str) -> Result<(), SessionError> {
    if catalog.course(course_id).is_none() {
      return Err(SessionError::UnknownCourse(course_id.to_string()));
    }
    self.current_screen = Screen::Course;
    self.selected_course_id = Some(course_id.to_string());
    self.selected_chapter_id = None;
    debug!(target: "session", course_id, "Course selected");
    Ok(())
  }

  pub fn select_chapter(&mut self, catalog: &Catalog, chapter_id: Option<&str>) -> Result<(), SessionError> {
    let course = self.selected_course(catalog)?;
    if let Some(id) = chapter_id {
      if course.chapter(id).is_none() {
        return Err(SessionError::UnknownChapter { course: course.id.clone(), chapter: id.to_string() });
      }
    }
    self.selected_chapter_id = chapter_id.map(str::to_string);
    debug!(target: "session", chapter_id = ?chapter_id, "Chapter selected");
    Ok(())
  }

  /// Step to the next chapter in course order. After the last chapter the
  /// selection is cleared instead of wrapping. Returns the new selection.
  /// Without a course and chapter selected this does nothing.
  pub fn advance_chapter(&mut self, catalog: &Catalog) -> Option<&str> {
    let (course_id, chapter_id) = match (&self.selected_course_id, &self.selected_chapter_id) {
      (Some(course), Some(chapter)) => (course, chapter),
      _ => return None,
    };
    let next = catalog
      .course(course_id)
      .and_then(|c| c.next_after(chapter_id))
      .map(|c| c.id.clone());
    debug!(target: "session", from = %chapter_id, to = ?next, "Advanced chapter");
    self.selected_chapter_id = next;
    self.selected_chapter_id.as_deref()
  }

  pub fn selected_course<'c>(&self, catalog: &'c Catalog) -> Result<&'c Course, SessionError> {
    let id = self.selected_course_id.as_deref().ok_or(SessionError::NoCourseSelected)?;
    catalog.course(id).ok_or_else(|| SessionError::UnknownCourse(id.to_string()))
  }

  /// The course and chapter currently open, if any.
  pub fn current_chapter<'c>(&self, catalog: &'c Catalog) -> Result<(&'c Course, &'c Chapter), SessionError> {
    let course = self.selected_course(catalog)?;
    let id = self.selected_chapter_id.as_deref().ok_or(SessionError::NoChapterSelected)?;
    let chapter = course
      .chapter(id)
      .ok_or_else(|| SessionError::UnknownChapter { course: course.id.clone(), chapter: id.to_string() })?;
    Ok((course, chapter))
  }
}
