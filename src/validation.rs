//! Local practice-answer validation.
//!
//! Every chapter carries exactly one rule: a regular expression the answer must
//! contain a match for, a list of substrings that must all appear, or (when the
//! author gave neither) a weak length check. Evaluation is pure and offline; it
//! never talks to the AI service.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Submissions longer than this many characters pass the fallback rule.
pub const FALLBACK_MIN_CHARS: usize = 10;

/// Authoring form of a pattern rule, including its matching mode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
  pub pattern: String,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub case_insensitive: bool,
  /// `.` also matches `\n`, for rules that span several submitted lines.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub dot_matches_newline: bool,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub multi_line: bool,
}

impl PatternSpec {
  pub fn new(pattern: impl Into<String>) -> Self {
    Self { pattern: pattern.into(), ..Self::default() }
  }

  fn compile(&self) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&self.pattern)
      .case_insensitive(self.case_insensitive)
      .dot_matches_new_line(self.dot_matches_newline)
      .multi_line(self.multi_line)
      .build()
  }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
  #[error("a practice rule may declare a pattern or keywords, not both")]
  Ambiguous,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
  Pattern,
  Keywords,
  Fallback,
}

#[derive(Clone, Debug)]
pub enum ValidationRule {
  Pattern(Regex),
  Keywords(Vec<String>),
  Fallback { min_chars: usize },
}

impl ValidationRule {
  /// Build a rule from the optional authoring fields. At most one may be set.
  pub fn from_parts(pattern: Option<PatternSpec>, keywords: Option<Vec<String>>) -> Result<Self, RuleError> {
    match (pattern, keywords) {
      (Some(_), Some(_)) => Err(RuleError::Ambiguous),
      (Some(spec), None) => Ok(Self::pattern(spec)),
      (None, Some(words)) => Ok(Self::Keywords(words)),
      (None, None) => Ok(Self::fallback()),
    }
  }

  /// A pattern rule. A pattern that does not compile degrades to the fallback rule.
  pub fn pattern(spec: PatternSpec) -> Self {
    match spec.compile() {
      Ok(regex) => Self::Pattern(regex),
      Err(e) => {
        warn!(target: "practice", pattern = %spec.pattern, error = %e, "Invalid practice pattern; using length fallback");
        Self::fallback()
      }
    }
  }

  pub fn keywords<I, S>(words: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self::Keywords(words.into_iter().map(Into::into).collect())
  }

  pub fn fallback() -> Self {
    Self::Fallback { min_chars: FALLBACK_MIN_CHARS }
  }

  pub fn kind(&self) -> RuleKind {
    match self {
      Self::Pattern(_) => RuleKind::Pattern,
      Self::Keywords(_) => RuleKind::Keywords,
      Self::Fallback { .. } => RuleKind::Fallback,
    }
  }

  /// Pass/fail for a submitted answer. No partial credit.
  pub fn evaluate(&self, submission: &str) -> bool {
    match self {
      Self::Pattern(regex) => regex.is_match(submission),
      Self::Keywords(words) => words.iter().all(|w| submission.contains(w.as_str())),
      Self::Fallback { min_chars } => submission.chars().count() > *min_chars,
    }
  }
}
