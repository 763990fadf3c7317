//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings, cut on a char boundary.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

/// Longest text sent to speech synthesis, in characters.
pub const SPEECH_MAX_CHARS: usize = 400;

/// Prepare markdown for reading aloud: drop heading/emphasis/code markers and
/// keep the first `SPEECH_MAX_CHARS` characters.
pub fn speech_text(markdown: &str) -> String {
  markdown
    .chars()
    .filter(|c| !matches!(c, '#' | '*' | '`'))
    .take(SPEECH_MAX_CHARS)
    .collect()
}

/// Strip a `data:<mime>;base64,` prefix (as produced by browser file readers).
pub fn strip_data_url(payload: &str) -> &str {
  let trimmed = payload.trim();
  if trimmed.starts_with("data:") {
    if let Some((_, data)) = trimmed.split_once(',') {
      return data;
    }
  }
  trimmed
}
