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

/// Case-insensitive answer comparison, ignoring surrounding whitespace.
/// This is the single equality rule for scoring: "A" matches "a",
/// "Tom" matches " tom ".
pub fn answers_match(selected: &str, correct: &str) -> bool {
  selected.trim().to_lowercase() == correct.trim().to_lowercase()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
#[allow(dead_code)]
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max { s.to_string() } else { format!("{}… ({} bytes total)", &s[..max], s.len()) }
}

/// Truncate on a char boundary, appending an ellipsis when shortened.
/// Used for the history excerpt of the analysis summary.
pub fn excerpt(s: &str, max_chars: usize) -> String {
  let mut it = s.chars();
  let head: String = it.by_ref().take(max_chars).collect();
  if it.next().is_some() { format!("{}…", head.trim_end()) } else { head }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_replaces_all_occurrences() {
    let out = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and y and x");
  }

  #[test]
  fn answers_match_is_case_insensitive() {
    assert!(answers_match("A", "a"));
    assert!(answers_match("Tom", "tom"));
    assert!(answers_match(" tom ", "Tom"));
    assert!(answers_match("ÉCLAIR", "éclair"));
    assert!(!answers_match("Tom", "Tim"));
  }

  #[test]
  fn excerpt_keeps_short_strings_intact() {
    assert_eq!(excerpt("short", 140), "short");
    let long = "x".repeat(200);
    let cut = excerpt(&long, 140);
    assert!(cut.chars().count() <= 141);
    assert!(cut.ends_with('…'));
  }
}
