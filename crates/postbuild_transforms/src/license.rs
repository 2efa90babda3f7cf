use std::sync::LazyLock;

use regex::Regex;

static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

fn is_license_comment(comment: &str) -> bool {
  comment.starts_with("/*!")
    || comment.starts_with("/**!")
    || comment.contains("@license")
    || comment.contains("@preserve")
}

/// Collect license comment blocks (`/*! */`, `@license`, `@preserve`) in source order,
/// without duplicates
pub fn extract_license_comments(code: &str) -> Vec<String> {
  let mut comments: Vec<String> = Vec::new();
  for found in BLOCK_COMMENT.find_iter(code) {
    let comment = found.as_str();
    if is_license_comment(comment) && !comments.iter().any(|c| c == comment) {
      comments.push(comment.to_string());
    }
  }
  comments
}

/// Prepend license comments to emitted code. Returns the number of lines added, which callers
/// need to shift source map lines.
pub fn prepend_license_comments(code: &str, comments: &[String]) -> (String, usize) {
  if comments.is_empty() {
    return (code.to_string(), 0);
  }

  let header = comments.join("\n");
  let added_lines = header.lines().count();
  (format!("{}\n{}", header, code), added_lines)
}
