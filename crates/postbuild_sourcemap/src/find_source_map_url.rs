use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, PartialEq)]
pub struct SourceMapUrlMatch {
  /// The comment containing the sourcemap url
  pub code: String,

  /// The url to the sourcemap
  pub url: String,
}

static SOURCEMAP_URL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\/[*/][@#]\s*sourceMappingURL\s*=\s*(?<url>\S+)(?:\s*\*\/)?\s*$").unwrap()
});

pub fn find_sourcemap_url(code: &str) -> Option<SourceMapUrlMatch> {
  if let Some(captures) = SOURCEMAP_URL.captures(code) {
    if let (Some(code), Some(url)) = (captures.get(0), captures.name("url")) {
      return Some(SourceMapUrlMatch {
        code: code.as_str().trim().into(),
        url: url.as_str().to_string(),
      });
    }
  }

  None
}

/// Strip a trailing `sourceMappingURL` comment, returning the code without it
pub fn remove_sourcemap_url(code: &str) -> &str {
  match SOURCEMAP_URL.find(code) {
    Some(found) => code[..found.start()].trim_end_matches(['\n', '\r']),
    None => code,
  }
}

/// Replace any trailing `sourceMappingURL` comment with one that points at `url`
pub fn append_sourcemap_url(code: &str, url: &str) -> String {
  format!("{}\n//# sourceMappingURL={}\n", remove_sourcemap_url(code), url)
}

/// Insert `statement` immediately before the trailing `sourceMappingURL` comment, or at the
/// end of the code when there is none
pub fn insert_before_sourcemap_url(code: &str, statement: &str) -> String {
  match SOURCEMAP_URL.find(code) {
    Some(found) => format!(
      "{}\n{}\n{}",
      code[..found.start()].trim_end_matches(['\n', '\r']),
      statement,
      &code[found.start()..]
    ),
    None => format!("{}\n{}\n", code.trim_end_matches(['\n', '\r']), statement),
  }
}
