use std::fmt::Display;
use std::fmt::Formatter;

use base64::Engine;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha384;

/// Algorithm used to compute subresource integrity digests
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityAlgorithm {
  Sha384,
}

impl IntegrityAlgorithm {
  pub fn prefix(&self) -> &'static str {
    match self {
      IntegrityAlgorithm::Sha384 => "sha384",
    }
  }

  /// Digest `bytes` into the `<algorithm>-<base64>` form used by `integrity` attributes
  pub fn digest(&self, bytes: &[u8]) -> String {
    match self {
      IntegrityAlgorithm::Sha384 => {
        let result = Sha384::digest(bytes);
        let b64 = base64::prelude::BASE64_STANDARD.encode(result);
        tracing::trace!("encode:integrity:sha384 {}", b64);
        format!("{}-{}", self.prefix(), b64)
      }
    }
  }
}

impl Display for IntegrityAlgorithm {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.prefix())
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn test_sha384_empty_input() {
    assert_eq!(
      IntegrityAlgorithm::Sha384.digest(b""),
      "sha384-OLBgp1GsljhM2TJ+sbHjaiH9txEUvgdDTAzHv2P24donTt6/529l+9Ua0vFImLlb"
    );
  }

  #[test]
  fn test_sha384_script() {
    assert_eq!(
      IntegrityAlgorithm::Sha384.digest(b"alert('Hello, world.');"),
      "sha384-H8BRh8j48O9oYatfu5AZzq6A9RINhZO5H16dQZngK7T62em8MUt1FLm52t+eX6xO"
    );
  }

  #[test]
  fn test_deserialize() {
    let algorithm: IntegrityAlgorithm = serde_json::from_str(r#""sha384""#).unwrap();
    assert_eq!(algorithm, IntegrityAlgorithm::Sha384);
    assert_eq!(algorithm.to_string(), "sha384");
  }
}
