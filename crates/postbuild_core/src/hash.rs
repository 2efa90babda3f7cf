use xxhash_rust::xxh3::xxh3_64;
use xxhash_rust::xxh3::Xxh3;

/// Hasher used for identifiers that end up on disk, such as cache keys.
///
/// Hashes must be stable across runs, machines and platforms.
pub type IdentifierHasher = Xxh3;

pub fn hash_string(s: String) -> String {
  hash_bytes(s.as_bytes())
}

pub fn hash_bytes(s: &[u8]) -> String {
  let res = xxh3_64(s);
  format!("{:016x}", res)
}

/// Hash several inputs into one key. Each part is length-prefixed so that
/// `["ab", "c"]` and `["a", "bc"]` produce different keys.
pub fn hash_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> String {
  let mut hasher = IdentifierHasher::new();
  for part in parts {
    hasher.update(&(part.len() as u64).to_le_bytes());
    hasher.update(part);
  }
  format!("{:016x}", hasher.digest())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_hash_bytes_is_stable() {
    assert_eq!(hash_bytes(b"runtime.js"), hash_bytes(b"runtime.js"));
    assert_ne!(hash_bytes(b"runtime.js"), hash_bytes(b"main.js"));
    assert_eq!(hash_bytes(b"runtime.js").len(), 16);
  }

  #[test]
  fn test_hash_string_matches_hash_bytes() {
    assert_eq!(hash_string(String::from("abc")), hash_bytes(b"abc"));
  }

  #[test]
  fn test_hash_parts_separates_boundaries() {
    let left = hash_parts([b"ab".as_slice(), b"c".as_slice()]);
    let right = hash_parts([b"a".as_slice(), b"bc".as_slice()]);

    assert_ne!(left, right);
    assert_eq!(left, hash_parts([b"ab".as_slice(), b"c".as_slice()]));
  }
}
