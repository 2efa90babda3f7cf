use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

pub type CacheRef = Arc<dyn Cache + Sync + Send>;

/// Content-addressed store for transform output that persists across builds
#[mockall::automock]
pub trait Cache {
  fn set_blob(&self, key: &str, blob: &[u8]) -> anyhow::Result<()>;

  /// Returns `None` when the key was never written
  fn get_blob(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Convert a cache key to a safe filesystem path.
/// Sanitizes `..` in path segments to avoid directory traversal.
pub fn get_file_key(cache_dir: &Path, key: &str) -> PathBuf {
  let clean_key = key
    .split('/')
    .map(|part| {
      if part == ".." {
        "$$__parent_dir$$"
      } else {
        part
      }
    })
    .collect::<Vec<_>>()
    .join("/");
  cache_dir.join(clean_key)
}

/// Stores all blobs on the filesystem under `{cache_dir}/{key}`.
#[derive(Debug)]
pub struct FsCache {
  cache_dir: PathBuf,
}

impl FsCache {
  pub fn new(cache_dir: PathBuf) -> Self {
    Self { cache_dir }
  }
}

impl Cache for FsCache {
  fn set_blob(&self, key: &str, blob: &[u8]) -> anyhow::Result<()> {
    let file_path = get_file_key(&self.cache_dir, key);
    if let Some(parent) = file_path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, blob)?;
    Ok(())
  }

  fn get_blob(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
    let file_path = get_file_key(&self.cache_dir, key);
    match fs::read(&file_path) {
      Ok(blob) => Ok(Some(blob)),
      Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(error) => Err(error.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn test_get_file_key_sanitizes_parent_dirs() {
    assert_eq!(
      get_file_key(Path::new("/cache"), "../etc/passwd"),
      PathBuf::from("/cache/$$__parent_dir$$/etc/passwd")
    );
    assert_eq!(
      get_file_key(Path::new("/cache"), "process/abc"),
      PathBuf::from("/cache/process/abc")
    );
  }

  #[test]
  fn test_fs_cache_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cache = FsCache::new(dir.path().to_path_buf());

    assert_eq!(cache.get_blob("process/abc").unwrap(), None);

    cache.set_blob("process/abc", b"contents").unwrap();
    assert_eq!(
      cache.get_blob("process/abc").unwrap(),
      Some(b"contents".to_vec())
    );
  }
}
