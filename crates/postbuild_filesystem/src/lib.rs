use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// In-memory file-system for testing
pub mod memory;

/// File-system implementation using std::fs
pub mod os_file_system;

pub use memory::InMemoryFileSystem;
pub use os_file_system::OsFileSystem;

/// FileSystem abstraction instance
///
/// This should be `OsFileSystem` for non-testing environments and `InMemoryFileSystem` for testing.
pub type FileSystemRef = Arc<dyn FileSystem + Send + Sync>;

/// Trait abstracting the file-system operations the pipeline performs on build output
#[mockall::automock]
pub trait FileSystem: std::fmt::Debug {
  fn cwd(&self) -> io::Result<PathBuf> {
    Err(io::Error::new(
      io::ErrorKind::Other,
      "Not implemented: FileSystem::cwd",
    ))
  }

  fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
  fn create_dir_all(&self, path: &Path) -> io::Result<()>;
  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
  fn read_to_string(&self, path: &Path) -> io::Result<String>;

  /// Write `contents` to `path`, creating parent directories as needed
  fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

  fn remove_file(&self, path: &Path) -> io::Result<()>;
  fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

  /// Copy a file, creating the parent directories of `to` as needed
  fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

  fn is_file(&self, path: &Path) -> bool;
  fn is_dir(&self, path: &Path) -> bool;
}
