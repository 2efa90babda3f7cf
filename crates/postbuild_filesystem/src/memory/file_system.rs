use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use parking_lot::RwLock;

use super::canonicalize::canonicalize_impl;
use crate::FileSystem;

#[cfg(not(target_os = "windows"))]
fn root_dir() -> PathBuf {
  PathBuf::from("/")
}

#[cfg(target_os = "windows")]
fn root_dir() -> PathBuf {
  PathBuf::from("C:/")
}

#[derive(Debug)]
enum InMemoryFileSystemEntry {
  File { contents: Vec<u8> },
  Directory,
}

/// In memory implementation of the `FileSystem` trait, for testing purposes.
#[derive(Debug)]
pub struct InMemoryFileSystem {
  files: RwLock<HashMap<PathBuf, InMemoryFileSystemEntry>>,
  current_working_directory: RwLock<PathBuf>,
}

impl Default for InMemoryFileSystem {
  fn default() -> Self {
    Self {
      files: Default::default(),
      current_working_directory: RwLock::new(root_dir()),
    }
  }
}

impl InMemoryFileSystem {
  /// Change the current working directory. Used for resolving relative paths.
  pub fn set_current_working_directory(&self, cwd: &Path) {
    let cwd = self.resolve(cwd);
    *self.current_working_directory.write() = cwd;
  }

  /// Every file path currently stored, sorted
  pub fn files(&self) -> Vec<PathBuf> {
    let mut files = self
      .files
      .read()
      .iter()
      .filter(|(_, entry)| matches!(entry, InMemoryFileSystemEntry::File { .. }))
      .map(|(path, _)| path.clone())
      .collect::<Vec<_>>();
    files.sort();
    files
  }

  fn resolve(&self, path: &Path) -> PathBuf {
    let cwd = self.current_working_directory.read();
    canonicalize_impl(&cwd, path)
  }

  fn insert_parents(files: &mut HashMap<PathBuf, InMemoryFileSystemEntry>, path: &Path) {
    let mut dir = path.parent();
    while let Some(path) = dir {
      files.insert(path.to_path_buf(), InMemoryFileSystemEntry::Directory);
      dir = path.parent();
    }
  }
}

fn not_found() -> io::Error {
  io::Error::new(io::ErrorKind::NotFound, "File not found")
}

impl FileSystem for InMemoryFileSystem {
  fn cwd(&self) -> io::Result<PathBuf> {
    Ok(self.current_working_directory.read().clone())
  }

  fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
    Ok(self.resolve(path))
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    let path = self.resolve(path);
    let mut files = self.files.write();
    Self::insert_parents(&mut files, &path);
    files.insert(path, InMemoryFileSystemEntry::Directory);
    Ok(())
  }

  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    let path = self.resolve(path);
    let files = self.files.read();
    match files.get(&path) {
      None => Err(not_found()),
      Some(InMemoryFileSystemEntry::File { contents }) => Ok(contents.clone()),
      Some(InMemoryFileSystemEntry::Directory) => Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        "Path is a directory",
      )),
    }
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    let bytes = self.read(path)?;
    String::from_utf8(bytes).map_err(|_| io::Error::other("Unable to read file as string"))
  }

  fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
    let path = self.resolve(path);
    let mut files = self.files.write();
    Self::insert_parents(&mut files, &path);
    files.insert(
      path,
      InMemoryFileSystemEntry::File {
        contents: contents.to_vec(),
      },
    );
    Ok(())
  }

  fn remove_file(&self, path: &Path) -> io::Result<()> {
    let path = self.resolve(path);
    let mut files = self.files.write();
    match files.get(&path) {
      Some(InMemoryFileSystemEntry::File { .. }) => {
        files.remove(&path);
        Ok(())
      }
      Some(InMemoryFileSystemEntry::Directory) => Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        "Path is a directory",
      )),
      None => Err(not_found()),
    }
  }

  fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
    let path = self.resolve(path);
    let mut files = self.files.write();
    if !files.contains_key(&path) {
      return Err(not_found());
    }
    files.retain(|entry, _| !entry.starts_with(&path));
    Ok(())
  }

  fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
    let contents = self.read(from)?;
    self.write(to, &contents)?;
    Ok(contents.len() as u64)
  }

  fn is_file(&self, path: &Path) -> bool {
    let path = self.resolve(path);
    matches!(
      self.files.read().get(&path),
      Some(InMemoryFileSystemEntry::File { .. })
    )
  }

  fn is_dir(&self, path: &Path) -> bool {
    let path = self.resolve(path);
    matches!(
      self.files.read().get(&path),
      Some(InMemoryFileSystemEntry::Directory)
    )
  }
}
