use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Resolve `path` against `cwd`, collapsing `.` and `..` segments without touching the disk
pub fn canonicalize_impl(cwd: &Path, path: &Path) -> PathBuf {
  let mut result = if path.is_absolute() {
    vec![]
  } else {
    cwd.components().collect()
  };

  for component in path.components() {
    match component {
      Component::Prefix(prefix) => {
        result = vec![Component::Prefix(prefix)];
      }
      Component::RootDir => {
        result.push(Component::RootDir);
      }
      Component::CurDir => {}
      Component::ParentDir => {
        result.pop();
      }
      Component::Normal(path) => {
        result.push(Component::Normal(path));
      }
    }
  }

  PathBuf::from_iter(result)
}
