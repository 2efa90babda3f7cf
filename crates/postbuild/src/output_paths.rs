use std::collections::BTreeMap;
use std::io;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use postbuild_core::types::I18nOptions;
use postbuild_filesystem::FileSystem;

/// Create the output directory of every inlined locale.
///
/// Without inlining the build has a single output directory, keyed by the empty locale.
pub fn ensure_output_paths(
  base: &Path,
  i18n: Option<&I18nOptions>,
  fs: &dyn FileSystem,
) -> io::Result<BTreeMap<String, PathBuf>> {
  let mut output_paths = BTreeMap::new();

  match i18n.filter(|i18n| i18n.should_inline()) {
    Some(i18n) => {
      for locale in i18n.output_locales() {
        output_paths.insert(locale.clone(), base.join(&locale));
      }
    }
    None => {
      output_paths.insert(String::new(), base.to_path_buf());
    }
  }

  for path in output_paths.values() {
    fs.create_dir_all(path)?;
  }

  Ok(output_paths)
}

/// Remove a previous build. Refuses to delete the project root.
pub fn delete_output_dir(root: &Path, output_path: &Path, fs: &dyn FileSystem) -> io::Result<()> {
  let resolved = normalize(&root.join(output_path));
  if resolved == normalize(root) {
    return Err(io::Error::new(
      io::ErrorKind::InvalidInput,
      "Output path MUST not be project root directory!",
    ));
  }

  match fs.remove_dir_all(&resolved) {
    Ok(()) => Ok(()),
    Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(error) => Err(error),
  }
}

fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        normalized.pop();
      }
      component => normalized.push(component),
    }
  }
  normalized
}

#[cfg(test)]
mod tests {
  use postbuild_core::types::LocaleOptions;
  use postbuild_filesystem::InMemoryFileSystem;
  use postbuild_filesystem::MockFileSystem;
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn test_single_output_path_without_inlining() {
    let fs = InMemoryFileSystem::default();

    let output_paths = ensure_output_paths(Path::new("/dist"), None, &fs).unwrap();

    assert_eq!(
      output_paths,
      BTreeMap::from([(String::new(), PathBuf::from("/dist"))])
    );
    assert!(fs.is_dir(Path::new("/dist")));
  }

  #[test]
  fn test_output_path_per_locale() {
    let fs = InMemoryFileSystem::default();
    let i18n = I18nOptions {
      source_locale: String::from("en"),
      locales: BTreeMap::from([(String::from("de"), LocaleOptions::default())]),
      ..I18nOptions::default()
    };

    let output_paths = ensure_output_paths(Path::new("/dist"), Some(&i18n), &fs).unwrap();

    assert_eq!(
      output_paths,
      BTreeMap::from([
        (String::from("de"), PathBuf::from("/dist/de")),
        (String::from("en"), PathBuf::from("/dist/en")),
      ])
    );
    assert!(fs.is_dir(Path::new("/dist/de")));
    assert!(fs.is_dir(Path::new("/dist/en")));
  }

  #[test]
  fn test_refuses_to_delete_project_root() {
    let fs = MockFileSystem::new();

    let error = delete_output_dir(Path::new("/project"), Path::new("./dist/.."), &fs).unwrap_err();

    assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    assert_eq!(
      error.to_string(),
      "Output path MUST not be project root directory!"
    );
  }

  #[test]
  fn test_delete_missing_output_dir() {
    let mut fs = MockFileSystem::new();
    fs.expect_remove_dir_all()
      .withf(|path| path == Path::new("/project/dist"))
      .returning(|_| Err(io::Error::new(io::ErrorKind::NotFound, "missing")));

    assert!(delete_output_dir(Path::new("/project"), Path::new("dist"), &fs).is_ok());
  }

  #[test]
  fn test_delete_output_dir_reports_other_errors() {
    let mut fs = MockFileSystem::new();
    fs.expect_remove_dir_all()
      .returning(|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")));

    let error = delete_output_dir(Path::new("/project"), Path::new("dist"), &fs).unwrap_err();

    assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
  }
}
