use thiserror::Error;

#[derive(Debug, Error)]
pub enum FromEnvError {
  #[error("Invalid value for environment variable {0}: {1}")]
  InvalidKey(String, #[source] anyhow::Error),
}

/// Read an environment variable, treating unset and empty values as missing
pub fn optional_var(key: &str) -> Option<String> {
  match std::env::var(key) {
    Ok(value) if !value.trim().is_empty() => Some(value),
    _ => None,
  }
}

/// Parse a boolean flag such as `CI=true` or `POSTBUILD_CACHE=0`
pub fn optional_bool_var(key: &str) -> Result<Option<bool>, FromEnvError> {
  let Some(value) = optional_var(key) else {
    return Ok(None);
  };

  match value.trim().to_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(Some(true)),
    "0" | "false" | "no" | "off" => Ok(Some(false)),
    other => Err(FromEnvError::InvalidKey(
      key.to_string(),
      anyhow::anyhow!("Expected a boolean, got {}", other),
    )),
  }
}

/// Parse a positive integer such as `POSTBUILD_MAX_WORKERS=4`
pub fn optional_usize_var(key: &str) -> Result<Option<usize>, FromEnvError> {
  let Some(value) = optional_var(key) else {
    return Ok(None);
  };

  match value.trim().parse::<usize>() {
    Ok(0) => Err(FromEnvError::InvalidKey(
      key.to_string(),
      anyhow::anyhow!("Expected a positive number"),
    )),
    Ok(number) => Ok(Some(number)),
    Err(error) => Err(FromEnvError::InvalidKey(key.to_string(), error.into())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_optional_var() {
    std::env::set_var("POSTBUILD_TEST_OPTIONAL_VAR", "value");
    assert_eq!(
      optional_var("POSTBUILD_TEST_OPTIONAL_VAR"),
      Some(String::from("value"))
    );

    std::env::set_var("POSTBUILD_TEST_OPTIONAL_VAR", "  ");
    assert_eq!(optional_var("POSTBUILD_TEST_OPTIONAL_VAR"), None);

    std::env::remove_var("POSTBUILD_TEST_OPTIONAL_VAR");
    assert_eq!(optional_var("POSTBUILD_TEST_OPTIONAL_VAR"), None);
  }

  #[test]
  fn test_optional_bool_var() {
    std::env::set_var("POSTBUILD_TEST_BOOL_VAR", "TRUE");
    assert_eq!(optional_bool_var("POSTBUILD_TEST_BOOL_VAR").unwrap(), Some(true));

    std::env::set_var("POSTBUILD_TEST_BOOL_VAR", "0");
    assert_eq!(optional_bool_var("POSTBUILD_TEST_BOOL_VAR").unwrap(), Some(false));

    std::env::set_var("POSTBUILD_TEST_BOOL_VAR", "maybe");
    assert!(optional_bool_var("POSTBUILD_TEST_BOOL_VAR").is_err());
  }

  #[test]
  fn test_optional_usize_var() {
    std::env::set_var("POSTBUILD_TEST_USIZE_VAR", "4");
    assert_eq!(optional_usize_var("POSTBUILD_TEST_USIZE_VAR").unwrap(), Some(4));

    std::env::set_var("POSTBUILD_TEST_USIZE_VAR", "0");
    assert!(optional_usize_var("POSTBUILD_TEST_USIZE_VAR").is_err());

    std::env::set_var("POSTBUILD_TEST_USIZE_VAR", "four");
    assert!(optional_usize_var("POSTBUILD_TEST_USIZE_VAR").is_err());
  }
}
