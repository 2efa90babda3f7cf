use sourcemap::SourceMap;

#[derive(Debug, thiserror::Error)]
pub enum ComposeSourceMapError {
  #[error("Failed to read source map: {0}")]
  Parse(#[source] sourcemap::Error),
  #[error("Failed to write source map: {0}")]
  Write(#[source] sourcemap::Error),
  #[error("Invalid source map json: {0}")]
  Json(#[from] serde_json::Error),
}

/// Compose the map of a transform applied to already mapped code.
///
/// `input` maps the bundler output back to the sources; `transform` maps the transformed
/// code back to the bundler output. The result maps the transformed code back to the sources.
pub fn compose_source_maps(input: &[u8], transform: &[u8]) -> Result<Vec<u8>, ComposeSourceMapError> {
  let mut input = SourceMap::from_slice(input).map_err(ComposeSourceMapError::Parse)?;
  let transform = SourceMap::from_slice(transform).map_err(ComposeSourceMapError::Parse)?;

  input.adjust_mappings(&transform);
  input.set_file(transform.get_file());

  let mut output = vec![];
  input
    .to_writer(&mut output)
    .map_err(ComposeSourceMapError::Write)?;
  Ok(output)
}

/// Set the `file` field of a serialized map
pub fn rename_source_map_file(map: &[u8], file: &str) -> Result<Vec<u8>, ComposeSourceMapError> {
  let mut map = SourceMap::from_slice(map).map_err(ComposeSourceMapError::Parse)?;
  map.set_file(Some(file));

  let mut output = vec![];
  map
    .to_writer(&mut output)
    .map_err(ComposeSourceMapError::Write)?;
  Ok(output)
}

/// Shift every mapping down by `lines`, for code that had lines prepended after the map was
/// generated
pub fn offset_source_map_lines(map: &[u8], lines: usize) -> Result<Vec<u8>, ComposeSourceMapError> {
  if lines == 0 {
    return Ok(map.to_vec());
  }

  let mut map: serde_json::Value = serde_json::from_slice(map)?;
  if let Some(mappings) = map.get_mut("mappings") {
    let shifted = format!("{}{}", ";".repeat(lines), mappings.as_str().unwrap_or_default());
    *mappings = serde_json::Value::String(shifted);
  }
  Ok(serde_json::to_vec(&map)?)
}
