use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkInfo {
  pub id: String,
  pub names: Vec<String>,
  pub files: Vec<String>,
  pub initial: bool,
  pub entry: bool,

  /// False when the bundler reused the chunk from a previous build
  pub rendered: bool,
}

impl Default for ChunkInfo {
  fn default() -> Self {
    Self {
      id: String::new(),
      names: Vec::new(),
      files: Vec::new(),
      initial: false,
      entry: false,
      rendered: true,
    }
  }
}

impl ChunkInfo {
  pub fn is_initial(&self) -> bool {
    self.initial || self.entry
  }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetInfo {
  pub name: String,
  pub size: u64,
}

/// Statistics reported by the bundler for the build being post-processed
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundlerStats {
  pub hash: Option<String>,
  pub chunks: Vec<ChunkInfo>,
  pub assets: Vec<AssetInfo>,

  /// Stylesheets attached to individual components
  pub component_styles: Vec<AssetInfo>,

  pub warnings: Vec<String>,
  pub errors: Vec<String>,
}

impl BundlerStats {
  pub fn asset_size(&self, name: &str) -> Option<u64> {
    self
      .assets
      .iter()
      .find(|asset| asset.name == name)
      .map(|asset| asset.size)
  }
}
