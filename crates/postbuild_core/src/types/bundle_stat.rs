use serde::Deserialize;
use serde::Serialize;

/// A row of the build stats table
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStat {
  pub files: Vec<String>,
  pub names: Vec<String>,
  pub size: Option<u64>,
  pub initial: bool,
}
