use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BudgetType {
  All,
  AllScript,
  Any,
  AnyScript,
  AnyComponentStyle,
  Bundle,
  Initial,
}

/// A size ceiling or floor applied to the build output
///
/// Thresholds are written either as sizes (`"500"`, `"10kb"`, `"1.5mb"`) or as a
/// percentage of `baseline` (`"5%"`).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
  #[serde(rename = "type")]
  pub budget_type: BudgetType,

  /// Chunk name for `bundle` budgets
  pub name: Option<String>,

  pub baseline: Option<String>,
  pub maximum_warning: Option<String>,
  pub maximum_error: Option<String>,
  pub minimum_warning: Option<String>,
  pub minimum_error: Option<String>,

  /// Sets both a minimum and a maximum warning around the baseline
  pub warning: Option<String>,

  /// Sets both a minimum and a maximum error around the baseline
  pub error: Option<String>,

  /// Unit for warning thresholds written without one
  pub warning_unit: Option<String>,

  /// Unit for error thresholds written without one
  pub error_unit: Option<String>,
}

impl Budget {
  pub fn new(budget_type: BudgetType) -> Self {
    Self {
      budget_type,
      name: None,
      baseline: None,
      maximum_warning: None,
      maximum_error: None,
      minimum_warning: None,
      minimum_error: None,
      warning: None,
      error: None,
      warning_unit: None,
      error_unit: None,
    }
  }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ThresholdSeverity {
  Warning,
  Error,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetFailure {
  pub severity: ThresholdSeverity,
  pub message: String,
}
