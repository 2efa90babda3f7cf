use std::sync::LazyLock;

use postbuild_core::types::Budget;
use postbuild_core::types::BudgetFailure;
use postbuild_core::types::BudgetType;
use postbuild_core::types::BundlerStats;
use postbuild_core::types::EcmaTarget;
use postbuild_core::types::ProcessResult;
use postbuild_core::types::ThresholdSeverity;
use regex::Regex;

use crate::stats::format_size;

static THRESHOLD: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(%|(?:[mM]|[kK]|[gG])?[bB])?\s*$").unwrap()
});

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ThresholdError {
  #[error("Invalid budget threshold \"{0}\"")]
  InvalidThreshold(String),
  #[error("Invalid budget unit \"{0}\"")]
  InvalidUnit(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ThresholdKind {
  Max,
  Min,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Threshold {
  limit: f64,
  kind: ThresholdKind,
  severity: ThresholdSeverity,
}

#[derive(Clone, Debug, PartialEq)]
struct Size {
  size: u64,
  label: String,
}

/// Convert a threshold to bytes.
///
/// Percentages are relative to `baseline`. With a baseline the result is the baseline moved by
/// the value in the direction of `factor`. `default_unit` applies to values written without a
/// unit.
pub fn calculate_bytes(
  input: &str,
  baseline: Option<&str>,
  factor: f64,
  default_unit: Option<&str>,
) -> Result<f64, ThresholdError> {
  let captures = THRESHOLD
    .captures(input)
    .ok_or_else(|| ThresholdError::InvalidThreshold(input.to_string()))?;

  let baseline_bytes = match baseline {
    Some(baseline) => calculate_bytes(baseline, None, 1.0, None)?,
    None => 0.0,
  };

  let mut value: f64 = captures[1]
    .parse()
    .map_err(|_| ThresholdError::InvalidThreshold(input.to_string()))?;

  let unit = match (captures.get(2), default_unit) {
    (Some(unit), _) => unit.as_str().to_lowercase(),
    (None, Some(unit)) => unit.trim().to_lowercase(),
    (None, None) => String::from("b"),
  };

  match unit.as_str() {
    "%" => value = baseline_bytes * value / 100.0,
    "b" => {}
    "kb" => value *= 1024.0,
    "mb" => value *= 1024.0 * 1024.0,
    "gb" => value *= 1024.0 * 1024.0 * 1024.0,
    _ => return Err(ThresholdError::InvalidUnit(unit)),
  }

  if baseline_bytes == 0.0 {
    return Ok(value);
  }

  Ok(baseline_bytes + value * factor)
}

fn calculate_thresholds(budget: &Budget) -> Result<Vec<Threshold>, ThresholdError> {
  use ThresholdKind::*;
  use ThresholdSeverity::*;

  let baseline = budget.baseline.as_deref();
  let warning_unit = budget.warning_unit.as_deref();
  let error_unit = budget.error_unit.as_deref();

  let configured = [
    (&budget.maximum_warning, Max, Warning, warning_unit),
    (&budget.maximum_error, Max, Error, error_unit),
    (&budget.minimum_warning, Min, Warning, warning_unit),
    (&budget.minimum_error, Min, Error, error_unit),
    (&budget.warning, Max, Warning, warning_unit),
    (&budget.warning, Min, Warning, warning_unit),
    (&budget.error, Max, Error, error_unit),
    (&budget.error, Min, Error, error_unit),
  ];

  let mut thresholds = Vec::new();
  for (value, kind, severity, unit) in configured {
    let Some(value) = value else {
      continue;
    };
    let factor = match kind {
      Max => 1.0,
      Min => -1.0,
    };
    thresholds.push(Threshold {
      limit: calculate_bytes(value, baseline, factor, unit)?,
      kind,
      severity,
    });
  }

  Ok(thresholds)
}

/// Sizes of an original and its downlevel variant
#[derive(Default)]
struct VariantSizes {
  original: u64,
  downlevel: u64,
  has_downlevel: bool,
}

impl VariantSizes {
  fn add_file(&mut self, file: &str, stats: &BundlerStats, results: &[ProcessResult]) {
    match results.iter().find(|result| result.name == file) {
      Some(result) => {
        let original = result.original.as_ref().map(|artifact| artifact.size);
        let downlevel = result.downlevel.as_ref().map(|artifact| artifact.size);
        self.original += original.unwrap_or(0);
        if let Some(downlevel) = downlevel {
          self.has_downlevel = true;
          self.downlevel += downlevel;
        } else {
          self.downlevel += original.unwrap_or(0);
        }
      }
      None => {
        let size = stats.asset_size(file).unwrap_or(0);
        self.original += size;
        self.downlevel += size;
      }
    }
  }

  fn into_sizes(self, label: &str, target: EcmaTarget) -> Vec<Size> {
    if !self.has_downlevel {
      return vec![Size {
        size: self.original,
        label: label.to_string(),
      }];
    }

    vec![
      Size {
        size: self.original,
        label: format!("{}-{}", label, target.file_tag()),
      },
      Size {
        size: self.downlevel,
        label: format!("{}-{}", label, EcmaTarget::Es5.file_tag()),
      },
    ]
  }
}

fn is_map(file: &str) -> bool {
  file.ends_with(".map")
}

fn is_script(file: &str) -> bool {
  file.ends_with(".js")
}

fn total_sizes(
  files: impl Iterator<Item = String>,
  label: &str,
  stats: &BundlerStats,
  results: &[ProcessResult],
  target: EcmaTarget,
) -> Vec<Size> {
  let mut sizes = VariantSizes::default();
  for file in files {
    sizes.add_file(&file, stats, results);
  }
  sizes.into_sizes(label, target)
}

/// Every non-map asset, each processed file reported once per variant
fn each_asset(
  stats: &BundlerStats,
  results: &[ProcessResult],
  filter: impl Fn(&str) -> bool,
) -> Vec<Size> {
  let mut sizes = Vec::new();
  for asset in &stats.assets {
    if is_map(&asset.name) || !filter(&asset.name) {
      continue;
    }

    match results.iter().find(|result| result.name == asset.name) {
      Some(result) => sizes.extend(result.artifacts().map(|artifact| Size {
        size: artifact.size,
        label: artifact.filename.clone(),
      })),
      None => sizes.push(Size {
        size: asset.size,
        label: asset.name.clone(),
      }),
    }
  }
  sizes
}

fn calculate_sizes(
  budget: &Budget,
  stats: &BundlerStats,
  results: &[ProcessResult],
  target: EcmaTarget,
) -> Vec<Size> {
  let asset_names = || {
    stats
      .assets
      .iter()
      .map(|asset| asset.name.clone())
      .filter(|name| !is_map(name))
  };

  match budget.budget_type {
    BudgetType::All => total_sizes(asset_names(), "total", stats, results, target),
    BudgetType::AllScript => total_sizes(
      asset_names().filter(|name| is_script(name)),
      "total scripts",
      stats,
      results,
      target,
    ),
    BudgetType::Initial => {
      let files = stats
        .chunks
        .iter()
        .filter(|chunk| chunk.is_initial())
        .flat_map(|chunk| chunk.files.iter().cloned())
        .filter(|file| !is_map(file));
      total_sizes(files, "bundle initial", stats, results, target)
    }
    BudgetType::Bundle => {
      let Some(name) = &budget.name else {
        return Vec::new();
      };
      let chunks = stats
        .chunks
        .iter()
        .filter(|chunk| chunk.names.contains(name))
        .collect::<Vec<_>>();
      if chunks.is_empty() {
        return Vec::new();
      }
      let files = chunks
        .into_iter()
        .flat_map(|chunk| chunk.files.iter().cloned())
        .filter(|file| !is_map(file));
      total_sizes(files, &format!("bundle {}", name), stats, results, target)
    }
    BudgetType::Any => each_asset(stats, results, |_| true),
    BudgetType::AnyScript => each_asset(stats, results, is_script),
    BudgetType::AnyComponentStyle => stats
      .component_styles
      .iter()
      .map(|style| Size {
        size: style.size,
        label: style.name.clone(),
      })
      .collect(),
  }
}

fn check_thresholds(thresholds: &[Threshold], size: &Size) -> Vec<BudgetFailure> {
  let mut failures = Vec::new();
  let actual = size.size as f64;

  for threshold in thresholds {
    match threshold.kind {
      ThresholdKind::Max if actual > threshold.limit => failures.push(BudgetFailure {
        severity: threshold.severity,
        message: format!(
          "budgets: {} exceeded maximum budget. Budget {} was not met by {} with a total of {}.",
          size.label,
          format_size(threshold.limit),
          format_size(actual - threshold.limit),
          format_size(actual)
        ),
      }),
      ThresholdKind::Min if actual < threshold.limit => failures.push(BudgetFailure {
        severity: threshold.severity,
        message: format!(
          "budgets: {} failed to meet minimum budget. Budget {} was not met by {} with a total of {}.",
          size.label,
          format_size(threshold.limit),
          format_size(threshold.limit - actual),
          format_size(actual)
        ),
      }),
      _ => {}
    }
  }

  failures
}

/// Outcome of checking every budget. A malformed budget is reported in `errors` and does not
/// stop the remaining budgets from being checked.
#[derive(Debug, Default, PartialEq)]
pub struct BudgetReport {
  pub failures: Vec<BudgetFailure>,
  pub errors: Vec<ThresholdError>,
}

/// Evaluate every budget against the final output sizes.
///
/// Sizes come from the processed artifacts when a file was processed, otherwise from the
/// bundler stats. Totals are reported per variant once downleveled output exists.
pub fn check_budgets(
  budgets: &[Budget],
  stats: &BundlerStats,
  results: &[ProcessResult],
  target: EcmaTarget,
) -> BudgetReport {
  let mut report = BudgetReport::default();

  for budget in budgets {
    let thresholds = match calculate_thresholds(budget) {
      Ok(thresholds) => thresholds,
      Err(error) => {
        tracing::warn!(budget = ?budget.budget_type, "Skipping invalid budget: {}", error);
        report.errors.push(error);
        continue;
      }
    };
    if thresholds.is_empty() {
      continue;
    }

    for size in calculate_sizes(budget, stats, results, target) {
      report.failures.extend(check_thresholds(&thresholds, &size));
    }
  }

  report
}
