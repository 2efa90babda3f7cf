use std::path::Path;
use std::sync::LazyLock;

use chrono::SecondsFormat;
use chrono::Utc;
use console::measure_text_width;
use console::style;
use postbuild_core::types::BundleStat;
use postbuild_core::types::BundlerStats;
use postbuild_core::types::ProcessResult;
use postbuild_core::types::ProcessedArtifact;
use regex::Regex;

const SIZE_UNITS: [&str; 4] = ["bytes", "kB", "MB", "GB"];

/// Warnings the bundler emits that never require action
static ERRONEOUS_WARNINGS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
  vec![
    Regex::new(r"(?i)multiple assets emit different content.*3rdpartylicenses\.txt").unwrap(),
    Regex::new(r"(?i)System.import\(\) is deprecated and will be removed soon").unwrap(),
  ]
});

/// Render a byte count with three significant digits, e.g. `12000` as `11.7 kB`
pub fn format_size(size: f64) -> String {
  if size <= 0.0 {
    return String::from("0 bytes");
  }

  let index = (size.log2() / 10.0).floor().clamp(0.0, 3.0) as usize;
  let value = size / 1024_f64.powi(index as i32);
  format!("{} {}", to_precision(value, 3), SIZE_UNITS[index])
}

fn to_precision(value: f64, digits: i32) -> f64 {
  let magnitude = value.abs().log10().floor() as i32;
  let exponent = digits - 1 - magnitude;
  if exponent >= 0 {
    let factor = 10_f64.powi(exponent);
    (value * factor).round() / factor
  } else {
    let factor = 10_f64.powi(-exponent);
    (value / factor).round() * factor
  }
}

/// A rendered row of the stats table
#[derive(Clone, Debug, PartialEq)]
pub struct BundleStatsRow {
  pub initial: bool,
  pub cells: [String; 3],
}

pub fn generate_bundle_stats(info: &BundleStat, colors: bool) -> BundleStatsRow {
  let size = info
    .size
    .map(|size| format_size(size as f64))
    .unwrap_or_else(|| String::from("-"));
  let files = info
    .files
    .iter()
    .filter(|file| !file.ends_with(".map"))
    .map(|file| {
      Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file)
    })
    .collect::<Vec<_>>()
    .join(", ");
  let names = if info.names.is_empty() {
    String::from("-")
  } else {
    info.names.join(", ")
  };

  BundleStatsRow {
    initial: info.initial,
    cells: [
      paint(files, colors, |s| s.green().bright()),
      names,
      paint(size, colors, |s| s.cyan().bright()),
    ],
  }
}

pub fn generate_build_stats_table(rows: &[BundleStatsRow], colors: bool) -> String {
  let (initial, lazy): (Vec<_>, Vec<_>) = rows.iter().partition(|row| row.initial);

  let header = |title: &str| {
    [title, "Names", "Size"].map(|cell| paint(cell.to_string(), colors, |s| s.bold()))
  };

  let mut table: Vec<Vec<String>> = Vec::new();
  if !initial.is_empty() {
    table.push(header("Initial Chunk Files").to_vec());
    table.extend(initial.iter().map(|row| row.cells.to_vec()));
  }
  if !initial.is_empty() && !lazy.is_empty() {
    table.push(Vec::new());
  }
  if !lazy.is_empty() {
    table.push(header("Lazy Chunk Files").to_vec());
    table.extend(lazy.iter().map(|row| row.cells.to_vec()));
  }

  text_table(&table, &paint(String::from(" | "), colors, |s| s.dim()))
}

/// Left aligned columns joined by `separator`, trailing whitespace removed from every line
fn text_table(rows: &[Vec<String>], separator: &str) -> String {
  let mut widths: Vec<usize> = Vec::new();
  for row in rows {
    for (index, cell) in row.iter().enumerate() {
      let width = measure_text_width(cell);
      match widths.get_mut(index) {
        Some(current) => *current = (*current).max(width),
        None => widths.push(width),
      }
    }
  }

  rows
    .iter()
    .map(|row| {
      let line = row
        .iter()
        .enumerate()
        .map(|(index, cell)| {
          let padding = widths[index].saturating_sub(measure_text_width(cell));
          format!("{}{}", cell, " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(separator);
      line.trim_end().to_string()
    })
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn generate_build_stats(hash: &str, time_ms: u128, colors: bool) -> String {
  let white = |value: String| paint(value, colors, |s| s.white().bold());
  format!(
    "Build at: {} - Hash: {} - Time: {}ms",
    white(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    white(hash.to_string()),
    white(time_ms.to_string())
  )
}

/// Table rows for the chunks rendered in this build, plus the number of chunks the bundler
/// reused unchanged.
///
/// Processed chunks get a row per artifact. Other chunks report the size the bundler emitted.
pub fn generate_process_stats(
  results: &[ProcessResult],
  stats: &BundlerStats,
) -> (Vec<BundleStat>, usize) {
  let mut rows = Vec::new();
  let mut unchanged = 0;

  for chunk in &stats.chunks {
    if !chunk.rendered {
      unchanged += 1;
      continue;
    }

    let processed = chunk
      .files
      .iter()
      .filter_map(|file| results.iter().find(|result| &result.name == file))
      .collect::<Vec<_>>();

    if processed.is_empty() {
      let size = chunk
        .files
        .iter()
        .filter(|file| !file.ends_with(".map"))
        .filter_map(|file| stats.asset_size(file))
        .sum();
      rows.push(BundleStat {
        files: chunk.files.clone(),
        names: chunk.names.clone(),
        size: Some(size),
        initial: chunk.is_initial(),
      });
      continue;
    }

    for result in processed {
      for artifact in result.artifacts() {
        rows.push(artifact_stat(artifact, &chunk.names, chunk.is_initial()));
      }
    }
  }

  (rows, unchanged)
}

fn artifact_stat(artifact: &ProcessedArtifact, names: &[String], initial: bool) -> BundleStat {
  BundleStat {
    files: vec![artifact.filename.clone()],
    names: names.to_vec(),
    size: Some(artifact.size),
    initial,
  }
}

pub fn stats_to_string(
  rows: &[BundleStat],
  unchanged: usize,
  hash: &str,
  time_ms: u128,
  colors: bool,
) -> String {
  let rows = rows
    .iter()
    .map(|row| generate_bundle_stats(row, colors))
    .collect::<Vec<_>>();

  let mut output = format!("\n{}\n\n", generate_build_stats_table(&rows, colors));
  if unchanged > 0 {
    output.push_str(&format!("{} unchanged chunks\n\n", unchanged));
  }
  output.push_str(&generate_build_stats(hash, time_ms, colors));
  output
}

fn is_relevant_warning(warning: &str) -> bool {
  !ERRONEOUS_WARNINGS
    .iter()
    .any(|pattern| pattern.is_match(warning))
}

pub fn stats_warnings_to_string(stats: &BundlerStats, colors: bool) -> String {
  let output = stats
    .warnings
    .iter()
    .filter(|warning| is_relevant_warning(warning))
    .map(|warning| {
      paint(format!("WARNING in {}\n\n", warning), colors, |s| {
        s.yellow().bright()
      })
    })
    .collect::<String>();

  if output.is_empty() {
    output
  } else {
    format!("\n{}", output)
  }
}

pub fn stats_errors_to_string(stats: &BundlerStats, colors: bool) -> String {
  let output = stats
    .errors
    .iter()
    .map(|error| paint(format!("ERROR in {}\n\n", error), colors, |s| s.red().bright()))
    .collect::<String>();

  if output.is_empty() {
    output
  } else {
    format!("\n{}", output)
  }
}

pub fn stats_has_warnings(stats: &BundlerStats) -> bool {
  stats
    .warnings
    .iter()
    .any(|warning| is_relevant_warning(warning))
}

pub fn stats_has_errors(stats: &BundlerStats) -> bool {
  !stats.errors.is_empty()
}

fn paint(
  value: String,
  colors: bool,
  apply: impl FnOnce(console::StyledObject<String>) -> console::StyledObject<String>,
) -> String {
  if colors {
    apply(style(value).force_styling(true)).to_string()
  } else {
    value
  }
}
