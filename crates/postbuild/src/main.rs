use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use console::style;
use postbuild::file_system::FileSystem;
use postbuild::file_system::FileSystemRef;
use postbuild::file_system::OsFileSystem;
use postbuild::locale_output_dirs;
use postbuild::output_paths::delete_output_dir;
use postbuild::stats::stats_errors_to_string;
use postbuild::stats::stats_has_errors;
use postbuild::stats::stats_has_warnings;
use postbuild::stats::stats_warnings_to_string;
use postbuild::Postbuild;
use postbuild_core::diagnostic::Diagnostics;
use postbuild_core::types::BuildManifest;
use postbuild_core::types::PostbuildOptions;
use postbuild_monitoring::MonitoringOptions;
use postbuild_monitoring::TracerMode;
use tracing::error;
use tracing::info;

#[derive(Parser)]
struct Args {
  /// Files emitted by the bundler together with its stats, as JSON
  #[arg(short, long)]
  manifest: PathBuf,

  /// Build options, as JSON
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[arg(short, long)]
  verbose: bool,

  /// Remove locale output directories left by a previous build first
  #[arg(long)]
  delete_output_path: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
  initialize_tracing();

  let args = Args::parse();
  let success = run(args).await.unwrap_or_else(|e| {
    error!("Failed to run postbuild: {:#}", e);
    postbuild_monitoring::close_monitoring();
    std::process::exit(1);
  });

  postbuild_monitoring::close_monitoring();
  if !success {
    std::process::exit(1);
  }
}

async fn run(args: Args) -> anyhow::Result<bool> {
  let fs: FileSystemRef = Arc::new(OsFileSystem);

  let manifest: BuildManifest = read_json(&*fs, &args.manifest)?;
  let mut options: PostbuildOptions = match &args.config {
    Some(config) => read_json(&*fs, config)?,
    None => PostbuildOptions::default(),
  };
  options.verbose |= args.verbose;
  if options.project_root.as_os_str().is_empty() {
    options.project_root = fs.cwd()?;
  }
  if options.output_path.is_relative() {
    options.output_path = options.project_root.join(&options.output_path);
  }

  if args.delete_output_path {
    for dir in locale_output_dirs(&options) {
      info!("Deleting {}", dir.display());
      delete_output_dir(&options.project_root, &dir, &*fs)?;
    }
  }

  let verbose = options.verbose;
  let postbuild = Postbuild::new(options, Some(fs))?.with_colors(console::colors_enabled());
  let output = postbuild.run(manifest.clone()).await?;

  println!("{}", output.stats_table);
  if stats_has_warnings(&manifest.stats) {
    eprintln!("{}", stats_warnings_to_string(&manifest.stats, console::colors_enabled()));
  }
  if stats_has_errors(&manifest.stats) {
    eprintln!("{}", stats_errors_to_string(&manifest.stats, console::colors_enabled()));
  }
  print_diagnostics(&output.diagnostics);

  if verbose {
    println!("{}", serde_json::to_string_pretty(&output.process_results)?);
  }

  Ok(output.success)
}

fn read_json<T: serde::de::DeserializeOwned>(
  fs: &dyn FileSystem,
  path: &std::path::Path,
) -> anyhow::Result<T> {
  let contents = fs
    .read_to_string(path)
    .with_context(|| format!("Unable to read {}", path.display()))?;
  serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_diagnostics(diagnostics: &Diagnostics) {
  for diagnostic in diagnostics.warnings() {
    eprintln!("{} {}", style("Warning:").yellow().bold(), diagnostic);
  }
  for diagnostic in diagnostics.errors() {
    eprintln!("{} {}", style("Error:").red().bold(), diagnostic);
  }
}

fn initialize_tracing() {
  if std::env::var("RUST_LOG").is_err() {
    std::env::set_var("RUST_LOG", "info,swc_ecma_codegen=warn,swc_ecma_minifier=warn");
  }
  let mut options = MonitoringOptions::from_env().unwrap_or_default();
  if options.tracing_options.is_empty() {
    options.tracing_options.push(TracerMode::Stdout);
  }
  if let Err(error) = postbuild_monitoring::initialize_monitoring(options) {
    eprintln!("Failed to initialize tracing: {}", error);
  }
}
