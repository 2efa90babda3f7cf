use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use postbuild_core::cache::CacheRef;
use postbuild_core::cache::FsCache;
use postbuild_core::diagnostic::Diagnostic;
use postbuild_core::diagnostic::Diagnostics;
use postbuild_core::result::PostbuildResult;
use postbuild_core::types::BudgetFailure;
use postbuild_core::types::BuildManifest;
use postbuild_core::types::I18nOptions;
use postbuild_core::types::InlineAction;
use postbuild_core::types::InlineResult;
use postbuild_core::types::PostbuildOptions;
use postbuild_core::types::ProcessResult;
use postbuild_core::types::ThresholdSeverity;
use postbuild_filesystem::FileSystemRef;
use postbuild_filesystem::OsFileSystem;
use postbuild_monitoring::optional_bool_var;
use postbuild_worker_pool::WorkerPool;
use postbuild_worker_pool::WorkerPoolOptions;

use crate::action_executor::ActionBatch;
use crate::action_executor::BundleActionExecutor;
use crate::bundle_calculator::check_budgets;
use crate::i18n_inlining::copy_to_locale;
use crate::i18n_inlining::InlineContext;
use crate::javascript_optimizer::optimize_assets;
use crate::output_paths::ensure_output_paths;
use crate::planner::create_actions;
use crate::planner::load_scripts;
use crate::planner::plan_files;
use crate::planner::store_scripts;
use crate::planner::FilePlan;
use crate::process_bundle::ProcessBundleOptions;
use crate::stats::generate_process_stats;
use crate::stats::stats_has_errors;
use crate::stats::stats_to_string;
use crate::translations::load_translations;

#[derive(Debug, Default)]
pub struct PostbuildOutput {
  /// False when any error diagnostic or failing budget was reported
  pub success: bool,

  pub process_results: Vec<ProcessResult>,
  pub inline_results: Vec<InlineResult>,

  /// Locales whose inlining reported an error. Their output directories are incomplete.
  pub locale_failures: Vec<String>,

  pub budget_failures: Vec<BudgetFailure>,
  pub stats_table: String,
  pub diagnostics: Diagnostics,
}

/// A processed artifact as read back from the output directory, shared by every locale
struct ProcessedSource {
  filename: String,
  code: Arc<str>,
  source_map: Option<Arc<str>>,
  is_downleveled: bool,
  is_main_chunk: bool,
}

pub struct Postbuild {
  pub fs: FileSystemRef,
  pub options: PostbuildOptions,
  cache: Option<CacheRef>,
  colors: bool,
}

impl Postbuild {
  pub fn new(options: PostbuildOptions, fs: Option<FileSystemRef>) -> PostbuildResult<Self> {
    let fs = fs.unwrap_or_else(|| Arc::new(OsFileSystem));

    let cache_enabled = optional_bool_var("POSTBUILD_CACHE")
      .map_err(anyhow::Error::from)?
      .unwrap_or(true);
    let cache = match &options.cache_path {
      Some(cache_path) if cache_enabled => {
        tracing::debug!(path = %cache_path.display(), "Using transform cache");
        Some(Arc::new(FsCache::new(cache_path.clone())) as CacheRef)
      }
      _ => None,
    };

    Ok(Self {
      fs,
      options,
      cache,
      colors: false,
    })
  }

  pub fn with_cache(mut self, cache: Option<CacheRef>) -> Self {
    self.cache = cache;
    self
  }

  /// Render the stats table with terminal colors
  pub fn with_colors(mut self, colors: bool) -> Self {
    self.colors = colors;
    self
  }

  /// Post-process one build. The worker pool lives for the duration of the call.
  pub async fn run(&self, manifest: BuildManifest) -> PostbuildResult<PostbuildOutput> {
    let started = Instant::now();

    let pool_options = WorkerPoolOptions::from_env(
      self.options.max_workers,
      self.options.task_timeout_ms.map(Duration::from_millis),
    )
    .map_err(anyhow::Error::from)?;
    let pool = WorkerPool::new(pool_options)?;

    let executor = BundleActionExecutor::new(
      pool,
      self.fs.clone(),
      self.cache.clone(),
      ProcessBundleOptions {
        output_path: self.options.output_path.clone(),
        optimization: self.options.optimization.clone(),
        source_map: self.options.source_map.clone(),
      },
    );

    let output = self.run_with_executor(&executor, &manifest, started).await;
    executor.stop();
    output
  }

  async fn run_with_executor(
    &self,
    executor: &BundleActionExecutor,
    manifest: &BuildManifest,
    started: Instant,
  ) -> PostbuildResult<PostbuildOutput> {
    let options = &self.options;
    let mut diagnostics = Diagnostics::default();

    let plan = plan_files(&manifest.emitted_files, options);
    let mut assets = load_scripts(&plan, options, &self.fs)?;

    if options.optimization.scripts {
      diagnostics.extend(
        optimize_assets(
          executor.pool(),
          &mut assets,
          &options.optimization,
          options.source_map.scripts,
        )
        .await,
      );
      store_scripts(&assets, &options.output_path, &self.fs)?;
    }

    let batch = ActionBatch::new(create_actions(&plan, assets, options));
    let process_results = executor.process_all(batch).collect().await?;
    for result in &process_results {
      diagnostics.extend(result.diagnostics.iter().cloned());
    }

    let mut inline_results = Vec::new();
    let mut locale_failures = Vec::new();
    if let Some(i18n) = options.i18n.as_ref().filter(|i18n| i18n.should_inline()) {
      (inline_results, locale_failures) = self
        .inline_locales(executor, i18n, &plan, &process_results, &mut diagnostics)
        .await?;
    }

    let budgets = check_budgets(
      &options.budgets,
      &manifest.stats,
      &process_results,
      options.optimization.target,
    );
    for error in &budgets.errors {
      diagnostics.push(Diagnostic::error(error.to_string()).with_origin("postbuild:budgets"));
    }
    let budget_failures = budgets.failures;
    for failure in &budget_failures {
      let diagnostic = match failure.severity {
        ThresholdSeverity::Warning => Diagnostic::warning(failure.message.clone()),
        ThresholdSeverity::Error => Diagnostic::error(failure.message.clone()),
      };
      diagnostics.push(diagnostic.with_origin("postbuild:budgets"));
    }

    let (rows, unchanged) = generate_process_stats(&process_results, &manifest.stats);
    let stats_table = stats_to_string(
      &rows,
      unchanged,
      manifest.stats.hash.as_deref().unwrap_or("-"),
      started.elapsed().as_millis(),
      self.colors,
    );

    let success = !diagnostics.has_errors() && !stats_has_errors(&manifest.stats);
    tracing::info!(
      success,
      processed = process_results.len(),
      inlined = inline_results.len(),
      "Post-processing complete"
    );

    Ok(PostbuildOutput {
      success,
      process_results,
      inline_results,
      locale_failures,
      budget_failures,
      stats_table,
      diagnostics,
    })
  }

  async fn inline_locales(
    &self,
    executor: &BundleActionExecutor,
    i18n: &I18nOptions,
    plan: &FilePlan,
    process_results: &[ProcessResult],
    diagnostics: &mut Diagnostics,
  ) -> PostbuildResult<(Vec<InlineResult>, Vec<String>)> {
    let options = &self.options;
    let output_paths = ensure_output_paths(&options.output_path, Some(i18n), &*self.fs)?;

    let mut translations = HashMap::new();
    for locale in output_paths.keys() {
      let files = i18n
        .locales
        .get(locale)
        .map(|locale| locale.translation.clone())
        .unwrap_or_default();
      let loaded = load_translations(&*self.fs, &options.project_root, locale, &files)?;
      diagnostics.extend(loaded.diagnostics);
      translations.insert(locale.clone(), Arc::new(loaded.translations));
    }

    let context = Arc::new(InlineContext {
      output_paths: output_paths.clone(),
      source_locale: i18n.source_locale.clone(),
      translations,
      missing_translation: i18n.missing_translation,
      missing_translation_fallback: i18n.missing_translation_fallback.clone(),
      source_map: options.source_map.clone(),
      minify: options.optimization.scripts,
    });

    let sources = self.read_processed(plan, process_results)?;
    let untouched = untouched_files(plan, process_results);

    let mut inline_results = Vec::new();
    let mut failed_locales = Vec::new();
    for (locale, locale_dir) in &output_paths {
      let actions = sources
        .iter()
        .map(|source| InlineAction {
          filename: source.filename.clone(),
          code: source.code.clone(),
          source_map: source.source_map.clone(),
          locale: locale.clone(),
          is_downleveled: source.is_downleveled,
          is_main_chunk: source.is_main_chunk,
        })
        .collect::<Vec<_>>();

      tracing::info!(locale = %locale, files = actions.len(), "Inlining translations");
      let results = executor.inline_all(actions, context.clone()).await;
      if results.iter().any(InlineResult::has_errors) {
        tracing::error!(locale = %locale, "Locale build failed");
        failed_locales.push(locale.clone());
      }

      copy_to_locale(&*self.fs, &options.output_path, locale_dir, &untouched)?;

      for result in &results {
        diagnostics.extend(result.diagnostics.iter().cloned());
      }
      inline_results.extend(results);
    }

    Ok((inline_results, failed_locales))
  }

  fn read_processed(
    &self,
    plan: &FilePlan,
    process_results: &[ProcessResult],
  ) -> std::io::Result<Vec<ProcessedSource>> {
    let output_path = &self.options.output_path;
    let mut sources = Vec::new();

    for result in process_results {
      let variants = [(&result.original, false), (&result.downlevel, true)];
      for (artifact, is_downleveled) in variants {
        let Some(artifact) = artifact else {
          continue;
        };

        let code = self.fs.read_to_string(&output_path.join(&artifact.filename))?;
        let source_map = match &artifact.map {
          Some(map) => Some(Arc::from(
            self.fs.read_to_string(&output_path.join(&map.filename))?,
          )),
          None => None,
        };

        sources.push(ProcessedSource {
          filename: artifact.filename.clone(),
          code: Arc::from(code),
          source_map,
          is_downleveled,
          is_main_chunk: plan.is_main_chunk(&result.name),
        });
      }
    }

    Ok(sources)
  }
}

/// Emitted files the inliner does not write, including maps of passed through files
fn untouched_files(plan: &FilePlan, process_results: &[ProcessResult]) -> Vec<String> {
  let mut files = Vec::new();
  for file in &plan.passthrough {
    files.push(file.clone());
    if !file.ends_with(".map") {
      files.push(format!("{}.map", file));
    }
  }

  // Scripts whose artifacts are missing from the results were left as the bundler wrote them
  for script in &plan.scripts {
    let processed = process_results
      .iter()
      .any(|result| result.name == script.file_name && result.artifacts().next().is_some());
    if !processed {
      files.push(script.file_name.clone());
    }
  }

  files
}

/// Locale output directories a previous build may have written
pub fn locale_output_dirs(options: &PostbuildOptions) -> Vec<PathBuf> {
  options
    .i18n
    .as_ref()
    .filter(|i18n| i18n.should_inline())
    .map(|i18n| {
      i18n
        .output_locales()
        .into_iter()
        .map(|locale| options.output_path.join(locale))
        .collect()
    })
    .unwrap_or_default()
}
