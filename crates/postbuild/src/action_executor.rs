use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use postbuild_core::cache::CacheRef;
use postbuild_core::diagnostic::Diagnostic;
use postbuild_core::hash::hash_parts;
use postbuild_core::types::InlineAction;
use postbuild_core::types::InlineResult;
use postbuild_core::types::ProcessAction;
use postbuild_core::types::ProcessResult;
use postbuild_core::types::ProcessedArtifact;
use postbuild_core::version::postbuild_version;
use postbuild_filesystem::FileSystem;
use postbuild_filesystem::FileSystemRef;
use postbuild_worker_pool::TaskError;
use postbuild_worker_pool::WorkerPool;
use tokio::task::JoinSet;

use crate::i18n_inlining::inline_locale;
use crate::i18n_inlining::InlineContext;
use crate::process_bundle::process_bundle;
use crate::process_bundle::process_runtime;
use crate::process_bundle::write_process_output;
use crate::process_bundle::ProcessBundleOptions;
use crate::process_bundle::ProcessOutput;

/// Work planned for one output file
#[derive(Clone, Debug, PartialEq)]
pub enum BundleAction {
  Process(ProcessAction),

  /// Processed after every other action of the batch has completed
  Runtime(ProcessAction),
}

impl BundleAction {
  pub fn action(&self) -> &ProcessAction {
    match self {
      BundleAction::Process(action) => action,
      BundleAction::Runtime(action) => action,
    }
  }
}

/// A runtime action waiting for the results of its siblings
#[derive(Debug)]
pub struct PendingRuntime {
  action: ProcessAction,
}

impl PendingRuntime {
  /// Close the barrier. `results` must hold every non-runtime result of the batch.
  pub fn complete(self, results: &[ProcessResult]) -> RuntimeTask {
    RuntimeTask {
      action: self.action,
      siblings: results.to_vec(),
    }
  }
}

/// The runtime action together with the complete set of sibling results
#[derive(Debug)]
pub struct RuntimeTask {
  action: ProcessAction,
  siblings: Vec<ProcessResult>,
}

impl RuntimeTask {
  pub fn file_name(&self) -> &str {
    &self.action.file_name
  }

  pub(crate) fn run(&self, options: &ProcessBundleOptions) -> ProcessOutput {
    process_runtime(&self.action, &self.siblings, options)
  }
}

/// Deduplicated actions of one build
#[derive(Debug, Default)]
pub struct ActionBatch {
  actions: Vec<ProcessAction>,
  runtime: Option<PendingRuntime>,
}

impl ActionBatch {
  /// Keeps the first action for each output file
  pub fn new(actions: Vec<BundleAction>) -> Self {
    let mut unique: IndexMap<String, BundleAction> = IndexMap::new();
    for action in actions {
      let file_name = action.action().file_name.clone();
      if unique.contains_key(&file_name) {
        tracing::debug!(file = %file_name, "Skipping duplicate bundle action");
        continue;
      }
      unique.insert(file_name, action);
    }

    let mut batch = ActionBatch::default();
    for (_, action) in unique {
      match action {
        BundleAction::Process(action) => batch.actions.push(action),
        BundleAction::Runtime(action) if batch.runtime.is_none() => {
          batch.runtime = Some(PendingRuntime { action })
        }
        BundleAction::Runtime(action) => {
          tracing::debug!(file = %action.file_name, "Processing extra runtime as a regular bundle");
          batch.actions.push(action);
        }
      }
    }
    batch
  }

  pub fn len(&self) -> usize {
    self.actions.len() + usize::from(self.runtime.is_some())
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Runs process and inline actions on the worker pool
pub struct BundleActionExecutor {
  pool: WorkerPool,
  fs: FileSystemRef,
  cache: Option<CacheRef>,
  options: Arc<ProcessBundleOptions>,
}

impl BundleActionExecutor {
  pub fn new(
    pool: WorkerPool,
    fs: FileSystemRef,
    cache: Option<CacheRef>,
    options: ProcessBundleOptions,
  ) -> Self {
    Self {
      pool,
      fs,
      cache,
      options: Arc::new(options),
    }
  }

  pub fn pool(&self) -> &WorkerPool {
    &self.pool
  }

  /// Submit every non-runtime action. The runtime action is submitted by
  /// [`ProcessResults::next`] once all other results were observed.
  pub fn process_all(&self, batch: ActionBatch) -> ProcessResults<'_> {
    tracing::info!(actions = batch.len(), "Processing bundles");

    let mut results = ProcessResults {
      executor: self,
      in_flight: JoinSet::new(),
      ready: VecDeque::new(),
      completed: Vec::new(),
      runtime: batch.runtime,
      fatal: None,
    };

    for action in batch.actions {
      let key = self.cache_key(&action);
      if let Some(key) = &key {
        match self.read_cache(key) {
          Ok(Some(result)) => {
            results.ready.push_back(result);
            continue;
          }
          Ok(None) => {}
          Err(error) => {
            results.fatal.get_or_insert(error);
            continue;
          }
        }
      }

      let fallback = unprocessed_result(&action);
      let handle = self.pool.submit({
        let options = self.options.clone();
        move || Ok(process_bundle(&action, &options))
      });

      let fs = self.fs.clone();
      let cache = self.cache.clone();
      let options = self.options.clone();
      results.in_flight.spawn(async move {
        match handle.join().await {
          Ok(output) => commit_output(
            &*fs,
            &options.output_path,
            output,
            cache.as_ref().zip(key.as_deref()),
          ),
          Err(error) => recover_task_error(error, fallback),
        }
      });
    }

    results
  }

  fn cache_key(&self, action: &ProcessAction) -> Option<String> {
    self.cache.as_ref()?;

    let action = serde_json::to_vec(action).ok()?;
    let options = serde_json::to_vec(&*self.options).ok()?;
    Some(hash_parts([
      action.as_slice(),
      options.as_slice(),
      postbuild_version().as_bytes(),
    ]))
  }

  /// Replay a cached output to disk, returning its result
  fn read_cache(&self, key: &str) -> anyhow::Result<Option<ProcessResult>> {
    let Some(cache) = &self.cache else {
      return Ok(None);
    };

    let blob = match cache.get_blob(key) {
      Ok(Some(blob)) => blob,
      Ok(None) => return Ok(None),
      Err(error) => {
        tracing::warn!("Failed to read transform cache: {}", error);
        return Ok(None);
      }
    };

    let output: ProcessOutput = match serde_json::from_slice(&blob) {
      Ok(output) => output,
      Err(error) => {
        tracing::warn!("Ignoring corrupt cache entry {}: {}", key, error);
        return Ok(None);
      }
    };

    tracing::debug!(file = %output.result.name, "Transform cache hit");
    write_process_output(&*self.fs, &self.options.output_path, &output)?;
    Ok(Some(output.result))
  }

  async fn run_runtime(&self, task: RuntimeTask) -> anyhow::Result<ProcessResult> {
    tracing::debug!(file = %task.file_name(), "Processing runtime");

    let fallback = unprocessed_result(&task.action);
    let handle = self.pool.submit({
      let options = self.options.clone();
      move || Ok(task.run(&options))
    });

    match handle.join().await {
      Ok(output) => commit_output(&*self.fs, &self.options.output_path, output, None),
      Err(error) => recover_task_error(error, fallback),
    }
  }

  /// Inline one locale into every processed file. A failed task becomes an error diagnostic
  /// on its file.
  pub async fn inline_all(
    &self,
    actions: Vec<InlineAction>,
    context: Arc<InlineContext>,
  ) -> Vec<InlineResult> {
    let handles = actions
      .into_iter()
      .map(|action| {
        let file = action.filename.clone();
        let locale = action.locale.clone();
        let handle = self.pool.submit({
          let fs = self.fs.clone();
          let context = context.clone();
          move || inline_locale(&action, &context, &*fs)
        });
        (file, locale, handle)
      })
      .collect::<Vec<_>>();

    let mut results = Vec::with_capacity(handles.len());
    for (file, locale, handle) in handles {
      match handle.join().await {
        Ok(result) => results.push(result),
        Err(error) => results.push(InlineResult {
          diagnostics: vec![Diagnostic::error(format!(
            "Failed to inline translations into {}: {}",
            file, error
          ))
          .with_file(file.clone())
          .with_origin("postbuild:i18n")],
          file,
          locale,
          substitution_count: 0,
        }),
      }
    }
    results
  }

  /// Release the worker pool
  pub fn stop(self) {
    self.pool.shutdown();
  }
}

/// Results of a batch: process results in completion order, then the runtime result
pub struct ProcessResults<'a> {
  executor: &'a BundleActionExecutor,
  in_flight: JoinSet<anyhow::Result<ProcessResult>>,
  ready: VecDeque<ProcessResult>,
  completed: Vec<ProcessResult>,
  runtime: Option<PendingRuntime>,
  fatal: Option<anyhow::Error>,
}

impl ProcessResults<'_> {
  /// The next result, `None` once the batch is exhausted.
  ///
  /// After a fatal error the remaining in-flight tasks are awaited and their results
  /// discarded; the error is returned once and the runtime is never processed.
  pub async fn next(&mut self) -> Option<anyhow::Result<ProcessResult>> {
    if self.fatal.is_none() {
      if let Some(result) = self.ready.pop_front() {
        self.completed.push(result.clone());
        return Some(Ok(result));
      }
    }

    while let Some(joined) = self.in_flight.join_next().await {
      let outcome = joined.unwrap_or_else(|error| Err(anyhow::anyhow!(error)));
      match outcome {
        Ok(result) if self.fatal.is_none() => {
          self.completed.push(result.clone());
          return Some(Ok(result));
        }
        Ok(_) => {}
        Err(error) => {
          if self.fatal.is_none() {
            tracing::error!("Bundle processing failed, waiting for in-flight tasks");
            self.fatal = Some(error);
          }
        }
      }
    }

    if let Some(error) = self.fatal.take() {
      self.runtime = None;
      self.ready.clear();
      return Some(Err(error));
    }

    let runtime = self.runtime.take()?;
    let task = runtime.complete(&self.completed);
    let result = self.executor.run_runtime(task).await;
    if let Ok(result) = &result {
      self.completed.push(result.clone());
    }
    Some(result)
  }

  /// Await the whole batch
  pub async fn collect(mut self) -> anyhow::Result<Vec<ProcessResult>> {
    while let Some(result) = self.next().await {
      result?;
    }
    Ok(self.completed)
  }
}

/// Result reported for a file whose task panicked or timed out: the file stays as the
/// bundler wrote it
fn unprocessed_result(action: &ProcessAction) -> ProcessResult {
  let digest = |bytes: &[u8]| {
    action
      .integrity_algorithm
      .map(|algorithm| algorithm.digest(bytes))
  };

  ProcessResult {
    name: action.file_name.clone(),
    integrity: digest(action.code.as_bytes()),
    original: Some(ProcessedArtifact {
      filename: action.file_name.clone(),
      size: action.code.len() as u64,
      integrity: digest(action.code.as_bytes()),
      map: None,
    }),
    downlevel: None,
    diagnostics: vec![],
  }
}

/// Write the files of a task that finished in time. Tasks run without side effects, so the
/// late output of a timed out task never reaches the output directory.
fn commit_output(
  fs: &dyn FileSystem,
  output_path: &Path,
  output: ProcessOutput,
  cache: Option<(&CacheRef, &str)>,
) -> anyhow::Result<ProcessResult> {
  write_process_output(fs, output_path, &output)?;
  if let Some((cache, key)) = cache {
    store_in_cache(cache, key, &output);
  }
  Ok(output.result)
}

/// Task failures are fatal; panics and timeouts only affect their own file
fn recover_task_error(error: TaskError, fallback: ProcessResult) -> anyhow::Result<ProcessResult> {
  match error {
    TaskError::Failed(error) => Err(error),
    error => {
      let mut result = fallback;
      result.diagnostics.push(
        Diagnostic::error(format!("Failed to process {}: {}", result.name, error))
          .with_file(result.name.clone())
          .with_origin("postbuild:process-bundle"),
      );
      Ok(result)
    }
  }
}

fn store_in_cache(cache: &CacheRef, key: &str, output: &ProcessOutput) {
  if output.result.has_errors() {
    return;
  }

  let stored = serde_json::to_vec(output)
    .map_err(anyhow::Error::from)
    .and_then(|blob| cache.set_blob(key, &blob));
  if let Err(error) = stored {
    tracing::warn!("Failed to write transform cache: {}", error);
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;
  use std::time::Duration;

  use postbuild_core::cache::MockCache;
  use postbuild_core::types::IntegrityAlgorithm;
  use postbuild_filesystem::InMemoryFileSystem;
  use postbuild_filesystem::MockFileSystem;
  use postbuild_worker_pool::WorkerPoolOptions;
  use pretty_assertions::assert_eq;

  use super::*;

  fn pool() -> WorkerPool {
    WorkerPool::new(WorkerPoolOptions {
      max_workers: 2,
      task_timeout: None,
    })
    .unwrap()
  }

  fn options() -> ProcessBundleOptions {
    ProcessBundleOptions {
      output_path: PathBuf::from("/dist"),
      ..ProcessBundleOptions::default()
    }
  }

  fn action(file_name: &str, code: &str) -> ProcessAction {
    ProcessAction {
      name: file_name.to_string(),
      file_name: file_name.to_string(),
      code: code.to_string(),
      integrity_algorithm: Some(IntegrityAlgorithm::Sha384),
      ..ProcessAction::default()
    }
  }

  #[test]
  fn test_batch_deduplicates_by_file_name() {
    let batch = ActionBatch::new(vec![
      BundleAction::Process(action("main.js", "first")),
      BundleAction::Runtime(action("runtime.js", "runtime")),
      BundleAction::Process(action("main.js", "second")),
    ]);

    assert_eq!(batch.len(), 2);
    assert_eq!(batch.actions.len(), 1);
    assert_eq!(batch.actions[0].code, "first");
    assert!(batch.runtime.is_some());
  }

  #[tokio::test]
  async fn test_runtime_result_comes_last_and_sees_every_sibling() {
    let fs = Arc::new(InMemoryFileSystem::default());
    let executor = BundleActionExecutor::new(pool(), fs.clone(), None, options());

    let batch = ActionBatch::new(vec![
      BundleAction::Runtime(action("runtime.js", "var runtime = 1;")),
      BundleAction::Process(action("main.js", "var main = 1;")),
      BundleAction::Process(action("lazy.js", "var lazy = 1;")),
    ]);

    let mut results = executor.process_all(batch);
    let mut names = Vec::new();
    while let Some(result) = results.next().await {
      names.push(result.unwrap().name);
    }
    drop(results);

    assert_eq!(names.len(), 3);
    assert_eq!(names[2], "runtime.js");

    let runtime = fs.read_to_string(Path::new("/dist/runtime.js")).unwrap();
    assert!(runtime.contains("\"main.js\":\"sha384-"));
    assert!(runtime.contains("\"lazy.js\":\"sha384-"));

    executor.stop();
  }

  #[tokio::test]
  async fn test_duplicate_file_is_processed_once() {
    let fs = Arc::new(InMemoryFileSystem::default());
    let executor = BundleActionExecutor::new(pool(), fs.clone(), None, options());

    let results = executor
      .process_all(ActionBatch::new(vec![
        BundleAction::Process(action("main.js", "var first = 1;")),
        BundleAction::Process(action("lazy.js", "var lazy = 1;")),
        BundleAction::Process(action("main.js", "var second = 2;")),
      ]))
      .collect()
      .await
      .unwrap();

    let main = results
      .iter()
      .filter(|result| result.name == "main.js")
      .collect::<Vec<_>>();
    assert_eq!(main.len(), 1);
    assert_eq!(
      main[0].integrity,
      Some(IntegrityAlgorithm::Sha384.digest(b"var first = 1;"))
    );
    assert_eq!(results.len(), 2);
    assert_eq!(executor.pool().stats().submitted, 2);
    executor.stop();
  }

  #[tokio::test]
  async fn test_timed_out_sibling_is_reported_unprocessed_before_runtime() {
    let pool = WorkerPool::new(WorkerPoolOptions {
      max_workers: 1,
      task_timeout: Some(Duration::from_millis(50)),
    })
    .unwrap();
    let fs = Arc::new(InMemoryFileSystem::default());
    let executor = BundleActionExecutor::new(pool, fs.clone(), None, options());

    let slow_code = (0..5000)
      .map(|index| format!("class C{index} {{ m() {{ return () => `${{this}}{index}`; }} }}\n"))
      .collect::<String>();
    let slow = ProcessAction {
      requires_downlevel: true,
      ..action("slow.js", &slow_code)
    };

    let mut results = executor.process_all(ActionBatch::new(vec![
      BundleAction::Runtime(action("runtime.js", "var runtime = 1;")),
      BundleAction::Process(slow),
    ]));
    let mut reported = Vec::new();
    while let Some(result) = results.next().await {
      reported.push(result.unwrap());
    }
    drop(results);

    assert_eq!(
      reported.iter().map(|result| result.name.as_str()).collect::<Vec<_>>(),
      vec!["slow.js", "runtime.js"]
    );
    assert_eq!(reported[0].downlevel, None);
    assert!(reported[0].has_errors());
    assert!(reported[1].diagnostics.is_empty());

    // Waits for the abandoned task to finish on its worker
    executor.stop();

    assert!(!fs.is_file(Path::new("/dist/slow-es5.js")));
    let runtime = fs.read_to_string(Path::new("/dist/runtime.js")).unwrap();
    assert!(runtime.contains(&format!(
      "\"slow.js\":\"{}\"",
      IntegrityAlgorithm::Sha384.digest(slow_code.as_bytes())
    )));
    assert!(!runtime.contains("slow-es5.js"));
  }

  #[tokio::test]
  async fn test_empty_batch() {
    let executor = BundleActionExecutor::new(
      pool(),
      Arc::new(InMemoryFileSystem::default()),
      None,
      options(),
    );

    let results = executor.process_all(ActionBatch::new(vec![]));
    assert_eq!(results.collect().await.unwrap(), vec![]);
    assert_eq!(executor.pool().stats().submitted, 0);
    executor.stop();
  }

  #[tokio::test]
  async fn test_fatal_error_drains_and_skips_runtime() {
    let mut fs = MockFileSystem::new();
    fs.expect_write().returning(|path, _| {
      if path.ends_with("broken-es5.js") {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"))
      } else {
        Ok(())
      }
    });
    fs.expect_is_file().returning(|_| false);

    let executor = BundleActionExecutor::new(pool(), Arc::new(fs), None, options());
    let downlevel = |file_name: &str| ProcessAction {
      requires_downlevel: true,
      ..action(file_name, "var a = 1;")
    };

    let batch = ActionBatch::new(vec![
      BundleAction::Runtime(downlevel("runtime.js")),
      BundleAction::Process(downlevel("broken.js")),
      BundleAction::Process(downlevel("main.js")),
    ]);

    let error = executor.process_all(batch).collect().await.unwrap_err();
    assert_eq!(error.to_string(), "read-only");
    assert_eq!(executor.pool().stats().submitted, 2);
    executor.stop();
  }

  #[tokio::test]
  async fn test_cache_hit_bypasses_pool() {
    let cached = ProcessOutput {
      result: ProcessResult {
        name: String::from("main.js"),
        original: Some(ProcessedArtifact {
          filename: String::from("main.js"),
          size: 3,
          ..ProcessedArtifact::default()
        }),
        ..ProcessResult::default()
      },
      files: vec![crate::process_bundle::OutputFile {
        filename: String::from("main-es5.js"),
        contents: String::from("var a;"),
      }],
      removed: vec![],
    };
    let blob = serde_json::to_vec(&cached).unwrap();

    let mut cache = MockCache::new();
    cache
      .expect_get_blob()
      .returning(move |_| Ok(Some(blob.clone())));
    cache.expect_set_blob().never();

    let fs = Arc::new(InMemoryFileSystem::default());
    let executor =
      BundleActionExecutor::new(pool(), fs.clone(), Some(Arc::new(cache)), options());

    let results = executor
      .process_all(ActionBatch::new(vec![BundleAction::Process(action(
        "main.js", "abc",
      ))]))
      .collect()
      .await
      .unwrap();

    assert_eq!(results, vec![cached.result]);
    assert_eq!(executor.pool().stats().submitted, 0);
    assert_eq!(
      fs.read_to_string(Path::new("/dist/main-es5.js")).unwrap(),
      "var a;"
    );
    executor.stop();
  }

  #[tokio::test]
  async fn test_cache_miss_stores_output() {
    let mut cache = MockCache::new();
    cache.expect_get_blob().returning(|_| Ok(None));
    cache.expect_set_blob().times(1).returning(|_, _| Ok(()));

    let executor = BundleActionExecutor::new(
      pool(),
      Arc::new(InMemoryFileSystem::default()),
      Some(Arc::new(cache)),
      options(),
    );

    let results = executor
      .process_all(ActionBatch::new(vec![BundleAction::Process(action(
        "main.js", "abc",
      ))]))
      .collect()
      .await
      .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(executor.pool().stats().submitted, 1);
    executor.stop();
  }
}
