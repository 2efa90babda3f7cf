use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use tokio::sync::oneshot;

use crate::TaskError;
use crate::WorkerPoolOptions;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum WorkerMessage {
  Run(Job),
  Stop,
}

#[derive(Debug, Default)]
struct Counters {
  submitted: AtomicUsize,
  completed: AtomicUsize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorkerPoolStats {
  pub workers: usize,
  pub submitted: usize,
  pub completed: usize,
}

/// Pool of worker threads reading from a single FIFO queue.
///
/// The pool must be released with [`WorkerPool::shutdown`]. Dropping it without shutting down
/// stops the workers as well, but is logged as a warning.
pub struct WorkerPool {
  tx: Sender<WorkerMessage>,
  workers: Vec<JoinHandle<()>>,
  counters: Arc<Counters>,
  task_timeout: Option<Duration>,
}

impl WorkerPool {
  pub fn new(options: WorkerPoolOptions) -> std::io::Result<Self> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let max_workers = options.max_workers.max(1);

    let mut workers = Vec::with_capacity(max_workers);
    for index in 0..max_workers {
      let worker = std::thread::Builder::new()
        .name(format!("postbuild-worker-{}", index))
        .spawn({
          let rx = rx.clone();
          move || run_worker(rx)
        });

      match worker {
        Ok(worker) => workers.push(worker),
        Err(error) => {
          stop_workers(&tx, &mut workers);
          return Err(error);
        }
      }
    }

    tracing::debug!(workers = max_workers, "Started worker pool");

    Ok(Self {
      tx,
      workers,
      counters: Arc::default(),
      task_timeout: options.task_timeout,
    })
  }

  /// Queue a task. Tasks start in the order they were submitted.
  pub fn submit<R, F>(&self, task: F) -> TaskHandle<R>
  where
    R: Send + 'static,
    F: FnOnce() -> anyhow::Result<R> + Send + 'static,
  {
    let (resolve, result) = oneshot::channel();
    let (mark_started, started) = oneshot::channel();
    let counters = self.counters.clone();

    let job: Job = Box::new(move || {
      let _ = mark_started.send(Instant::now());
      let outcome = match catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(TaskError::Failed(error)),
        Err(payload) => Err(TaskError::from_panic(payload)),
      };
      counters.completed.fetch_add(1, Ordering::Relaxed);
      let _ = resolve.send(outcome);
    });

    self.counters.submitted.fetch_add(1, Ordering::Relaxed);
    if self.tx.send(WorkerMessage::Run(job)).is_err() {
      // The job was dropped with its sender, so the handle resolves as cancelled
      tracing::error!("Worker pool queue is closed");
    }

    TaskHandle {
      started,
      result,
      timeout: self.task_timeout,
    }
  }

  pub fn stats(&self) -> WorkerPoolStats {
    WorkerPoolStats {
      workers: self.workers.len(),
      submitted: self.counters.submitted.load(Ordering::Relaxed),
      completed: self.counters.completed.load(Ordering::Relaxed),
    }
  }

  /// Finish queued tasks and stop every worker thread
  pub fn shutdown(mut self) {
    let stats = self.stats();
    stop_workers(&self.tx, &mut self.workers);
    tracing::debug!(
      submitted = stats.submitted,
      completed = stats.completed,
      "Stopped worker pool"
    );
  }
}

impl Drop for WorkerPool {
  fn drop(&mut self) {
    if !self.workers.is_empty() {
      tracing::warn!("Worker pool dropped without shutdown");
      stop_workers(&self.tx, &mut self.workers);
    }
  }
}

fn stop_workers(tx: &Sender<WorkerMessage>, workers: &mut Vec<JoinHandle<()>>) {
  for _ in workers.iter() {
    let _ = tx.send(WorkerMessage::Stop);
  }

  for worker in workers.drain(..) {
    if worker.join().is_err() {
      tracing::error!("Worker thread exited abnormally");
    }
  }
}

fn run_worker(rx: Receiver<WorkerMessage>) {
  while let Ok(message) = rx.recv() {
    match message {
      WorkerMessage::Run(job) => job(),
      WorkerMessage::Stop => break,
    }
  }
}

/// Result of a submitted task
pub struct TaskHandle<R> {
  started: oneshot::Receiver<Instant>,
  result: oneshot::Receiver<Result<R, TaskError>>,
  timeout: Option<Duration>,
}

impl<R> TaskHandle<R> {
  /// Wait for the task. The deadline runs from the moment a worker picks the task up, so time
  /// spent queued behind other tasks does not count against it. A task that outlives its
  /// deadline keeps running on its worker but is reported as timed out.
  pub async fn join(self) -> Result<R, TaskError> {
    let Some(timeout) = self.timeout else {
      return self.result.await.unwrap_or(Err(TaskError::Cancelled));
    };

    // A job dropped before running never sends its start time
    let Ok(started) = self.started.await else {
      return Err(TaskError::Cancelled);
    };

    let deadline = tokio::time::Instant::from_std(started + timeout);
    match tokio::time::timeout_at(deadline, self.result).await {
      Ok(received) => received.unwrap_or(Err(TaskError::Cancelled)),
      Err(_) => Err(TaskError::TimedOut(timeout)),
    }
  }
}
