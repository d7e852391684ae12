use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;

use crate::CharmapError;
use crate::CharmapResult;
use crate::FileProcessor;
use crate::PlaceholderScanner;
use crate::RunConfig;
use crate::RunError;
use crate::TokenReplacer;
use crate::Walk;

/// Number of queue slots per worker.
const QUEUE_SLOTS_PER_WORKER: usize = 2;

/// Shared flag used to stop a run early.
///
/// Clones observe the same flag. The walker checks it before queueing each
/// path and workers check it before touching each file.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_canceled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
	/// Files handed to a worker.
	pub processed: u64,
	/// Files rewritten, or that would be rewritten in a dry run.
	pub changed: u64,
	/// Files read but left alone because nothing was substituted.
	pub unchanged: u64,
	/// Files that failed.
	pub failed: u64,
	/// Paths of the changed files, sorted.
	pub changed_paths: Vec<PathBuf>,
	pub duration: Duration,
}

#[derive(Debug, Default)]
struct Counters {
	processed: AtomicU64,
	changed: AtomicU64,
	unchanged: AtomicU64,
	failed: AtomicU64,
}

/// Everything a run produced: per-file failures, the walk failure, and
/// whether the run was cut short.
#[derive(Debug)]
pub struct RunReport {
	pub root: PathBuf,
	/// Per-file failures, sorted by message so runs compare equal
	/// regardless of worker interleaving.
	pub failures: Vec<CharmapError>,
	pub walk_error: Option<CharmapError>,
	pub canceled: bool,
	pub stats: RunStats,
}

impl RunReport {
	/// True when every file succeeded, the walk completed and the run was
	/// not canceled.
	pub fn is_ok(&self) -> bool {
		self.failures.is_empty() && self.walk_error.is_none() && !self.canceled
	}

	pub fn error_count(&self) -> usize {
		self.failures.len() + usize::from(self.walk_error.is_some())
	}

	/// Keys of every unresolved placeholder that failed a file.
	pub fn unresolved_keys(&self) -> Vec<&str> {
		let mut keys: Vec<_> = self
			.failures
			.iter()
			.filter_map(CharmapError::unresolved_key)
			.collect();
		keys.sort_unstable();
		keys.dedup();
		keys
	}

	/// Collapse the report into the stats, or one composite error holding
	/// every failure.
	pub fn into_result(self) -> Result<RunStats, RunError> {
		if self.is_ok() {
			return Ok(self.stats);
		}

		let mut errors = self.failures;
		errors.extend(self.walk_error);

		Err(RunError {
			root: self.root,
			canceled: self.canceled,
			errors,
		})
	}
}

/// Walks the target directory on one thread and substitutes placeholders
/// on a fixed pool of worker threads fed through a bounded queue.
pub struct Scheduler {
	config: RunConfig,
	replacer: Box<dyn TokenReplacer>,
}

impl Scheduler {
	/// Build a scheduler using the [`PlaceholderScanner`] for the configured
	/// delimiters and values.
	pub fn new(config: RunConfig) -> Self {
		let replacer = PlaceholderScanner::new(config.delimiters.clone(), config.values.clone());
		Self::with_replacer(config, replacer)
	}

	pub fn with_replacer(config: RunConfig, replacer: impl TokenReplacer + 'static) -> Self {
		Self {
			config,
			replacer: Box::new(replacer),
		}
	}

	pub fn config(&self) -> &RunConfig {
		&self.config
	}

	/// Run to completion and report every failure. A failing file never
	/// stops the others.
	pub fn run(&self) -> RunReport {
		self.run_paths(Walk::new(&self.config.target_dir, &self.config.filter))
	}

	/// Drain `paths` through the worker pool. The first `Err` ends the feed,
	/// while every path queued before it is still processed.
	pub(crate) fn run_paths<P>(&self, paths: P) -> RunReport
	where
		P: Iterator<Item = CharmapResult<PathBuf>> + Send,
	{
		let started = Instant::now();
		let config = &self.config;
		let workers = config.workers.get();
		let (sender, receiver) = crossbeam_channel::bounded(workers * QUEUE_SLOTS_PER_WORKER);
		let failures = Mutex::new(Vec::new());
		let changed_paths = Mutex::new(Vec::new());
		let counters = Counters::default();
		let processor = FileProcessor::new(self.replacer.as_ref())
			.write_mode(config.write_mode)
			.dry_run(config.dry_run);

		tracing::info!(
			dir = %config.target_dir.display(),
			workers,
			dry_run = config.dry_run,
			"starting run"
		);

		let walk_error = thread::scope(|scope| {
			let mut handles = Vec::with_capacity(workers);
			for id in 0..workers {
				let worker = Worker {
					receiver: receiver.clone(),
					processor,
					cancel: &config.cancel,
					counters: &counters,
					failures: &failures,
					changed_paths: &changed_paths,
				};
				match thread::Builder::new()
					.name(format!("charmap-worker-{id}"))
					.spawn_scoped(scope, move || worker.run())
				{
					Ok(handle) => handles.push(handle),
					Err(e) => record(&failures, CharmapError::Io(e)),
				}
			}
			// Only workers hold receivers from here on, so the walker stops
			// instead of blocking if every worker is gone.
			drop(receiver);

			let root = config.target_dir.as_path();
			let cancel = &config.cancel;
			let walk_error = match thread::Builder::new()
				.name("charmap-walker".to_string())
				.spawn_scoped(scope, move || feed_queue(root, paths, &sender, cancel))
			{
				Ok(handle) => {
					handle.join().unwrap_or_else(|_| {
						Some(CharmapError::Walk {
							path: root.to_path_buf(),
							source: std::io::Error::other("walker thread panicked"),
						})
					})
				}
				Err(e) => {
					Some(CharmapError::Walk {
						path: root.to_path_buf(),
						source: e,
					})
				}
			};

			for handle in handles {
				if handle.join().is_err() {
					record(
						&failures,
						CharmapError::Io(std::io::Error::other("worker thread panicked")),
					);
				}
			}

			walk_error
		});

		let mut failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
		failures.sort_by_cached_key(ToString::to_string);
		let mut changed_paths = changed_paths
			.into_inner()
			.unwrap_or_else(PoisonError::into_inner);
		changed_paths.sort();

		let stats = RunStats {
			processed: counters.processed.into_inner(),
			changed: counters.changed.into_inner(),
			unchanged: counters.unchanged.into_inner(),
			failed: counters.failed.into_inner(),
			changed_paths,
			duration: started.elapsed(),
		};
		let canceled = config.cancel.is_canceled();

		tracing::info!(
			processed = stats.processed,
			changed = stats.changed,
			failed = stats.failed,
			walk_failed = walk_error.is_some(),
			canceled,
			duration_ms = stats.duration.as_millis() as u64,
			"run finished"
		);

		RunReport {
			root: config.target_dir.clone(),
			failures,
			walk_error,
			canceled,
			stats,
		}
	}
}

/// One consumer of the path queue.
struct Worker<'s, 'r> {
	receiver: Receiver<PathBuf>,
	processor: FileProcessor<'r>,
	cancel: &'s CancellationToken,
	counters: &'s Counters,
	failures: &'s Mutex<Vec<CharmapError>>,
	changed_paths: &'s Mutex<Vec<PathBuf>>,
}

impl Worker<'_, '_> {
	fn run(self) {
		for path in &self.receiver {
			if self.cancel.is_canceled() {
				break;
			}

			self.counters.processed.fetch_add(1, Ordering::Relaxed);
			match self.processor.process(&path) {
				Ok(outcome) if outcome.touched => {
					self.counters.changed.fetch_add(1, Ordering::Relaxed);
					self.changed_paths
						.lock()
						.unwrap_or_else(PoisonError::into_inner)
						.push(outcome.path);
				}
				Ok(_) => {
					self.counters.unchanged.fetch_add(1, Ordering::Relaxed);
				}
				Err(e) => {
					self.counters.failed.fetch_add(1, Ordering::Relaxed);
					tracing::error!(path = %path.display(), error = ?e, "error processing file");
					record(self.failures, e);
				}
			}
		}
	}
}

/// Producer side: queue every accepted path. Returns the walk failure, if
/// any. Dropping the sender on return closes the queue.
fn feed_queue(
	root: &Path,
	paths: impl Iterator<Item = CharmapResult<PathBuf>>,
	sender: &Sender<PathBuf>,
	cancel: &CancellationToken,
) -> Option<CharmapError> {
	for item in paths {
		if cancel.is_canceled() {
			tracing::info!(dir = %root.display(), "walk canceled");
			return None;
		}

		match item {
			Ok(path) => {
				if sender.send(path).is_err() {
					// Every worker has exited.
					return None;
				}
			}
			Err(e) => {
				tracing::error!(dir = %root.display(), error = ?e, "failed to walk directory");
				return Some(e);
			}
		}
	}

	None
}

fn record(failures: &Mutex<Vec<CharmapError>>, error: CharmapError) {
	failures
		.lock()
		.unwrap_or_else(PoisonError::into_inner)
		.push(error);
}
