//! Task execution backends: the lookup contract plus an in-process tokio implementation.

// crates.io
use serde_json::Value;
use tokio::runtime::Handle as RuntimeHandle;
// self
use crate::{
	_prelude::*,
	clock::{self, Clock, SystemClock},
	error::{ConfigError, TransientError},
	id::TaskHandle,
	obs::{self, GuardKind},
	task::{Progress, TaskPhase, TaskRecord, TaskTransitionError},
};

type RecordMap = Arc<RwLock<HashMap<TaskHandle, TaskRecord>>>;

/// Boxed future returned by [`TaskBackend`] operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Non-blocking status source for submitted work.
pub trait TaskBackend
where
	Self: Send + Sync,
{
	/// Returns the record for `handle`, or `None` when the backend does not know it.
	fn lookup<'a>(&'a self, handle: &'a TaskHandle) -> BackendFuture<'a, Option<TaskRecord>>;
}

/// Unit of work runnable by [`MemoryTaskBackend`].
pub trait TaskJob
where
	Self: 'static + Send,
{
	/// Stable label used in logs.
	fn name(&self) -> &'static str;

	/// Runs the job, reporting progress through `reporter`.
	///
	/// `Ok` payloads become the `SUCCESS` result; `Err` detail becomes the `FAILURE` detail.
	fn run(self, reporter: ProgressReporter)
	-> impl Future<Output = Result<Value, String>> + Send + 'static;
}

/// Handle given to a running job to publish progress.
#[derive(Clone)]
pub struct ProgressReporter {
	handle: TaskHandle,
	records: RecordMap,
	clock: Arc<dyn Clock>,
}
impl ProgressReporter {
	/// Handle of the task this reporter belongs to.
	pub fn handle(&self) -> &TaskHandle {
		&self.handle
	}

	/// Publishes `current` out of `total` completed steps.
	pub fn report(&self, current: u64, total: u64) -> Result<(), TaskTransitionError> {
		self.apply(TaskPhase::Progress(Some(Progress::new(current, total))))
	}

	/// Marks the task as running without progress metadata.
	pub fn started(&self) -> Result<(), TaskTransitionError> {
		self.apply(TaskPhase::Progress(None))
	}

	fn apply(&self, phase: TaskPhase) -> Result<(), TaskTransitionError> {
		MemoryTaskBackend::transition(&self.records, &self.handle, phase, self.clock.now())
	}
}
impl Debug for ProgressReporter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProgressReporter").field("handle", &self.handle).finish()
	}
}

/// Tunables for [`MemoryTaskBackend`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
	/// How long a finished task stays queryable, measured from its last transition.
	pub retention_secs: u64,
}
impl BackendConfig {
	/// Default retention: one day.
	pub const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;

	/// Overrides the retention period.
	pub fn with_retention_secs(mut self, retention_secs: u64) -> Self {
		self.retention_secs = retention_secs;

		self
	}

	/// Retention as a [`Duration`].
	pub fn retention(&self) -> Duration {
		Duration::seconds(i64::try_from(self.retention_secs).unwrap_or(i64::MAX))
	}

	/// Rejects a zero retention period.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.retention_secs == 0 {
			return Err(ConfigError::NonPositiveRetention);
		}

		Ok(())
	}
}
impl Default for BackendConfig {
	fn default() -> Self {
		Self { retention_secs: Self::DEFAULT_RETENTION_SECS }
	}
}

/// In-process backend that runs each job on the ambient tokio runtime.
///
/// Finished records expire once the retention period has passed since their last transition;
/// expired handles look exactly like never-submitted ones. Running tasks never expire.
/// [`MemoryTaskBackend::forget`] drops a record early.
#[derive(Clone)]
pub struct MemoryTaskBackend {
	records: RecordMap,
	clock: Arc<dyn Clock>,
	retention: Duration,
}
impl MemoryTaskBackend {
	/// Creates an empty backend that reads time from `clock`.
	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		Self { records: Default::default(), clock, retention: BackendConfig::default().retention() }
	}

	/// Applies the settings from `config`.
	pub fn with_config(self, config: &BackendConfig) -> Self {
		self.with_retention(config.retention())
	}

	/// Overrides how long finished records stay queryable.
	pub fn with_retention(mut self, retention: Duration) -> Self {
		self.retention = retention;

		self
	}

	/// Spawns `job` and returns its handle.
	///
	/// Fails with [`TransientError::Backend`] when called outside a tokio runtime.
	pub fn submit<J>(&self, job: J) -> Result<TaskHandle>
	where
		J: TaskJob,
	{
		let runtime = RuntimeHandle::try_current()
			.map_err(|e| TransientError::Backend { message: e.to_string() })?;
		let handle = TaskHandle::generate();
		let name = job.name();

		self.purge_expired();
		self.records.write().insert(handle.clone(), TaskRecord::pending(self.clock.now()));

		let reporter = ProgressReporter {
			handle: handle.clone(),
			records: self.records.clone(),
			clock: self.clock.clone(),
		};
		let records = self.records.clone();
		let clock = self.clock.clone();
		let finished = handle.clone();
		let work = runtime.spawn(job.run(reporter));

		runtime.spawn(async move {
			let phase = match work.await {
				Ok(Ok(Value::Null)) => TaskPhase::Failure(format!("{name} produced no result.")),
				Ok(Ok(value)) => TaskPhase::Success(value),
				Ok(Err(detail)) => TaskPhase::Failure(detail),
				Err(join) => TaskPhase::Failure(format!("{name} aborted: {join}.")),
			};

			if let Err(err) = Self::transition(&records, &finished, phase, clock.now()) {
				obs::warn_fault(GuardKind::TaskPoller, "finish", &finished, &err.into());
			}
		});
		obs::debug_event(GuardKind::TaskPoller, &handle, "task submitted");

		Ok(handle)
	}

	/// Synchronous view of a record; expired records read as absent.
	pub fn record(&self, handle: &TaskHandle) -> Option<TaskRecord> {
		let now = self.clock.now();

		self.records.read().get(handle).filter(|record| !self.is_expired(record, now)).cloned()
	}

	/// Drops every expired record and returns how many were removed.
	pub fn purge_expired(&self) -> usize {
		let now = self.clock.now();
		let mut guard = self.records.write();
		let before = guard.len();

		guard.retain(|_, record| !self.is_expired(record, now));

		before - guard.len()
	}

	/// Drops the retained record for `handle`, returning whether one existed.
	pub fn forget(&self, handle: &TaskHandle) -> bool {
		self.records.write().remove(handle).is_some()
	}

	/// Number of retained records, including expired ones not yet purged.
	pub fn len(&self) -> usize {
		self.records.read().len()
	}

	/// Returns `true` when no records are retained.
	pub fn is_empty(&self) -> bool {
		self.records.read().is_empty()
	}

	fn is_expired(&self, record: &TaskRecord, now: OffsetDateTime) -> bool {
		record.state().is_terminal()
			&& now >= clock::deadline_after(record.updated_at, self.retention)
	}

	fn transition(
		records: &RecordMap,
		handle: &TaskHandle,
		phase: TaskPhase,
		now: OffsetDateTime,
	) -> Result<(), TaskTransitionError> {
		match records.write().get_mut(handle) {
			Some(record) => record.transition(phase, now),
			// Forgotten while running; nothing left to update.
			None => Ok(()),
		}
	}
}
impl Default for MemoryTaskBackend {
	fn default() -> Self {
		Self::with_clock(Arc::new(SystemClock))
	}
}
impl Debug for MemoryTaskBackend {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryTaskBackend")
			.field("records", &self.records.read().len())
			.field("retention", &self.retention)
			.finish()
	}
}
impl TaskBackend for MemoryTaskBackend {
	fn lookup<'a>(&'a self, handle: &'a TaskHandle) -> BackendFuture<'a, Option<TaskRecord>> {
		Box::pin(async move { Ok(self.record(handle)) })
	}
}
