//! Out-of-band units of work and the pull-based status contract used to follow them.
//!
//! A task moves `PENDING -> PROGRESS -> SUCCESS | FAILURE`. `SUCCESS` and `FAILURE` are terminal:
//! backends refuse any transition out of them. Handles the backend does not know (never submitted,
//! forgotten, or malformed) surface as `UNKNOWN` rather than `PENDING`.

pub mod backend;
pub mod countdown;
pub mod poller;

pub use backend::*;
pub use countdown::CountdownJob;
pub use poller::*;

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Externally visible task state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
	/// Submitted but not yet reporting.
	Pending,
	/// Running and reporting incremental progress.
	Progress,
	/// Finished with a result payload.
	Success,
	/// Finished with failure detail.
	Failure,
	/// The handle is not known to the backend.
	Unknown,
}
impl TaskState {
	/// Returns a stable label suitable for logs and wire formats.
	pub const fn as_str(self) -> &'static str {
		match self {
			TaskState::Pending => "PENDING",
			TaskState::Progress => "PROGRESS",
			TaskState::Success => "SUCCESS",
			TaskState::Failure => "FAILURE",
			TaskState::Unknown => "UNKNOWN",
		}
	}

	/// `SUCCESS` and `FAILURE` never change once reached.
	pub const fn is_terminal(self) -> bool {
		matches!(self, TaskState::Success | TaskState::Failure)
	}
}
impl Display for TaskState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Incremental progress reported by a running task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
	/// Completed steps.
	pub current: u64,
	/// Total steps.
	pub total: u64,
}
impl Progress {
	/// Creates a progress marker.
	pub const fn new(current: u64, total: u64) -> Self {
		Self { current, total }
	}
}
impl Default for Progress {
	fn default() -> Self {
		Self::new(0, 1)
	}
}

/// Backend-side lifecycle of a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TaskPhase {
	/// Submitted, no report yet.
	Pending,
	/// Running; metadata is `None` until the task reports any.
	Progress(Option<Progress>),
	/// Completed with a non-null payload.
	Success(Value),
	/// Completed with failure detail.
	Failure(String),
}
impl TaskPhase {
	/// State label for the phase.
	pub fn state(&self) -> TaskState {
		match self {
			TaskPhase::Pending => TaskState::Pending,
			TaskPhase::Progress(_) => TaskState::Progress,
			TaskPhase::Success(_) => TaskState::Success,
			TaskPhase::Failure(_) => TaskState::Failure,
		}
	}
}

/// Errors raised when a backend is asked for an illegal transition.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TaskTransitionError {
	/// The task already reached a terminal state.
	#[error("Task already finished with {state}; {attempted} is not allowed.")]
	AlreadyTerminal {
		/// Terminal state the task is in.
		state: TaskState,
		/// State the caller tried to move to.
		attempted: TaskState,
	},
	/// A running task cannot go back to `PENDING`.
	#[error("Task cannot return to PENDING from {state}.")]
	Regression {
		/// Current state of the task.
		state: TaskState,
	},
	/// Successful tasks must carry a non-null result.
	#[error("Task succeeded without a result payload.")]
	NullResult,
}

/// Stored task record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
	/// Current phase.
	pub phase: TaskPhase,
	/// Instant the work was submitted.
	pub submitted_at: OffsetDateTime,
	/// Instant of the last transition.
	pub updated_at: OffsetDateTime,
}
impl TaskRecord {
	/// Creates a freshly submitted record.
	pub fn pending(now: OffsetDateTime) -> Self {
		Self { phase: TaskPhase::Pending, submitted_at: now, updated_at: now }
	}

	/// Current state.
	pub fn state(&self) -> TaskState {
		self.phase.state()
	}

	/// Moves the record to `next`, enforcing the lifecycle rules.
	pub fn transition(
		&mut self,
		next: TaskPhase,
		now: OffsetDateTime,
	) -> Result<(), TaskTransitionError> {
		let state = self.state();

		if state.is_terminal() {
			return Err(TaskTransitionError::AlreadyTerminal { state, attempted: next.state() });
		}
		if matches!(next, TaskPhase::Pending) && state != TaskState::Pending {
			return Err(TaskTransitionError::Regression { state });
		}
		if matches!(next, TaskPhase::Success(Value::Null)) {
			return Err(TaskTransitionError::NullResult);
		}

		self.phase = next;
		self.updated_at = now;

		Ok(())
	}
}

/// Status document returned by [`TaskPoller::get_status`].
///
/// Serializes as `{"state":"PROGRESS","result":null,"current":1,"total":3}`; progress fields are
/// omitted outside `PROGRESS` and `error` only appears on `FAILURE`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
	/// Current state.
	pub state: TaskState,
	/// Result payload; only populated for `SUCCESS`.
	pub result: Option<Value>,
	/// Completed steps; only populated for `PROGRESS`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub current: Option<u64>,
	/// Total steps; only populated for `PROGRESS`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub total: Option<u64>,
	/// Failure detail; only populated for `FAILURE`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl TaskStatus {
	/// Status reported for handles the backend does not know.
	pub fn unknown() -> Self {
		Self::bare(TaskState::Unknown)
	}

	/// Progress pair, when the task is running.
	pub fn progress(&self) -> Option<Progress> {
		self.current.zip(self.total).map(|(current, total)| Progress::new(current, total))
	}

	/// Renders the status as a JSON document.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	fn bare(state: TaskState) -> Self {
		Self { state, result: None, current: None, total: None, error: None }
	}
}
impl From<&TaskPhase> for TaskStatus {
	fn from(phase: &TaskPhase) -> Self {
		match phase {
			TaskPhase::Pending => Self::bare(TaskState::Pending),
			TaskPhase::Progress(meta) => {
				let progress = meta.unwrap_or_default();

				Self {
					current: Some(progress.current),
					total: Some(progress.total),
					..Self::bare(TaskState::Progress)
				}
			},
			// Backends outside this crate may hand back a bare null; it never counts as success.
			TaskPhase::Success(Value::Null) => Self {
				error: Some(TaskTransitionError::NullResult.to_string()),
				..Self::bare(TaskState::Failure)
			},
			TaskPhase::Success(value) =>
				Self { result: Some(value.clone()), ..Self::bare(TaskState::Success) },
			TaskPhase::Failure(detail) =>
				Self { error: Some(detail.clone()), ..Self::bare(TaskState::Failure) },
		}
	}
}
