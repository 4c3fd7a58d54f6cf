//! Simple file-backed [`CounterStore`] so attempt counters survive process restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	store::{CounterEntry, CounterKey, CounterStore, StoreError, StoreFuture},
};

/// Persists live counters to a JSON file after each mutation.
///
/// Expired entries are dropped whenever the snapshot is written, so the file never grows past the
/// set of clients currently inside their window. A mutation becomes visible only after its
/// snapshot is written; a failed write leaves both the file and the live counters untouched.
#[derive(Clone)]
pub struct FileCounterStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<CounterKey, CounterEntry>>>,
	clock: Arc<dyn Clock>,
}
impl FileCounterStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		Self::open_with_clock(path, Arc::new(SystemClock))
	}

	/// Same as [`FileCounterStore::open`] but reads time from `clock`.
	pub fn open_with_clock(
		path: impl Into<PathBuf>,
		clock: Arc<dyn Clock>,
	) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)), clock })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<CounterKey, CounterEntry>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let entries: Vec<(CounterKey, CounterEntry)> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries.into_iter().collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	/// Persists `next` and only then replaces the live map with it.
	fn commit(
		&self,
		live: &mut HashMap<CounterKey, CounterEntry>,
		mut next: HashMap<CounterKey, CounterEntry>,
		now: OffsetDateTime,
	) -> Result<(), StoreError> {
		next.retain(|_, entry| entry.is_live_at(now));

		self.persist(&next)?;

		*live = next;

		Ok(())
	}

	fn persist(&self, contents: &HashMap<CounterKey, CounterEntry>) -> Result<(), StoreError> {
		let snapshot: Vec<_> = contents.iter().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize counter snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl Debug for FileCounterStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FileCounterStore").field("path", &self.path).finish()
	}
}
impl CounterStore for FileCounterStore {
	fn get<'a>(&'a self, key: &'a CounterKey) -> StoreFuture<'a, u64> {
		Box::pin(async move {
			let now = self.clock.now();

			Ok(self
				.inner
				.read()
				.get(key)
				.filter(|entry| entry.is_live_at(now))
				.map_or(0, |entry| entry.count))
		})
	}

	fn increment<'a>(&'a self, key: &'a CounterKey, ttl: Duration) -> StoreFuture<'a, u64> {
		Box::pin(async move {
			let now = self.clock.now();
			let mut guard = self.inner.write();
			let mut next = guard.clone();
			let entry = match next.get_mut(key) {
				Some(existing) => CounterEntry::bump(Some(existing), now, ttl),
				None => {
					let fresh = CounterEntry::bump(None, now, ttl);

					next.insert(key.clone(), fresh);

					fresh
				},
			};

			self.commit(&mut guard, next, now)?;

			Ok(entry.count)
		})
	}

	fn delete<'a>(&'a self, key: &'a CounterKey) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let now = self.clock.now();
			let mut guard = self.inner.write();
			let mut next = guard.clone();
			let removed = next.remove(key).is_some_and(|entry| entry.is_live_at(now));

			self.commit(&mut guard, next, now)?;

			Ok(removed)
		})
	}

	fn ttl<'a>(&'a self, key: &'a CounterKey) -> StoreFuture<'a, Option<Duration>> {
		Box::pin(async move {
			let now = self.clock.now();

			Ok(self
				.inner
				.read()
				.get(key)
				.filter(|entry| entry.is_live_at(now))
				.map(|entry| entry.expires_at - now))
		})
	}
}
