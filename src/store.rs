//! Shared counter store contract and built-in implementations.
//!
//! Counters are plain integers with a per-key expiry. Implementations must make
//! [`CounterStore::increment`] atomic: creating an absent key with the supplied TTL, or bumping an
//! existing key while leaving its expiry untouched. The limiter never performs a
//! read-modify-write on its own.

pub mod file;
pub mod memory;

pub use file::FileCounterStore;
pub use memory::MemoryCounterStore;

// self
use crate::{_prelude::*, clock, id::ClientAddress};

/// Boxed future returned by [`CounterStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key-value store with per-key expiry backing the attempt counters.
pub trait CounterStore
where
	Self: Send + Sync,
{
	/// Returns the live count for `key`, treating absent or expired keys as zero.
	fn get<'a>(&'a self, key: &'a CounterKey) -> StoreFuture<'a, u64>;

	/// Atomically increments `key` and returns the new count.
	///
	/// Absent keys are created with a count of one that expires after `ttl`; existing keys keep
	/// their original expiry.
	fn increment<'a>(&'a self, key: &'a CounterKey, ttl: Duration) -> StoreFuture<'a, u64>;

	/// Removes `key`, returning whether a live counter was present.
	fn delete<'a>(&'a self, key: &'a CounterKey) -> StoreFuture<'a, bool>;

	/// Returns the remaining lifetime of `key`, if it is live.
	fn ttl<'a>(&'a self, key: &'a CounterKey) -> StoreFuture<'a, Option<Duration>>;
}

/// Error type produced by [`CounterStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Fully qualified counter key: a namespace prefix followed by the client address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterKey(String);
impl CounterKey {
	/// Builds the key for `address` inside `namespace`.
	pub fn new(namespace: &str, address: &ClientAddress) -> Self {
		Self(format!("{namespace}{address}"))
	}

	/// Returns the raw key string.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for CounterKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Live counter value plus its absolute expiry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterEntry {
	/// Current count.
	pub count: u64,
	/// Instant after which the entry is treated as absent.
	pub expires_at: OffsetDateTime,
}
impl CounterEntry {
	/// Returns `true` when the entry is still live at `now`.
	pub fn is_live_at(&self, now: OffsetDateTime) -> bool {
		now < self.expires_at
	}

	/// Applies the increment rule shared by every built-in store.
	pub(crate) fn bump(
		slot: Option<&mut CounterEntry>,
		now: OffsetDateTime,
		ttl: Duration,
	) -> Self {
		match slot {
			Some(entry) if entry.is_live_at(now) => {
				entry.count = entry.count.saturating_add(1);

				*entry
			},
			Some(entry) => {
				*entry = Self { count: 1, expires_at: clock::deadline_after(now, ttl) };

				*entry
			},
			None => Self { count: 1, expires_at: clock::deadline_after(now, ttl) },
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counter_key_prefixes_address() {
		let address = ClientAddress::new("10.0.0.5").expect("Address fixture should be valid.");
		let key = CounterKey::new("login_attempts_", &address);

		assert_eq!(key.as_str(), "login_attempts_10.0.0.5");
		assert_eq!(key.to_string(), "login_attempts_10.0.0.5");
	}

	#[test]
	fn bump_keeps_expiry_of_live_entries() {
		let now = time::macros::datetime!(2025-11-10 12:00 UTC);
		let ttl = Duration::seconds(300);
		let mut entry = CounterEntry::bump(None, now, ttl);

		assert_eq!(entry, CounterEntry { count: 1, expires_at: now + ttl });

		let later = now + Duration::seconds(120);
		let bumped = CounterEntry::bump(Some(&mut entry), later, ttl);

		assert_eq!(bumped.count, 2);
		assert_eq!(bumped.expires_at, now + ttl);
	}

	#[test]
	fn bump_restarts_expired_entries() {
		let now = time::macros::datetime!(2025-11-10 12:00 UTC);
		let ttl = Duration::seconds(300);
		let mut entry = CounterEntry { count: 4, expires_at: now };
		let bumped = CounterEntry::bump(Some(&mut entry), now, ttl);

		assert_eq!(bumped, CounterEntry { count: 1, expires_at: now + ttl });
		assert_eq!(entry, bumped);
	}

	#[test]
	fn store_error_serializes() {
		let payload = serde_json::to_string(&StoreError::Backend { message: "down".into() })
			.expect("StoreError should serialize to JSON.");

		assert_eq!(payload, "{\"Backend\":{\"message\":\"down\"}}");
	}
}
