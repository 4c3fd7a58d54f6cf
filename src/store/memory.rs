//! Thread-safe in-memory [`CounterStore`] implementation for single-node deployments and tests.

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	store::{CounterEntry, CounterKey, CounterStore, StoreFuture},
};

type CounterMap = Arc<RwLock<HashMap<CounterKey, CounterEntry>>>;

/// Thread-safe counter store that keeps entries in-process.
///
/// Expired entries are ignored on read and replaced on increment;
/// [`MemoryCounterStore::purge_expired`] drops them eagerly.
#[derive(Clone)]
pub struct MemoryCounterStore {
	map: CounterMap,
	clock: Arc<dyn Clock>,
}
impl MemoryCounterStore {
	/// Creates an empty store that reads time from `clock`.
	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		Self { map: Default::default(), clock }
	}

	/// Returns the live entry for `key`, if any.
	pub fn entry(&self, key: &CounterKey) -> Option<CounterEntry> {
		let now = self.clock.now();

		self.map.read().get(key).filter(|entry| entry.is_live_at(now)).copied()
	}

	/// Drops every expired entry and returns how many were removed.
	pub fn purge_expired(&self) -> usize {
		let now = self.clock.now();
		let mut guard = self.map.write();
		let before = guard.len();

		guard.retain(|_, entry| entry.is_live_at(now));

		before - guard.len()
	}

	/// Number of entries currently held, including expired ones not yet purged.
	pub fn len(&self) -> usize {
		self.map.read().len()
	}

	/// Returns `true` when no entries are held.
	pub fn is_empty(&self) -> bool {
		self.map.read().is_empty()
	}

	fn get_now(map: &CounterMap, key: &CounterKey, now: OffsetDateTime) -> u64 {
		map.read().get(key).filter(|entry| entry.is_live_at(now)).map_or(0, |entry| entry.count)
	}

	fn increment_now(
		map: &CounterMap,
		key: &CounterKey,
		now: OffsetDateTime,
		ttl: Duration,
	) -> u64 {
		let mut guard = map.write();

		match guard.get_mut(key) {
			Some(entry) => CounterEntry::bump(Some(entry), now, ttl).count,
			None => {
				let entry = CounterEntry::bump(None, now, ttl);

				guard.insert(key.clone(), entry);

				entry.count
			},
		}
	}

	fn delete_now(map: &CounterMap, key: &CounterKey, now: OffsetDateTime) -> bool {
		map.write().remove(key).is_some_and(|entry| entry.is_live_at(now))
	}

	fn ttl_now(map: &CounterMap, key: &CounterKey, now: OffsetDateTime) -> Option<Duration> {
		map.read()
			.get(key)
			.filter(|entry| entry.is_live_at(now))
			.map(|entry| entry.expires_at - now)
	}
}
impl Default for MemoryCounterStore {
	fn default() -> Self {
		Self::with_clock(Arc::new(SystemClock))
	}
}
impl Debug for MemoryCounterStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryCounterStore").field("entries", &self.map.read().len()).finish()
	}
}
impl CounterStore for MemoryCounterStore {
	fn get<'a>(&'a self, key: &'a CounterKey) -> StoreFuture<'a, u64> {
		let now = self.clock.now();

		Box::pin(async move { Ok(Self::get_now(&self.map, key, now)) })
	}

	fn increment<'a>(&'a self, key: &'a CounterKey, ttl: Duration) -> StoreFuture<'a, u64> {
		let now = self.clock.now();

		Box::pin(async move { Ok(Self::increment_now(&self.map, key, now, ttl)) })
	}

	fn delete<'a>(&'a self, key: &'a CounterKey) -> StoreFuture<'a, bool> {
		let now = self.clock.now();

		Box::pin(async move { Ok(Self::delete_now(&self.map, key, now)) })
	}

	fn ttl<'a>(&'a self, key: &'a CounterKey) -> StoreFuture<'a, Option<Duration>> {
		let now = self.clock.now();

		Box::pin(async move { Ok(Self::ttl_now(&self.map, key, now)) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{clock::ManualClock, id::ClientAddress};

	fn fixture() -> (MemoryCounterStore, ManualClock, CounterKey) {
		let clock = ManualClock::new(time::macros::datetime!(2025-11-10 12:00 UTC));
		let store = MemoryCounterStore::with_clock(Arc::new(clock.clone()));
		let address = ClientAddress::new("10.0.0.5").expect("Address fixture should be valid.");

		(store, clock, CounterKey::new("login_attempts_", &address))
	}

	#[tokio::test]
	async fn expired_entries_read_as_zero_and_purge() {
		let (store, clock, key) = fixture();

		store.increment(&key, Duration::seconds(300)).await.expect("Increment should succeed.");
		clock.advance(Duration::seconds(300));

		assert_eq!(store.get(&key).await.expect("Get should succeed."), 0);
		assert_eq!(store.ttl(&key).await.expect("TTL should succeed."), None);
		assert!(store.entry(&key).is_none());
		assert_eq!(store.len(), 1);
		assert_eq!(store.purge_expired(), 1);
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn delete_reports_live_entries_only() {
		let (store, clock, key) = fixture();

		assert!(!store.delete(&key).await.expect("Delete should succeed."));

		store.increment(&key, Duration::seconds(10)).await.expect("Increment should succeed.");

		assert!(store.delete(&key).await.expect("Delete should succeed."));

		store.increment(&key, Duration::seconds(10)).await.expect("Increment should succeed.");
		clock.advance(Duration::seconds(11));

		assert!(!store.delete(&key).await.expect("Delete should succeed."));
		assert!(store.is_empty());
	}
}
