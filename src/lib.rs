//! Login rate limiting over shared counter stores and pull-based status polling for
//! out-of-band tasks, the two guard rails of an audit-tracking service.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod clock;
pub mod config;
pub mod error;
pub mod ext;
pub mod id;
pub mod limiter;
pub mod login;
pub mod obs;
pub mod store;
pub mod task;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		clock::{Clock, ManualClock},
		id::ClientAddress,
		limiter::{LimiterConfig, LoginRateLimiter},
		store::{CounterStore, MemoryCounterStore},
	};

	/// Fixed instant used as the starting point of every manual test clock.
	pub const TEST_EPOCH: OffsetDateTime = time::macros::datetime!(2025-11-10 12:00 UTC);

	/// Builds a validated client address, panicking on malformed fixtures.
	pub fn test_address(value: &str) -> ClientAddress {
		ClientAddress::new(value).expect("Client address fixture should be valid.")
	}

	/// Constructs a [`LoginRateLimiter`] backed by an in-memory store driven by a manual clock.
	pub fn build_test_limiter(
		config: LimiterConfig,
	) -> (LoginRateLimiter, Arc<MemoryCounterStore>, ManualClock) {
		let clock = ManualClock::new(TEST_EPOCH);
		let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
		let store_backend = Arc::new(MemoryCounterStore::with_clock(shared_clock.clone()));
		let store: Arc<dyn CounterStore> = store_backend.clone();
		let limiter = LoginRateLimiter::new(store, config).with_clock(shared_clock);

		(limiter, store_backend, clock)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

#[cfg(test)] use color_eyre as _;
