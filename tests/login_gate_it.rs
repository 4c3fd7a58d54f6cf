// std
use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use time::{Duration, macros};
// self
use audit_sentry::{
	clock::{Clock, ManualClock},
	error::{Error, TransientError},
	id::ClientAddress,
	limiter::{LimiterConfig, LoginRateLimiter},
	login::{CredentialVerifier, Credentials, LoginGate, LoginOutcome, VerifyFuture},
	store::{CounterKey, CounterStore, MemoryCounterStore, StoreError, StoreFuture},
};

/// Verifier over a fixed username/password table.
struct UserTable {
	users: HashMap<String, String>,
	calls: AtomicUsize,
}
impl UserTable {
	fn with_user(username: &str, password: &str) -> Self {
		Self {
			users: HashMap::from([(username.to_owned(), password.to_owned())]),
			calls: AtomicUsize::new(0),
		}
	}
}
impl CredentialVerifier for UserTable {
	type Principal = String;

	fn verify<'a>(&'a self, credentials: &'a Credentials) -> VerifyFuture<'a, String> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			let known = self.users.get(&credentials.username);

			Ok(known
				.filter(|password| password.as_str() == credentials.expose_password())
				.map(|_| credentials.username.clone()))
		})
	}
}

/// Verifier whose backing directory is down.
struct UnreachableDirectory;
impl CredentialVerifier for UnreachableDirectory {
	type Principal = ();

	fn verify<'a>(&'a self, _: &'a Credentials) -> VerifyFuture<'a, ()> {
		Box::pin(async move {
			Err(Error::from(TransientError::Backend { message: "directory offline".into() }))
		})
	}
}

/// Counter store that rejects every call.
struct BrokenStore;
impl CounterStore for BrokenStore {
	fn get<'a>(&'a self, _: &'a CounterKey) -> StoreFuture<'a, u64> {
		Box::pin(async move { Err(StoreError::Backend { message: "down".into() }) })
	}

	fn increment<'a>(&'a self, _: &'a CounterKey, _: Duration) -> StoreFuture<'a, u64> {
		Box::pin(async move { Err(StoreError::Backend { message: "down".into() }) })
	}

	fn delete<'a>(&'a self, _: &'a CounterKey) -> StoreFuture<'a, bool> {
		Box::pin(async move { Err(StoreError::Backend { message: "down".into() }) })
	}

	fn ttl<'a>(&'a self, _: &'a CounterKey) -> StoreFuture<'a, Option<Duration>> {
		Box::pin(async move { Err(StoreError::Backend { message: "down".into() }) })
	}
}

fn address(value: &str) -> ClientAddress {
	ClientAddress::new(value).expect("Client address fixture should be valid.")
}

fn build_gate() -> (LoginGate<UserTable>, Arc<UserTable>, ManualClock) {
	let clock = ManualClock::new(macros::datetime!(2025-11-10 12:00 UTC));
	let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
	let store = Arc::new(MemoryCounterStore::with_clock(shared_clock.clone()));
	let limiter = LoginRateLimiter::new(store, LimiterConfig::default()).with_clock(shared_clock);
	let verifier = Arc::new(UserTable::with_user("john", "secret123"));

	(LoginGate::new(limiter, verifier.clone()), verifier, clock)
}

#[tokio::test]
async fn five_failures_lock_out_even_correct_credentials() {
	let (gate, verifier, _clock) = build_gate();
	let attacker = address("10.0.0.5");
	let wrong = Credentials::new("john", "wrong");
	let right = Credentials::new("john", "secret123");

	for expected in 1..=5 {
		let outcome = gate.attempt(&attacker, &wrong).await.expect("Attempt should not error.");

		assert_eq!(outcome, LoginOutcome::InvalidCredentials { failures: Some(expected) });
		assert_eq!(outcome.message(), "Invalid username or password.");
	}

	let locked = gate.attempt(&attacker, &right).await.expect("Locked attempt should not error.");

	assert!(locked.is_rate_limited());
	assert_eq!(locked.message(), "Too many login attempts. Please try again later.");
	assert_eq!(verifier.calls.load(Ordering::SeqCst), 5);

	let bystander = gate
		.attempt(&address("10.0.0.6"), &right)
		.await
		.expect("Attempt from another address should not error.");

	assert_eq!(bystander, LoginOutcome::Authenticated("john".to_owned()));
}

#[tokio::test]
async fn lockout_lifts_when_the_window_expires() {
	let (gate, _verifier, clock) = build_gate();
	let client = address("10.0.0.5");

	for _ in 0..5 {
		gate.attempt(&client, &Credentials::new("john", "nope"))
			.await
			.expect("Failed attempt should not error.");
	}

	let locked = gate
		.attempt(&client, &Credentials::new("john", "secret123"))
		.await
		.expect("Locked attempt should not error.");

	match locked {
		LoginOutcome::TooManyAttempts { retry: Some(retry) } =>
			assert_eq!(retry.recommended_backoff, Duration::seconds(300)),
		other => panic!("Expected a lockout with a retry hint, got {other:?}."),
	}

	clock.advance(Duration::seconds(300));

	let outcome = gate
		.attempt(&client, &Credentials::new("john", "secret123"))
		.await
		.expect("Attempt after the window should not error.");

	assert!(outcome.is_authenticated());
}

#[tokio::test]
async fn verifier_errors_propagate_without_counting() {
	let limiter = LoginRateLimiter::new(
		Arc::new(MemoryCounterStore::default()),
		LimiterConfig::default().with_max_attempts(1),
	);
	let gate = <LoginGate<UnreachableDirectory>>::new(limiter.clone(), UnreachableDirectory);
	let client = address("10.0.0.5");
	let err = gate
		.attempt(&client, &Credentials::new("john", "secret123"))
		.await
		.expect_err("Directory failure should surface.");

	assert!(matches!(err, Error::Transient(TransientError::Backend { .. })));
	assert!(limiter.check(&client).await.allowed);
}

#[tokio::test]
async fn store_outage_does_not_change_authentication_outcomes() {
	let limiter = LoginRateLimiter::new(Arc::new(BrokenStore), LimiterConfig::default());
	let gate = <LoginGate<UserTable>>::new(limiter, UserTable::with_user("john", "secret123"));
	let client = address("10.0.0.5");
	let rejected = gate
		.attempt(&client, &Credentials::new("john", "wrong"))
		.await
		.expect("Rejected attempt should not error during an outage.");

	assert_eq!(rejected, LoginOutcome::InvalidCredentials { failures: None });

	let accepted = gate
		.attempt(&client, &Credentials::new("john", "secret123"))
		.await
		.expect("Accepted attempt should not error during an outage.");

	assert!(accepted.is_authenticated());
}
