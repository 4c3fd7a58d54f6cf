//! Demonstrates locking out a noisy client address while a neighbor keeps logging in, using a
//! file-backed counter store so attempt counts survive restarts.

// std
use std::{collections::HashMap, sync::Arc};
// crates.io
use color_eyre::Result;
// self
use audit_sentry::{
	config::SentryConfig,
	id::ClientAddress,
	limiter::LoginRateLimiter,
	login::{CredentialVerifier, Credentials, LoginGate, VerifyFuture},
	store::{CounterStore, FileCounterStore},
};

struct Accounts(HashMap<&'static str, &'static str>);
impl CredentialVerifier for Accounts {
	type Principal = String;

	fn verify<'a>(&'a self, credentials: &'a Credentials) -> VerifyFuture<'a, String> {
		Box::pin(async move {
			let accepted = self
				.0
				.get(credentials.username.as_str())
				.is_some_and(|password| *password == credentials.expose_password());

			Ok(accepted.then(|| credentials.username.clone()))
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = SentryConfig::from_json_str(
		r#"{"limiter":{"namespace":"demo_login_","max_attempts":5,"window_secs":300}}"#,
	)?;
	let path = std::env::temp_dir().join("audit-sentry-login-demo.json");
	let store: Arc<dyn CounterStore> = Arc::new(FileCounterStore::open(&path)?);
	let limiter = LoginRateLimiter::try_new(store, config.limiter)?;
	let accounts = Accounts(HashMap::from([("john", "secret123")]));
	let gate = <LoginGate<Accounts>>::new(limiter, accounts);
	let attacker = ClientAddress::new("10.0.0.5")?;
	let neighbor = ClientAddress::new("10.0.0.6")?;

	// Start from a clean slate in case a previous run left counters behind.
	gate.limiter.reset(&attacker).await?;
	gate.limiter.reset(&neighbor).await?;

	for attempt in 1..=6 {
		let outcome = gate.attempt(&attacker, &Credentials::new("john", "guess")).await?;

		println!("10.0.0.5 attempt {attempt}: {}", outcome.message());
	}

	let outcome = gate.attempt(&attacker, &Credentials::new("john", "secret123")).await?;

	println!("10.0.0.5 with the right password: {}", outcome.message());

	let outcome = gate.attempt(&neighbor, &Credentials::new("john", "secret123")).await?;

	println!("10.0.0.6 with the right password: {}", outcome.message());

	if let Some(remaining) = gate.limiter.remaining_window(&attacker).await? {
		println!("10.0.0.5 may retry in {remaining}.");
	}

	println!("Counters persisted to {}.", path.display());

	Ok(())
}
