//! Login gate composing the attempt limiter with a caller-supplied credential check.
//!
//! [`LoginGate::attempt`] consults the limiter before any credential is looked at, so a blocked
//! client never reaches the verifier. A successful verification resets the client's counter
//! exactly once; a rejected one records a failure. Limiter faults while recording or resetting are
//! logged and never change the authentication outcome.

// self
use crate::{
	_prelude::*,
	ext::RetryDirective,
	id::ClientAddress,
	limiter::LoginRateLimiter,
	obs::{self, GuardKind, GuardOutcome, GuardSpan},
};

const KIND: GuardKind = GuardKind::LoginGate;

/// Boxed future returned by [`CredentialVerifier::verify`].
pub type VerifyFuture<'a, Principal> =
	Pin<Box<dyn Future<Output = Result<Option<Principal>>> + 'a + Send>>;

/// Authentication backend consulted by [`LoginGate`].
pub trait CredentialVerifier
where
	Self: Send + Sync,
{
	/// Identity returned for accepted credentials.
	type Principal: Send;

	/// Returns the principal for valid credentials, `None` for rejected ones.
	///
	/// Errors mean the verifier itself failed and are propagated without touching the counter.
	fn verify<'a>(&'a self, credentials: &'a Credentials) -> VerifyFuture<'a, Self::Principal>;
}

/// Username/password pair submitted by a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	/// Submitted username.
	pub username: String,
	password: String,
}
impl Credentials {
	/// Wraps a submitted username/password pair.
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: username.into(), password: password.into() }
	}

	/// Returns the raw password; callers must avoid logging it.
	pub fn expose_password(&self) -> &str {
		&self.password
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Result of a login attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome<Principal> {
	/// Credentials were accepted and the attempt counter was cleared.
	Authenticated(Principal),
	/// Credentials were rejected and the failure was counted.
	InvalidCredentials {
		/// Failures recorded in the current window, when the store could be updated.
		failures: Option<u64>,
	},
	/// The client exceeded its attempt budget; credentials were not checked.
	TooManyAttempts {
		/// Hint for when the client may try again.
		retry: Option<RetryDirective>,
	},
}
impl<Principal> LoginOutcome<Principal> {
	/// Message suitable for the end user.
	pub fn message(&self) -> &'static str {
		match self {
			Self::Authenticated(_) => "Welcome back.",
			Self::InvalidCredentials { .. } => "Invalid username or password.",
			Self::TooManyAttempts { .. } => "Too many login attempts. Please try again later.",
		}
	}

	/// Returns `true` for [`LoginOutcome::Authenticated`].
	pub fn is_authenticated(&self) -> bool {
		matches!(self, Self::Authenticated(_))
	}

	/// Returns `true` for [`LoginOutcome::TooManyAttempts`].
	pub fn is_rate_limited(&self) -> bool {
		matches!(self, Self::TooManyAttempts { .. })
	}
}

/// Guards a [`CredentialVerifier`] with a [`LoginRateLimiter`].
pub struct LoginGate<V>
where
	V: ?Sized + CredentialVerifier,
{
	/// Limiter consulted before every attempt.
	pub limiter: LoginRateLimiter,
	/// Verifier invoked for attempts the limiter allows.
	pub verifier: Arc<V>,
}
impl<V> LoginGate<V>
where
	V: ?Sized + CredentialVerifier,
{
	/// Creates a gate from its two collaborators.
	pub fn new(limiter: LoginRateLimiter, verifier: impl Into<Arc<V>>) -> Self {
		Self { limiter, verifier: verifier.into() }
	}

	/// Runs one login attempt for `credentials` submitted from `address`.
	pub async fn attempt(
		&self,
		address: &ClientAddress,
		credentials: &Credentials,
	) -> Result<LoginOutcome<V::Principal>> {
		let span = GuardSpan::new(KIND, "attempt");

		obs::record_guard_outcome(KIND, GuardOutcome::Attempt);

		span.instrument(async move {
			let check = self.limiter.check(address).await;

			if !check.allowed {
				obs::record_guard_outcome(KIND, GuardOutcome::Blocked);

				return Ok(LoginOutcome::TooManyAttempts { retry: check.retry });
			}

			let verified = self.verifier.verify(credentials).await.inspect_err(|_| {
				obs::record_guard_outcome(KIND, GuardOutcome::Failure);
			})?;

			match verified {
				Some(principal) => {
					if let Err(err) = self.limiter.reset(address).await {
						obs::warn_fault(KIND, "reset", address, &err);
					}

					obs::record_guard_outcome(KIND, GuardOutcome::Success);

					Ok(LoginOutcome::Authenticated(principal))
				},
				None => {
					let failures = match self.limiter.record_failure(address).await {
						Ok(count) => Some(count),
						Err(err) => {
							obs::warn_fault(KIND, "record_failure", address, &err);

							None
						},
					};

					obs::record_guard_outcome(KIND, GuardOutcome::Failure);

					Ok(LoginOutcome::InvalidCredentials { failures })
				},
			}
		})
		.await
	}
}
impl<V> Clone for LoginGate<V>
where
	V: ?Sized + CredentialVerifier,
{
	fn clone(&self) -> Self {
		Self { limiter: self.limiter.clone(), verifier: self.verifier.clone() }
	}
}
impl<V> Debug for LoginGate<V>
where
	V: ?Sized + CredentialVerifier,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginGate").field("limiter", &self.limiter).finish()
	}
}
