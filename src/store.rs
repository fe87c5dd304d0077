//! Storage contracts for provider configurations and pending login credentials.
//!
//! Both contracts stand in for collections the host framework owns: the login-service
//! configuration collection and the pending-credential table that correlates a finished login
//! with the browser context that started it.

pub mod file;
pub mod memory;

pub use file::FileConfigStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialToken, ServiceName},
	config::ProviderConfig,
	flows::CredentialOutcome,
};

/// Boxed future returned by store implementations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Read/write access to provider configurations keyed by service name.
pub trait ConfigStore
where
	Self: Send + Sync,
{
	/// Fetches the configuration stored for a service, if any.
	fn fetch<'a>(&'a self, service: &'a ServiceName) -> StoreFuture<'a, Option<ProviderConfig>>;

	/// Inserts or replaces the configuration for `config.service`.
	fn save(&self, config: ProviderConfig) -> StoreFuture<'_, ()>;

	/// Removes the configuration for a service, returning the removed record.
	fn remove<'a>(
		&'a self,
		service: &'a ServiceName,
	) -> StoreFuture<'a, Option<ProviderConfig>>;
}

/// Pending login outcomes keyed by credential token.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Stores (or replaces) the outcome for a credential token.
	fn stash(&self, token: CredentialToken, pending: PendingCredential) -> StoreFuture<'_, ()>;

	/// Atomically removes the entry if its secret digest matches.
	fn take<'a>(
		&'a self,
		token: &'a CredentialToken,
		secret_digest: &'a str,
	) -> StoreFuture<'a, TakeOutcome>;

	/// Drops entries created before `cutoff`, returning how many were removed.
	fn purge_created_before(&self, cutoff: OffsetDateTime) -> StoreFuture<'_, usize>;
}

/// Stashed login outcome waiting for the browser to retrieve it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingCredential {
	/// SHA-256 digest of the credential secret handed to the browser.
	pub secret_digest: String,
	/// Instant the outcome was stashed.
	pub created_at: OffsetDateTime,
	/// Login outcome (success or failure).
	pub outcome: CredentialOutcome,
}

/// Result of [`CredentialStore::take`].
#[derive(Clone, Debug, PartialEq)]
pub enum TakeOutcome {
	/// The secret matched; the entry was removed and is returned.
	Taken(PendingCredential),
	/// An entry exists but the secret did not match; it was left in place.
	SecretMismatch,
	/// No entry exists for the token.
	Missing,
}

/// Error type produced by store implementations.
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
