//! Thread-safe in-memory store for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialToken, ServiceName},
	config::ProviderConfig,
	store::{
		ConfigStore, CredentialStore, PendingCredential, StoreError, StoreFuture, TakeOutcome,
	},
};

type ConfigMap = Arc<RwLock<HashMap<ServiceName, ProviderConfig>>>;
type CredentialMap = Arc<RwLock<HashMap<CredentialToken, PendingCredential>>>;

/// In-process backend implementing both [`ConfigStore`] and [`CredentialStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	configs: ConfigMap,
	credentials: CredentialMap,
}
impl MemoryStore {
	/// Creates a store pre-populated with configurations.
	pub fn with_configs(configs: impl IntoIterator<Item = ProviderConfig>) -> Self {
		let store = Self::default();

		{
			let mut guard = store.configs.write();

			for config in configs {
				guard.insert(config.service.clone(), config);
			}
		}

		store
	}

	/// Number of pending credentials currently held.
	pub fn pending_len(&self) -> usize {
		self.credentials.read().len()
	}

	fn take_now(map: CredentialMap, token: CredentialToken, secret_digest: String) -> TakeOutcome {
		let mut guard = map.write();

		match guard.get(&token) {
			Some(existing) if existing.secret_digest == secret_digest => guard
				.remove(&token)
				.map(TakeOutcome::Taken)
				.unwrap_or(TakeOutcome::Missing),
			Some(_) => TakeOutcome::SecretMismatch,
			None => TakeOutcome::Missing,
		}
	}

	fn purge_now(map: CredentialMap, cutoff: OffsetDateTime) -> usize {
		let mut guard = map.write();
		let before = guard.len();

		guard.retain(|_, pending| pending.created_at >= cutoff);

		before - guard.len()
	}
}
impl ConfigStore for MemoryStore {
	fn fetch<'a>(&'a self, service: &'a ServiceName) -> StoreFuture<'a, Option<ProviderConfig>> {
		let map = self.configs.clone();

		Box::pin(async move { Ok(map.read().get(service).cloned()) })
	}

	fn save(&self, config: ProviderConfig) -> StoreFuture<'_, ()> {
		let map = self.configs.clone();

		Box::pin(async move {
			map.write().insert(config.service.clone(), config);

			Ok::<_, StoreError>(())
		})
	}

	fn remove<'a>(
		&'a self,
		service: &'a ServiceName,
	) -> StoreFuture<'a, Option<ProviderConfig>> {
		let map = self.configs.clone();

		Box::pin(async move { Ok(map.write().remove(service)) })
	}
}
impl CredentialStore for MemoryStore {
	fn stash(&self, token: CredentialToken, pending: PendingCredential) -> StoreFuture<'_, ()> {
		let map = self.credentials.clone();

		Box::pin(async move {
			map.write().insert(token, pending);

			Ok(())
		})
	}

	fn take<'a>(
		&'a self,
		token: &'a CredentialToken,
		secret_digest: &'a str,
	) -> StoreFuture<'a, TakeOutcome> {
		let map = self.credentials.clone();
		let token = token.to_owned();
		let secret_digest = secret_digest.to_owned();

		Box::pin(async move { Ok(Self::take_now(map, token, secret_digest)) })
	}

	fn purge_created_before(&self, cutoff: OffsetDateTime) -> StoreFuture<'_, usize> {
		let map = self.credentials.clone();

		Box::pin(async move { Ok(Self::purge_now(map, cutoff)) })
	}
}
