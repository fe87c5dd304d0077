//! File-backed [`ConfigStore`] for deployments that keep provider settings on disk.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::ServiceName,
	config::ProviderConfig,
	store::{ConfigStore, StoreError, StoreFuture},
};

/// Persists provider configurations to a JSON array after each mutation.
#[derive(Clone, Debug)]
pub struct FileConfigStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<ServiceName, ProviderConfig>>>,
}
impl FileConfigStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing records.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<ServiceName, ProviderConfig>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(HashMap::new());
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
		let records: Vec<ProviderConfig> = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| StoreError::Serialization {
				message: format!(
					"Failed to parse {} at {}: {}",
					path.display(),
					e.path(),
					e.inner()
				),
			})?;

		Ok(records.into_iter().map(|record| (record.service.clone(), record)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(
		&self,
		contents: &HashMap<ServiceName, ProviderConfig>,
	) -> Result<(), StoreError> {
		let mut records: Vec<_> = contents.values().collect();

		records.sort_by(|a, b| a.service.cmp(&b.service));

		let serialized =
			serde_json::to_vec_pretty(&records).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize configuration snapshot: {e}"),
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
impl ConfigStore for FileConfigStore {
	fn fetch<'a>(&'a self, service: &'a ServiceName) -> StoreFuture<'a, Option<ProviderConfig>> {
		Box::pin(async move { Ok(self.inner.read().get(service).cloned()) })
	}

	fn save(&self, config: ProviderConfig) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(config.service.clone(), config);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn remove<'a>(
		&'a self,
		service: &'a ServiceName,
	) -> StoreFuture<'a, Option<ProviderConfig>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let removed = guard.remove(service);

			if removed.is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(removed)
		})
	}
}
