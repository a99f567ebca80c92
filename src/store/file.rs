//! File-backed [`ClientStorage`] so sessions survive process restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{ClientStorage, StoreError},
};

type Snapshot = BTreeMap<String, String>;

/// Persists every mutation to a JSON object on disk, replacing the file atomically.
#[derive(Clone, Debug)]
pub struct FileStorage {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileStorage {
	/// Opens (or creates) storage at `path`, eagerly loading existing values.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let snapshot = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn mutate(&self, apply: impl FnOnce(&mut Snapshot)) -> Result<(), StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();

		apply(&mut next);
		persist(&self.path, &next)?;
		*guard = next;

		Ok(())
	}
}
impl ClientStorage for FileStorage {
	fn get(&self, key: &str) -> Option<String> {
		self.inner.read().get(key).cloned()
	}

	fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
		self.mutate(|map| {
			map.insert(key.to_owned(), value);
		})
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		if !self.inner.read().contains_key(key) {
			return Ok(());
		}

		self.mutate(|map| {
			map.remove(key);
		})
	}

	fn set_many(&self, entries: Vec<(&str, String)>) -> Result<(), StoreError> {
		self.mutate(|map| {
			for (key, value) in entries {
				map.insert(key.to_owned(), value);
			}
		})
	}

	fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
		self.mutate(|map| {
			for key in keys {
				map.remove(*key);
			}
		})
	}
}

fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
	if !path.exists() {
		return Ok(Snapshot::new());
	}

	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(Snapshot::new());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create storage directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}

fn persist(path: &Path, contents: &Snapshot) -> Result<(), StoreError> {
	let serialized = serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize storage snapshot: {e}"),
	})?;
	let mut tmp_path = path.to_path_buf();

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

	fs::rename(&tmp_path, path).map_err(|e| StoreError::Backend {
		message: format!("Failed to replace {}: {e}", path.display()),
	})
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"sapphire_access_file_storage_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn values_survive_reopen() {
		let path = temp_path("reopen");
		let storage = FileStorage::open(&path).expect("Failed to open file storage.");

		storage.set("access_token", "a-1".into()).expect("Failed to persist access token.");
		storage
			.set_many(vec![("refresh_token", "r-1".into()), ("selected_product", "phones".into())])
			.expect("Failed to persist batch.");
		storage.remove("selected_product").expect("Failed to remove product.");
		drop(storage);

		let reopened = FileStorage::open(&path).expect("Failed to reopen file storage.");

		assert_eq!(reopened.get("access_token").as_deref(), Some("a-1"));
		assert_eq!(reopened.get("refresh_token").as_deref(), Some("r-1"));
		assert_eq!(reopened.get("selected_product"), None);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary storage file {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_reported() {
		let path = temp_path("corrupt");

		fs::write(&path, b"[not json").expect("Failed to write corrupt fixture.");

		let err = FileStorage::open(&path).expect_err("Corrupt snapshot should fail to load.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary storage file {}: {e}", path.display())
		});
	}
}
