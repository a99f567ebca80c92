//! Persisted client state: the storage contract, built-in backends, and the typed stores layered
//! on top of it.

pub mod file;
pub mod memory;
pub mod preferences;
pub mod tokens;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use preferences::{PasswordStatus, Preferences};
pub use tokens::TokenStore;

// self
use crate::_prelude::*;

/// Key/value contract for state that must survive reloads (the browser storage analogue).
///
/// Reads are infallible because backends keep a resident copy; writes may fail when the backend
/// persists eagerly.
pub trait ClientStorage
where
	Self: Send + Sync,
{
	/// Returns the stored value for `key`, if any.
	fn get(&self, key: &str) -> Option<String>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

	/// Removes `key`; missing keys are not an error.
	fn remove(&self, key: &str) -> Result<(), StoreError>;

	/// Stores several values as one write.
	fn set_many(&self, entries: Vec<(&str, String)>) -> Result<(), StoreError> {
		for (key, value) in entries {
			self.set(key, value)?;
		}

		Ok(())
	}

	/// Removes several keys as one write.
	fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
		for key in keys {
			self.remove(key)?;
		}

		Ok(())
	}
}

/// Error type produced by [`ClientStorage`] implementations.
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

/// Storage keys shared by the typed stores.
pub mod keys {
	/// Access token string.
	pub const ACCESS_TOKEN: &str = "access_token";
	/// Refresh token string.
	pub const REFRESH_TOKEN: &str = "refresh_token";
	/// Absolute access-token expiry in epoch milliseconds.
	pub const TOKEN_EXPIRES_AT: &str = "token_expires_at";
	/// JSON-encoded [`PasswordStatus`](super::PasswordStatus).
	pub const PASSWORD_STATUS: &str = "password_security_status";
	/// Selected credit product, sent as the tenant header.
	pub const SELECTED_PRODUCT: &str = "selected_product";
}
