//! Small persisted flags: the password-security status and the selected credit product.

// self
use crate::{
	_prelude::*,
	store::{ClientStorage, StoreError, keys},
};

/// Lifetime of a recorded password-security status.
pub const PASSWORD_STATUS_TTL: Duration = Duration::days(1);

/// Password-security status as last reported by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordStatus {
	/// `true` when the account must change its password before continuing.
	pub insecure: bool,
	/// Instant after which the status is ignored.
	pub expires_at: OffsetDateTime,
}

/// Typed access to the non-token client flags.
#[derive(Clone)]
pub struct Preferences {
	storage: Arc<dyn ClientStorage>,
}
impl Preferences {
	/// Wraps a storage backend.
	pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
		Self { storage }
	}

	/// Records the password-security status for [`PASSWORD_STATUS_TTL`].
	pub fn set_password_security(&self, insecure: bool) -> Result<(), StoreError> {
		self.set_password_security_at(insecure, OffsetDateTime::now_utc())
	}

	/// Records the password-security status as of `now`.
	pub fn set_password_security_at(
		&self,
		insecure: bool,
		now: OffsetDateTime,
	) -> Result<(), StoreError> {
		let status = PasswordStatus { insecure, expires_at: now + PASSWORD_STATUS_TTL };
		let encoded = serde_json::to_string(&status)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

		self.storage.set(keys::PASSWORD_STATUS, encoded)
	}

	/// Returns the live status at `now`; expired or unreadable records count as absent.
	pub fn password_status_at(&self, now: OffsetDateTime) -> Option<PasswordStatus> {
		let raw = self.storage.get(keys::PASSWORD_STATUS)?;
		let status = serde_json::from_str::<PasswordStatus>(&raw).ok()?;

		(now < status.expires_at).then_some(status)
	}

	/// Returns `true` when a live status flags the password as insecure.
	pub fn is_password_insecure(&self) -> bool {
		self.password_status_at(OffsetDateTime::now_utc()).is_some_and(|status| status.insecure)
	}

	/// Forgets the password-security status.
	pub fn clear_password_security(&self) -> Result<(), StoreError> {
		self.storage.remove(keys::PASSWORD_STATUS)
	}

	/// Returns the selected credit product, if any.
	pub fn selected_product(&self) -> Option<String> {
		self.storage.get(keys::SELECTED_PRODUCT).filter(|value| !value.trim().is_empty())
	}

	/// Stores or clears the selected credit product.
	pub fn select_product(&self, product: Option<&str>) -> Result<(), StoreError> {
		match product.map(str::trim).filter(|value| !value.is_empty()) {
			Some(value) => self.storage.set(keys::SELECTED_PRODUCT, value.to_owned()),
			None => self.storage.remove(keys::SELECTED_PRODUCT),
		}
	}
}
impl Debug for Preferences {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Preferences")
			.field("password_insecure", &self.is_password_insecure())
			.field("selected_product", &self.selected_product())
			.finish()
	}
}
