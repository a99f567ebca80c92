//! Access/refresh token persistence and the expiry predicate used for proactive refresh.

// self
use crate::{
	_prelude::*,
	auth::{TokenGrant, TokenSecret},
	store::{ClientStorage, StoreError, keys},
};

/// Lead time, in seconds, at which a token is treated as "expiring soon".
pub const PROACTIVE_REFRESH_LEAD_SECS: i64 = 300;

/// Sole owner of the token pair and its absolute expiry.
#[derive(Clone)]
pub struct TokenStore {
	storage: Arc<dyn ClientStorage>,
}
impl TokenStore {
	/// Wraps a storage backend.
	pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
		Self { storage }
	}

	/// Returns the stored access token, if any.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.read_secret(keys::ACCESS_TOKEN)
	}

	/// Returns the stored refresh token, if any.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.read_secret(keys::REFRESH_TOKEN)
	}

	/// Returns the absolute access-token expiry, if one was recorded.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		let raw = self.storage.get(keys::TOKEN_EXPIRES_AT)?;
		let millis = raw.trim().parse::<i128>().ok()?;

		OffsetDateTime::from_unix_timestamp_nanos(millis.checked_mul(1_000_000)?).ok()
	}

	/// Persists a new pair, computing the absolute expiry from the current clock.
	pub fn save_tokens(
		&self,
		access: impl Into<String>,
		refresh: impl Into<String>,
		expires_in_seconds: i64,
	) -> Result<(), StoreError> {
		self.save_tokens_at(access, refresh, expires_in_seconds, OffsetDateTime::now_utc())
	}

	/// Persists a new pair issued at `now`.
	pub fn save_tokens_at(
		&self,
		access: impl Into<String>,
		refresh: impl Into<String>,
		expires_in_seconds: i64,
		now: OffsetDateTime,
	) -> Result<(), StoreError> {
		let expires_at = now.saturating_add(Duration::seconds(expires_in_seconds));
		let expires_ms = expires_at.unix_timestamp_nanos() / 1_000_000;

		self.storage.set_many(vec![
			(keys::ACCESS_TOKEN, access.into()),
			(keys::REFRESH_TOKEN, refresh.into()),
			(keys::TOKEN_EXPIRES_AT, expires_ms.to_string()),
		])
	}

	/// Persists an issued grant; a grant without a refresh token keeps the current one.
	pub fn save_grant(&self, grant: &TokenGrant) -> Result<(), StoreError> {
		let refresh = grant
			.refresh_token
			.clone()
			.or_else(|| self.refresh_token())
			.map(|secret| secret.expose().to_owned())
			.unwrap_or_default();

		self.save_tokens(grant.access_token.expose(), refresh, grant.expires_in)
	}

	/// Removes the whole pair and its expiry.
	pub fn clear(&self) -> Result<(), StoreError> {
		self.storage.remove_many(&[keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::TOKEN_EXPIRES_AT])
	}

	/// Returns `true` when no token is stored or it expires within `lead_time_seconds`.
	pub fn is_token_expired(&self, lead_time_seconds: i64) -> bool {
		self.is_token_expired_at(lead_time_seconds, OffsetDateTime::now_utc())
	}

	/// Same as [`is_token_expired`](Self::is_token_expired) evaluated at `now`.
	pub fn is_token_expired_at(&self, lead_time_seconds: i64, now: OffsetDateTime) -> bool {
		if self.access_token().is_none() {
			return true;
		}

		match self.expires_at() {
			Some(expires_at) =>
				now.saturating_add(Duration::seconds(lead_time_seconds)) >= expires_at,
			None => true,
		}
	}

	fn read_secret(&self, key: &str) -> Option<TokenSecret> {
		self.storage.get(key).filter(|value| !value.is_empty()).map(TokenSecret::new)
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore")
			.field("access_token", &self.access_token())
			.field("refresh_token", &self.refresh_token())
			.field("expires_at", &self.expires_at())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::store::MemoryStorage;

	fn store() -> TokenStore {
		TokenStore::new(Arc::new(MemoryStorage::default()))
	}

	#[test]
	fn empty_store_is_always_expired() {
		let tokens = store();

		assert!(tokens.access_token().is_none());
		assert!(tokens.is_token_expired(0));
		assert!(tokens.is_token_expired(PROACTIVE_REFRESH_LEAD_SECS));
	}

	#[test]
	fn lead_time_boundary_is_inclusive() {
		let tokens = store();
		let issued = macros::datetime!(2025-03-01 08:00 UTC);

		tokens.save_tokens_at("access", "refresh", 3_600, issued).expect("Saving tokens failed.");

		assert_eq!(tokens.expires_at(), Some(macros::datetime!(2025-03-01 09:00 UTC)));
		assert!(!tokens.is_token_expired_at(300, macros::datetime!(2025-03-01 08:54:59 UTC)));
		assert!(tokens.is_token_expired_at(300, macros::datetime!(2025-03-01 08:55 UTC)));
		assert!(!tokens.is_token_expired_at(0, macros::datetime!(2025-03-01 08:59:59 UTC)));
		assert!(tokens.is_token_expired_at(0, macros::datetime!(2025-03-01 09:00 UTC)));
	}

	#[test]
	fn grant_without_refresh_keeps_current_refresh_token() {
		let tokens = store();

		tokens.save_tokens("a-1", "r-1", 60).expect("Saving tokens failed.");

		let grant = TokenGrant::from_slice(br#"{"access_token":"a-2","expires_in":120}"#)
			.expect("Grant fixture should parse.");

		tokens.save_grant(&grant).expect("Saving grant failed.");

		assert_eq!(tokens.access_token().as_ref().map(TokenSecret::expose), Some("a-2"));
		assert_eq!(tokens.refresh_token().as_ref().map(TokenSecret::expose), Some("r-1"));
		assert!(!tokens.is_token_expired(0));
	}

	#[test]
	fn clear_removes_pair_and_debug_redacts() {
		let tokens = store();

		tokens.save_tokens("a-1", "r-1", 60).expect("Saving tokens failed.");

		let rendered = format!("{tokens:?}");

		assert!(!rendered.contains("a-1"));
		assert!(!rendered.contains("r-1"));

		tokens.clear().expect("Clearing tokens failed.");

		assert!(tokens.access_token().is_none());
		assert!(tokens.refresh_token().is_none());
		assert!(tokens.expires_at().is_none());
	}
}
