//! Time-to-live response cache with lazy expiry and a periodic sweeper.
//!
//! Entries are checked on access: [`TtlCache::get`] drops and hides anything older than its TTL,
//! so the sweeper spawned by [`TtlCache::spawn_sweeper`] is housekeeping only. Every method has an
//! `_at` variant that takes the instant explicitly, which keeps expiry tests deterministic.

pub mod key;
pub mod memo;

pub use key::generate_cache_key;
pub use memo::cached_api_call;

// crates.io
use tokio::task::JoinHandle;
// self
use crate::{_prelude::*, obs};

/// TTL applied when a caller does not pass one.
pub const DEFAULT_TTL: Duration = Duration::minutes(5);
/// TTL commonly used for paginated customer listings.
pub const PAGINATED_LIST_TTL: Duration = Duration::minutes(2);
/// Period between sweeper passes.
pub const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Cached value plus the bookkeeping needed to expire it.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
	/// Cached payload.
	pub data: V,
	/// Instant the payload was stored.
	pub inserted_at: OffsetDateTime,
	/// Lifetime of the payload.
	pub ttl: Duration,
}
impl<V> CacheEntry<V> {
	/// Returns `true` once more than `ttl` has elapsed since insertion.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now - self.inserted_at > self.ttl
	}
}

/// Keyed store whose entries die after their TTL.
#[derive(Debug)]
pub struct TtlCache<V> {
	entries: RwLock<HashMap<String, CacheEntry<V>>>,
	default_ttl: Duration,
}
impl<V> TtlCache<V>
where
	V: Clone,
{
	/// Creates an empty cache using [`DEFAULT_TTL`].
	pub fn new() -> Self {
		Self::with_default_ttl(DEFAULT_TTL)
	}

	/// Creates an empty cache with a custom default TTL.
	pub fn with_default_ttl(default_ttl: Duration) -> Self {
		Self { entries: RwLock::new(HashMap::new()), default_ttl }
	}

	/// TTL used by [`set`](Self::set).
	pub fn default_ttl(&self) -> Duration {
		self.default_ttl
	}

	/// Stores `value` with the default TTL, replacing any previous entry.
	pub fn set(&self, key: impl Into<String>, value: V) {
		self.set_with_ttl(key, value, self.default_ttl);
	}

	/// Stores `value` with an explicit TTL, replacing any previous entry.
	pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
		self.set_at(key, value, ttl, OffsetDateTime::now_utc());
	}

	/// Stores `value` as if inserted at `now`.
	pub fn set_at(&self, key: impl Into<String>, value: V, ttl: Duration, now: OffsetDateTime) {
		self.entries.write().insert(key.into(), CacheEntry { data: value, inserted_at: now, ttl });
	}

	/// Returns the live value for `key`, deleting it if it has expired.
	pub fn get(&self, key: &str) -> Option<V> {
		self.get_at(key, OffsetDateTime::now_utc())
	}

	/// Same as [`get`](Self::get) evaluated at `now`.
	pub fn get_at(&self, key: &str, now: OffsetDateTime) -> Option<V> {
		{
			let guard = self.entries.read();

			match guard.get(key) {
				Some(entry) if !entry.is_expired_at(now) => {
					obs::record_cache_lookup(true);

					return Some(entry.data.clone());
				},
				Some(_) => {},
				None => {
					obs::record_cache_lookup(false);

					return None;
				},
			}
		}

		let mut guard = self.entries.write();

		// Another writer may have refreshed the entry between the two locks.
		let live = guard.get(key).filter(|entry| !entry.is_expired_at(now)).map(|e| e.data.clone());

		if live.is_none() {
			guard.remove(key);
		}

		obs::record_cache_lookup(live.is_some());

		live
	}

	/// Returns `true` when `key` holds a live value.
	pub fn has(&self, key: &str) -> bool {
		self.has_at(key, OffsetDateTime::now_utc())
	}

	/// Same as [`has`](Self::has) evaluated at `now`.
	pub fn has_at(&self, key: &str, now: OffsetDateTime) -> bool {
		self.entries.read().get(key).is_some_and(|entry| !entry.is_expired_at(now))
	}

	/// Deletes `key`, returning whether an entry existed.
	pub fn delete(&self, key: &str) -> bool {
		self.entries.write().remove(key).is_some()
	}

	/// Deletes every entry whose key starts with `prefix`, returning how many were removed.
	pub fn delete_prefix(&self, prefix: &str) -> usize {
		let mut guard = self.entries.write();
		let before = guard.len();

		guard.retain(|key, _| !key.starts_with(prefix));

		before - guard.len()
	}

	/// Removes every entry.
	pub fn clear(&self) {
		self.entries.write().clear();
	}

	/// Number of stored entries, live or not yet swept.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Deletes every expired entry, returning how many were removed.
	pub fn cleanup(&self) -> usize {
		self.cleanup_at(OffsetDateTime::now_utc())
	}

	/// Same as [`cleanup`](Self::cleanup) evaluated at `now`.
	pub fn cleanup_at(&self, now: OffsetDateTime) -> usize {
		let mut guard = self.entries.write();
		let before = guard.len();

		guard.retain(|_, entry| !entry.is_expired_at(now));

		before - guard.len()
	}

	/// Spawns a tokio task that runs [`cleanup`](Self::cleanup) every `period`.
	///
	/// The task holds a weak handle and exits once the cache is dropped; abort the returned handle
	/// to stop it earlier. Must be called from within a tokio runtime.
	pub fn spawn_sweeper(self: &Arc<Self>, period: std::time::Duration) -> JoinHandle<()>
	where
		V: 'static + Send + Sync,
	{
		let cache = Arc::downgrade(self);

		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(period);

			// The first tick completes immediately.
			ticker.tick().await;

			loop {
				ticker.tick().await;

				let Some(cache) = cache.upgrade() else { break };
				let removed = cache.cleanup();

				obs::cache_swept(removed);
			}
		})
	}
}
impl<V> Default for TtlCache<V>
where
	V: Clone,
{
	fn default() -> Self {
		Self::new()
	}
}
