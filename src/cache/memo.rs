//! Memoization of idempotent calls on top of [`TtlCache`].

// self
use crate::{_prelude::*, cache::TtlCache, client::Outcome, obs};

/// Returns the cached value for `key`, or runs `producer` and caches what it completes with.
///
/// `ttl` falls back to the cache's default. Redirected outcomes and errors are returned as-is
/// and never stored.
pub async fn cached_api_call<V, F, Fut>(
	cache: &TtlCache<V>,
	key: &str,
	ttl: Option<Duration>,
	producer: F,
) -> Result<Outcome<V>>
where
	V: Clone,
	F: FnOnce() -> Fut,
	Fut: Future<Output = Result<Outcome<V>>>,
{
	if let Some(value) = cache.get(key) {
		obs::cache_hit(key);

		return Ok(Outcome::Completed(value));
	}

	let outcome = producer().await?;

	if let Outcome::Completed(value) = &outcome {
		cache.set_with_ttl(key, value.clone(), ttl.unwrap_or_else(|| cache.default_ttl()));
	}

	Ok(outcome)
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[tokio::test]
	async fn hits_skip_the_producer() {
		let cache = TtlCache::new();
		let calls = AtomicUsize::new(0);

		for _ in 0..3 {
			let outcome = cached_api_call(&cache, "/stores", None, || async {
				calls.fetch_add(1, Ordering::SeqCst);

				Ok(Outcome::Completed(serde_json::json!(["store-a"])))
			})
			.await
			.expect("Producer should succeed.");

			assert_eq!(outcome, Outcome::Completed(serde_json::json!(["store-a"])));
		}

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn redirects_and_errors_are_not_cached() {
		let cache = TtlCache::<Value>::new();
		let outcome = cached_api_call(&cache, "/loans", Some(Duration::minutes(2)), || async {
			Ok(Outcome::Redirected { location: "/settings".into() })
		})
		.await
		.expect("Redirect outcome should pass through.");

		assert!(outcome.is_redirected());
		assert!(cache.is_empty());

		let err = cached_api_call(&cache, "/loans", None, || async {
			Err(Error::Transport { message: "connection reset".into() })
		})
		.await
		.expect_err("Producer errors should propagate.");

		assert_eq!(err.message(), "connection reset");
		assert!(cache.is_empty());
	}
}
