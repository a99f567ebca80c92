//! HTTP access layer for the Sapphire Credit operations dashboard.
//!
//! One reqwest-backed client combines single-flight token refresh, retry-once interception and
//! TTL response caching.
//!
//! Every dashboard page funnels its REST traffic through [`client::ApiClient`]. The client owns
//! the token store, the response cache, and the refresh coordinator, so cloning it shares one
//! set of state across the whole application.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod nav;
pub mod obs;
pub mod refresh;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and client fixtures for tests; enabled via `cfg(test)` or the
	//! `test` crate feature for downstream test suites.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::ApiClient,
		config::ApiConfig,
		nav::HistoryNavigator,
		store::{ClientStorage, MemoryStorage},
	};

	/// Everything an integration test needs to drive and inspect a client.
	pub struct TestClient {
		/// Client wired to the in-memory storage and recording navigator below.
		pub client: ApiClient,
		/// Storage backend shared with the client.
		pub storage: Arc<MemoryStorage>,
		/// Navigator that records redirects instead of performing them.
		pub navigator: Arc<HistoryNavigator>,
	}

	/// Builds an [`ApiConfig`] pointing at `base` with a fixed test app key.
	pub fn test_config(base: &str) -> ApiConfig {
		let base = Url::parse(base).expect("Test API base URL should parse.");

		ApiConfig::builder(base)
			.app_key("test-app-key")
			.build()
			.expect("Test API configuration should be valid.")
	}

	/// Constructs an interactive [`ApiClient`] backed by in-memory storage and a navigator
	/// sitting on `current_path`.
	pub fn build_test_client(base: &str, current_path: &str) -> TestClient {
		let storage = Arc::new(MemoryStorage::default());
		let navigator = Arc::new(HistoryNavigator::new(current_path));
		let backend: Arc<dyn ClientStorage> = storage.clone();
		let client = ApiClient::new(test_config(base), backend)
			.expect("Test API client should build.")
			.with_navigator(navigator.clone());

		TestClient { client, storage, navigator }
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::OnceCell;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, Method, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
