// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use sapphire_access::{
	client::ApiClient,
	config::ApiConfig,
	nav::HistoryNavigator,
	store::{ClientStorage, MemoryStorage},
	url::Url,
};

pub const APP_KEY: &str = "it-app-key";

pub const GRANT_BODY: &str = r#"{
	"access_token": "access-new",
	"refresh_token": "refresh-new",
	"token_type": "Bearer",
	"expires_in": 3600
}"#;

pub struct Harness {
	pub client: ApiClient,
	pub storage: Arc<MemoryStorage>,
	pub navigator: Arc<HistoryNavigator>,
}

pub fn config(server: &MockServer) -> ApiConfig {
	let base =
		Url::parse(&format!("http://{}", server.address())).expect("Mock server URL should parse.");

	ApiConfig::builder(base).app_key(APP_KEY).build().expect("Test configuration should be valid.")
}

/// Client wired to a recording navigator sitting on `current_path`.
pub fn interactive(server: &MockServer, current_path: &str) -> Harness {
	let storage = Arc::new(MemoryStorage::default());
	let navigator = Arc::new(HistoryNavigator::new(current_path));
	let backend: Arc<dyn ClientStorage> = storage.clone();
	let client = ApiClient::new(config(server), backend)
		.expect("Test client should build.")
		.with_navigator(navigator.clone());

	Harness { client, storage, navigator }
}

/// Client without a navigator, as used from server-side code.
#[allow(dead_code)]
pub fn headless(server: &MockServer) -> ApiClient {
	ApiClient::new(config(server), Arc::new(MemoryStorage::default()))
		.expect("Test client should build.")
}

/// Stores a pair that stays valid for an hour.
pub fn seed_fresh_tokens(client: &ApiClient) {
	client
		.tokens()
		.save_tokens("access-old", "refresh-old", 3_600)
		.expect("Token fixture should save.");
}

/// Stores a pair that is inside the proactive refresh window.
#[allow(dead_code)]
pub fn seed_expiring_tokens(client: &ApiClient) {
	client
		.tokens()
		.save_tokens("access-old", "refresh-old", 60)
		.expect("Token fixture should save.");
}
