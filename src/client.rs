//! Request executor shared by every dashboard page.
//!
//! [`ApiClient`] owns the token store, the preferences, the response cache, the refresh
//! coordinator, and the HTTP transport. Cloning is cheap and every clone shares that state, so
//! the composition root builds one client and hands clones to whoever needs one.
//!
//! A call runs in three stages. Pre-flight checks (see [`preflight`]) may refresh tokens or halt
//! the call with [`Outcome::Redirected`]. The request is then assembled from the stored
//! credentials and sent. Finally every response goes through [`interceptor::inspect`], which
//! decides whether to pass it through, give up on the session, or join the shared refresh and
//! replay the request exactly once.

pub mod interceptor;
pub mod preflight;

mod request;
mod session;

pub use request::{
	APP_KEY_HEADER, CacheMode, CallOptions, MultipartForm, PRODUCT_HEADER, REFRESH_TOKEN_HEADER,
	RequestBody,
};

// crates.io
use reqwest::Response;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	cache::{self, TtlCache},
	client::{
		interceptor::Verdict,
		request::{PreparedCall, RequestContext},
	},
	config::ApiConfig,
	error::ConfigError,
	nav::Navigator,
	obs::{self, CallKind, CallOutcome, CallSpan},
	refresh::{RefreshCoordinator, RefreshMetrics},
	store::{ClientStorage, Preferences, TokenStore},
};

/// How a call ended when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
	/// The server answered successfully.
	Completed(T),
	/// The user was sent to `location` and the request was not (or no longer) performed.
	Redirected {
		/// Page the navigator was sent to.
		location: String,
	},
}
impl<T> Outcome<T> {
	/// Returns `true` for [`Outcome::Redirected`].
	pub fn is_redirected(&self) -> bool {
		matches!(self, Self::Redirected { .. })
	}

	/// Returns the completed value, discarding redirects.
	pub fn completed(self) -> Option<T> {
		match self {
			Self::Completed(value) => Some(value),
			Self::Redirected { .. } => None,
		}
	}

	/// Maps the completed value.
	pub fn map<U, F>(self, f: F) -> Outcome<U>
	where
		F: FnOnce(T) -> U,
	{
		match self {
			Self::Completed(value) => Outcome::Completed(f(value)),
			Self::Redirected { location } => Outcome::Redirected { location },
		}
	}
}
impl Outcome<Value> {
	/// Deserializes a completed JSON body into `T`, reporting the failing path on mismatch.
	pub fn decode<T>(self) -> Result<Outcome<T>>
	where
		T: DeserializeOwned,
	{
		match self {
			Self::Completed(value) => serde_path_to_error::deserialize(value)
				.map(Outcome::Completed)
				.map_err(|source| Error::Decode { source }),
			Self::Redirected { location } => Ok(Outcome::Redirected { location }),
		}
	}
}

/// Authenticated REST client for the dashboard API.
#[derive(Clone)]
pub struct ApiClient {
	http: ReqwestClient,
	config: Arc<ApiConfig>,
	tokens: TokenStore,
	preferences: Preferences,
	cache: Arc<TtlCache<Value>>,
	coordinator: RefreshCoordinator,
	navigator: Option<Arc<dyn Navigator>>,
}
impl ApiClient {
	/// Builds a client over `storage`, constructing a reqwest transport from `config`.
	pub fn new(config: ApiConfig, storage: Arc<dyn ClientStorage>) -> Result<Self> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = config.timeout {
			builder = builder.timeout(timeout);
		}

		let http = builder.build().map_err(ConfigError::from)?;

		Ok(Self::with_http_client(http, config, storage))
	}

	/// Builds a client around an existing reqwest transport.
	pub fn with_http_client(
		http: ReqwestClient,
		config: ApiConfig,
		storage: Arc<dyn ClientStorage>,
	) -> Self {
		Self {
			http,
			config: Arc::new(config),
			tokens: TokenStore::new(storage.clone()),
			preferences: Preferences::new(storage),
			cache: Arc::new(TtlCache::new()),
			coordinator: RefreshCoordinator::new(),
			navigator: None,
		}
	}

	/// Attaches a navigator, which turns on the interactive pre-flight checks and redirects.
	pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.navigator = Some(navigator);

		self
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ApiConfig {
		&self.config
	}

	/// Token store shared by every clone.
	pub fn tokens(&self) -> &TokenStore {
		&self.tokens
	}

	/// Preferences shared by every clone.
	pub fn preferences(&self) -> &Preferences {
		&self.preferences
	}

	/// Response cache shared by every clone.
	pub fn cache(&self) -> &Arc<TtlCache<Value>> {
		&self.cache
	}

	/// Refresh coordinator shared by every clone.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Counters for refresh rounds driven by this client.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.coordinator.metrics()
	}

	/// Sends `method` to `endpoint` with the stored credentials attached.
	///
	/// Non-2xx responses become [`Error`]s carrying the server's `message` when it sent one.
	/// A first 401 on a regular endpoint triggers the shared refresh and one replay.
	pub async fn call(
		&self,
		endpoint: &str,
		method: Method,
		body: Option<RequestBody>,
		options: CallOptions,
	) -> Result<Outcome<Value>> {
		let span = CallSpan::new(CallKind::Request, "call");

		obs::record_call_outcome(CallKind::Request, CallOutcome::Attempt);

		let result = span.instrument(self.execute(endpoint, &method, body, options)).await;

		match &result {
			Ok(Outcome::Completed(_)) =>
				obs::record_call_outcome(CallKind::Request, CallOutcome::Success),
			Ok(Outcome::Redirected { .. }) =>
				obs::record_call_outcome(CallKind::Request, CallOutcome::Redirected),
			Err(e) => {
				obs::record_call_outcome(CallKind::Request, CallOutcome::Failure);
				obs::call_failed(&method, endpoint, &e.message());
			},
		}

		result
	}

	/// Issues a GET for `endpoint` + `params`, served from the response cache when possible.
	///
	/// The cache key comes from [`cache::generate_cache_key`], so parameter order does not
	/// matter. `options.use_cache == false` bypasses the cache in both directions.
	pub async fn cached_call<I, K, V>(
		&self,
		endpoint: &str,
		params: I,
		options: CallOptions,
	) -> Result<Outcome<Value>>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Display,
	{
		let params = params
			.into_iter()
			.map(|(key, value)| (key.as_ref().to_owned(), value.to_string()))
			.collect::<Vec<_>>();
		let target = append_query(endpoint, &params);

		if !options.use_cache {
			return self.call(&target, Method::GET, None, options).await;
		}

		let key = cache::generate_cache_key(endpoint, params.iter().map(|(k, v)| (k, v)));
		let ttl = options.cache_ttl;

		cache::cached_api_call(&self.cache, &key, ttl, || {
			self.call(&target, Method::GET, None, options)
		})
		.await
	}

	/// Drops the cached response stored under `key`.
	pub fn invalidate_cache(&self, key: &str) -> bool {
		self.cache.delete(key)
	}

	/// Drops every cached response whose key starts with `prefix`.
	pub fn invalidate_cache_prefix(&self, prefix: &str) -> usize {
		self.cache.delete_prefix(prefix)
	}

	/// Drops every cached response.
	pub fn clear_cache(&self) {
		self.cache.clear();
	}

	/// Starts the periodic sweep of expired cache entries.
	pub fn spawn_cache_sweeper(&self) -> JoinHandle<()> {
		self.cache.spawn_sweeper(cache::SWEEP_INTERVAL)
	}

	async fn execute(
		&self,
		endpoint: &str,
		method: &Method,
		body: Option<RequestBody>,
		options: CallOptions,
	) -> Result<Outcome<Value>> {
		if let Some(location) = self.preflight(endpoint).await? {
			return Ok(Outcome::Redirected { location });
		}

		let url = self.config.endpoint_url(endpoint)?;
		let app_key = options.app_key.clone().unwrap_or_else(|| self.config.app_key.clone());
		let call = PreparedCall::new(method.clone(), url, body, options);
		let mut retried = false;

		loop {
			let request = call.build(&self.http, &self.request_context(&app_key))?;
			let response = self.http.execute(request).await?;
			let status = response.status();

			match interceptor::inspect(status, &call.url, retried) {
				Verdict::PassThrough =>
					return read_response(response).await.map(Outcome::Completed),
				Verdict::Unrecoverable => {
					let body = response.bytes().await.unwrap_or_default();

					self.abandon_session();

					return Err(Error::from_response(status, &body));
				},
				Verdict::RefreshAndRetry => {
					self.refresh_shared("unauthorized").await.outcome?;

					retried = true;
				},
			}
		}
	}

	fn request_context(&self, app_key: &str) -> RequestContext {
		RequestContext {
			app_key: app_key.to_owned(),
			access_token: self.tokens.access_token(),
			refresh_token: self.tokens.refresh_token(),
			product: self.preferences.selected_product(),
		}
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("cached_entries", &self.cache.len())
			.field("refreshing", &self.coordinator.is_refreshing())
			.field("interactive", &self.navigator.is_some())
			.finish()
	}
}

async fn read_response(response: Response) -> Result<Value> {
	let status = response.status();
	let body = response.bytes().await?;

	if !status.is_success() {
		return Err(Error::from_response(status, &body));
	}

	Ok(decode_body(&body))
}

fn decode_body(body: &[u8]) -> Value {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Value::Null;
	}

	serde_json::from_slice(body)
		.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn append_query(endpoint: &str, params: &[(String, String)]) -> String {
	if params.is_empty() {
		return endpoint.to_owned();
	}

	let query = form_urlencoded::Serializer::new(String::new()).extend_pairs(params).finish();
	let separator = if endpoint.contains('?') { '&' } else { '?' };

	format!("{endpoint}{separator}{query}")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn bodies_decode_by_shape() {
		assert_eq!(decode_body(b""), Value::Null);
		assert_eq!(decode_body(b" \n"), Value::Null);
		assert_eq!(decode_body(br#"{"id":7}"#), serde_json::json!({ "id": 7 }));
		assert_eq!(decode_body(b"OK"), Value::String("OK".into()));
	}

	#[test]
	fn query_pairs_are_encoded_and_appended() {
		let params = vec![("search".to_owned(), "Ada Lovelace".to_owned())];

		assert_eq!(append_query("/customers", &params), "/customers?search=Ada+Lovelace");
		assert_eq!(
			append_query("/customers?page=1", &params),
			"/customers?page=1&search=Ada+Lovelace"
		);
		assert_eq!(append_query("/customers", &[]), "/customers");
	}

	#[test]
	fn outcomes_decode_into_typed_values() {
		#[derive(Debug, PartialEq, Deserialize)]
		struct Store {
			id: u32,
		}

		let typed = Outcome::Completed(serde_json::json!({ "id": 3 }))
			.decode::<Store>()
			.expect("Matching body should decode.");

		assert_eq!(typed, Outcome::Completed(Store { id: 3 }));

		let err = Outcome::Completed(serde_json::json!({ "id": "three" }))
			.decode::<Store>()
			.expect_err("Mismatched body should fail.");

		assert!(err.message().contains("`id`"));

		let redirected = Outcome::<Value>::Redirected { location: "/settings".into() };

		assert_eq!(
			redirected.decode::<Store>().expect("Redirects decode trivially."),
			Outcome::Redirected { location: "/settings".into() }
		);
	}
}
