//! Request bodies, per-call options, and the header/body assembly shared by every attempt.

// crates.io
use reqwest::{
	Request,
	header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE},
	multipart::{Form, Part},
};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Header identifying the calling application.
pub const APP_KEY_HEADER: &str = "x-app-key";
/// Header echoing the refresh token on authenticated calls.
pub const REFRESH_TOKEN_HEADER: &str = "X-Refresh-Token";
/// Tenant header selecting the credit product.
pub const PRODUCT_HEADER: &str = "Sapphire-Credit-Product";

/// Fetch-style cache modes forwarded as `Cache-Control` directives on GET requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
	/// Let intermediaries decide; no directive is sent.
	Default,
	/// Never store the response.
	NoStore,
	/// Skip stored responses and fetch fresh.
	Reload,
	/// Revalidate stored responses before use.
	NoCache,
	/// Accept stale stored responses.
	ForceCache,
	/// Only answer from a cache.
	OnlyIfCached,
}
impl CacheMode {
	/// `Cache-Control` directive for the mode, if it maps to one.
	pub const fn directive(self) -> Option<&'static str> {
		match self {
			Self::Default => None,
			Self::NoStore => Some("no-store"),
			Self::Reload | Self::NoCache => Some("no-cache"),
			Self::ForceCache => Some("max-stale"),
			Self::OnlyIfCached => Some("only-if-cached"),
		}
	}
}

/// Options recognized by [`ApiClient::call`](crate::client::ApiClient::call) and
/// [`ApiClient::cached_call`](crate::client::ApiClient::cached_call).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOptions {
	/// Cache mode forwarded on GET requests.
	pub cache: Option<CacheMode>,
	/// Revalidation window in seconds forwarded on GET requests.
	pub revalidate: Option<u64>,
	/// Overrides the configured app key for this call.
	pub app_key: Option<String>,
	/// Whether `cached_call` may serve and store this response.
	pub use_cache: bool,
	/// TTL for the cached response; the cache default applies when unset.
	pub cache_ttl: Option<Duration>,
}
impl CallOptions {
	/// Sets the forwarded cache mode.
	pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
		self.cache = Some(mode);

		self
	}

	/// Sets the forwarded revalidation window.
	pub fn with_revalidate(mut self, seconds: u64) -> Self {
		self.revalidate = Some(seconds);

		self
	}

	/// Overrides the app key.
	pub fn with_app_key(mut self, key: impl Into<String>) -> Self {
		self.app_key = Some(key.into());

		self
	}

	/// Bypasses the response cache.
	pub fn without_cache(mut self) -> Self {
		self.use_cache = false;

		self
	}

	/// Sets the response cache TTL.
	pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
		self.cache_ttl = Some(ttl);

		self
	}

	fn cache_control(&self) -> Option<String> {
		let mut directives = Vec::new();

		if let Some(directive) = self.cache.and_then(CacheMode::directive) {
			directives.push(directive.to_owned());
		}
		if let Some(seconds) = self.revalidate {
			directives.push(format!("max-age={seconds}"));
		}

		(!directives.is_empty()).then(|| directives.join(", "))
	}
}
impl Default for CallOptions {
	fn default() -> Self {
		Self { cache: None, revalidate: None, app_key: None, use_cache: true, cache_ttl: None }
	}
}

/// Request payload.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
	/// Serialized as JSON with `Content-Type: application/json`.
	Json(Value),
	/// Sent as `multipart/form-data`; the boundary header is left to the transport.
	Multipart(MultipartForm),
}
impl RequestBody {
	/// Serializes any `Serialize` value into a JSON body.
	pub fn json<T>(value: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		serde_json::to_value(value).map(Self::Json).map_err(ConfigError::BodySerialization)
	}
}
impl From<Value> for RequestBody {
	fn from(value: Value) -> Self {
		Self::Json(value)
	}
}
impl From<MultipartForm> for RequestBody {
	fn from(form: MultipartForm) -> Self {
		Self::Multipart(form)
	}
}

/// Replayable multipart payload; rebuilt into a transport form on every attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartForm {
	parts: Vec<FormPart>,
}
impl MultipartForm {
	/// Creates an empty form.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push(FormPart { name: name.into(), content: PartContent::Text(value.into()) });

		self
	}

	/// Appends a file field.
	pub fn file(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		bytes: impl Into<Vec<u8>>,
		mime: Option<&str>,
	) -> Self {
		self.parts.push(FormPart {
			name: name.into(),
			content: PartContent::File {
				file_name: file_name.into(),
				bytes: bytes.into(),
				mime: mime.map(str::to_owned),
			},
		});

		self
	}

	/// Number of fields.
	pub fn len(&self) -> usize {
		self.parts.len()
	}

	/// Returns `true` when the form has no fields.
	pub fn is_empty(&self) -> bool {
		self.parts.is_empty()
	}

	fn to_form(&self) -> Result<Form, ConfigError> {
		let mut form = Form::new();

		for part in &self.parts {
			form = match &part.content {
				PartContent::Text(value) => form.text(part.name.clone(), value.clone()),
				PartContent::File { file_name, bytes, mime } => {
					let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());

					if let Some(mime) = mime {
						file = file.mime_str(mime).map_err(|source| ConfigError::InvalidPartMime {
							name: part.name.clone(),
							source,
						})?;
					}

					form.part(part.name.clone(), file)
				},
			};
		}

		Ok(form)
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FormPart {
	name: String,
	content: PartContent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum PartContent {
	Text(String),
	File { file_name: String, bytes: Vec<u8>, mime: Option<String> },
}

/// Credentials and tenant state read from storage right before an attempt.
#[derive(Clone, Debug, Default)]
pub(crate) struct RequestContext {
	pub(crate) app_key: String,
	pub(crate) access_token: Option<TokenSecret>,
	pub(crate) refresh_token: Option<TokenSecret>,
	pub(crate) product: Option<String>,
}

/// Everything needed to (re)build one logical request.
#[derive(Clone, Debug)]
pub(crate) struct PreparedCall {
	pub(crate) method: Method,
	pub(crate) url: Url,
	body: Option<RequestBody>,
	options: CallOptions,
}
impl PreparedCall {
	pub(crate) fn new(
		method: Method,
		url: Url,
		body: Option<RequestBody>,
		options: CallOptions,
	) -> Self {
		Self { method, url, body, options }
	}

	/// Builds a transport request carrying `ctx`'s headers.
	pub(crate) fn build(&self, http: &ReqwestClient, ctx: &RequestContext) -> Result<Request> {
		let mut builder = http
			.request(self.method.clone(), self.url.clone())
			.header(ACCEPT, "*/*")
			.header(APP_KEY_HEADER, ctx.app_key.as_str());

		if let Some(access) = &ctx.access_token {
			builder = builder.header(AUTHORIZATION, access.bearer());
		}
		if let Some(refresh) = &ctx.refresh_token {
			builder = builder.header(REFRESH_TOKEN_HEADER, refresh.expose());
		}
		if let Some(product) = &ctx.product {
			builder = builder.header(PRODUCT_HEADER, product.as_str());
		}

		if self.method == Method::GET {
			if let Some(cache_control) = self.options.cache_control() {
				builder = builder.header(CACHE_CONTROL, cache_control);
			}
		} else {
			match &self.body {
				Some(RequestBody::Json(value)) => {
					let bytes = serde_json::to_vec(value).map_err(ConfigError::BodySerialization)?;

					builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
				},
				Some(RequestBody::Multipart(form)) => builder = builder.multipart(form.to_form()?),
				None => {},
			}
		}

		Ok(builder.build()?)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn context() -> RequestContext {
		RequestContext {
			app_key: "dashboard".into(),
			access_token: Some(TokenSecret::new("a-1")),
			refresh_token: Some(TokenSecret::new("r-1")),
			product: Some("phones".into()),
		}
	}

	fn url() -> Url {
		Url::parse("https://api.example.com/customers").expect("Fixture URL should parse.")
	}

	#[test]
	fn authenticated_headers_are_attached() {
		let call = PreparedCall::new(Method::GET, url(), None, CallOptions::default());
		let request = call.build(&ReqwestClient::new(), &context()).expect("Request should build.");
		let headers = request.headers();

		assert_eq!(headers[ACCEPT], "*/*");
		assert_eq!(headers[APP_KEY_HEADER], "dashboard");
		assert_eq!(headers[AUTHORIZATION], "Bearer a-1");
		assert_eq!(headers["x-refresh-token"], "r-1");
		assert_eq!(headers["sapphire-credit-product"], "phones");
		assert!(headers.get(CACHE_CONTROL).is_none());
	}

	#[test]
	fn get_requests_drop_bodies_and_forward_cache_directives() {
		let options =
			CallOptions::default().with_cache_mode(CacheMode::NoStore).with_revalidate(30);
		let body = Some(RequestBody::Json(serde_json::json!({ "ignored": true })));
		let call = PreparedCall::new(Method::GET, url(), body, options);
		let request = call
			.build(&ReqwestClient::new(), &RequestContext::default())
			.expect("Request should build.");

		assert!(request.body().is_none());
		assert!(request.headers().get(AUTHORIZATION).is_none());
		assert_eq!(request.headers()[CACHE_CONTROL], "no-store, max-age=30");
	}

	#[test]
	fn json_and_multipart_bodies_set_content_type_differently() {
		let json = PreparedCall::new(
			Method::POST,
			url(),
			Some(RequestBody::Json(serde_json::json!({ "name": "Ada" }))),
			CallOptions::default(),
		)
		.build(&ReqwestClient::new(), &context())
		.expect("JSON request should build.");

		assert_eq!(json.headers()[CONTENT_TYPE], "application/json");
		assert_eq!(
			json.body().and_then(|body| body.as_bytes()),
			Some(br#"{"name":"Ada"}"#.as_slice())
		);

		let form = MultipartForm::new().text("customer_id", "42").file(
			"document",
			"id.png",
			vec![0_u8, 1, 2],
			Some("image/png"),
		);
		let multipart =
			PreparedCall::new(Method::POST, url(), Some(form.into()), CallOptions::default())
				.build(&ReqwestClient::new(), &context())
				.expect("Multipart request should build.");
		let content_type = multipart.headers()[CONTENT_TYPE]
			.to_str()
			.expect("Content type should be ASCII.");

		assert!(content_type.starts_with("multipart/form-data; boundary="));
	}

	#[test]
	fn invalid_part_mime_is_reported() {
		let form = MultipartForm::new().file("doc", "x.bin", vec![1_u8], Some("not a mime"));
		let err = PreparedCall::new(Method::POST, url(), Some(form.into()), CallOptions::default())
			.build(&ReqwestClient::new(), &context())
			.expect_err("Invalid MIME should fail.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidPartMime { .. })));
	}
}
