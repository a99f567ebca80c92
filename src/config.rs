//! Client configuration: API base, app key, proxy routing, and the redirect routes.
//!
//! Configuration is assembled once at the composition root, either explicitly through
//! [`ApiConfig::builder`] or from the dashboard's `NEXT_PUBLIC_*` environment via
//! [`ApiConfig::from_env`]. Request code never reads the environment itself.

// std
use std::{env, time::Duration as StdDuration};
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "NEXT_PUBLIC_API_URL";
/// Environment variable holding the app key.
pub const ENV_APP_KEY: &str = "NEXT_PUBLIC_APP_KEY";
/// Environment variable toggling proxy routing (`true` enables it).
pub const ENV_USE_CORS_BYPASS: &str = "NEXT_PUBLIC_USE_CORS_BYPASS";
/// Environment variable overriding the proxy URL.
pub const ENV_PROXY_URL: &str = "NEXT_PUBLIC_PROXY_URL";
/// Proxy used when routing is enabled without an explicit URL.
pub const DEFAULT_PROXY_URL: &str = "http://localhost:3000/api/proxy";
/// Default login page.
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
/// Default settings page used by the password-security gate.
pub const DEFAULT_SETTINGS_ROUTE: &str = "/settings";

/// Where requests are sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Routing {
	/// Straight to the API base.
	#[default]
	Direct,
	/// Through a same-origin proxy that forwards to the API (avoids CORS).
	Proxy(Url),
}

/// Immutable client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
	/// API base URL.
	pub api_base: Url,
	/// Value of the `x-app-key` header.
	pub app_key: String,
	/// Direct or proxied routing.
	pub routing: Routing,
	/// Optional per-request timeout; none means requests may wait indefinitely.
	pub timeout: Option<StdDuration>,
	/// Login page used for auth redirects.
	pub login_route: String,
	/// Settings page used by the password-security gate.
	pub settings_route: String,
}
impl ApiConfig {
	/// Creates a builder seeded with the API base.
	pub fn builder(api_base: Url) -> ApiConfigBuilder {
		ApiConfigBuilder::new(api_base)
	}

	/// Reads the `NEXT_PUBLIC_*` variables from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Reads configuration through `lookup`, which maps variable names to values.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let read = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
		let api_base = read(ENV_API_URL).ok_or(ConfigError::MissingEnv(ENV_API_URL))?;
		let api_base = parse_url("API base", api_base.trim())?;
		let app_key = read(ENV_APP_KEY).ok_or(ConfigError::MissingEnv(ENV_APP_KEY))?;
		let mut builder = Self::builder(api_base).app_key(app_key);

		if read(ENV_USE_CORS_BYPASS).is_some_and(|flag| flag.trim().eq_ignore_ascii_case("true")) {
			let proxy = read(ENV_PROXY_URL).unwrap_or_else(|| DEFAULT_PROXY_URL.into());

			builder = builder.routing(Routing::Proxy(parse_url("proxy", proxy.trim())?));
		}

		builder.build()
	}

	/// Base every endpoint is resolved against, honoring proxy routing.
	pub fn effective_base(&self) -> &Url {
		match &self.routing {
			Routing::Direct => &self.api_base,
			Routing::Proxy(proxy) => proxy,
		}
	}

	/// Resolves `endpoint` by appending it to the effective base; absolute URLs pass through.
	pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ConfigError> {
		let invalid =
			|source| ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source };

		if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
			return Url::parse(endpoint).map_err(invalid);
		}

		let base = self.effective_base().as_str().trim_end_matches('/');
		let path = endpoint.trim_start_matches('/');

		Url::parse(&format!("{base}/{path}")).map_err(invalid)
	}
}

/// Builder for [`ApiConfig`] values.
#[derive(Debug)]
pub struct ApiConfigBuilder {
	api_base: Url,
	app_key: Option<String>,
	routing: Routing,
	timeout: Option<StdDuration>,
	login_route: String,
	settings_route: String,
}
impl ApiConfigBuilder {
	fn new(api_base: Url) -> Self {
		Self {
			api_base,
			app_key: None,
			routing: Routing::default(),
			timeout: None,
			login_route: DEFAULT_LOGIN_ROUTE.into(),
			settings_route: DEFAULT_SETTINGS_ROUTE.into(),
		}
	}

	/// Sets the app key sent as `x-app-key`.
	pub fn app_key(mut self, key: impl Into<String>) -> Self {
		self.app_key = Some(key.into());

		self
	}

	/// Overrides direct/proxy routing.
	pub fn routing(mut self, routing: Routing) -> Self {
		self.routing = routing;

		self
	}

	/// Applies a timeout to every request.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Overrides the login page.
	pub fn login_route(mut self, route: impl Into<String>) -> Self {
		self.login_route = route.into();

		self
	}

	/// Overrides the settings page.
	pub fn settings_route(mut self, route: impl Into<String>) -> Self {
		self.settings_route = route.into();

		self
	}

	/// Validates and produces the configuration.
	pub fn build(self) -> Result<ApiConfig, ConfigError> {
		validate_scheme("API base", &self.api_base)?;

		if let Routing::Proxy(proxy) = &self.routing {
			validate_scheme("proxy", proxy)?;
		}

		let app_key = self
			.app_key
			.map(|key| key.trim().to_owned())
			.filter(|key| !key.is_empty())
			.ok_or(ConfigError::MissingAppKey)?;

		Ok(ApiConfig {
			api_base: self.api_base,
			app_key,
			routing: self.routing,
			timeout: self.timeout,
			login_route: self.login_route,
			settings_route: self.settings_route,
		})
	}
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { name, source })
}

fn validate_scheme(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ConfigError::UnsupportedScheme { name, url: url.to_string() }),
	}
}
