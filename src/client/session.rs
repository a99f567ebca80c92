//! Session lifecycle: the shared token refresh, login, logout, and the tenant/password flags.

// crates.io
use reqwest::header::CONTENT_TYPE;
// self
use crate::{
	_prelude::*,
	auth::TokenGrant,
	client::{
		APP_KEY_HEADER, ApiClient, CallOptions, Outcome, RequestBody,
		interceptor::{LOGIN_ENDPOINT, REFRESH_ENDPOINT},
	},
	error::{self, transport_message},
	nav,
	obs::{self, CallKind, CallOutcome, CallSpan},
	refresh::{RefreshError, RefreshOutcome, RefreshTicket},
};

impl ApiClient {
	/// Exchanges credentials for a token pair and stores it.
	///
	/// Returns the raw login response. A 401 here clears any stored tokens and never triggers
	/// a refresh.
	pub async fn login(&self, email: &str, password: &str) -> Result<Outcome<Value>> {
		let span = CallSpan::new(CallKind::Login, "login");

		obs::record_call_outcome(CallKind::Login, CallOutcome::Attempt);

		let result = span
			.instrument(async {
				let body = RequestBody::Json(serde_json::json!({
					"email": email,
					"password": password,
				}));
				let outcome = self
					.call(LOGIN_ENDPOINT, Method::POST, Some(body), CallOptions::default())
					.await?;

				if let Outcome::Completed(value) = &outcome {
					self.tokens.save_grant(&TokenGrant::from_value(value)?)?;
				}

				Ok::<_, Error>(outcome)
			})
			.await;
		let label = match &result {
			Ok(_) => CallOutcome::Success,
			Err(_) => CallOutcome::Failure,
		};

		obs::record_call_outcome(CallKind::Login, label);

		result
	}

	/// Forgets the session: tokens, the password-security status, and every cached response.
	pub fn logout(&self) -> Result<()> {
		self.cache.clear();
		self.tokens.clear()?;
		self.preferences.clear_password_security()?;

		Ok(())
	}

	/// Selects (or clears) the credit product sent with every request.
	///
	/// Cached responses belong to the previous product and are dropped.
	pub fn select_product(&self, product: Option<&str>) -> Result<()> {
		self.preferences.select_product(product)?;
		self.cache.clear();

		Ok(())
	}

	/// Records whether the API reported the account's password as insecure.
	pub fn set_password_security(&self, insecure: bool) -> Result<()> {
		Ok(self.preferences.set_password_security(insecure)?)
	}

	/// Joins the registered refresh round or drives a new one.
	pub(crate) async fn refresh_shared(&self, reason: &'static str) -> RefreshTicket {
		let span = CallSpan::new(CallKind::Refresh, reason);

		span.instrument(self.coordinator.run(|| self.refresh_tokens(reason))).await
	}

	/// Clears the tokens and sends an interactive user to the login page.
	pub(crate) fn abandon_session(&self) {
		if let Err(e) = self.tokens.clear() {
			obs::storage_failed("clear_tokens", &e.to_string());
		}

		let Some(navigator) = self.navigator.as_deref() else { return };

		if let Some(location) =
			nav::login_location(&self.config.login_route, &navigator.current_path())
		{
			obs::redirected("session_expired", &location);
			navigator.redirect(&location);
		}
	}

	async fn refresh_tokens(&self, reason: &'static str) -> RefreshOutcome {
		obs::refresh_started(reason);
		obs::record_call_outcome(CallKind::Refresh, CallOutcome::Attempt);

		let outcome = self.exchange_refresh_token().await;

		match &outcome {
			Ok(_) => {
				obs::refresh_finished(None);
				obs::record_call_outcome(CallKind::Refresh, CallOutcome::Success);
			},
			Err(e) => {
				self.abandon_session();
				obs::refresh_finished(Some(&e.to_string()));
				obs::record_call_outcome(CallKind::Refresh, CallOutcome::Failure);
			},
		}

		outcome
	}

	async fn exchange_refresh_token(&self) -> RefreshOutcome {
		let refresh_token = self.tokens.refresh_token().ok_or(RefreshError::MissingRefreshToken)?;
		let url = self
			.config
			.endpoint_url(REFRESH_ENDPOINT)
			.map_err(|e| RefreshError::Transport { message: e.to_string() })?;
		let body = serde_json::json!({ "refresh_token": refresh_token.expose() }).to_string();
		let response = self
			.http
			.post(url)
			.header(CONTENT_TYPE, "application/json")
			.header(APP_KEY_HEADER, self.config.app_key.as_str())
			.body(body)
			.send()
			.await
			.map_err(|e| RefreshError::Transport { message: transport_message(&e) })?;
		let status = response.status();
		let bytes = response
			.bytes()
			.await
			.map_err(|e| RefreshError::Transport { message: transport_message(&e) })?;

		if !status.is_success() {
			let message =
				error::server_message(&bytes).unwrap_or_else(|| error::status_message(status));

			return Err(RefreshError::Rejected { status: status.as_u16(), message });
		}

		let grant = TokenGrant::from_slice(&bytes)
			.map_err(|e| RefreshError::MalformedResponse { message: e.to_string() })?;

		self.tokens
			.save_grant(&grant)
			.map_err(|e| RefreshError::Storage { message: e.to_string() })?;

		Ok(grant.access_token)
	}
}
