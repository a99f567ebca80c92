//! Checks that run before a request is built, in interactive contexts only.

// self
use crate::{
	_prelude::*,
	client::{ApiClient, interceptor, interceptor::matches_endpoint},
	nav::{self, Navigator},
	obs,
	store::tokens::PROACTIVE_REFRESH_LEAD_SECS,
};

/// Endpoints that never trigger a proactive refresh.
pub const AUTH_ENDPOINTS: &[&str] = &[
	interceptor::LOGIN_ENDPOINT,
	interceptor::REFRESH_ENDPOINT,
	"/auth/register",
	"/auth/set-password",
	"/auth/verify-invitation",
];
/// Endpoints that stay reachable while the password is flagged insecure.
pub const PASSWORD_GATE_EXEMPT_ENDPOINTS: &[&str] =
	&[interceptor::LOGIN_ENDPOINT, "/auth/profile", "/auth/change-password"];
/// Pages on which the password-security gate is not enforced.
pub const PASSWORD_GATE_EXEMPT_ROUTES: &[&str] =
	&["/login", "/logout", "/settings", "/forgot-password", "/verify-code", "/invite"];

/// Returns `true` for endpoints that must not wait on a proactive refresh.
pub fn is_auth_endpoint(endpoint: &str) -> bool {
	matches_endpoint(endpoint, AUTH_ENDPOINTS)
}

impl ApiClient {
	/// Runs the proactive refresh and the password gate; `Some(location)` halts the call.
	pub(crate) async fn preflight(&self, endpoint: &str) -> Result<Option<String>> {
		let Some(navigator) = self.navigator.as_deref() else {
			return Ok(None);
		};

		let expiring = self.tokens.is_token_expired(PROACTIVE_REFRESH_LEAD_SECS);

		if expiring && !is_auth_endpoint(endpoint) {
			let origin = navigator.current_path();
			let ticket = self.refresh_shared("proactive").await;

			// Joined rounds proceed whatever their outcome; a failed round is retried reactively.
			if let (true, Err(err)) = (ticket.is_leader(), ticket.outcome) {
				return match nav::login_location(&self.config.login_route, &origin) {
					Some(location) => Ok(Some(location)),
					None => Err(err.into()),
				};
			}
		}

		Ok(self.password_gate(endpoint, navigator))
	}

	fn password_gate(&self, endpoint: &str, navigator: &dyn Navigator) -> Option<String> {
		if matches_endpoint(endpoint, PASSWORD_GATE_EXEMPT_ENDPOINTS) {
			return None;
		}

		let current = navigator.current_path();
		let exempt = PASSWORD_GATE_EXEMPT_ROUTES
			.iter()
			.copied()
			.chain([self.config.login_route.as_str(), self.config.settings_route.as_str()])
			.any(|route| nav::is_on_route(&current, route));

		if exempt || !self.preferences.is_password_insecure() {
			return None;
		}

		let location = self.config.settings_route.clone();

		obs::redirected("password_insecure", &location);
		navigator.redirect(&location);

		Some(location)
	}
}
