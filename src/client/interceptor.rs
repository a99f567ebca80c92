//! Response classification applied to every attempt of a call.

// self
use crate::_prelude::*;

/// Login endpoint; a 401 here is never refreshed.
pub const LOGIN_ENDPOINT: &str = "/auth/login";
/// Refresh endpoint; a 401 here is never refreshed.
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";

/// What the client does with a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
	/// Hand the response to the caller unchanged.
	PassThrough,
	/// Authentication cannot be recovered: clear tokens, send the user to login, fail.
	Unrecoverable,
	/// Join the shared refresh and replay the request once.
	RefreshAndRetry,
}

/// Classifies a response to a request for `url` that has (or has not) been `retried`.
pub fn inspect(status: StatusCode, url: &Url, retried: bool) -> Verdict {
	if status != StatusCode::UNAUTHORIZED || retried {
		return Verdict::PassThrough;
	}
	if targets_session_endpoint(url.path()) {
		return Verdict::Unrecoverable;
	}

	Verdict::RefreshAndRetry
}

/// Returns `true` for the login and refresh endpoints, however they are prefixed.
pub fn targets_session_endpoint(path: &str) -> bool {
	matches_endpoint(path, &[LOGIN_ENDPOINT, REFRESH_ENDPOINT])
}

/// Returns `true` when `endpoint`'s path is, or ends with, one of `candidates`.
pub(crate) fn matches_endpoint(endpoint: &str, candidates: &[&str]) -> bool {
	let path = endpoint.split(['?', '#']).next().unwrap_or_default().trim_end_matches('/');

	candidates.iter().any(|candidate| path == *candidate || path.ends_with(candidate))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(path: &str) -> Url {
		Url::parse(&format!("https://api.example.com{path}")).expect("Fixture URL should parse.")
	}

	#[test]
	fn only_first_unauthorized_responses_trigger_refresh() {
		assert_eq!(inspect(StatusCode::OK, &url("/customers"), false), Verdict::PassThrough);
		assert_eq!(inspect(StatusCode::FORBIDDEN, &url("/customers"), false), Verdict::PassThrough);
		assert_eq!(
			inspect(StatusCode::UNAUTHORIZED, &url("/customers"), false),
			Verdict::RefreshAndRetry
		);
		assert_eq!(
			inspect(StatusCode::UNAUTHORIZED, &url("/customers"), true),
			Verdict::PassThrough
		);
	}

	#[test]
	fn session_endpoints_never_refresh_themselves() {
		assert_eq!(
			inspect(StatusCode::UNAUTHORIZED, &url("/auth/refresh"), false),
			Verdict::Unrecoverable
		);
		assert_eq!(
			inspect(StatusCode::UNAUTHORIZED, &url("/api/proxy/auth/login/"), false),
			Verdict::Unrecoverable
		);
		assert!(!targets_session_endpoint("/auth/login-history"));
	}
}
