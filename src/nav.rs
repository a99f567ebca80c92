//! Navigation seam used for login and settings redirects.
//!
//! A client with a [`Navigator`] attached runs in an interactive context: pre-flight checks are
//! active and auth failures move the user to the login page. Without one (server-side use) the
//! pre-flight checks are skipped and failures only surface as errors.

// crates.io
use url::form_urlencoded;
// self
use crate::_prelude::*;

/// Query parameter carrying the page to return to after logging in.
pub const CALLBACK_PARAM: &str = "callbackUrl";

/// Page-level navigation performed on behalf of the access layer.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Path (and query) of the page currently shown.
	fn current_path(&self) -> String;

	/// Moves the user to `location`.
	fn redirect(&self, location: &str);
}

/// In-memory [`Navigator`] that records every redirect.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
	current: RwLock<String>,
	redirects: Mutex<Vec<String>>,
}
impl HistoryNavigator {
	/// Creates a navigator sitting on `current_path`.
	pub fn new(current_path: impl Into<String>) -> Self {
		Self { current: RwLock::new(current_path.into()), redirects: Mutex::default() }
	}

	/// Moves to `path` without recording a redirect.
	pub fn visit(&self, path: impl Into<String>) {
		*self.current.write() = path.into();
	}

	/// Every redirect issued so far, oldest first.
	pub fn redirects(&self) -> Vec<String> {
		self.redirects.lock().clone()
	}

	/// Most recent redirect, if any.
	pub fn last_redirect(&self) -> Option<String> {
		self.redirects.lock().last().cloned()
	}
}
impl Navigator for HistoryNavigator {
	fn current_path(&self) -> String {
		self.current.read().clone()
	}

	fn redirect(&self, location: &str) {
		self.redirects.lock().push(location.to_owned());
		*self.current.write() = location.to_owned();
	}
}

/// Returns `true` when `path` is `route` itself or a page nested under it.
pub fn is_on_route(path: &str, route: &str) -> bool {
	let path = path.split(['?', '#']).next().unwrap_or_default();

	match path.strip_prefix(route) {
		Some(rest) => rest.is_empty() || rest.starts_with('/'),
		None => false,
	}
}

/// Builds the login redirect for a user on `current_path`, or `None` when already there.
pub fn login_location(login_route: &str, current_path: &str) -> Option<String> {
	if is_on_route(current_path, login_route) {
		return None;
	}

	let callback = form_urlencoded::byte_serialize(current_path.as_bytes()).collect::<String>();

	Some(format!("{login_route}?{CALLBACK_PARAM}={callback}"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn login_location_carries_the_current_page() {
		assert_eq!(
			login_location("/login", "/customers?page=2").as_deref(),
			Some("/login?callbackUrl=%2Fcustomers%3Fpage%3D2")
		);
		assert_eq!(login_location("/login", "/login"), None);
		assert_eq!(login_location("/login", "/login?callbackUrl=%2Floans"), None);
		assert!(login_location("/login", "/login-history").is_some());
	}

	#[test]
	fn history_navigator_tracks_redirects() {
		let navigator = HistoryNavigator::new("/dashboard");

		navigator.redirect("/settings");

		assert_eq!(navigator.current_path(), "/settings");
		assert_eq!(navigator.redirects(), vec!["/settings".to_owned()]);

		navigator.visit("/loans");

		assert_eq!(navigator.current_path(), "/loans");
		assert_eq!(navigator.last_redirect().as_deref(), Some("/settings"));
	}
}
