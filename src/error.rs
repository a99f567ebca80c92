//! Client-level error types shared by the executor, the refresh coordinator, and the stores.
//!
//! Callers only ever match on [`Error`]; [`Error::message`] yields the human-readable text the
//! dashboard shows in a toast.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Message used when neither the server nor the transport supplied anything better.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred.";

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Client-state storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The shared token refresh failed; tokens were cleared.
	#[error(transparent)]
	RefreshFailed(#[from] crate::refresh::RefreshError),
	/// Login response did not carry a usable token grant.
	#[error(transparent)]
	Grant(#[from] crate::auth::GrantParseError),

	/// Network, DNS, or timeout failure before a response arrived.
	#[error("{message}")]
	Transport {
		/// Transport-supplied message.
		message: String,
	},
	/// Server answered with a non-success status.
	#[error("{message}")]
	Application {
		/// HTTP status code.
		status: u16,
		/// Server `message` field, or the transport-style fallback.
		message: String,
	},
	/// Authentication could not be recovered (auth endpoint 401 or a repeated 401).
	#[error("{message}")]
	Unauthorized {
		/// Normalized message.
		message: String,
	},
	/// Response body did not match the requested type.
	#[error("Response body does not match the expected shape at `{}`.", source.path())]
	Decode {
		/// Path-aware decoding failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns the normalized, human-readable message for this failure.
	pub fn message(&self) -> String {
		let message = self.to_string();

		if message.trim().is_empty() { FALLBACK_MESSAGE.into() } else { message }
	}

	/// Returns the HTTP status attached to the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Application { status, .. } => Some(*status),
			Self::Unauthorized { .. } => Some(401),
			Self::RefreshFailed(err) => err.status(),
			_ => None,
		}
	}

	/// Builds the error for an unsuccessful HTTP response.
	///
	/// The server's JSON `message` wins; otherwise the transport-style
	/// `Request failed with status code N` text is used.
	pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
		let message = server_message(body).unwrap_or_else(|| status_message(status));

		if status == StatusCode::UNAUTHORIZED {
			Self::Unauthorized { message }
		} else {
			Self::Application { status: status.as_u16(), message }
		}
	}
}
impl From<ReqwestError> for Error {
	fn from(e: ReqwestError) -> Self {
		Self::Transport { message: transport_message(&e) }
	}
}

/// Configuration and validation failures raised while building a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: ReqwestError,
	},
	/// API base or proxy URL cannot be parsed.
	#[error("The {name} URL is invalid.")]
	InvalidUrl {
		/// Which URL failed.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// API base or proxy URL uses an unsupported scheme.
	#[error("The {name} URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Which URL failed.
		name: &'static str,
		/// Offending URL.
		url: String,
	},
	/// App key is empty.
	#[error("The app key must not be empty.")]
	MissingAppKey,
	/// Required environment variable is absent.
	#[error("Environment variable `{0}` is not set.")]
	MissingEnv(&'static str),
	/// Endpoint cannot be joined onto the API base.
	#[error("Endpoint `{endpoint}` cannot be resolved against the API base.")]
	InvalidEndpoint {
		/// Endpoint as supplied by the caller.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body cannot be serialized.
	#[error("Request body cannot be serialized.")]
	BodySerialization(#[source] serde_json::Error),
	/// Multipart part declares an unparsable MIME type.
	#[error("Multipart part `{name}` has an invalid content type.")]
	InvalidPartMime {
		/// Part name.
		name: String,
		/// Underlying reqwest failure.
		#[source]
		source: ReqwestError,
	},
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::HttpClientBuild { source: e }
	}
}

pub(crate) fn server_message(body: &[u8]) -> Option<String> {
	let value = serde_json::from_slice::<Value>(body).ok()?;
	let message = value.get("message")?.as_str()?.trim();

	(!message.is_empty()).then(|| message.to_owned())
}

pub(crate) fn status_message(status: StatusCode) -> String {
	format!("Request failed with status code {}", status.as_u16())
}

pub(crate) fn transport_message(e: &ReqwestError) -> String {
	let message = e.to_string();

	if message.trim().is_empty() { FALLBACK_MESSAGE.into() } else { message }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn response_errors_prefer_server_message() {
		let err = Error::from_response(
			StatusCode::UNPROCESSABLE_ENTITY,
			br#"{"message":"Customer already has an active loan"}"#,
		);

		assert_eq!(err.message(), "Customer already has an active loan");
		assert_eq!(err.status(), Some(422));
	}

	#[test]
	fn response_errors_fall_back_to_status_text() {
		let err = Error::from_response(StatusCode::BAD_GATEWAY, b"<html>upstream down</html>");

		assert_eq!(err.message(), "Request failed with status code 502");

		let err = Error::from_response(StatusCode::NOT_FOUND, br#"{"message":"   "}"#);

		assert_eq!(err.message(), "Request failed with status code 404");
	}

	#[test]
	fn unauthorized_responses_map_to_unauthorized() {
		let err = Error::from_response(StatusCode::UNAUTHORIZED, br#"{"message":"Token expired"}"#);

		assert!(matches!(err, Error::Unauthorized { .. }));
		assert_eq!(err.message(), "Token expired");
	}

	#[test]
	fn empty_messages_use_fallback() {
		let err = Error::Transport { message: String::new() };

		assert_eq!(err.message(), FALLBACK_MESSAGE);
	}

	#[test]
	fn store_error_converts_with_source() {
		let store_error = StoreError::Backend { message: "disk full".into() };
		let err: Error = store_error.clone().into();

		assert!(matches!(err, Error::Storage(_)));
		assert!(err.message().contains("disk full"));

		let source =
			StdError::source(&err).expect("Client error should expose the store error as source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
