//! Token grant payloads returned by `/auth/login` and `/auth/refresh`.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Failure to read a token grant from a response body.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum GrantParseError {
	/// Body is not the expected JSON shape.
	#[error("Token response is malformed at `{path}`: {message}.")]
	Malformed {
		/// JSON path where decoding stopped.
		path: String,
		/// serde_json failure text.
		message: String,
	},
	/// `expires_in` is zero or negative.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}

/// Access/refresh pair plus relative lifetime, exactly as the API issues it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token; absent when the API keeps the previous one valid.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Token type label, normally `Bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Lifetime of the access token in seconds.
	pub expires_in: i64,
}
impl TokenGrant {
	/// Decodes a grant from a raw response body.
	pub fn from_slice(body: &[u8]) -> Result<Self, GrantParseError> {
		let mut de = serde_json::Deserializer::from_slice(body);
		let grant: Self = serde_path_to_error::deserialize(&mut de).map_err(|e| {
			GrantParseError::Malformed {
				path: e.path().to_string(),
				message: e.inner().to_string(),
			}
		})?;

		if grant.expires_in <= 0 {
			return Err(GrantParseError::NonPositiveExpiresIn);
		}

		Ok(grant)
	}

	/// Decodes a grant from an already parsed JSON value.
	pub fn from_value(value: &Value) -> Result<Self, GrantParseError> {
		let body = serde_json::to_vec(value).map_err(|e| GrantParseError::Malformed {
			path: ".".into(),
			message: e.to_string(),
		})?;

		Self::from_slice(&body)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_refresh_response() {
		let grant = TokenGrant::from_slice(
			br#"{
				"access_token": "a-1",
				"refresh_token": "r-1",
				"token_type": "Bearer",
				"expires_in": 900
			}"#,
		)
		.expect("Refresh response fixture should parse.");

		assert_eq!(grant.access_token.expose(), "a-1");
		assert_eq!(grant.refresh_token.as_ref().map(TokenSecret::expose), Some("r-1"));
		assert_eq!(grant.expires_in, 900);
	}

	#[test]
	fn login_payload_with_extra_fields_parses() {
		let value = serde_json::json!({
			"access_token": "a-2",
			"expires_in": 60,
			"user": { "id": 7, "role": "finance" }
		});
		let grant = TokenGrant::from_value(&value).expect("Login payload should parse.");

		assert!(grant.refresh_token.is_none());
	}

	#[test]
	fn rejects_missing_fields_and_non_positive_lifetimes() {
		let err = TokenGrant::from_slice(br#"{"expires_in":60}"#)
			.expect_err("Missing access token should be rejected.");

		assert!(matches!(err, GrantParseError::Malformed { .. }));

		let err = TokenGrant::from_slice(br#"{"access_token":"a","expires_in":0}"#)
			.expect_err("Zero lifetime should be rejected.");

		assert_eq!(err, GrantParseError::NonPositiveExpiresIn);
	}
}
