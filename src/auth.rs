//! Credential models: redacted token secrets and the token grants issued by the API.

pub mod grant;
pub mod secret;

pub use grant::*;
pub use secret::*;
