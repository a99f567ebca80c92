mod support;

// crates.io
use httpmock::prelude::*;
// self
use sapphire_access::{
	client::{CallOptions, Outcome},
	error::Error,
	reqwest::Method,
};
use support::*;

#[tokio::test]
async fn login_stores_the_issued_pair() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let Harness { client, .. } = interactive(&server, "/login");
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/login")
				.header("x-app-key", APP_KEY)
				.json_body(serde_json::json!({
					"email": "ops@sapphire.test",
					"password": "hunter2",
				}));
			then.status(200).header("content-type", "application/json").body(GRANT_BODY);
		})
		.await;
	let outcome = client.login("ops@sapphire.test", "hunter2").await?;
	let body = outcome.completed().expect("Login should complete.");

	assert_eq!(body["access_token"], "access-new");
	assert_eq!(
		client.tokens().access_token().map(|t| t.expose().to_owned()).as_deref(),
		Some("access-new")
	);
	assert!(!client.tokens().is_token_expired(300));

	login.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn unauthorized_login_never_refreshes() {
	let server = MockServer::start_async().await;
	let Harness { client, navigator, .. } = interactive(&server, "/customers");

	seed_fresh_tokens(&client);

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).header("content-type", "application/json").body(GRANT_BODY);
		})
		.await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"message":"Invalid credentials"}"#);
		})
		.await;
	let err = client.login("ops@sapphire.test", "wrong").await.expect_err("Login should fail.");

	assert!(matches!(err, Error::Unauthorized { .. }));
	assert_eq!(err.message(), "Invalid credentials");
	assert!(client.tokens().access_token().is_none());
	assert!(client.tokens().refresh_token().is_none());
	assert_eq!(navigator.last_redirect().as_deref(), Some("/login?callbackUrl=%2Fcustomers"));

	refresh.assert_calls_async(0).await;
	login.assert_calls_async(1).await;
}

#[tokio::test]
async fn unauthorized_refresh_endpoint_is_unrecoverable() {
	let server = MockServer::start_async().await;
	let Harness { client, navigator, .. } = interactive(&server, "/login");

	seed_fresh_tokens(&client);

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(401);
		})
		.await;
	let err = client
		.call("/auth/refresh", Method::POST, None, CallOptions::default())
		.await
		.expect_err("A 401 from the refresh endpoint should fail.");

	assert!(matches!(err, Error::Unauthorized { .. }));
	assert_eq!(err.message(), "Request failed with status code 401");
	assert!(client.tokens().access_token().is_none());
	// Already on the login page.
	assert!(navigator.redirects().is_empty());

	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn logout_drops_session_state() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let Harness { client, .. } = interactive(&server, "/stores");

	seed_fresh_tokens(&client);

	let stores = server
		.mock_async(|when, then| {
			when.method(GET).path("/stores");
			then.status(200).header("content-type", "application/json").body(r#"["north"]"#);
		})
		.await;
	let outcome =
		client.cached_call("/stores", Vec::<(&str, &str)>::new(), CallOptions::default()).await?;

	assert_eq!(outcome, Outcome::Completed(serde_json::json!(["north"])));
	assert!(client.cache().has("/stores"));

	client.logout()?;

	assert!(client.cache().is_empty());
	assert!(client.tokens().access_token().is_none());

	stores.assert_calls_async(1).await;

	Ok(())
}
