mod common;

// std
use std::sync::Arc;
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::prelude::*;
use org_device_api::{
	auth::{AssertionClaims, AssertionHeader, CLIENT_ASSERTION_TYPE, Scope, TokenIssuer},
	clock::ManualClock,
	error::{AuthError, Error},
};
use time::{Duration, macros};
// self
use common::{Reply, ScriptedTokenClient};

fn reqwest_issuer(server: &MockServer) -> TokenIssuer {
	TokenIssuer::new(
		&common::credentials(Scope::Business),
		&common::descriptor(server),
		common::test_http_client(),
	)
	.expect("Issuer should build.")
	.with_retry_policy(common::instant_token_retry())
	.expect("Instant token policy should validate.")
}

fn form_value(body: &str, key: &str) -> Option<String> {
	url::form_urlencoded::parse(body.as_bytes())
		.find(|(k, _)| k == key)
		.map(|(_, value)| value.into_owned())
}

#[tokio::test]
async fn exchange_presents_a_signed_client_assertion() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::default();
	let issuer = common::scripted_issuer(&client, &server);
	let token = issuer.token().await.expect("Token exchange should succeed.");

	assert_eq!(token.secret.expose(), "token-1");
	assert_eq!(token.scope, Scope::Business);
	assert_eq!(token.expires_at - token.issued_at, Duration::hours(1));

	let requests = client.requests();
	let body = requests.first().expect("One exchange should be recorded.");

	assert_eq!(form_value(body, "grant_type").as_deref(), Some("client_credentials"));
	assert_eq!(form_value(body, "client_id").as_deref(), Some(common::CLIENT_ID));
	assert_eq!(form_value(body, "scope").as_deref(), Some("business.api"));
	assert_eq!(form_value(body, "client_assertion_type").as_deref(), Some(CLIENT_ASSERTION_TYPE));

	let assertion = form_value(body, "client_assertion").expect("Assertion should be present.");
	let parts = assertion.split('.').collect::<Vec<_>>();

	assert_eq!(parts.len(), 3);

	let header: AssertionHeader =
		serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).expect("Header should decode."))
			.expect("Header should be JSON.");
	let claims: AssertionClaims =
		serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).expect("Claims should decode."))
			.expect("Claims should be JSON.");

	assert_eq!(header.alg, "ES256");
	assert_eq!(header.kid, common::KEY_ID);
	assert_eq!(claims.iss, common::CLIENT_ID);
	assert_eq!(claims.sub, common::CLIENT_ID);
	assert_eq!(claims.aud, "https://account.example.com/token");
	assert_eq!(claims.exp - claims.iat, 1200);
}

#[tokio::test]
async fn cached_token_is_reused_until_the_margin() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(common::token_body("cached-token", 3600));
		})
		.await;
	let clock = Arc::new(ManualClock::new(macros::datetime!(2025-05-01 08:00 UTC)));
	let issuer = reqwest_issuer(&server).with_clock(clock.clone());

	for _ in 0..3 {
		let token = issuer.token().await.expect("Token should be issued.");

		assert_eq!(token.secret.expose(), "cached-token");
	}

	token_mock.assert_calls_async(1).await;

	// 100 seconds of lifetime left, still outside the 60 second margin.
	clock.advance(Duration::seconds(3500));
	issuer.token().await.expect("Cached token should be served.");
	token_mock.assert_calls_async(1).await;

	// 55 seconds left, inside the margin.
	clock.advance(Duration::seconds(45));
	issuer.token().await.expect("Token should be refreshed.");
	token_mock.assert_calls_async(2).await;
	assert_eq!(issuer.metrics().successes(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_exchange() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(50))
				.body(common::token_body("shared-token", 3600));
		})
		.await;
	let issuer = Arc::new(reqwest_issuer(&server));
	let tokens = futures::future::join_all((0..16).map(|_| {
		let issuer = issuer.clone();

		tokio::spawn(async move { issuer.token().await })
	}))
	.await;

	for token in tokens {
		let token = token.expect("Task should not panic.").expect("Token should be issued.");

		assert_eq!(token.secret.expose(), "shared-token");
	}

	token_mock.assert_calls_async(1).await;
	assert_eq!(issuer.metrics().attempts(), 1);
}

#[tokio::test]
async fn client_errors_fail_without_retry() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/oauth2/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_client","error_description":"Unknown key."}"#);
		})
		.await;
	let issuer = reqwest_issuer(&server);
	let err = issuer.token().await.expect_err("Invalid clients must fail.");

	match err {
		Error::Auth(AuthError::TokenEndpoint { status, attempts, ref message }) => {
			assert_eq!(status, Some(400));
			assert_eq!(attempts, 1);
			assert!(!message.is_empty());
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	token_mock.assert_calls_async(1).await;
	assert!(issuer.cached().is_none());
	assert_eq!(issuer.metrics().failures(), 1);
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::with_replies([
		Reply::status(503, r#"{"error":"temporarily_unavailable"}"#),
		Reply::status(500, "{}"),
	]);
	let issuer = common::scripted_issuer(&client, &server);
	let token = issuer.token().await.expect("Third attempt should succeed.");

	assert_eq!(token.secret.expose(), "token-1");
	assert_eq!(client.calls(), 3);
	assert_eq!(issuer.metrics().attempts(), 1);
	assert_eq!(issuer.metrics().successes(), 1);

	let assertions = client
		.requests()
		.iter()
		.map(|body| form_value(body, "client_assertion").expect("Assertion should be present."))
		.collect::<std::collections::HashSet<_>>();

	assert_eq!(assertions.len(), 3, "Every attempt signs a new assertion.");
}

#[tokio::test]
async fn throttling_exhausts_the_retry_budget() {
	let server = MockServer::start_async().await;
	let throttled = Reply::Status {
		status: 429,
		body: r#"{"error":"slow_down"}"#.into(),
		retry_after: Some(Duration::ZERO),
	};
	let client = ScriptedTokenClient::with_replies(vec![throttled; 5]);
	let issuer = common::scripted_issuer(&client, &server);
	let err = issuer.token().await.expect_err("Persistent throttling must fail.");

	assert!(matches!(
		err,
		Error::Auth(AuthError::TokenEndpoint { status: Some(429), attempts: 5, .. })
	));
	assert_eq!(client.calls(), 5);
}

#[tokio::test]
async fn transport_failures_surface_after_retries() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::with_replies(vec![Reply::ConnectionReset; 5]);
	let issuer = common::scripted_issuer(&client, &server);
	let err = issuer.token().await.expect_err("Unreachable endpoints must fail.");

	assert!(matches!(err, Error::Auth(AuthError::Transport { attempts: 5, .. })));
	assert_eq!(err.attempts(), Some(5));
	assert_eq!(client.calls(), 5);
}

#[tokio::test]
async fn responses_without_expiry_are_malformed() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::with_replies([Reply::status(
		200,
		r#"{"access_token":"no-expiry","token_type":"Bearer"}"#,
	)]);
	let issuer = common::scripted_issuer(&client, &server);
	let err = issuer.token().await.expect_err("Tokens without expiry must be rejected.");

	assert!(matches!(err, Error::Auth(AuthError::MalformedResponse { .. })));
	assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn rejected_tokens_are_replaced_once() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::default();
	let issuer = common::scripted_issuer(&client, &server);
	let first = issuer.token().await.expect("First token should be issued.");
	let second = issuer.refresh_rejected(&first).await.expect("Replacement should be issued.");

	assert_eq!(second.secret.expose(), "token-2");

	// A late caller still holding the first token gets the replacement without another exchange.
	let again = issuer.refresh_rejected(&first).await.expect("Replacement should be reused.");

	assert_eq!(again.secret.expose(), "token-2");
	assert_eq!(client.calls(), 2);

	issuer.invalidate();

	assert!(issuer.cached().is_none());
	assert_eq!(issuer.token().await.expect("Token should be issued.").secret.expose(), "token-3");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_refresh_inside_the_margin() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::default();
	let clock = Arc::new(ManualClock::new(macros::datetime!(2025-05-01 08:00 UTC)));
	let issuer = Arc::new(common::scripted_issuer(&client, &server).with_clock(clock.clone()));

	assert_eq!(issuer.token().await.expect("Token should be issued.").secret.expose(), "token-1");

	// 55 seconds of lifetime left.
	clock.advance(Duration::seconds(3545));

	let tokens = futures::future::join_all((0..16).map(|_| {
		let issuer = issuer.clone();

		tokio::spawn(async move { issuer.token().await })
	}))
	.await;

	for token in tokens {
		let token = token.expect("Task should not panic.").expect("Token should be refreshed.");

		assert_eq!(token.secret.expose(), "token-2");
	}

	assert_eq!(client.calls(), 2);
}
