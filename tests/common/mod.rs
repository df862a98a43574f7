#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use httpmock::MockServer;
use org_device_api::{
	auth::{ClientId, Credentials, KeyId, Scope, TokenIssuer},
	descriptor::ServiceDescriptor,
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http},
	reqwest::{Client, redirect::Policy},
	retry::RetryPolicy,
};
use p256::{
	SecretKey,
	pkcs8::{EncodePrivateKey, LineEnding},
};
use parking_lot::Mutex;
use time::Duration;
use url::Url;

pub const CLIENT_ID: &str = "BUSINESSAPI.2f1a6a35-test";
pub const KEY_ID: &str = "key-7d1c";

pub fn secret_key() -> SecretKey {
	SecretKey::from_slice(&[0x2a; 32]).expect("Fixed scalar should be a valid P-256 key.")
}

pub fn pkcs8_pem() -> String {
	secret_key().to_pkcs8_pem(LineEnding::LF).expect("PKCS#8 encoding should succeed.").to_string()
}

pub fn sec1_pem() -> String {
	secret_key().to_sec1_pem(LineEnding::LF).expect("SEC1 encoding should succeed.").to_string()
}

pub fn credentials(scope: Scope) -> Credentials {
	Credentials::new(
		ClientId::new(CLIENT_ID).expect("Client fixture should be valid."),
		KeyId::new(KEY_ID).expect("Key fixture should be valid."),
		pkcs8_pem(),
		scope,
	)
}

/// Descriptor routing the token endpoint and both scopes to `server`.
pub fn descriptor(server: &MockServer) -> ServiceDescriptor {
	ServiceDescriptor::builder()
		.token_endpoint(Url::parse(&server.url("/auth/oauth2/token")).expect("URL should parse."))
		.assertion_audience("https://account.example.com/auth/oauth2/v2/token")
		.resource_base_url(Url::parse(&server.base_url()).expect("URL should parse."))
		.build()
		.expect("Loopback descriptor should build.")
}

/// Descriptor for tests whose token endpoint is never contacted over HTTP.
pub fn resource_only_descriptor(server: &MockServer) -> ServiceDescriptor {
	ServiceDescriptor::builder()
		.token_endpoint(Url::parse("https://account.example.com/token").expect("URL should parse."))
		.resource_base_url(Url::parse(&server.base_url()).expect("URL should parse."))
		.build()
		.expect("Descriptor should build.")
}

/// Client that trusts the self-signed certificate served by `httpmock`.
pub fn test_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.no_proxy()
		.redirect(Policy::none())
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Insecure test client should build.");

	ReqwestHttpClient::with_client(client)
}

/// Token endpoint policy that retries without sleeping.
pub fn instant_token_retry() -> RetryPolicy {
	RetryPolicy::token_endpoint()
		.with_base_delay(Duration::ZERO)
		.with_max_delay(Duration::ZERO)
		.with_jitter_factor(0.0)
}

/// Policy that retries without sleeping.
pub fn instant_retry(max_attempts: u32) -> RetryPolicy {
	RetryPolicy::default()
		.with_max_attempts(max_attempts)
		.with_base_delay(Duration::ZERO)
		.with_max_delay(Duration::ZERO)
		.with_jitter_factor(0.0)
}

pub fn token_body(token: &str, expires_in: i64) -> String {
	format!(r#"{{"access_token":"{token}","token_type":"Bearer","expires_in":{expires_in}}}"#)
}

#[derive(Debug)]
pub struct ScriptedTransportError;
impl Display for ScriptedTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Scripted connection reset.")
	}
}
impl std::error::Error for ScriptedTransportError {}

/// One scripted token endpoint reaction.
#[derive(Clone, Debug)]
pub enum Reply {
	/// Answer with `status` and a JSON `body`.
	Status { status: u16, body: String, retry_after: Option<Duration> },
	/// Fail before any response arrives.
	ConnectionReset,
}
impl Reply {
	pub fn token(token: &str, expires_in: i64) -> Self {
		Self::Status { status: 200, body: token_body(token, expires_in), retry_after: None }
	}

	pub fn status(status: u16, body: &str) -> Self {
		Self::Status { status, body: body.into(), retry_after: None }
	}
}

#[derive(Default)]
struct Script {
	replies: Mutex<VecDeque<Reply>>,
	requests: Mutex<Vec<String>>,
	issued: AtomicUsize,
}

/// [`TokenHttpClient`] replaying scripted replies; once the script runs dry it issues
/// `token-N` with a one-hour lifetime.
#[derive(Clone, Default)]
pub struct ScriptedTokenClient(Arc<Script>);
impl ScriptedTokenClient {
	pub fn with_replies<I>(replies: I) -> Self
	where
		I: IntoIterator<Item = Reply>,
	{
		let client = Self::default();

		client.0.replies.lock().extend(replies);

		client
	}

	/// Number of token endpoint round trips.
	pub fn calls(&self) -> usize {
		self.0.requests.lock().len()
	}

	/// Form bodies sent so far.
	pub fn requests(&self) -> Vec<String> {
		self.0.requests.lock().clone()
	}
}
impl TokenHttpClient for ScriptedTokenClient {
	type Handle = ScriptedHandle;
	type TransportError = ScriptedTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ScriptedHandle { script: self.0.clone(), slot }
	}
}

pub struct ScriptedHandle {
	script: Arc<Script>,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
	type Error = HttpClientError<ScriptedTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();
			self.script
				.requests
				.lock()
				.push(String::from_utf8_lossy(request.body()).into_owned());

			let reply = self.script.replies.lock().pop_front().unwrap_or_else(|| {
				let n = self.script.issued.fetch_add(1, Ordering::SeqCst) + 1;

				Reply::token(&format!("token-{n}"), 3600)
			});

			match reply {
				Reply::Status { status, body, retry_after } => {
					self.slot.store(ResponseMetadata { status: Some(status), retry_after });

					let response = http::Response::builder()
						.status(status)
						.header("content-type", "application/json")
						.body(body.into_bytes())
						.expect("Scripted response should build.");

					Ok(response)
				},
				Reply::ConnectionReset =>
					Err(HttpClientError::Reqwest(Box::new(ScriptedTransportError))),
			}
		})
	}
}

/// Issuer backed by a scripted token endpoint.
pub fn scripted_issuer(
	client: &ScriptedTokenClient,
	server: &MockServer,
) -> TokenIssuer<ScriptedTokenClient> {
	TokenIssuer::new(
		&credentials(Scope::Business),
		&resource_only_descriptor(server),
		Arc::new(client.clone()),
	)
	.expect("Issuer should build.")
	.with_retry_policy(instant_token_retry())
	.expect("Instant token policy should validate.")
}
