//! Authenticated resource calls with retry, backoff, and token refresh on 401.
//!
//! Each [`RequestExecutor::send`] resolves the URL, attaches the issuer's current bearer token,
//! and classifies the outcome:
//!
//! - 2xx returns the body.
//! - 401 replaces the token once and repeats the call without spending a backoff attempt; a
//!   second 401 is terminal.
//! - Statuses in the policy's retryable set (and transport failures) back off and retry until
//!   `max_attempts` is spent.
//! - Anything else fails immediately.
//!
//! Every terminal failure is reported to the [`DiagnosticsSink`] before it is returned.

// crates.io
use reqwest::{
	Method,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	api::RequestSpec,
	auth::{Scope, TokenIssuer},
	descriptor::ServiceDescriptor,
	error::{AuthError, ConfigError, TransportError},
	http::{ReqwestHttpClient, TokenHttpClient, body_excerpt, parse_retry_after},
	obs::{self, Diagnostic, DiagnosticsSink, OpKind, OpOutcome, OpSpan, TracingDiagnostics},
	retry::{self, RetryPolicy},
};

const UNAUTHORIZED: u16 = 401;
const TOO_MANY_REQUESTS: u16 = 429;

/// Successful resource API response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status (always 2xx).
	pub status: u16,
	/// Raw response body; empty for `204 No Content`.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Decodes the body as JSON; an empty body decodes as `null`.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let bytes: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
			b"null"
		} else {
			&self.body
		};
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { status: self.status, source })
	}
}

/// Executes [`RequestSpec`]s against the resource API on behalf of one [`TokenIssuer`].
pub struct RequestExecutor<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	issuer: Arc<TokenIssuer<C>>,
	client: ReqwestClient,
	descriptor: Arc<ServiceDescriptor>,
	retry_policy: RetryPolicy,
	diagnostics: Arc<dyn DiagnosticsSink>,
	deadline: Option<Instant>,
}
impl<C> RequestExecutor<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an executor with the default retry policy and tracing diagnostics.
	pub fn new(
		issuer: Arc<TokenIssuer<C>>,
		client: ReqwestClient,
		descriptor: Arc<ServiceDescriptor>,
	) -> Self {
		Self {
			issuer,
			client,
			descriptor,
			retry_policy: RetryPolicy::default(),
			diagnostics: Arc::new(TracingDiagnostics),
			deadline: None,
		}
	}

	/// Overrides the retry policy for resource calls.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Result<Self> {
		policy.validate()?;

		self.retry_policy = policy;

		Ok(self)
	}

	/// Routes terminal failure reports to `sink`.
	pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
		self.diagnostics = sink;

		self
	}

	/// Bounds every call made from now on by an overall deadline `budget` away.
	pub fn with_deadline(mut self, budget: Duration) -> Self {
		self.deadline = Some(Instant::now() + budget.max(Duration::ZERO).unsigned_abs());

		self
	}

	/// Issuer supplying bearer tokens.
	pub fn issuer(&self) -> &Arc<TokenIssuer<C>> {
		&self.issuer
	}

	/// Active resource retry policy.
	pub fn retry_policy(&self) -> &RetryPolicy {
		&self.retry_policy
	}

	/// Performs `spec` and returns the raw successful response.
	pub async fn send(&self, spec: &RequestSpec) -> Result<ApiResponse> {
		let scope = self.resolve_scope(spec)?;
		let url = self.descriptor.resource_url(scope, &spec.path, &spec.query)?;
		let body = spec
			.body
			.as_ref()
			.map(serde_json::to_vec)
			.transpose()
			.map_err(ConfigError::RequestBody)?;
		let span = OpSpan::new(OpKind::Request, "send");

		obs::record_op_outcome(OpKind::Request, OpOutcome::Attempt);

		let call = span.instrument(self.send_with_retry(&spec.method, &url, body.as_deref()));
		let result = match self.deadline {
			Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
				Ok(result) => result,
				Err(_) => Err(Error::DeadlineExceeded),
			},
			None => call.await,
		};

		match &result {
			Ok(_) => obs::record_op_outcome(OpKind::Request, OpOutcome::Success),
			Err(err) => {
				obs::record_op_outcome(OpKind::Request, OpOutcome::Failure);
				self.diagnostics.report(&diagnostic_for(&spec.method, &url, err));
			},
		}

		result
	}

	/// Performs `spec` and decodes the JSON body into `T`.
	pub async fn send_json<T>(&self, spec: &RequestSpec) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.send(spec).await?;

		response.json()
	}

	fn resolve_scope(&self, spec: &RequestSpec) -> Result<Scope, ConfigError> {
		let authorized = self.issuer.scope();

		match spec.scope {
			Some(requested) if requested != authorized =>
				Err(ConfigError::ScopeMismatch { requested, authorized }),
			_ => Ok(authorized),
		}
	}

	async fn send_with_retry(
		&self,
		method: &Method,
		url: &Url,
		body: Option<&[u8]>,
	) -> Result<ApiResponse> {
		let mut attempt = 1;
		let mut replaced_rejected_token = false;

		loop {
			let token = self.issuer.token().await?;
			let mut request = self
				.client
				.request(method.clone(), url.clone())
				.header(AUTHORIZATION, token.bearer())
				.header(ACCEPT, "application/json");

			if let Some(body) = body {
				request = request.header(CONTENT_TYPE, "application/json").body(body.to_vec());
			}

			let (status, retry_after) = match execute(request).await {
				Ok((status, _, body)) if (200..300).contains(&status) =>
					return Ok(ApiResponse { status, body }),
				Ok((UNAUTHORIZED, _, _)) if !replaced_rejected_token => {
					replaced_rejected_token = true;

					self.issuer.refresh_rejected(&token).await?;

					continue;
				},
				Ok((UNAUTHORIZED, _, _)) =>
					return Err(AuthError::Rejected { status: UNAUTHORIZED }.into()),
				Ok((status, retry_after, body)) => {
					if !self.retry_policy.is_retryable(status)
						|| !self.retry_policy.allows_another(attempt)
					{
						return Err(status_error(status, retry_after, &body, attempt));
					}

					(Some(status), retry_after)
				},
				Err(err) if err.is_builder() => return Err(ConfigError::from(err).into()),
				Err(err) => {
					if !self.retry_policy.allows_another(attempt) {
						return Err(Error::Network {
							attempts: attempt,
							source: TransportError::network("resource API", err),
						});
					}

					(None, None)
				},
			};
			let delay = self.retry_policy.delay_for(attempt, retry_after);

			obs::retry_scheduled(OpKind::Request, attempt, status, delay);
			retry::pause(delay).await;

			attempt += 1;
		}
	}
}
impl<C> Debug for RequestExecutor<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor")
			.field("issuer", &self.issuer)
			.field("descriptor", &self.descriptor)
			.field("retry_policy", &self.retry_policy)
			.field("deadline", &self.deadline)
			.finish_non_exhaustive()
	}
}

async fn execute(
	request: reqwest::RequestBuilder,
) -> Result<(u16, Option<Duration>, Vec<u8>), ReqwestError> {
	let response = request.send().await?;
	let status = response.status().as_u16();
	let retry_after = parse_retry_after(response.headers());
	let body = response.bytes().await?.to_vec();

	Ok((status, retry_after, body))
}

fn status_error(status: u16, retry_after: Option<Duration>, body: &[u8], attempts: u32) -> Error {
	let body = body_excerpt(body);

	if status == TOO_MANY_REQUESTS {
		Error::RateLimitExceeded { body, attempts, retry_after }
	} else {
		Error::Api { status, body, attempts }
	}
}

fn diagnostic_for(method: &Method, url: &Url, err: &Error) -> Diagnostic {
	let body = match err {
		Error::Api { body, .. } | Error::RateLimitExceeded { body, .. } => body.clone(),
		other => other.to_string(),
	};

	Diagnostic {
		method: method.to_string(),
		url: url.to_string(),
		status: err.status(),
		body,
		attempts: err.attempts().unwrap_or(1),
	}
}
