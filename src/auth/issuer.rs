//! Token issuance with caching and single-flight refresh.
//!
//! [`TokenIssuer::token`] returns the cached bearer token while more than the refresh margin of
//! its lifetime remains. Otherwise callers line up behind one async mutex; the first to acquire
//! it signs a fresh client assertion and exchanges it, and everyone queued behind re-checks the
//! cache after acquiring the guard, so concurrent callers share the single in-flight refresh
//! instead of stampeding the token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientAssertion, ClientId, Credentials, KeyId, Scope, SigningKey},
	clock::{Clock, SystemClock},
	descriptor::ServiceDescriptor,
	error::AuthError,
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{AssertionFacade, ExchangeFailure},
	obs::{self, IssuerMetrics, OpKind, OpSpan},
	retry::{self, RetryPolicy},
};

/// Issues and caches bearer tokens for one set of credentials.
pub struct TokenIssuer<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	client_id: ClientId,
	key_id: KeyId,
	scope: Scope,
	signing_key: SigningKey,
	audience: String,
	facade: AssertionFacade,
	http_client: Arc<C>,
	clock: Arc<dyn Clock>,
	refresh_margin: Duration,
	retry_policy: RetryPolicy,
	cache: RwLock<Option<AccessToken>>,
	refresh_guard: AsyncMutex<()>,
	metrics: IssuerMetrics,
}
impl<C> TokenIssuer<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Default time before expiry at which the cached token is replaced.
	pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::seconds(60);

	/// Parses the private key and prepares the token exchange for `credentials`.
	pub fn new(
		credentials: &Credentials,
		descriptor: &ServiceDescriptor,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let signing_key = SigningKey::load(credentials.private_key.expose().as_bytes())?;

		Self::with_signing_key(credentials, signing_key, descriptor, http_client)
	}

	/// Like [`TokenIssuer::new`] but with an already parsed key.
	pub fn with_signing_key(
		credentials: &Credentials,
		signing_key: SigningKey,
		descriptor: &ServiceDescriptor,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let facade = AssertionFacade::new(&credentials.client_id, &descriptor.token_endpoint)?;

		Ok(Self {
			client_id: credentials.client_id.clone(),
			key_id: credentials.key_id.clone(),
			scope: credentials.scope,
			signing_key,
			audience: descriptor.assertion_audience.clone(),
			facade,
			http_client: http_client.into(),
			clock: Arc::new(SystemClock),
			refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
			retry_policy: RetryPolicy::token_endpoint(),
			cache: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
			metrics: IssuerMetrics::default(),
		})
	}

	/// Replaces the time source used for expiry checks and assertion timestamps.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides how long before expiry the cached token is replaced.
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = margin;

		self
	}

	/// Overrides the retry policy applied to token endpoint calls.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Result<Self> {
		policy.validate()?;

		self.retry_policy = policy;

		Ok(self)
	}

	/// Scope tokens are requested for.
	pub fn scope(&self) -> Scope {
		self.scope
	}

	/// Token endpoint counters for this issuer.
	pub fn metrics(&self) -> &IssuerMetrics {
		&self.metrics
	}

	/// Returns a usable bearer token, fetching a new one only when necessary.
	pub async fn token(&self) -> Result<AccessToken> {
		if let Some(token) = self.fresh_cached() {
			return Ok(token);
		}

		let span = OpSpan::new(OpKind::TokenFetch, "token");

		span.instrument(async move {
			let _singleflight = self.refresh_guard.lock().await;

			if let Some(token) = self.fresh_cached() {
				return Ok(token);
			}

			self.fetch_and_store().await
		})
		.await
	}

	/// Replaces a token the resource API refused.
	///
	/// If another caller already swapped in a different fresh token while this one waited for
	/// the guard, that token is returned without another exchange.
	pub async fn refresh_rejected(&self, rejected: &AccessToken) -> Result<AccessToken> {
		let span = OpSpan::new(OpKind::TokenFetch, "refresh_rejected");

		span.instrument(async move {
			let _singleflight = self.refresh_guard.lock().await;

			if let Some(token) =
				self.fresh_cached().filter(|current| current.secret != rejected.secret)
			{
				return Ok(token);
			}

			self.invalidate();
			self.fetch_and_store().await
		})
		.await
	}

	/// Drops the cached token; the next [`TokenIssuer::token`] call fetches a new one.
	pub fn invalidate(&self) {
		self.cache.write().take();
	}

	/// Returns the cached token without checking freshness.
	pub fn cached(&self) -> Option<AccessToken> {
		self.cache.read().clone()
	}

	fn fresh_cached(&self) -> Option<AccessToken> {
		let now = self.clock.now();

		self.cache.read().as_ref().filter(|token| token.is_fresh_at(now, self.refresh_margin)).cloned()
	}

	async fn fetch_and_store(&self) -> Result<AccessToken> {
		self.metrics.record_attempt();

		match self.fetch_with_retry().await {
			Ok((token, attempts)) => {
				self.metrics.record_success();
				obs::token_refreshed(attempts, token.expires_at);

				*self.cache.write() = Some(token.clone());

				Ok(token)
			},
			Err(err) => {
				self.metrics.record_failure();

				Err(err)
			},
		}
	}

	async fn fetch_with_retry(&self) -> Result<(AccessToken, u32)> {
		let mut attempt = 0;

		loop {
			attempt += 1;

			let issued_at = self.clock.now();
			let assertion =
				ClientAssertion::new(&self.client_id, &self.key_id, &self.audience, issued_at)
					.sign(&self.signing_key)?;
			let (status, retry_after) = match self
				.facade
				.exchange(self.http_client.as_ref(), self.scope, &assertion)
				.await
			{
				Ok(grant) => {
					let token =
						AccessToken::new(grant.access_token, self.scope, issued_at, grant.expires_in);

					return Ok((token, attempt));
				},
				Err(ExchangeFailure::Status { status, retry_after, message }) => {
					if !self.retry_policy.is_retryable(status)
						|| !self.retry_policy.allows_another(attempt)
					{
						return Err(AuthError::TokenEndpoint {
							status: Some(status),
							message,
							attempts: attempt,
						}
						.into());
					}

					(Some(status), retry_after)
				},
				Err(ExchangeFailure::Transport(source)) => {
					if !self.retry_policy.allows_another(attempt) {
						return Err(AuthError::Transport { attempts: attempt, source }.into());
					}

					(None, None)
				},
				Err(ExchangeFailure::Malformed(reason)) =>
					return Err(AuthError::MalformedResponse { reason }.into()),
			};
			let delay = self.retry_policy.delay_for(attempt, retry_after);

			obs::retry_scheduled(OpKind::TokenFetch, attempt, status, delay);
			retry::pause(delay).await;
		}
	}
}
impl<C> Debug for TokenIssuer<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenIssuer")
			.field("client_id", &self.client_id)
			.field("key_id", &self.key_id)
			.field("scope", &self.scope)
			.field("facade", &self.facade)
			.field("refresh_margin", &self.refresh_margin)
			.field("retry_policy", &self.retry_policy)
			.field("cached", &self.cache.read().is_some())
			.finish_non_exhaustive()
	}
}
