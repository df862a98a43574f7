//! One command invocation's worth of wiring: issuer, executor, and paginator.
//!
//! ```no_run
//! use org_device_api::{
//! 	api::resources,
//! 	auth::{ClientId, Credentials, KeyId, Scope},
//! 	descriptor::ServiceDescriptor,
//! 	session::Session,
//! };
//!
//! # async fn run(pem: String) -> org_device_api::error::Result<()> {
//! let credentials = Credentials::new(
//! 	ClientId::new("BUSINESSAPI.3bb3a62b-0000-0000-0000-000000000000").expect("valid id"),
//! 	KeyId::new("d136aa66-0000-0000-0000-000000000000").expect("valid id"),
//! 	pem,
//! 	Scope::Business,
//! );
//! let session = Session::builder(credentials, ServiceDescriptor::production()?).build()?;
//! let devices: Vec<serde_json::Value> =
//! 	session.paginator().collect_all(&resources::list_devices(), Some(250)).await?;
//!
//! println!("{} devices", devices.len());
//! # Ok(())
//! # }
//! ```

// self
use crate::{
	_prelude::*,
	api::{Paginator, RequestExecutor},
	auth::{
		CredentialStore, Credentials, KeyFormatConverter, ProfileName, SigningKey, TokenIssuer,
	},
	clock::Clock,
	descriptor::ServiceDescriptor,
	error::ConfigError,
	http::ReqwestHttpClient,
	obs::{self, DiagnosticsSink},
	retry::RetryPolicy,
};

/// Issuer, executor, and paginator sharing one set of credentials.
#[derive(Debug)]
pub struct Session {
	issuer: Arc<TokenIssuer>,
	executor: Arc<RequestExecutor>,
	paginator: Paginator,
}
impl Session {
	/// Starts a builder for `credentials` against `descriptor`.
	pub fn builder(credentials: Credentials, descriptor: ServiceDescriptor) -> SessionBuilder {
		SessionBuilder::new(credentials, descriptor)
	}

	/// Loads `profile` from `store` and starts a builder with it.
	pub async fn from_store<S>(
		store: &S,
		profile: &ProfileName,
		descriptor: ServiceDescriptor,
	) -> Result<SessionBuilder>
	where
		S: ?Sized + CredentialStore,
	{
		let credentials = store.load(profile).await?;

		Ok(SessionBuilder::new(credentials, descriptor))
	}

	/// Token issuer of the session.
	pub fn issuer(&self) -> &Arc<TokenIssuer> {
		&self.issuer
	}

	/// Request executor of the session.
	pub fn executor(&self) -> &Arc<RequestExecutor> {
		&self.executor
	}

	/// Paginator of the session.
	pub fn paginator(&self) -> &Paginator {
		&self.paginator
	}
}

/// Collects overrides before the session's components are built.
pub struct SessionBuilder {
	credentials: Credentials,
	descriptor: ServiceDescriptor,
	http_client: Option<ReqwestHttpClient>,
	key_converter: Option<Arc<dyn KeyFormatConverter>>,
	retry_policy: Option<RetryPolicy>,
	token_retry_policy: Option<RetryPolicy>,
	refresh_margin: Option<Duration>,
	clock: Option<Arc<dyn Clock>>,
	diagnostics: Option<Arc<dyn DiagnosticsSink>>,
	deadline: Option<Duration>,
}
impl SessionBuilder {
	fn new(credentials: Credentials, descriptor: ServiceDescriptor) -> Self {
		Self {
			credentials,
			descriptor,
			http_client: None,
			key_converter: None,
			retry_policy: None,
			token_retry_policy: None,
			refresh_margin: None,
			clock: None,
			diagnostics: None,
			deadline: None,
		}
	}

	/// Uses `client` for both the token endpoint and the resource API.
	pub fn with_http_client(mut self, client: ReqwestHttpClient) -> Self {
		self.http_client = Some(client);

		self
	}

	/// Converts non-PKCS#8 keys with `converter` instead of the in-process default.
	pub fn with_key_converter(mut self, converter: Arc<dyn KeyFormatConverter>) -> Self {
		self.key_converter = Some(converter);

		self
	}

	/// Overrides the retry policy for resource calls.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = Some(policy);

		self
	}

	/// Overrides the retry policy for token endpoint calls.
	pub fn with_token_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.token_retry_policy = Some(policy);

		self
	}

	/// Overrides how long before expiry tokens are replaced.
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = Some(margin);

		self
	}

	/// Replaces the time source used for token expiry.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);

		self
	}

	/// Routes terminal request failure reports to `sink`.
	pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
		self.diagnostics = Some(sink);

		self
	}

	/// Bounds every resource call by a deadline `budget` after [`SessionBuilder::build`].
	pub fn with_deadline(mut self, budget: Duration) -> Self {
		self.deadline = Some(budget);

		self
	}

	/// Validates the configuration, parses the key, and wires the components.
	pub fn build(self) -> Result<Session> {
		self.descriptor.validate().map_err(ConfigError::from)?;

		let scope = self.credentials.scope;

		if let Some(hinted) = self.credentials.client_id.scope_hint().filter(|&h| h != scope) {
			obs::scope_hint_mismatch(&self.credentials.client_id, hinted, scope);
		}

		let http_client = match self.http_client {
			Some(client) => client,
			None => ReqwestHttpClient::new()?,
		};
		let pem = self.credentials.private_key.expose().as_bytes();
		let signing_key = match &self.key_converter {
			Some(converter) => SigningKey::load_with(pem, converter.as_ref())?,
			None => SigningKey::load(pem)?,
		};
		let resource_client = http_client.0.clone();
		let mut issuer = TokenIssuer::<ReqwestHttpClient>::with_signing_key(
			&self.credentials,
			signing_key,
			&self.descriptor,
			http_client,
		)?;

		if let Some(policy) = self.token_retry_policy {
			issuer = issuer.with_retry_policy(policy)?;
		}
		if let Some(margin) = self.refresh_margin {
			issuer = issuer.with_refresh_margin(margin);
		}
		if let Some(clock) = self.clock {
			issuer = issuer.with_clock(clock);
		}

		let issuer = Arc::new(issuer);
		let mut executor =
			RequestExecutor::new(issuer.clone(), resource_client, Arc::new(self.descriptor));

		if let Some(policy) = self.retry_policy {
			executor = executor.with_retry_policy(policy)?;
		}
		if let Some(sink) = self.diagnostics {
			executor = executor.with_diagnostics(sink);
		}
		if let Some(budget) = self.deadline {
			executor = executor.with_deadline(budget);
		}

		let executor = Arc::new(executor);
		let paginator = Paginator::new(executor.clone());

		Ok(Session { issuer, executor, paginator })
	}
}
impl Debug for SessionBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionBuilder")
			.field("credentials", &self.credentials)
			.field("descriptor", &self.descriptor)
			.field("retry_policy", &self.retry_policy)
			.field("token_retry_policy", &self.token_retry_policy)
			.field("refresh_margin", &self.refresh_margin)
			.field("deadline", &self.deadline)
			.finish_non_exhaustive()
	}
}
