//! Internal OAuth client facade for the client-assertion token exchange.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, Scope as OAuthScope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{CLIENT_ASSERTION_TYPE, ClientId, Scope},
	error::{ConfigError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient, body_excerpt},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Usable result of a successful exchange.
#[derive(Clone)]
pub(crate) struct TokenGrant {
	pub(crate) access_token: String,
	pub(crate) expires_in: Duration,
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

/// Classified failure of one exchange attempt; the issuer decides whether to retry.
#[derive(Debug)]
pub(crate) enum ExchangeFailure {
	/// Endpoint answered with a non-success status.
	Status { status: u16, retry_after: Option<Duration>, message: String },
	/// No usable HTTP response arrived.
	Transport(TransportError),
	/// Success status with a body that cannot be turned into a token.
	Malformed(String),
}

/// Client-credentials request authenticated by a signed client assertion.
///
/// `client_id` travels in the form body and no client secret is configured.
pub(crate) struct AssertionFacade {
	oauth_client: ConfiguredBasicClient,
	token_url: Url,
}
impl AssertionFacade {
	pub(crate) fn new(client_id: &ClientId, token_endpoint: &Url) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::new(token_endpoint.to_string()).map_err(|source| {
			ConfigError::InvalidUrl { url: token_endpoint.to_string(), source }
		})?;
		let oauth_client = BasicClient::new(OAuthClientId::new(client_id.to_string()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, token_url: token_endpoint.clone() })
	}

	/// Performs one exchange attempt through `http_client`.
	pub(crate) async fn exchange<C>(
		&self,
		http_client: &C,
		scope: Scope,
		assertion: &str,
	) -> Result<TokenGrant, ExchangeFailure>
	where
		C: ?Sized + TokenHttpClient,
	{
		let meta = ResponseMetadataSlot::default();
		let instrumented = http_client.with_metadata(meta.clone());
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.add_scope(OAuthScope::new(scope.as_str().to_owned()))
			.add_extra_param("client_assertion_type", CLIENT_ASSERTION_TYPE)
			.add_extra_param("client_assertion", assertion.to_owned())
			.request_async(&instrumented)
			.await
			.map_err(|err| classify_request_error(meta.take(), err))?;
		let expires_in = response
			.expires_in()
			.ok_or_else(|| ExchangeFailure::Malformed("missing expires_in".into()))?;
		let expires_in = i64::try_from(expires_in.as_secs())
			.map_err(|_| ExchangeFailure::Malformed("expires_in is out of range".into()))?;

		if expires_in <= 0 {
			return Err(ExchangeFailure::Malformed("expires_in must be positive".into()));
		}

		Ok(TokenGrant {
			access_token: response.access_token().secret().to_owned(),
			expires_in: Duration::seconds(expires_in),
		})
	}
}
impl Debug for AssertionFacade {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AssertionFacade")
			.field("token_url", &self.token_url.as_str())
			.finish()
	}
}

fn classify_request_error<E>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> ExchangeFailure
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.as_ref().and_then(|value| value.status);
	let retry_after = meta.as_ref().and_then(|value| value.retry_after);
	let failed_status = status.filter(|code| !(200..300).contains(code));

	match err {
		RequestTokenError::ServerResponse(response) => ExchangeFailure::Status {
			status: failed_status.unwrap_or(400),
			retry_after,
			message: server_message(&response),
		},
		RequestTokenError::Request(error) => ExchangeFailure::Transport(map_transport_error(error)),
		RequestTokenError::Parse(error, body) => match failed_status {
			Some(status) =>
				ExchangeFailure::Status { status, retry_after, message: body_excerpt(&body) },
			None => ExchangeFailure::Malformed(error.to_string()),
		},
		RequestTokenError::Other(message) => match failed_status {
			Some(status) => ExchangeFailure::Status { status, retry_after, message },
			None => ExchangeFailure::Malformed(message),
		},
	}
}

fn server_message(response: &BasicErrorResponse) -> String {
	match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	}
}

fn map_transport_error<E>(err: HttpClientError<E>) -> TransportError
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network("token endpoint", *inner),
		HttpClientError::Io(inner) => TransportError::Io(inner),
		HttpClientError::Http(inner) => TransportError::Other(inner.to_string()),
		HttpClientError::Other(message) => TransportError::Other(message),
		_ => TransportError::Other("unknown HTTP client failure".into()),
	}
}
