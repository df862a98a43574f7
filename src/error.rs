//! Crate-level error types shared by the token issuer, request executor, and paginator.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Retries happen internally; once a variant reaches the caller the retry budget is spent or the
/// failure was never retryable.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Private key could not be parsed or converted.
	#[error(transparent)]
	KeyFormat(#[from] KeyFormatError),
	/// Token issuance or refresh failed terminally.
	#[error(transparent)]
	Auth(#[from] AuthError),

	/// Resource API returned a non-retryable status or exhausted its retries.
	#[error("API request failed with HTTP {status} after {attempts} attempt(s): {body}")]
	Api {
		/// Last HTTP status observed.
		status: u16,
		/// Truncated response body.
		body: String,
		/// Attempts consumed, including the first.
		attempts: u32,
	},
	/// HTTP 429 persisted until the retry budget ran out.
	#[error("Rate limit still exceeded after {attempts} attempt(s): {body}")]
	RateLimitExceeded {
		/// Truncated response body of the last 429.
		body: String,
		/// Attempts consumed, including the first.
		attempts: u32,
		/// Last Retry-After hint supplied by the server.
		retry_after: Option<Duration>,
	},
	/// Transport failure (DNS, TCP, TLS, timeout) persisted after retries.
	#[error("Network failure after {attempts} attempt(s).")]
	Network {
		/// Attempts consumed, including the first.
		attempts: u32,
		/// Last transport failure.
		#[source]
		source: TransportError,
	},
	/// Credential store does not know the requested profile.
	#[error("Credential profile `{profile}` was not found.")]
	ProfileNotFound {
		/// Profile name that was requested.
		profile: String,
	},
	/// A successful response body could not be decoded into the requested type.
	#[error("Response body with HTTP {status} could not be decoded.")]
	Decode {
		/// HTTP status of the response.
		status: u16,
		/// Structured decoding failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The overall command deadline elapsed.
	#[error("Command deadline exceeded.")]
	DeadlineExceeded,
}
impl Error {
	/// Returns the HTTP status associated with the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api { status, .. } | Self::Decode { status, .. } => Some(*status),
			Self::RateLimitExceeded { .. } => Some(429),
			Self::Auth(err) => err.status(),
			_ => None,
		}
	}

	/// Returns the number of attempts consumed before the failure surfaced.
	pub fn attempts(&self) -> Option<u32> {
		match self {
			Self::Api { attempts, .. }
			| Self::RateLimitExceeded { attempts, .. }
			| Self::Network { attempts, .. } => Some(*attempts),
			Self::Auth(err) => err.attempts(),
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Descriptor or request contains an invalid URL.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Service descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::descriptor::DescriptorError),
	/// Retry policy failed validation.
	#[error("Retry policy is invalid: {reason}.")]
	InvalidRetryPolicy {
		/// Which invariant was violated.
		reason: &'static str,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[source] serde_json::Error),
	/// Request targets a scope the session holds no token for.
	#[error("Request targets scope {requested} but the session is authorized for {authorized}.")]
	ScopeMismatch {
		/// Scope named by the request.
		requested: crate::auth::Scope,
		/// Scope of the issuer's tokens.
		authorized: crate::auth::Scope,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Private key parsing and conversion failures.
#[derive(Debug, ThisError)]
pub enum KeyFormatError {
	/// Key bytes are not valid UTF-8 PEM text.
	#[error("Private key is not UTF-8 encoded PEM text.")]
	NotPem,
	/// The PEM label is neither PKCS#8 nor SEC1.
	#[error("Private key container `{label}` is not supported.")]
	UnsupportedContainer {
		/// PEM label that was found, or `<none>`.
		label: String,
	},
	/// SEC1 to PKCS#8 conversion failed.
	#[error("Private key could not be converted to PKCS#8: {reason}.")]
	Conversion {
		/// Converter-supplied reason.
		reason: String,
	},
	/// PKCS#8 document could not be parsed as a P-256 signing key.
	#[error("Private key is not a valid P-256 PKCS#8 key: {reason}.")]
	Parse {
		/// Parser-supplied reason.
		reason: String,
	},
}

/// Token endpoint failures; every variant is terminal for the current token request.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered with an error status or an OAuth error document.
	#[error("Token endpoint rejected the request after {attempts} attempt(s): {message}.")]
	TokenEndpoint {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Endpoint- or crate-supplied description.
		message: String,
		/// Attempts consumed, including the first.
		attempts: u32,
	},
	/// Token endpoint could not be reached.
	#[error("Token endpoint could not be reached after {attempts} attempt(s).")]
	Transport {
		/// Attempts consumed, including the first.
		attempts: u32,
		/// Last transport failure.
		#[source]
		source: TransportError,
	},
	/// Token endpoint returned a success document that cannot be used.
	#[error("Token endpoint response is unusable: {reason}.")]
	MalformedResponse {
		/// Which field was missing or invalid.
		reason: String,
	},
	/// Resource API kept rejecting a freshly issued token.
	#[error("Resource API rejected a freshly issued token with HTTP {status}.")]
	Rejected {
		/// HTTP status of the rejection.
		status: u16,
	},
	/// Client assertion could not be encoded.
	#[error("Client assertion could not be encoded.")]
	Assertion(#[source] serde_json::Error),
}
impl AuthError {
	/// Returns the HTTP status associated with the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::TokenEndpoint { status, .. } => *status,
			Self::Rejected { status } => Some(*status),
			_ => None,
		}
	}

	/// Returns the number of token endpoint attempts, when applicable.
	pub fn attempts(&self) -> Option<u32> {
		match self {
			Self::TokenEndpoint { attempts, .. } | Self::Transport { attempts, .. } =>
				Some(*attempts),
			_ => None,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Which endpoint family was being called.
		target: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
	/// HTTP client reported a failure without a typed cause.
	#[error("HTTP client error: {0}.")]
	Other(String),
}
impl TransportError {
	/// Wraps a transport-specific network error raised while calling `target`.
	pub fn network(target: &'static str, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { target, source: Box::new(src) }
	}
}
