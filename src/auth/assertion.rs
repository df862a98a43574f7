//! JWT client assertions presented to the token endpoint instead of a client secret.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, KeyId, SigningKey},
	error::AuthError,
};

/// `client_assertion_type` value for JWT bearer client authentication (RFC 7523).
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// JOSE header of a client assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionHeader {
	/// Signature algorithm, always `ES256`.
	pub alg: String,
	/// Registered key identifier.
	pub kid: String,
	/// Token type, always `JWT`.
	pub typ: String,
}

/// Registered claims carried by a client assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer; the client identifier.
	pub iss: String,
	/// Subject; the client identifier.
	pub sub: String,
	/// Audience the token endpoint expects.
	pub aud: String,
	/// Issued-at, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry, seconds since the Unix epoch.
	pub exp: i64,
	/// Unique assertion identifier.
	pub jti: String,
}

/// Unsigned client assertion; call [`ClientAssertion::sign`] to obtain the compact JWT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientAssertion {
	/// JOSE header.
	pub header: AssertionHeader,
	/// Claims set.
	pub claims: AssertionClaims,
}
impl ClientAssertion {
	/// Validity window of every assertion.
	pub const LIFETIME: Duration = Duration::seconds(1200);

	/// Builds an assertion issued at `issued_at` with a fresh `jti`.
	pub fn new(
		client_id: &ClientId,
		key_id: &KeyId,
		audience: &str,
		issued_at: OffsetDateTime,
	) -> Self {
		let iat = issued_at.unix_timestamp();

		Self {
			header: AssertionHeader {
				alg: SigningKey::ALGORITHM.into(),
				kid: key_id.to_string(),
				typ: "JWT".into(),
			},
			claims: AssertionClaims {
				iss: client_id.to_string(),
				sub: client_id.to_string(),
				aud: audience.to_owned(),
				iat,
				exp: iat + Self::LIFETIME.whole_seconds(),
				jti: uuid::Uuid::new_v4().to_string(),
			},
		}
	}

	/// Encodes and signs the assertion, returning `header.claims.signature`.
	pub fn sign(&self, key: &SigningKey) -> Result<String, AuthError> {
		let header = serde_json::to_vec(&self.header).map_err(AuthError::Assertion)?;
		let claims = serde_json::to_vec(&self.claims).map_err(AuthError::Assertion)?;
		let signing_input =
			format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(claims));
		let signature = key.sign(signing_input.as_bytes());

		Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
	}
}
