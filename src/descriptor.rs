//! Validated endpoint configuration for the token exchange and the resource APIs.
//!
//! A [`ServiceDescriptor`] names the token endpoint, the audience placed in client assertions,
//! and one resource base URL per [`Scope`]. [`ServiceDescriptor::production`] targets the
//! production hosts; tests and staging setups assemble their own through
//! [`ServiceDescriptor::builder`].

/// Builder API for assembling service descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::Scope, error::ConfigError};

/// Immutable endpoint set consumed by the issuer and the executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
	/// Token endpoint receiving client-assertion exchanges.
	pub token_endpoint: Url,
	/// `aud` claim of every client assertion.
	pub assertion_audience: String,
	/// Resource base URL for [`Scope::Business`].
	pub business_base_url: Url,
	/// Resource base URL for [`Scope::School`].
	pub school_base_url: Url,
}
impl ServiceDescriptor {
	/// Production token endpoint.
	pub const TOKEN_ENDPOINT: &'static str = "https://account.apple.com/auth/oauth2/token";
	/// Production client-assertion audience.
	pub const ASSERTION_AUDIENCE: &'static str = "https://account.apple.com/auth/oauth2/v2/token";
	/// Production base URL for business organizations.
	pub const BUSINESS_BASE_URL: &'static str = "https://api-business.apple.com";
	/// Production base URL for school organizations.
	pub const SCHOOL_BASE_URL: &'static str = "https://api-school.apple.com";

	/// Descriptor for the production hosts.
	pub fn production() -> Result<Self, ConfigError> {
		Ok(Self {
			token_endpoint: parse_url(Self::TOKEN_ENDPOINT)?,
			assertion_audience: Self::ASSERTION_AUDIENCE.into(),
			business_base_url: parse_url(Self::BUSINESS_BASE_URL)?,
			school_base_url: parse_url(Self::SCHOOL_BASE_URL)?,
		})
	}

	/// Creates an empty builder.
	pub fn builder() -> ServiceDescriptorBuilder {
		ServiceDescriptorBuilder::default()
	}

	/// Returns the resource base URL serving `scope`.
	pub fn base_url(&self, scope: Scope) -> &Url {
		match scope {
			Scope::Business => &self.business_base_url,
			Scope::School => &self.school_base_url,
		}
	}

	/// Resolves `path` and `query` against the base URL of `scope`.
	///
	/// `path` is appended to the base URL's own path, so base URLs with a prefix
	/// (`https://host/prefix`) keep it.
	pub fn resource_url(
		&self,
		scope: Scope,
		path: &str,
		query: &[(String, String)],
	) -> Result<Url, ConfigError> {
		let base = self.base_url(scope);
		let joined =
			format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));
		let mut url = parse_url(&joined)?;

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		Ok(url)
	}
}
fn parse_url(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })
}
