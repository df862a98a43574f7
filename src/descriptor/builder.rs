// self
use crate::{_prelude::*, descriptor::ServiceDescriptor};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum DescriptorError {
	/// A required endpoint was not supplied.
	#[error("Missing {endpoint} endpoint.")]
	MissingEndpoint {
		/// Which endpoint is missing.
		endpoint: &'static str,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The assertion audience must not be blank.
	#[error("Assertion audience must not be empty.")]
	EmptyAudience,
}

/// Builder for [`ServiceDescriptor`] values.
#[derive(Debug, Default)]
pub struct ServiceDescriptorBuilder {
	/// Token endpoint receiving client-assertion exchanges.
	pub token_endpoint: Option<Url>,
	/// Optional `aud` override; defaults to the token endpoint URL.
	pub assertion_audience: Option<String>,
	/// Resource base URL for business organizations.
	pub business_base_url: Option<Url>,
	/// Resource base URL for school organizations.
	pub school_base_url: Option<Url>,
}
impl ServiceDescriptorBuilder {
	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the client-assertion audience.
	pub fn assertion_audience(mut self, audience: impl Into<String>) -> Self {
		self.assertion_audience = Some(audience.into());

		self
	}

	/// Sets the business resource base URL.
	pub fn business_base_url(mut self, url: Url) -> Self {
		self.business_base_url = Some(url);

		self
	}

	/// Sets the school resource base URL.
	pub fn school_base_url(mut self, url: Url) -> Self {
		self.school_base_url = Some(url);

		self
	}

	/// Points both resource scopes at the same base URL.
	pub fn resource_base_url(self, url: Url) -> Self {
		self.business_base_url(url.clone()).school_base_url(url)
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ServiceDescriptor, DescriptorError> {
		let token_endpoint =
			self.token_endpoint.ok_or(DescriptorError::MissingEndpoint { endpoint: "token" })?;
		let business_base_url = self
			.business_base_url
			.ok_or(DescriptorError::MissingEndpoint { endpoint: "business" })?;
		let school_base_url =
			self.school_base_url.ok_or(DescriptorError::MissingEndpoint { endpoint: "school" })?;
		let assertion_audience =
			self.assertion_audience.unwrap_or_else(|| token_endpoint.to_string());
		let descriptor =
			ServiceDescriptor { token_endpoint, assertion_audience, business_base_url, school_base_url };

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ServiceDescriptor {
	/// Checks every endpoint; deserialized descriptors should be validated before use.
	pub fn validate(&self) -> Result<(), DescriptorError> {
		validate_endpoint("token", &self.token_endpoint)?;
		validate_endpoint("business", &self.business_base_url)?;
		validate_endpoint("school", &self.school_base_url)?;

		if self.assertion_audience.trim().is_empty() {
			return Err(DescriptorError::EmptyAudience);
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), DescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(DescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}
