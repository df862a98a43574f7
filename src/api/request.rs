//! Immutable descriptions of resource API calls.

// crates.io
use reqwest::Method;
// self
use crate::{_prelude::*, auth::Scope, error::ConfigError};

/// Query parameter carrying the pagination cursor.
pub const CURSOR_PARAM: &str = "cursor";

/// One resource API call: method, path relative to the scope's base URL, query, and JSON body.
///
/// Builder methods consume and return the value; [`RequestSpec::with_cursor`] derives a new
/// spec from a borrowed template so paginated listings never mutate it.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
	/// HTTP method.
	pub method: Method,
	/// Path appended to the base URL, e.g. `/v1/orgDevices`.
	pub path: String,
	/// Target scope; `None` uses the scope of the session's credentials.
	pub scope: Option<Scope>,
	/// Query parameters in insertion order.
	pub query: Vec<(String, String)>,
	/// JSON request body.
	pub body: Option<serde_json::Value>,
}
impl RequestSpec {
	/// Creates a spec with no query and no body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), scope: None, query: Vec::new(), body: None }
	}

	/// `GET path`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST path` with a JSON body.
	pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
		Self::new(Method::POST, path).with_body(body)
	}

	/// Pins the request to `scope`.
	pub fn with_scope(mut self, scope: Scope) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Sets or replaces the query parameter `name`.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		let name = name.into();
		let value = value.into();

		match self.query.iter_mut().find(|(key, _)| *key == name) {
			Some(slot) => slot.1 = value,
			None => self.query.push((name, value)),
		}

		self
	}

	/// Sets the JSON body.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Serializes `body` and sets it as the JSON body.
	pub fn with_json<T>(self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let value = serde_json::to_value(body).map_err(ConfigError::RequestBody)?;

		Ok(self.with_body(value))
	}

	/// Derives the spec for one page: the template with `cursor` set, or untouched when `None`.
	pub fn with_cursor(&self, cursor: Option<&str>) -> Self {
		match cursor {
			Some(cursor) => self.clone().with_query(CURSOR_PARAM, cursor),
			None => self.clone(),
		}
	}

	/// Returns the value of query parameter `name`.
	pub fn query_value(&self, name: &str) -> Option<&str> {
		self.query.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
	}
}
