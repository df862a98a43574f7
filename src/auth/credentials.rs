//! Client credentials, API scopes, and the credential-store contract.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, KeyId, KeyMaterial, ProfileName},
};

/// API audience; selects the resource host and the OAuth `scope` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
	/// Business organizations.
	#[serde(rename = "business.api")]
	Business,
	/// School organizations.
	#[serde(rename = "school.api")]
	School,
}
impl Scope {
	/// Returns the OAuth scope string.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Business => "business.api",
			Self::School => "school.api",
		}
	}
}
impl Display for Scope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Scope {
	type Err = UnknownScope;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"business.api" | "business" => Ok(Self::Business),
			"school.api" | "school" => Ok(Self::School),
			other => Err(UnknownScope(other.to_owned())),
		}
	}
}

/// Error returned when parsing an unknown [`Scope`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Scope `{0}` is not supported; expected business.api or school.api.")]
pub struct UnknownScope(pub String);

/// Long-lived client credentials resolved once per invocation.
#[derive(Clone)]
pub struct Credentials {
	/// OAuth client identifier.
	pub client_id: ClientId,
	/// Registered key identifier.
	pub key_id: KeyId,
	/// PEM-encoded private key.
	pub private_key: KeyMaterial,
	/// API audience the credentials were issued for.
	pub scope: Scope,
}
impl Credentials {
	/// Bundles validated identifiers with their private key.
	pub fn new(
		client_id: ClientId,
		key_id: KeyId,
		private_key: impl Into<String>,
		scope: Scope,
	) -> Self {
		Self { client_id, key_id, private_key: KeyMaterial::new(private_key), scope }
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("key_id", &self.key_id)
			.field("private_key", &"<redacted>")
			.field("scope", &self.scope)
			.finish()
	}
}

/// Boxed future returned by [`CredentialStore::load`].
pub type CredentialFuture<'a> = Pin<Box<dyn Future<Output = Result<Credentials>> + 'a + Send>>;

/// Source of credentials keyed by profile name, typically a keychain or secret store.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Loads the credentials filed under `profile`.
	///
	/// Implementations return [`Error::ProfileNotFound`] for unknown profiles.
	fn load<'a>(&'a self, profile: &'a ProfileName) -> CredentialFuture<'a>;
}

/// Thread-safe in-process [`CredentialStore`] for tests and embedding callers.
#[derive(Clone, Debug, Default)]
pub struct MemoryCredentialStore(Arc<RwLock<HashMap<ProfileName, Credentials>>>);
impl MemoryCredentialStore {
	/// Files `credentials` under `profile`, replacing any previous entry.
	pub fn insert(&self, profile: ProfileName, credentials: Credentials) {
		self.0.write().insert(profile, credentials);
	}

	/// Removes the entry filed under `profile`.
	pub fn remove(&self, profile: &ProfileName) -> Option<Credentials> {
		self.0.write().remove(profile)
	}

	fn load_now(&self, profile: &ProfileName) -> Result<Credentials> {
		self.0
			.read()
			.get(profile)
			.cloned()
			.ok_or_else(|| Error::ProfileNotFound { profile: profile.to_string() })
	}
}
impl CredentialStore for MemoryCredentialStore {
	fn load<'a>(&'a self, profile: &'a ProfileName) -> CredentialFuture<'a> {
		Box::pin(async move { self.load_now(profile) })
	}
}
