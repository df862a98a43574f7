//! Validated identifiers for client credentials and credential-store profiles.
//!
//! Client and key identifiers travel inside form bodies and JWT headers, so they are restricted to
//! visible ASCII. Profile names key credential stores and accept a narrower, file-name-safe set.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::{_prelude::*, auth::Scope};

/// Longest identifier accepted by any of the wrappers in this module.
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Nothing was supplied.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Which identifier failed (`client`, `key`, `profile`).
		kind: &'static str,
	},
	/// A character outside the identifier's alphabet was found.
	#[error("{kind} identifier contains {found:?} at byte {position}.")]
	InvalidCharacter {
		/// Which identifier failed (`client`, `key`, `profile`).
		kind: &'static str,
		/// The offending character.
		found: char,
		/// Byte offset of the offending character.
		position: usize,
	},
	/// The identifier is longer than [`MAX_IDENTIFIER_LEN`].
	#[error("{kind} identifier is {len} bytes long; the limit is {max}.")]
	TooLong {
		/// Which identifier failed (`client`, `key`, `profile`).
		kind: &'static str,
		/// Observed length in bytes.
		len: usize,
		/// Maximum permitted length in bytes.
		max: usize,
	},
}

macro_rules! identifier {
	($(#[$meta:meta])* $name:ident, kind = $kind:literal, allows = $allows:path) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates `value` and wraps it.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				check($kind, &value, $allows)?;

				Ok(Self(value))
			}

			/// Borrows the raw identifier.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.debug_tuple(stringify!($name)).field(&self.0).finish()
			}
		}
	};
}

identifier! {
	/// OAuth client identifier; doubles as the assertion issuer and subject.
	///
	/// Registered clients carry a `BUSINESSAPI.` or `SCHOOLAPI.` prefix naming the organization
	/// type; see [`ClientId::scope_hint`].
	ClientId, kind = "client", allows = visible_ascii
}
identifier! {
	/// Identifier of the registered public key, sent as the JWT `kid` header.
	KeyId, kind = "key", allows = visible_ascii
}
identifier! {
	/// Name under which a credential store files a set of credentials.
	ProfileName, kind = "profile", allows = profile_char
}

impl ClientId {
	/// Scope implied by the client's organization prefix, if it has a recognized one.
	pub fn scope_hint(&self) -> Option<Scope> {
		let (prefix, _) = self.0.split_once('.')?;

		match prefix {
			"BUSINESSAPI" => Some(Scope::Business),
			"SCHOOLAPI" => Some(Scope::School),
			_ => None,
		}
	}
}

fn visible_ascii(c: char) -> bool {
	c.is_ascii_graphic()
}

fn profile_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn check(
	kind: &'static str,
	value: &str,
	allows: fn(char) -> bool,
) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.len() > MAX_IDENTIFIER_LEN {
		return Err(IdentifierError::TooLong { kind, len: value.len(), max: MAX_IDENTIFIER_LEN });
	}
	if let Some((position, found)) = value.char_indices().find(|&(_, c)| !allows(c)) {
		return Err(IdentifierError::InvalidCharacter { kind, found, position });
	}

	Ok(())
}
