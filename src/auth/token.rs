//! In-memory bearer tokens issued by the token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{Scope, TokenSecret},
};

/// Short-lived bearer token; never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
	/// Bearer value; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Scope the token was issued for.
	pub scope: Scope,
	/// Instant the token endpoint answered.
	pub issued_at: OffsetDateTime,
	/// Instant after which the token must not be used.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token valid for `expires_in` from `issued_at`.
	pub fn new(
		secret: impl Into<String>,
		scope: Scope,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self { secret: TokenSecret::new(secret), scope, issued_at, expires_at: issued_at + expires_in }
	}

	/// Time left before expiry at `now`; negative once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at - now
	}

	/// Returns `true` while more than `margin` of lifetime remains at `now`.
	pub fn is_fresh_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		self.remaining_at(now) > margin
	}

	/// Returns `true` once `now` reaches the expiry instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}

	/// `Authorization` header value.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
