//! Exponential backoff with jitter, shared by the token exchange and resource calls.
//!
//! For attempt `n` (1-based) the pre-jitter delay is `min(max_delay, base_delay * 2^(n-1))`, so
//! it never decreases from one attempt to the next. Jitter then adds a uniform sample from
//! `[0, jitter_factor * delay]`. A server-supplied `Retry-After` replaces the computed value for
//! that attempt.

// std
use std::collections::BTreeSet;
// crates.io
use rand::Rng;
// self
use crate::{_prelude::*, error::ConfigError};

/// Bounded retry configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Total attempts, including the first; `1` disables retries.
	pub max_attempts: u32,
	/// Delay before the second attempt.
	#[serde(with = "duration_millis")]
	pub base_delay: Duration,
	/// Upper bound for the pre-jitter delay.
	#[serde(with = "duration_millis")]
	pub max_delay: Duration,
	/// Fraction of the delay added as random jitter, within `0.0..=1.0`.
	pub jitter_factor: f64,
	/// HTTP statuses that trigger a retry.
	pub retryable_statuses: BTreeSet<u16>,
}
impl RetryPolicy {
	/// Largest accepted `max_delay`.
	pub const MAX_DELAY_CEILING: Duration = Duration::hours(1);
	/// Statuses retried by resource calls.
	pub const RESOURCE_STATUSES: [u16; 5] = [408, 429, 502, 503, 504];

	/// Policy for token endpoint calls: rate limiting and every server error are retryable.
	pub fn token_endpoint() -> Self {
		Self { retryable_statuses: std::iter::once(429).chain(500..=599).collect(), ..Self::default() }
	}

	/// Policy that makes exactly one attempt.
	pub fn no_retry() -> Self {
		Self { max_attempts: 1, ..Self::default() }
	}

	/// Overrides the attempt budget.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts;

		self
	}

	/// Overrides the base delay.
	pub fn with_base_delay(mut self, delay: Duration) -> Self {
		self.base_delay = delay;

		self
	}

	/// Overrides the delay cap.
	pub fn with_max_delay(mut self, delay: Duration) -> Self {
		self.max_delay = delay;

		self
	}

	/// Overrides the jitter factor.
	pub fn with_jitter_factor(mut self, factor: f64) -> Self {
		self.jitter_factor = factor;

		self
	}

	/// Replaces the retryable status set.
	pub fn with_retryable_statuses<I>(mut self, statuses: I) -> Self
	where
		I: IntoIterator<Item = u16>,
	{
		self.retryable_statuses = statuses.into_iter().collect();

		self
	}

	/// Checks the policy invariants.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_attempts == 0 {
			return Err(ConfigError::InvalidRetryPolicy { reason: "max_attempts must be at least 1" });
		}
		if self.base_delay.is_negative() {
			return Err(ConfigError::InvalidRetryPolicy { reason: "base_delay must not be negative" });
		}
		if self.max_delay < self.base_delay {
			return Err(ConfigError::InvalidRetryPolicy {
				reason: "max_delay must not be smaller than base_delay",
			});
		}
		if self.max_delay > Self::MAX_DELAY_CEILING {
			return Err(ConfigError::InvalidRetryPolicy { reason: "max_delay must not exceed one hour" });
		}
		if !(0.0..=1.0).contains(&self.jitter_factor) {
			return Err(ConfigError::InvalidRetryPolicy {
				reason: "jitter_factor must be within 0.0..=1.0",
			});
		}

		Ok(())
	}

	/// Returns `true` if `status` should be retried.
	pub fn is_retryable(&self, status: u16) -> bool {
		self.retryable_statuses.contains(&status)
	}

	/// Returns `true` if another attempt is allowed after `attempt` attempts.
	pub fn allows_another(&self, attempt: u32) -> bool {
		attempt < self.max_attempts
	}

	/// Pre-jitter delay after the given 1-based attempt.
	pub fn backoff(&self, attempt: u32) -> Duration {
		let exponent = attempt.saturating_sub(1);

		2_i32
			.checked_pow(exponent)
			.and_then(|factor| self.base_delay.checked_mul(factor))
			.map_or(self.max_delay, |delay| delay.min(self.max_delay))
	}

	/// Delay to wait after `attempt`, honoring a server `Retry-After` hint when present.
	pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
		if let Some(server) = retry_after {
			return server.max(Duration::ZERO);
		}

		let delay = self.backoff(attempt);

		delay.saturating_add(self.jitter(delay))
	}

	fn jitter(&self, delay: Duration) -> Duration {
		if self.jitter_factor <= 0.0 || !delay.is_positive() {
			return Duration::ZERO;
		}

		let fraction = rand::rng().random_range(0.0..=self.jitter_factor);

		Duration::checked_seconds_f64(delay.as_seconds_f64() * fraction).unwrap_or(Duration::ZERO)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			base_delay: Duration::seconds(1),
			max_delay: Duration::seconds(30),
			jitter_factor: 0.2,
			retryable_statuses: Self::RESOURCE_STATUSES.into_iter().collect(),
		}
	}
}

/// Sleeps for `delay`; non-positive delays return immediately.
pub(crate) async fn pause(delay: Duration) {
	if delay.is_positive() {
		tokio::time::sleep(delay.unsigned_abs()).await;
	}
}

mod duration_millis {
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer};
	use time::Duration;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let millis = i64::try_from(value.whole_milliseconds()).unwrap_or(i64::MAX);

		serializer.serialize_i64(millis)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::milliseconds)
	}
}
