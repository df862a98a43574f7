//! Optional observability helpers for token, request, and pagination operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `org_device_api.op` with the `op`
//!   and `stage` fields, `debug` events for scheduled retries and token refreshes, and `warn`
//!   events from [`TracingDiagnostics`].
//! - Enable `metrics` to increment the `org_device_api_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.
//!
//! Token values and key material never appear in any field.

mod diagnostics;
mod metrics;
mod tracing;

pub use diagnostics::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Client-assertion exchange at the token endpoint.
	TokenFetch,
	/// Single resource API request, including its retries.
	Request,
	/// Cursor-driven listing.
	Paginate,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::TokenFetch => "token_fetch",
			OpKind::Request => "request",
			OpKind::Paginate => "paginate",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Operation started.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
