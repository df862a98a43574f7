// self
use crate::{_prelude::*, auth::Scope, obs::OpKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// Span builder shared by the issuer, executor, and paginator.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the operation kind and call site.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("org_device_api.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a `debug` event before a backoff sleep.
pub(crate) fn retry_scheduled(kind: OpKind, attempt: u32, status: Option<u16>, delay: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			op = kind.as_str(),
			attempt,
			status,
			delay_ms = u64::try_from(delay.whole_milliseconds()).unwrap_or(u64::MAX),
			"retry scheduled"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, attempt, status, delay);
	}
}

/// Emits a `debug` event once a new token is cached; the token value is never recorded.
pub(crate) fn token_refreshed(attempts: u32, expires_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(attempts, expires_at = %expires_at, "access token refreshed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempts, expires_at);
	}
}

/// Emits a `warn` event when a client's organization prefix disagrees with its configured scope.
pub(crate) fn scope_hint_mismatch(client_id: &str, hinted: Scope, configured: Scope) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			client_id,
			hinted = hinted.as_str(),
			configured = configured.as_str(),
			"client prefix does not match the configured scope"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (client_id, hinted, configured);
	}
}
