// self
use crate::_prelude::*;

/// Context reported for every terminal resource-call failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
	/// HTTP method of the failed request.
	pub method: String,
	/// Fully resolved request URL, query included.
	pub url: String,
	/// Last HTTP status, if any response arrived.
	pub status: Option<u16>,
	/// Response body excerpt, or the transport error text.
	pub body: String,
	/// Attempts consumed, including the first.
	pub attempts: u32,
}
impl Display for Diagnostic {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self.status {
			Some(status) => write!(
				f,
				"{} {} -> HTTP {status} after {} attempt(s): {}",
				self.method, self.url, self.attempts, self.body
			),
			None => write!(
				f,
				"{} {} -> no response after {} attempt(s): {}",
				self.method, self.url, self.attempts, self.body
			),
		}
	}
}

/// Receiver of [`Diagnostic`] reports.
pub trait DiagnosticsSink
where
	Self: Send + Sync,
{
	/// Called once, right before the failure is returned to the caller.
	fn report(&self, diagnostic: &Diagnostic);
}

/// Default sink; emits a `warn` event when the `tracing` feature is enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;
impl DiagnosticsSink for TracingDiagnostics {
	fn report(&self, diagnostic: &Diagnostic) {
		#[cfg(feature = "tracing")]
		{
			tracing::warn!(
				method = %diagnostic.method,
				url = %diagnostic.url,
				status = diagnostic.status,
				attempts = diagnostic.attempts,
				body = %diagnostic.body,
				"API request failed"
			);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = diagnostic;
		}
	}
}

/// Sink that keeps every report in memory, useful for tests and for rendering a summary later.
#[derive(Clone, Debug, Default)]
pub struct MemoryDiagnostics(Arc<Mutex<Vec<Diagnostic>>>);
impl MemoryDiagnostics {
	/// Returns a snapshot of the collected reports.
	pub fn records(&self) -> Vec<Diagnostic> {
		self.0.lock().clone()
	}
}
impl DiagnosticsSink for MemoryDiagnostics {
	fn report(&self, diagnostic: &Diagnostic) {
		self.0.lock().push(diagnostic.clone());
	}
}
