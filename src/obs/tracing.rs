// self
use crate::{_prelude::*, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("sapphire_access.call", kind = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
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

/// Logs a normalized call failure.
pub fn call_failed(method: &Method, endpoint: &str, message: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%method, endpoint, error = message, "API call failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, endpoint, message);
}

/// Logs the start of a shared refresh round.
pub fn refresh_started(reason: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::info!(reason, "Refreshing access token");
	#[cfg(not(feature = "tracing"))]
	let _ = reason;
}

/// Logs the end of a shared refresh round.
pub fn refresh_finished(error: Option<&str>) {
	#[cfg(feature = "tracing")]
	match error {
		None => tracing::info!("Access token refreshed"),
		Some(message) =>
			tracing::warn!(error = message, "Access token refresh failed; tokens cleared"),
	}
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

/// Logs a client-side redirect.
pub fn redirected(reason: &'static str, location: &str) {
	#[cfg(feature = "tracing")]
	tracing::info!(reason, location, "Redirecting");
	#[cfg(not(feature = "tracing"))]
	let _ = (reason, location);
}

/// Logs a storage write that failed where no caller can receive the error.
pub fn storage_failed(action: &'static str, message: &str) {
	#[cfg(feature = "tracing")]
	tracing::error!(action, error = message, "Client storage write failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (action, message);
}

/// Logs a cache hit.
pub fn cache_hit(key: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(key, "Serving cached response");
	#[cfg(not(feature = "tracing"))]
	let _ = key;
}

/// Logs a sweeper pass that removed entries.
pub fn cache_swept(removed: usize) {
	#[cfg(feature = "tracing")]
	if removed > 0 {
		tracing::debug!(removed, "Swept expired cache entries");
	}
	#[cfg(not(feature = "tracing"))]
	let _ = removed;
}
