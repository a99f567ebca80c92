//! Single-flight token refresh shared by every request of a client.
//!
//! A refresh round is an [`OnceCell`] registered in the coordinator's slot. The first caller to
//! find the slot empty registers a round and becomes its [`RefreshRole::Leader`]; everyone who
//! arrives while it is registered joins the same cell as a [`RefreshRole::Follower`]. The cell
//! runs exactly one refresh future and hands its outcome to all participants, so a burst of
//! expiring or rejected requests produces one refresh call. Each participant unregisters the round
//! once it holds the outcome, which returns the coordinator to idle.
//!
//! If the leader is dropped mid-refresh, a waiting follower drives its own refresh future in the
//! same cell, so there is still at most one refresh call in flight.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Outcome shared by every participant of a refresh round.
pub type RefreshOutcome = Result<TokenSecret, RefreshError>;

type Round = Arc<OnceCell<RefreshOutcome>>;

/// Reasons a refresh round fails; cloned to every participant.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh token is stored, so no call was made.
	#[error("No refresh token is available.")]
	MissingRefreshToken,
	/// Refresh endpoint answered with a non-success status.
	#[error("{message}")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Server message or status fallback.
		message: String,
	},
	/// Refresh call failed before a response arrived.
	#[error("{message}")]
	Transport {
		/// Transport-supplied message.
		message: String,
	},
	/// Refresh response could not be read as a token grant.
	#[error("{message}")]
	MalformedResponse {
		/// Decoding failure text.
		message: String,
	},
	/// New tokens could not be persisted.
	#[error("Refreshed tokens could not be stored: {message}")]
	Storage {
		/// Storage failure text.
		message: String,
	},
}
impl RefreshError {
	/// HTTP status observed from the refresh endpoint, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// How a caller took part in a refresh round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshRole {
	/// Registered the round.
	Leader,
	/// Joined a round that was already registered.
	Follower,
}

/// Result of [`RefreshCoordinator::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshTicket {
	/// How the caller took part.
	pub role: RefreshRole,
	/// Outcome shared by the round.
	pub outcome: RefreshOutcome,
}
impl RefreshTicket {
	/// Returns `true` when the caller registered the round.
	pub fn is_leader(&self) -> bool {
		matches!(self.role, RefreshRole::Leader)
	}
}

/// Guarantees at most one outstanding refresh across all clones.
#[derive(Clone, Debug, Default)]
pub struct RefreshCoordinator {
	inflight: Arc<Mutex<Option<Round>>>,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` while a refresh round is registered.
	pub fn is_refreshing(&self) -> bool {
		self.inflight.lock().is_some()
	}

	/// Counters for refresh rounds driven by this coordinator.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Joins the registered round or starts one driven by `refresh`.
	///
	/// `refresh` runs only if this caller ends up initializing the round; it must persist or clear
	/// tokens itself before resolving, so every participant observes the settled state.
	pub async fn run<F, Fut>(&self, refresh: F) -> RefreshTicket
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = RefreshOutcome>,
	{
		let (round, role) = self.join_or_start();
		let participant = Participant { coordinator: self, round };
		let metrics = &self.metrics;
		let outcome = participant
			.round
			.get_or_init(|| async move {
				metrics.record_attempt();

				let outcome = refresh().await;

				match &outcome {
					Ok(_) => metrics.record_success(),
					Err(_) => metrics.record_failure(),
				}

				outcome
			})
			.await
			.clone();

		drop(participant);

		RefreshTicket { role, outcome }
	}

	/// Waits for the registered round, if there is one, without offering to drive it.
	pub fn subscribe(&self) -> Option<impl Future<Output = RefreshOutcome> + Send + 'static> {
		let round = self.inflight.lock().clone()?;
		let coordinator = self.clone();

		Some(async move {
			let outcome = round.wait().await.clone();

			coordinator.finish(&round);

			outcome
		})
	}

	fn join_or_start(&self) -> (Round, RefreshRole) {
		let mut slot = self.inflight.lock();

		match slot.as_ref() {
			Some(round) => (round.clone(), RefreshRole::Follower),
			None => {
				let round = Arc::new(OnceCell::new());

				*slot = Some(round.clone());

				(round, RefreshRole::Leader)
			},
		}
	}

	fn finish(&self, round: &Round) {
		let mut slot = self.inflight.lock();

		if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, round)) {
			*slot = None;
		}
	}

	/// Unregisters `round` once settled, or when its last driver leaves it uninitialized.
	fn leave(&self, round: &Round) {
		let mut slot = self.inflight.lock();
		let Some(current) = slot.as_ref().filter(|current| Arc::ptr_eq(current, round)) else {
			return;
		};
		// One handle in the slot plus the one held by the leaving participant.
		let abandoned = Arc::strong_count(current) <= 2;

		if current.is_initialized() || abandoned {
			*slot = None;
		}
	}
}

/// Membership in a refresh round; leaving (including by cancellation) may unregister it.
struct Participant<'a> {
	coordinator: &'a RefreshCoordinator,
	round: Round,
}
impl Drop for Participant<'_> {
	fn drop(&mut self) {
		self.coordinator.leave(&self.round);
	}
}
