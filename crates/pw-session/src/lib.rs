//! Per-tab navigation lifecycle and stale-result arbitration.
//!
//! Each tab owns one [`TabSession`]. A navigation hands the fetch engine a
//! [`NavigationRequest`] tagged with a generation counter; whichever
//! request id is current when a result arrives decides whether that result
//! is applied or discarded. A newer navigation always supersedes an older
//! in-flight one, even when the older result lands later (or earlier) on
//! the completion channel.

use pw_locator::Locator;
use pw_trust::ConnectionInfo;
use pw_trust::FetchResult;
use tracing::debug;

/// Monotonic per-tab navigation generation.
pub type RequestId = u64;

/// One navigation attempt handed to the fetch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub request_id: RequestId,
    pub locator: Locator,
}

impl NavigationRequest {
    /// Canonical locator string dispatched to the engine.
    pub fn canonical_url(&self) -> String {
        self.locator.canonical()
    }
}

/// External fetch/handshake collaborator seam.
///
/// Implementations own transport, timeouts, and cancellation; the session
/// only consumes the terminal [`FetchResult`] they produce.
pub trait FetchEngine {
    fn fetch(&self, request: &NavigationRequest) -> FetchResult;
}

/// Navigation lifecycle of a single tab.
///
/// Terminal states transition back to `Resolving` only through a new
/// navigation or an explicit retry, never on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationState {
    Idle,
    Resolving {
        request_id: RequestId,
        locator: Locator,
    },
    Resolved {
        locator: Locator,
        result: FetchResult,
    },
    Failed {
        locator: Locator,
        result: FetchResult,
    },
}

/// Whether a completion was applied to the session or discarded as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Applied,
    Stale,
}

/// Per-tab navigation state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSession {
    state: NavigationState,
    next_request_id: RequestId,
}

impl Default for TabSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TabSession {
    pub fn new() -> Self {
        Self {
            state: NavigationState::Idle,
            next_request_id: 1,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Request id the session is currently waiting on, if any.
    pub fn inflight_request_id(&self) -> Option<RequestId> {
        match &self.state {
            NavigationState::Resolving { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self.state, NavigationState::Resolving { .. })
    }

    /// Starts a navigation attempt, superseding any in-flight one.
    ///
    /// The previous attempt is not cancelled; its eventual completion will
    /// carry a stale request id and be discarded.
    pub fn begin_navigation(&mut self, locator: Locator) -> NavigationRequest {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.saturating_add(1);

        self.state = NavigationState::Resolving {
            request_id,
            locator: locator.clone(),
        };

        NavigationRequest {
            request_id,
            locator,
        }
    }

    /// Applies a fetch-engine result.
    ///
    /// Only the result tagged with the current in-flight request id wins;
    /// anything else (an abandoned attempt, or a completion arriving after
    /// the tab already moved on) is reported as [`CompletionOutcome::Stale`]
    /// and leaves the session untouched.
    pub fn complete(&mut self, request_id: RequestId, result: FetchResult) -> CompletionOutcome {
        let NavigationState::Resolving {
            request_id: inflight,
            locator,
        } = &self.state
        else {
            debug!(request_id, "discarding navigation result for settled tab");
            return CompletionOutcome::Stale;
        };

        if *inflight != request_id {
            debug!(
                request_id,
                inflight = *inflight,
                "discarding stale navigation result"
            );
            return CompletionOutcome::Stale;
        }

        let locator = locator.clone();
        self.state = if result.ok {
            NavigationState::Resolved { locator, result }
        } else {
            NavigationState::Failed { locator, result }
        };
        CompletionOutcome::Applied
    }

    /// Restarts a terminal attempt from scratch with a fresh request id.
    /// Returns `None` while idle or still resolving. The new attempt's log
    /// starts empty; logs are never merged across attempts.
    pub fn retry(&mut self) -> Option<NavigationRequest> {
        let locator = match &self.state {
            NavigationState::Resolved { locator, .. } | NavigationState::Failed { locator, .. } => {
                locator.clone()
            }
            _ => return None,
        };
        Some(self.begin_navigation(locator))
    }

    /// Synchronous convenience for engines that resolve inline.
    pub fn navigate_blocking(
        &mut self,
        engine: &dyn FetchEngine,
        locator: Locator,
    ) -> CompletionOutcome {
        let request = self.begin_navigation(locator);
        let result = engine.fetch(&request);
        self.complete(request.request_id, result)
    }

    /// Terminal result of the last settled attempt, if any.
    pub fn last_result(&self) -> Option<&FetchResult> {
        match &self.state {
            NavigationState::Resolved { result, .. } | NavigationState::Failed { result, .. } => {
                Some(result)
            }
            _ => None,
        }
    }

    /// Provenance of the last settled attempt. Partial logs from failed
    /// attempts are preserved so the UI can show which stages passed.
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        self.last_result().and_then(FetchResult::connection_info)
    }

    /// Aggregate trust indicator: `Some(true)` only when handshake
    /// activity was recorded and every stage passed. `None` means no
    /// information, which must never render as verified.
    pub fn trust_verified(&self) -> Option<bool> {
        self.connection_info().map(|info| info.all_verified())
    }

    /// Error string of the last settled attempt, if it failed.
    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            NavigationState::Failed { result, .. } => result.error.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CompletionOutcome;
    use super::FetchEngine;
    use super::NavigationRequest;
    use super::NavigationState;
    use super::TabSession;
    use pw_locator::Locator;
    use pw_trust::ConnectionIdentity;
    use pw_trust::FetchResult;
    use pw_trust::LogStep;

    #[track_caller]
    fn locator(raw: &str) -> Locator {
        match Locator::parse(raw) {
            Ok(locator) => locator,
            Err(error) => panic!("{error}"),
        }
    }

    fn success_for(request: &NavigationRequest) -> FetchResult {
        FetchResult {
            ok: true,
            error: None,
            status: Some("20".to_owned()),
            status_details: None,
            body: Some(format!("served {}", request.canonical_url())),
            headers: Vec::new(),
            connection: Some(ConnectionIdentity {
                client_node_id: "client".to_owned(),
                server_node_id: request.locator.node_id().to_owned(),
                server_pubkey: "aa".to_owned(),
            }),
            log: vec![
                LogStep::passed("client established connection"),
                LogStep::passed("fetched resource"),
            ],
        }
    }

    struct InlineEngine;

    impl FetchEngine for InlineEngine {
        fn fetch(&self, request: &NavigationRequest) -> FetchResult {
            success_for(request)
        }
    }

    #[test]
    fn canonical_url_is_dispatched_for_shorthand_input() {
        let mut session = TabSession::new();
        let request = session.begin_navigation(locator("hello"));
        assert_eq!(request.canonical_url(), "web://[hello]:6937/");
        assert!(session.is_resolving());
    }

    #[test]
    fn successful_completion_resolves_the_tab() {
        let mut session = TabSession::new();
        let outcome = session.navigate_blocking(&InlineEngine, locator("hello"));
        assert_eq!(outcome, CompletionOutcome::Applied);
        assert!(matches!(
            session.state(),
            NavigationState::Resolved { .. }
        ));
        assert_eq!(session.trust_verified(), Some(true));
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn failed_completion_keeps_partial_provenance() {
        let mut session = TabSession::new();
        let request = session.begin_navigation(locator("hello"));
        let outcome = session.complete(
            request.request_id,
            FetchResult::failure(
                "[crypto:3] signature mismatch",
                vec![
                    LogStep::passed("generated ephemeral keypair"),
                    LogStep::failed("client established connection", "signature mismatch"),
                ],
            ),
        );

        assert_eq!(outcome, CompletionOutcome::Applied);
        assert_eq!(session.last_error(), Some("[crypto:3] signature mismatch"));
        assert_eq!(session.trust_verified(), Some(false));
        let info = match session.connection_info() {
            Some(info) => info,
            None => panic!("partial log must be preserved"),
        };
        assert_eq!(info.log.len(), 2);
        assert_eq!(info.server_node_id, None);
    }

    #[test]
    fn newer_navigation_supersedes_older_inflight_one() {
        let mut session = TabSession::new();
        let first = session.begin_navigation(locator("first"));
        let second = session.begin_navigation(locator("second"));
        assert_ne!(first.request_id, second.request_id);

        // The older result lands first and must be discarded.
        let stale = session.complete(first.request_id, success_for(&first));
        assert_eq!(stale, CompletionOutcome::Stale);
        assert_eq!(session.inflight_request_id(), Some(second.request_id));

        let applied = session.complete(second.request_id, success_for(&second));
        assert_eq!(applied, CompletionOutcome::Applied);
        match session.state() {
            NavigationState::Resolved { locator, .. } => {
                assert_eq!(locator.node_id(), "second");
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn out_of_order_stale_result_cannot_overwrite_settled_tab() {
        let mut session = TabSession::new();
        let first = session.begin_navigation(locator("first"));
        let second = session.begin_navigation(locator("second"));

        let applied = session.complete(second.request_id, success_for(&second));
        assert_eq!(applied, CompletionOutcome::Applied);

        // First attempt finishes late, after the tab already settled.
        let stale = session.complete(first.request_id, success_for(&first));
        assert_eq!(stale, CompletionOutcome::Stale);
        match session.state() {
            NavigationState::Resolved { locator, .. } => {
                assert_eq!(locator.node_id(), "second");
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn retry_restarts_with_fresh_request_and_log() {
        let mut session = TabSession::new();
        let request = session.begin_navigation(locator("hello"));
        let first_id = request.request_id;
        session.complete(
            first_id,
            FetchResult::failure(
                "[network:-7] timed out",
                vec![LogStep::failed("client established connection", "timed out")],
            ),
        );

        let retried = match session.retry() {
            Some(request) => request,
            None => panic!("terminal state must be retryable"),
        };
        assert!(retried.request_id > first_id);
        assert_eq!(retried.locator.node_id(), "hello");
        assert!(session.is_resolving());

        // The retried attempt's result replaces the old log wholesale.
        session.complete(retried.request_id, success_for(&retried));
        let info = match session.connection_info() {
            Some(info) => info,
            None => panic!("resolved attempt has a log"),
        };
        assert!(info.log.iter().all(|step| step.ok));
        assert_eq!(info.log.len(), 2);
    }

    #[test]
    fn retry_is_unavailable_while_idle_or_resolving() {
        let mut session = TabSession::new();
        assert!(session.retry().is_none());
        session.begin_navigation(locator("hello"));
        assert!(session.retry().is_none());
    }

    #[test]
    fn trust_is_unknown_without_handshake_activity() {
        let mut session = TabSession::new();
        assert_eq!(session.trust_verified(), None);

        let request = session.begin_navigation(locator("hello"));
        session.complete(
            request.request_id,
            FetchResult::failure("no route to peer network", Vec::new()),
        );
        // Failed before any handshake stage ran: no provenance at all.
        assert_eq!(session.connection_info(), None);
        assert_eq!(session.trust_verified(), None);
        assert_eq!(session.last_error(), Some("no route to peer network"));
    }
}
