use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use logging::redact_code;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use verifier_core::{
    OutcomeReport, OutcomeSink, ProfileName, ProfileSource, RequesterId, VerificationOutcome,
};
use verifier_profile::BioExtractor;
use verifier_security::CodeRegistry;

use crate::pool::WorkerPool;

/// Default number of checks allowed to run at once.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Result of handing a verify request to the coordinator.
pub enum Dispatch {
    /// Decided without touching the network.
    Completed(VerificationOutcome),
    /// A fetch-and-match check is queued or running.
    Scheduled(JoinHandle<VerificationOutcome>),
}

impl Dispatch {
    /// Wait for the outcome. The same value is also delivered to the sink.
    pub async fn outcome(self) -> VerificationOutcome {
        match self {
            Dispatch::Completed(outcome) => outcome,
            Dispatch::Scheduled(handle) => handle.await.unwrap_or_else(|e| VerificationOutcome::Internal {
                cause: format!("verification task failed: {e}"),
            }),
        }
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self, Dispatch::Scheduled(_))
    }
}

/// State shared between the coordinator and its spawned checks.
struct CheckContext {
    registry: Arc<CodeRegistry>,
    source: Arc<dyn ProfileSource>,
    extractor: BioExtractor,
    sink: Arc<dyn OutcomeSink>,
}

/// Per-requester verification state machine.
///
/// `NoRequest --issue--> Pending(code) --matched--> NoRequest`. Every other
/// outcome leaves `Pending(code)` in place so the requester can retry.
pub struct VerificationCoordinator {
    ctx: Arc<CheckContext>,
    pool: WorkerPool,
}

impl VerificationCoordinator {
    pub fn new(
        registry: Arc<CodeRegistry>,
        source: Arc<dyn ProfileSource>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            ctx: Arc::new(CheckContext {
                registry,
                source,
                extractor: BioExtractor::default(),
                sink,
            }),
            pool: WorkerPool::new(DEFAULT_POOL_SIZE),
        }
    }

    /// Replace the bio extractor. Call before the first `verify`.
    pub fn with_extractor(mut self, extractor: BioExtractor) -> Self {
        match Arc::get_mut(&mut self.ctx) {
            Some(ctx) => ctx.extractor = extractor,
            None => warn!("Coordinator already shared; extractor left unchanged"),
        }
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool = WorkerPool::new(size);
        self
    }

    pub fn registry(&self) -> &Arc<CodeRegistry> {
        &self.ctx.registry
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Handle one verify request. Must be called inside a Tokio runtime.
    ///
    /// Without a profile a fresh code is issued (replacing any pending one).
    /// With a profile, the check is dispatched to the worker pool and this
    /// returns without waiting for the network. Exactly one report reaches
    /// the sink per call.
    pub async fn verify(&self, requester: RequesterId, profile: Option<&str>) -> Dispatch {
        let Some(raw) = profile else {
            let code = self.ctx.registry.issue(requester);
            info!(%requester, "Verification code issued");
            return self
                .complete(requester, None, VerificationOutcome::CodeIssued { code })
                .await;
        };

        if self.ctx.registry.peek(requester).is_none() {
            warn!(%requester, "Verification not initiated");
            return self
                .complete(requester, Some(raw), VerificationOutcome::PendingNotFound)
                .await;
        }

        let name = match ProfileName::parse(raw) {
            Ok(name) => name,
            Err(e) => {
                warn!(%requester, error = %e, "Rejected profile name");
                let outcome = VerificationOutcome::InvalidProfileName { reason: e.to_string() };
                return self.complete(requester, Some(raw), outcome).await;
            }
        };

        debug!(%requester, profile = %name, busy = self.pool.busy(), "Dispatching profile check");
        let ctx = self.ctx.clone();
        let raw = raw.to_string();
        let handle = self.pool.spawn(async move {
            let outcome = AssertUnwindSafe(check_profile(&ctx, requester, name))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let cause = panic_message(panic);
                    error!(%requester, %cause, "Profile check panicked");
                    VerificationOutcome::Internal { cause }
                });
            ctx.sink
                .deliver(OutcomeReport::new(requester, Some(raw), outcome.clone()))
                .await;
            outcome
        });
        Dispatch::Scheduled(handle)
    }

    /// Periodically drop expired codes. Returns `None` when no TTL is set.
    pub fn spawn_expiry_sweeper(&self, every: Duration) -> Option<JoinHandle<()>> {
        self.ctx.registry.ttl()?;
        let registry = self.ctx.registry.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                registry.purge_expired();
            }
        }))
    }

    async fn complete(
        &self,
        requester: RequesterId,
        profile: Option<&str>,
        outcome: VerificationOutcome,
    ) -> Dispatch {
        self.ctx
            .sink
            .deliver(OutcomeReport::new(requester, profile.map(str::to_string), outcome.clone()))
            .await;
        Dispatch::Completed(outcome)
    }
}

/// Fetch, extract, and match. Every failure becomes an outcome.
async fn check_profile(
    ctx: &CheckContext,
    requester: RequesterId,
    profile: ProfileName,
) -> VerificationOutcome {
    let html = match ctx.source.fetch_profile(&profile).await {
        Ok(html) => html,
        Err(e) => {
            error!(%requester, profile = %profile, error = %e, "Error fetching profile");
            return e.into();
        }
    };

    let Some(bio) = ctx.extractor.extract(&html) else {
        warn!(%requester, profile = %profile, "Bio section not found on profile");
        return VerificationOutcome::BioRegionMissing;
    };

    // One snapshot for the whole match step.
    let Some(code) = ctx.registry.peek(requester) else {
        warn!(%requester, "Pending code vanished before match");
        return VerificationOutcome::PendingNotFound;
    };
    debug!(%requester, bio = %redact_code(&bio, code.as_str()), "Bio text found");

    if !code.appears_in(&bio) {
        warn!(%requester, profile = %profile, "Code not found in bio");
        return VerificationOutcome::CodeMismatch;
    }

    if !ctx.registry.clear_if(requester, &code) {
        debug!(%requester, "Code replaced during match; newer code kept");
    }
    info!(%requester, profile = %profile, "Requester verified");
    VerificationOutcome::Matched { profile }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::{mpsc, Notify};
    use verifier_core::{ChannelSink, FetchError, VerificationCode};

    const ALICE: RequesterId = RequesterId(42);

    fn bio_page(text: &str) -> String {
        format!(r#"<html><div class="bio"><div class="value">{text}</div></div></html>"#)
    }

    /// Serves whatever page is currently set for each profile.
    #[derive(Default)]
    struct FakeSource {
        pages: Mutex<HashMap<String, Result<String, FetchError>>>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl FakeSource {
        fn set(&self, profile: &str, page: Result<String, FetchError>) {
            self.pages.lock().unwrap().insert(profile.to_string(), page);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileSource for FakeSource {
        async fn fetch_profile(&self, profile: &ProfileName) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.pages
                .lock()
                .unwrap()
                .get(profile.as_str())
                .cloned()
                .unwrap_or(Err(FetchError::Status(404)))
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl ProfileSource for PanickingSource {
        async fn fetch_profile(&self, _profile: &ProfileName) -> Result<String, FetchError> {
            panic!("parser exploded");
        }
    }

    fn harness(source: Arc<dyn ProfileSource>) -> (VerificationCoordinator, mpsc::Receiver<OutcomeReport>) {
        let (tx, rx) = mpsc::channel(64);
        let coordinator = VerificationCoordinator::new(
            Arc::new(CodeRegistry::new()),
            source,
            Arc::new(ChannelSink::new(tx)),
        );
        (coordinator, rx)
    }

    async fn issue(coordinator: &VerificationCoordinator) -> VerificationCode {
        match coordinator.verify(ALICE, None).await.outcome().await {
            VerificationOutcome::CodeIssued { code } => code,
            other => panic!("expected CodeIssued, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn issue_stores_code_and_reports_it() {
        let (coordinator, mut rx) = harness(Arc::new(FakeSource::default()));
        let dispatch = coordinator.verify(ALICE, None).await;
        assert!(!dispatch.is_scheduled());

        let VerificationOutcome::CodeIssued { code } = dispatch.outcome().await else {
            panic!("expected CodeIssued");
        };
        assert_eq!(coordinator.registry().peek(ALICE), Some(code.clone()));

        let report = rx.recv().await.unwrap();
        assert_eq!(report.requester, ALICE);
        assert_eq!(report.outcome, VerificationOutcome::CodeIssued { code });
        assert!(report.profile.is_none());
    }

    #[tokio::test]
    async fn profile_without_pending_code_never_fetches() {
        let source = Arc::new(FakeSource::default());
        let (coordinator, mut rx) = harness(source.clone());

        let outcome = coordinator.verify(ALICE, Some("pilot")).await.outcome().await;
        assert_eq!(outcome, VerificationOutcome::PendingNotFound);
        assert_eq!(source.calls(), 0);
        assert_eq!(rx.recv().await.unwrap().outcome, VerificationOutcome::PendingNotFound);
    }

    #[tokio::test]
    async fn invalid_profile_name_never_fetches() {
        let source = Arc::new(FakeSource::default());
        let (coordinator, _rx) = harness(source.clone());
        let code = issue(&coordinator).await;

        let outcome = coordinator.verify(ALICE, Some("../../admin")).await.outcome().await;
        assert!(matches!(outcome, VerificationOutcome::InvalidProfileName { .. }));
        assert_eq!(source.calls(), 0);
        assert_eq!(coordinator.registry().peek(ALICE), Some(code));
    }

    #[tokio::test]
    async fn matching_bio_verifies_and_clears() {
        let source = Arc::new(FakeSource::default());
        let (coordinator, mut rx) = harness(source.clone());
        let code = issue(&coordinator).await;
        source.set("pilot", Ok(bio_page(&format!("o7 {code} see you in the verse"))));

        let dispatch = coordinator.verify(ALICE, Some("pilot")).await;
        assert!(dispatch.is_scheduled());
        let outcome = dispatch.outcome().await;
        assert_eq!(
            outcome,
            VerificationOutcome::Matched { profile: ProfileName::parse("pilot").unwrap() }
        );
        assert_eq!(coordinator.registry().peek(ALICE), None);

        let _issued = rx.recv().await.unwrap();
        let report = rx.recv().await.unwrap();
        assert_eq!(report.outcome, outcome);
        assert_eq!(report.profile.as_deref(), Some("pilot"));
    }

    #[tokio::test]
    async fn mismatch_keeps_pending_code() {
        let source = Arc::new(FakeSource::default());
        let (coordinator, _rx) = harness(source.clone());
        let code = issue(&coordinator).await;
        source.set("pilot", Ok(bio_page("no code here")));

        let outcome = coordinator.verify(ALICE, Some("pilot")).await.outcome().await;
        assert_eq!(outcome, VerificationOutcome::CodeMismatch);
        assert_eq!(coordinator.registry().peek(ALICE), Some(code));
    }

    #[tokio::test]
    async fn missing_bio_keeps_pending_code() {
        let source = Arc::new(FakeSource::default());
        let (coordinator, _rx) = harness(source.clone());
        let code = issue(&coordinator).await;
        source.set("pilot", Ok("<html><body>private profile</body></html>".into()));

        let outcome = coordinator.verify(ALICE, Some("pilot")).await.outcome().await;
        assert_eq!(outcome, VerificationOutcome::BioRegionMissing);
        assert_eq!(coordinator.registry().peek(ALICE), Some(code));
    }

    #[tokio::test]
    async fn old_code_after_reissue_is_a_mismatch() {
        let source = Arc::new(FakeSource::default());
        let (coordinator, _rx) = harness(source.clone());
        let old = issue(&coordinator).await;
        let mut new = issue(&coordinator).await;
        while new == old {
            new = issue(&coordinator).await;
        }
        source.set("pilot", Ok(bio_page(old.as_str())));

        let outcome = coordinator.verify(ALICE, Some("pilot")).await.outcome().await;
        assert_eq!(outcome, VerificationOutcome::CodeMismatch);
        assert_eq!(coordinator.registry().peek(ALICE), Some(new));
    }

    #[tokio::test]
    async fn reissue_during_fetch_invalidates_in_flight_check() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource { gate: Some(gate.clone()), ..Default::default() });
        let (coordinator, _rx) = harness(source.clone());
        let old = issue(&coordinator).await;
        source.set("pilot", Ok(bio_page(old.as_str())));

        let dispatch = coordinator.verify(ALICE, Some("pilot")).await;
        while source.calls() == 0 {
            tokio::task::yield_now().await;
        }
        let mut new = issue(&coordinator).await;
        while new == old {
            new = issue(&coordinator).await;
        }
        gate.notify_one();

        assert_eq!(dispatch.outcome().await, VerificationOutcome::CodeMismatch);
        assert_eq!(coordinator.registry().peek(ALICE), Some(new));
    }

    #[tokio::test]
    async fn fetch_failures_are_retryable() {
        let source = Arc::new(FakeSource::default());
        let (coordinator, _rx) = harness(source.clone());
        let code = issue(&coordinator).await;

        source.set("pilot", Err(FetchError::Timeout));
        let outcome = coordinator.verify(ALICE, Some("pilot")).await.outcome().await;
        assert!(matches!(outcome, VerificationOutcome::FetchFailed { .. }));

        source.set("pilot", Err(FetchError::Trust("UnknownIssuer".into())));
        let outcome = coordinator.verify(ALICE, Some("pilot")).await.outcome().await;
        assert_eq!(outcome, VerificationOutcome::TrustFailed { cause: "UnknownIssuer".into() });

        assert_eq!(coordinator.registry().peek(ALICE), Some(code.clone()));

        source.set("pilot", Ok(bio_page(code.as_str())));
        let outcome = coordinator.verify(ALICE, Some("pilot")).await.outcome().await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn panicking_check_still_reports_once() {
        let (coordinator, mut rx) = harness(Arc::new(PanickingSource));
        issue(&coordinator).await;
        let _issued = rx.recv().await.unwrap();

        let outcome = coordinator.verify(ALICE, Some("pilot")).await.outcome().await;
        assert_eq!(
            outcome,
            VerificationOutcome::Internal { cause: "parser exploded".into() }
        );
        let report = rx.recv().await.unwrap();
        assert_eq!(report.outcome, outcome);
        assert!(rx.try_recv().is_err());
        assert!(coordinator.registry().peek(ALICE).is_some());
    }

    #[tokio::test]
    async fn one_report_per_call() {
        let source = Arc::new(FakeSource::default());
        let (coordinator, mut rx) = harness(source.clone());
        source.set("pilot", Ok(bio_page("nothing")));

        let mut dispatches = Vec::new();
        for i in 0..20u64 {
            let requester = RequesterId(i);
            coordinator.verify(requester, None).await;
            dispatches.push(coordinator.verify(requester, Some("pilot")).await);
        }
        for dispatch in dispatches {
            dispatch.outcome().await;
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 40);
    }

    #[tokio::test]
    async fn sweeper_only_runs_with_ttl() {
        let (coordinator, _rx) = harness(Arc::new(FakeSource::default()));
        assert!(coordinator.spawn_expiry_sweeper(Duration::from_secs(1)).is_none());

        let (tx, _rx) = mpsc::channel(8);
        let coordinator = VerificationCoordinator::new(
            Arc::new(CodeRegistry::with_ttl(Some(Duration::ZERO))),
            Arc::new(FakeSource::default()),
            Arc::new(ChannelSink::new(tx)),
        );
        coordinator.registry().issue(ALICE);
        let sweeper = coordinator
            .spawn_expiry_sweeper(Duration::from_millis(5))
            .unwrap();
        while !coordinator.registry().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        sweeper.abort();
    }
}
