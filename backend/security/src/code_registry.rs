/// Pending verification codes keyed by requester.
///
/// Backed by a sharded concurrent map so issue, peek and clear for one
/// requester are linearizable without a global lock.
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info};
use verifier_core::{RequesterId, VerificationCode};

#[derive(Debug, Clone)]
pub struct PendingCode {
    pub code: VerificationCode,
    pub issued_at: Instant,
}

#[derive(Debug, Default)]
pub struct CodeRegistry {
    pending: DashMap<RequesterId, PendingCode>,
    /// Lifetime of an issued code. `None` keeps codes until matched.
    ttl: Option<Duration>,
}

impl CodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self { pending: DashMap::new(), ttl }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Issue a fresh code for `requester`, replacing any pending one.
    pub fn issue(&self, requester: RequesterId) -> VerificationCode {
        let code = VerificationCode::generate();
        let replaced = self
            .pending
            .insert(requester, PendingCode { code: code.clone(), issued_at: Instant::now() })
            .is_some();
        debug!(%requester, replaced, "Issued verification code");
        code
    }

    /// Current pending code, if any and not expired. Never mutates.
    pub fn peek(&self, requester: RequesterId) -> Option<VerificationCode> {
        self.pending
            .get(&requester)
            .filter(|entry| !self.is_expired(entry.value()))
            .map(|entry| entry.code.clone())
    }

    /// Remove the pending entry. Idempotent.
    pub fn clear(&self, requester: RequesterId) {
        if self.pending.remove(&requester).is_some() {
            debug!(%requester, "Cleared verification code");
        }
    }

    /// Remove the entry only if it still holds `code`. Returns whether it was removed.
    pub fn clear_if(&self, requester: RequesterId, code: &VerificationCode) -> bool {
        let removed = self
            .pending
            .remove_if(&requester, |_, entry| entry.code == *code)
            .is_some();
        if removed {
            debug!(%requester, "Cleared matched verification code");
        }
        removed
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let Some(ttl) = self.ttl else { return 0 };
        let before = self.pending.len();
        self.pending.retain(|_, entry| entry.issued_at.elapsed() < ttl);
        let removed = before.saturating_sub(self.pending.len());
        if removed > 0 {
            info!(removed, "Purged expired verification codes");
        }
        removed
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn is_expired(&self, entry: &PendingCode) -> bool {
        self.ttl.is_some_and(|ttl| entry.issued_at.elapsed() >= ttl)
    }
}
