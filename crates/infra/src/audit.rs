//! Persistence-time audit stamping.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use seniorcare_core::{Audited, Record, UserId};

/// Source of "now" for audit stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = at;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
    }
}

/// Stamps the audit pair right before a write reaches the store.
#[derive(Clone)]
pub struct AuditListener {
    clock: Arc<dyn Clock>,
}

impl Default for AuditListener {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for AuditListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditListener").finish_non_exhaustive()
    }
}

impl AuditListener {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn on_insert<R: Record + Audited>(&self, record: &mut R, actor: Option<UserId>) {
        let at = self.clock.now();
        record.audit_mut().stamp_created(actor, at);
        tracing::debug!(table = R::TABLE, id = %record.record_id(), actor = ?actor, "stamped created");
    }

    pub fn on_update<R: Record + Audited>(&self, record: &mut R, actor: Option<UserId>) {
        let at = self.clock.now();
        record.audit_mut().stamp_updated(actor, at);
        tracing::debug!(table = R::TABLE, id = %record.record_id(), actor = ?actor, "stamped updated");
    }
}
