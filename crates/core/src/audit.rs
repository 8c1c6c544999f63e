//! Audit pair: who created/updated a record and when.
//!
//! The fields are stamped by the persistence listener, never by request
//! handlers. `created_*` is written once; `updated_*` moves on every write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    #[serde(default)]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub updated_by: Option<UserId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Audit {
    /// Stamp on first persist.
    ///
    /// Existing creation values are left untouched, so re-inserting a record
    /// that already carries them cannot rewrite history.
    pub fn stamp_created(&mut self, actor: Option<UserId>, at: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(at);
            self.created_by = actor;
        }
        self.stamp_updated(actor, at);
    }

    /// Stamp on every mutation. `updated_at` never moves backwards.
    pub fn stamp_updated(&mut self, actor: Option<UserId>, at: DateTime<Utc>) {
        let at = match self.updated_at {
            Some(previous) if previous > at => previous,
            _ => at,
        };
        self.updated_at = Some(at);
        self.updated_by = actor;
    }

    pub fn is_persisted(&self) -> bool {
        self.created_at.is_some()
    }
}

/// Records carrying an [`Audit`] pair.
pub trait Audited {
    fn audit(&self) -> &Audit;

    fn audit_mut(&mut self) -> &mut Audit;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn created_at_is_immutable_after_first_stamp() {
        let mut audit = Audit::default();
        let first = Utc::now();
        let creator = UserId::new();
        audit.stamp_created(Some(creator), first);

        let later = first + Duration::seconds(30);
        audit.stamp_created(Some(UserId::new()), later);

        assert_eq!(audit.created_at, Some(first));
        assert_eq!(audit.created_by, Some(creator));
        assert_eq!(audit.updated_at, Some(later));
    }

    #[test]
    fn updated_at_advances_and_never_regresses() {
        let mut audit = Audit::default();
        let t0 = Utc::now();
        audit.stamp_created(None, t0);

        let t1 = t0 + Duration::seconds(5);
        let editor = UserId::new();
        audit.stamp_updated(Some(editor), t1);
        assert_eq!(audit.updated_at, Some(t1));
        assert_eq!(audit.updated_by, Some(editor));

        audit.stamp_updated(None, t0);
        assert_eq!(audit.updated_at, Some(t1));
    }
}
