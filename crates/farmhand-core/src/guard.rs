//! The process-wide field guard flag.
//!
//! While the guard is up, rotten farm entries can still be harvested. It
//! is raised for a fixed time after a platform outage and mirrored to
//! every process over the bus.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Time-boxed override allowing rotten entries to be harvested.
#[derive(Debug, Default)]
pub struct FieldGuard {
    /// Unix seconds until which the guard is up; 0 when never raised.
    until: AtomicI64,
}

impl FieldGuard {
    /// A guard that is down.
    pub const fn new() -> Self {
        Self {
            until: AtomicI64::new(0),
        }
    }

    /// Raise the guard until `until`. An earlier deadline never shortens a
    /// later one already set.
    pub fn enable_until(&self, until: DateTime<Utc>) {
        let previous = self.until.fetch_max(until.timestamp(), Ordering::AcqRel);
        if until.timestamp() > previous {
            tracing::info!(%until, "Field guard enabled");
        }
    }

    /// Whether the guard is up at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.until.load(Ordering::Acquire)
    }

    /// The current deadline, if the guard was ever raised.
    pub fn until(&self) -> Option<DateTime<Utc>> {
        match self.until.load(Ordering::Acquire) {
            0 => None,
            secs => DateTime::from_timestamp(secs, 0),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn guard_is_time_boxed() {
        let guard = FieldGuard::new();
        assert!(!guard.is_active(at(1_000)));
        assert!(guard.until().is_none());

        guard.enable_until(at(2_000));
        assert!(guard.is_active(at(1_999)));
        assert!(!guard.is_active(at(2_000)));
    }

    #[test]
    fn earlier_deadline_does_not_shorten() {
        let guard = FieldGuard::new();
        guard.enable_until(at(5_000));
        guard.enable_until(at(3_000));
        assert_eq!(guard.until(), Some(at(5_000)));
    }
}
