//! Time source for the engine.
//!
//! Every timestamp the engine persists and every retention or lifecycle
//! comparison goes through a [`Clock`], so tests can simulate the passage
//! of time instead of sleeping through retention windows.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Cloneable time source.
#[derive(Debug, Clone)]
pub struct Clock(Arc<Source>);

#[derive(Debug)]
enum Source {
    System,
    Manual(RwLock<DateTime<Utc>>),
}

impl Clock {
    /// Wall-clock time.
    #[must_use]
    pub fn system() -> Self {
        Self(Arc::new(Source::System))
    }

    /// A clock frozen at `start` until advanced or set explicitly.
    #[must_use]
    pub fn manual(start: DateTime<Utc>) -> Self {
        Self(Arc::new(Source::Manual(RwLock::new(start))))
    }

    /// The current instant.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match &*self.0 {
            Source::System => Utc::now(),
            Source::Manual(t) => *t.read(),
        }
    }

    /// Move a manual clock forward. No effect on the system clock.
    pub fn advance(&self, by: Duration) {
        if let Source::Manual(t) = &*self.0 {
            let mut t = t.write();
            *t = *t + by;
        }
    }

    /// Pin a manual clock to an exact instant. No effect on the system clock.
    pub fn set(&self, to: DateTime<Utc>) {
        if let Source::Manual(t) = &*self.0 {
            *t.write() = to;
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_freeze_manual_clock() {
        let start = Utc::now();
        let clock = Clock::manual(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_should_advance_manual_clock() {
        let start = Utc::now();
        let clock = Clock::manual(start);
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start + Duration::hours(2));
    }

    #[test]
    fn test_should_share_time_across_clones() {
        let start = Utc::now();
        let clock = Clock::manual(start);
        let clone = clock.clone();
        clock.advance(Duration::seconds(30));
        assert_eq!(clone.now(), start + Duration::seconds(30));
    }

    #[test]
    fn test_should_track_wall_clock_in_system_mode() {
        let clock = Clock::system();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
