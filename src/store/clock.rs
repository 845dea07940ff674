//! Clock Capability
//!
//! Abstracts the current instant so TTL arithmetic is testable against a
//! pinned time.

use chrono::{DateTime, Utc};

// == Clock ==
/// A provider of the current instant.
///
/// Successive calls return monotonically non-decreasing values in ordinary
/// operation; callers rely on it only for TTL semantics.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

// == System Clock ==
/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// == Fixed Clock ==
/// Clock pinned to a settable instant, for deterministic tests.
#[derive(Debug)]
pub struct FixedClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a fixed clock pinned at the given instant.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    /// Repins the clock to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("fixed clock poisoned") = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("fixed clock poisoned")
    }
}
