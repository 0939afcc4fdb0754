//! Injectable clock.
//!
//! `BoState::last_updated` needs a timestamp on every mutation; hard-coding
//! `Utc::now()` into the service would make its lifecycle operations
//! untestable without sleeping. `Clock` is the seam, mirroring how
//! `rng::CandidateRng` seams the PRNG: a real implementation for production,
//! a fixed one for tests.

use chrono::{DateTime, Utc};

/// A source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time via `chrono::Utc::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always returns the same instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
