//! Time and randomness, injected so media timing and client ids are
//! reproducible under test.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    /// Timestamp stamped on outbound envelopes and history records.
    fn now(&self) -> DateTime<Utc>;
}

/// Source of the simulated minigame outcome and client id suffixes.
#[cfg_attr(test, mockall::automock)]
pub trait RandomPort: Send + Sync {
    /// Inclusive on both ends.
    fn gen_range(&self, min: i32, max: i32) -> i32;
    fn gen_uuid(&self) -> Uuid;
}
