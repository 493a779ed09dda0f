use std::ops::{Add, Sub};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A monotonic-enough wall-clock timestamp, milliseconds since the UNIX
/// epoch.
///
/// Used for lease/session expiry, WAL/journal record timestamps, and
/// lock `granted_at` marks. Not a hybrid logical clock: the server has a
/// single clock source, so plain wall time is sufficient here.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(millis)
    }

    /// Construct from a raw millisecond value (used in tests and replay).
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// The epoch (zero) timestamp.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Raw milliseconds since the epoch.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// `true` if `self + d <= now`, i.e. this timestamp plus `d` has
    /// elapsed.
    pub fn has_elapsed(&self, d: Duration) -> bool {
        Self::now().0.saturating_sub(self.0) >= d.as_millis() as u64
    }

    /// The duration between `self` and `other`, saturating at zero if
    /// `other` is earlier.
    pub fn elapsed_since(&self, other: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(other.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.as_millis() as u64)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(rhs.as_millis() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_by_millis() {
        let a = Timestamp::from_millis(10);
        let b = Timestamp::from_millis(20);
        assert!(a < b);
    }

    #[test]
    fn add_duration_advances() {
        let t = Timestamp::from_millis(1000) + Duration::from_secs(5);
        assert_eq!(t.as_millis(), 6000);
    }

    #[test]
    fn elapsed_since_saturates_at_zero() {
        let earlier = Timestamp::from_millis(100);
        let later = Timestamp::from_millis(50);
        assert_eq!(earlier.elapsed_since(later), Duration::from_millis(50));
    }
}
