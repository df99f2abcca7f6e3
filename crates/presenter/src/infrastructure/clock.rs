//! Wall clock and thread-local randomness, plus deterministic stand-ins for
//! tests.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::ports::outbound::{ClockPort, RandomPort};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Always reports the same instant.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(any(test, feature = "testing"))]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Rolls the same value every time, clamped into the requested range.
/// Its uuids are all nil.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub i32);

#[cfg(any(test, feature = "testing"))]
impl RandomPort for FixedRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        self.0.clamp(min, max.max(min))
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::nil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minigame_rolls_stay_in_range() {
        for _ in 0..100 {
            let roll = SystemRandom.gen_range(1, 100);
            assert!((1..=100).contains(&roll));
        }
        assert_eq!(SystemRandom.gen_range(5, 5), 5);
        assert_eq!(SystemRandom.gen_range(9, 3), 9);
    }

    #[test]
    fn fixed_roll_is_clamped() {
        assert_eq!(FixedRandom(500).gen_range(1, 100), 100);
        assert_eq!(FixedRandom(70).gen_range(1, 100), 70);
        assert_eq!(FixedRandom(-3).gen_range(1, 100), 1);
        assert!(FixedRandom(1).gen_uuid().is_nil());
    }
}
