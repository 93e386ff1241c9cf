//! Simulated time primitives
//!
//! Event timestamps and the motion model's clock share one representation:
//! signed microseconds since the start of the recording.

use std::ops::{Add, Sub};
use std::time::Duration;

/// Simulated time - microseconds since the recording epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(pub i64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX: SimTime = SimTime(i64::MAX);
    pub const MIN: SimTime = SimTime(i64::MIN);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        SimTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        SimTime(millis * 1000)
    }

    /// Convert floating seconds as carried by raw records.
    /// Non-finite input maps to zero.
    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_finite() {
            SimTime((secs * 1_000_000.0).round() as i64)
        } else {
            SimTime::ZERO
        }
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Signed distance to `earlier` in seconds
    #[inline]
    pub fn secs_since(self, earlier: SimTime) -> f64 {
        (self.0 as i128 - earlier.0 as i128) as f64 / 1_000_000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        SimTime(self.0.saturating_add(micros_of(duration)))
    }

    #[inline]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        SimTime(self.0.saturating_sub(micros_of(duration)))
    }
}

/// Whole microseconds of a duration, pinned to `i64::MAX`
#[inline]
fn micros_of(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<Duration> for SimTime {
    type Output = SimTime;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

/// Elapsed simulated time. Never negative: a gap into the past is zero progress.
impl Sub<SimTime> for SimTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: SimTime) -> Self::Output {
        let diff = self.0 as i128 - rhs.0 as i128;
        if diff > 0 {
            Duration::from_micros(u64::try_from(diff).unwrap_or(u64::MAX))
        } else {
            Duration::ZERO
        }
    }
}

impl std::fmt::Debug for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({:.3}s)", self.as_secs_f64())
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Convert a frame delta in seconds into a forward-only duration.
/// Zero, negative, non-finite and unrepresentable deltas (clock glitches)
/// become zero.
#[inline]
pub fn forward_duration(secs: f64) -> Duration {
    if secs > 0.0 && secs.is_finite() {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sim_time_from_secs() {
        assert_eq!(SimTime::from_secs_f64(5.0), SimTime::from_millis(5000));
        assert_eq!(SimTime::from_secs_f64(f64::NAN), SimTime::ZERO);
        assert_eq!(SimTime::from_secs_f64(0.25).as_micros(), 250_000);
    }

    #[test]
    fn test_sub_saturates_at_zero() {
        let early = SimTime::from_millis(100);
        let late = SimTime::from_millis(300);
        assert_eq!(late - early, Duration::from_millis(200));
        assert_eq!(early - late, Duration::ZERO);
        assert!((early.secs_since(late) + 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_forward_duration_rejects_glitches() {
        assert_eq!(forward_duration(0.0), Duration::ZERO);
        assert_eq!(forward_duration(-1.0), Duration::ZERO);
        assert_eq!(forward_duration(f64::INFINITY), Duration::ZERO);
        assert_eq!(forward_duration(0.5), Duration::from_millis(500));
    }

    #[test]
    fn test_forward_duration_huge_delta_is_zero() {
        assert_eq!(forward_duration(1e20), Duration::ZERO);
        assert_eq!(forward_duration(f64::MAX), Duration::ZERO);
        assert_eq!(forward_duration(1e9), Duration::from_secs(1_000_000_000));
    }

    #[test]
    fn test_arithmetic_saturates() {
        assert_eq!(SimTime::MAX + Duration::from_secs(1), SimTime::MAX);
        assert_eq!(SimTime::ZERO + Duration::MAX, SimTime::MAX);
        assert_eq!(SimTime::MIN - Duration::from_secs(1), SimTime::MIN);
        assert_eq!(SimTime::MAX - SimTime::MIN, Duration::from_micros(u64::MAX));
        assert_eq!(SimTime::MIN - SimTime::MAX, Duration::ZERO);
        assert!(SimTime::MAX.secs_since(SimTime::MIN) > 0.0);
    }

    proptest! {
        #[test]
        fn prop_add_then_sub_roundtrips(start in -1_000_000_000i64..1_000_000_000, micros in 0u64..1_000_000_000) {
            let t = SimTime::from_micros(start);
            let d = Duration::from_micros(micros);
            prop_assert_eq!((t + d) - t, d);
        }
    }
}
