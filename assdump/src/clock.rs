//! 27 MHz system clock arithmetic.
//!
//! PCR values count ticks of the 27 MHz system clock. Captions are timed
//! in centiseconds, so this module converts between the two and exposes
//! the wall-clock fields used when formatting Dialogue lines.

use std::ops::{Add, Sub};

/// System clock frequency (ISO/IEC 13818-1 2.4.2.1).
pub const SYSTEM_CLOCK_FREQUENCY: u64 = 27_000_000;

const TICKS_PER_CENTISECOND: u64 = SYSTEM_CLOCK_FREQUENCY / 100;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Centiseconds in one day.
pub const CENTISECONDS_PER_DAY: i64 = SECONDS_PER_DAY as i64 * 100;

/// A point on the 27 MHz clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemClock(u64);

impl SystemClock {
    /// Raw tick value, e.g. a decoded PCR.
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Saturates at the largest representable tick count.
    pub const fn from_seconds(seconds: u64) -> Self {
        Self(seconds.saturating_mul(SYSTEM_CLOCK_FREQUENCY))
    }

    /// Saturates at the largest representable tick count.
    pub const fn from_centiseconds(centis: u64) -> Self {
        Self(centis.saturating_mul(TICKS_PER_CENTISECOND))
    }

    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Total elapsed centiseconds (truncated).
    pub const fn centitime(self) -> u64 {
        self.0 / TICKS_PER_CENTISECOND
    }

    /// Hour of day (0-23), wrapping every 24 hours.
    pub const fn hour(self) -> u64 {
        (self.whole_seconds() % SECONDS_PER_DAY) / 3600
    }

    pub const fn minute(self) -> u64 {
        (self.whole_seconds() % 3600) / 60
    }

    pub const fn second(self) -> u64 {
        self.whole_seconds() % 60
    }

    pub const fn centisecond(self) -> u64 {
        self.centitime() % 100
    }

    const fn whole_seconds(self) -> u64 {
        self.0 / SYSTEM_CLOCK_FREQUENCY
    }
}

impl Add for SystemClock {
    type Output = SystemClock;

    fn add(self, rhs: SystemClock) -> SystemClock {
        SystemClock(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for SystemClock {
    type Output = SystemClock;

    fn sub(self, rhs: SystemClock) -> SystemClock {
        SystemClock(self.0.wrapping_sub(rhs.0))
    }
}

/// Centiseconds added to PCR-relative time to obtain JST wall-clock time.
///
/// Recomputed on every valid TOT as `jst_seconds * 100 - pcr_centiseconds`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockOffset(i64);

impl ClockOffset {
    /// Calibrate against a TOT time observed while the PCR read `now`.
    pub fn calibrate(jst_seconds: i64, now: SystemClock) -> Self {
        Self(jst_seconds * 100 - now.centitime() as i64)
    }

    pub const fn centiseconds(self) -> i64 {
        self.0
    }

    /// Wall-clock time of `clock`, folded into a single day.
    pub fn apply(self, clock: SystemClock) -> SystemClock {
        let centis = (clock.centitime() as i64 + self.0).rem_euclid(CENTISECONDS_PER_DAY);
        SystemClock::from_centiseconds(centis as u64)
    }
}
