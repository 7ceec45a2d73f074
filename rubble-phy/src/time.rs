//! Time arithmetic for the two hardware timelines the PHY works with.
//!
//! The *coarse counter* is a 24-bit counter running at 32.768 kHz. Its unit is a *tick* (about
//! 30.52 µs). Times handed to the PHY by the Link-Layer are expressed in ticks, extended to 32 bits
//! by the platform, plus a sub-tick remainder in microseconds ([`TimeTarget`]).
//!
//! The *fine counter* is a 32-bit counter running at 1 MHz. It is started by the coarse counter
//! through the interconnect and is only meaningful relative to that start tick.
//!
//! All comparisons on both timelines are wrap-aware.

use core::fmt;
use core::ops::{Add, AddAssign, Sub};

/// Mask selecting the bits implemented by the coarse counter.
pub const COARSE_MASK: u32 = 0x00ff_ffff;

/// Sign bit of a 24-bit coarse counter difference.
const COARSE_SIGN: u32 = 0x0080_0000;

/// Microseconds that fit in one whole coarse tick (rounded down).
pub const TICK_MICROS: u32 = 30;

/// A duration with microsecond resolution.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(u32);

impl Duration {
    /// The duration of the interframe spacing between BLE packets.
    pub const T_IFS: Self = Duration(150);

    /// Creates a [`Duration`] from a number of microseconds.
    pub const fn from_micros(micros: u32) -> Self {
        Duration(micros)
    }

    /// Returns the number of microseconds represented by `self`.
    pub const fn as_micros(&self) -> u32 {
        self.0
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Duration(self.0.checked_add(rhs.0).expect("duration overflow"))
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Duration(self.0.checked_sub(rhs.0).expect("duration underflow"))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1000 {
            let (millis, submilli_micros) = (self.0 / 1000, self.0 % 1000);
            if submilli_micros == 0 {
                write!(f, "{}ms", millis)
            } else {
                write!(f, "{}.{:03}ms", millis, submilli_micros)
            }
        } else {
            write!(f, "{}µs", self.0)
        }
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}

/// A point in time on the coarse timeline, refined by a microsecond remainder.
///
/// This is the unit of scheduling exchanged with the Link-Layer: start times requested by the
/// Link-Layer and receive timestamps reported back to it both use it.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct TimeTarget {
    /// Coarse counter value (platform-extended to 32 bits).
    pub ticks: u32,

    /// Microseconds after `ticks`. Always less than one tick (`0..=30`).
    pub rem_us: u8,
}

impl TimeTarget {
    /// Creates a `TimeTarget` at `rem_us` microseconds past tick `ticks`.
    ///
    /// # Panics
    ///
    /// Panics when `rem_us` is a whole tick or more.
    pub fn new(ticks: u32, rem_us: u8) -> Self {
        assert!(u32::from(rem_us) <= TICK_MICROS, "remainder {}µs exceeds a tick", rem_us);
        Self { ticks, rem_us }
    }

    /// Creates a `TimeTarget` exactly at tick `ticks`.
    pub fn at_tick(ticks: u32) -> Self {
        Self { ticks, rem_us: 0 }
    }

    /// Returns the value to program into the 24-bit coarse compare register.
    pub fn coarse(&self) -> u32 {
        self.ticks & COARSE_MASK
    }
}

impl fmt::Debug for TimeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}t+{}µs", self.ticks, self.rem_us)
    }
}

/// Converts coarse ticks to microseconds, rounding down.
pub fn ticks_to_micros(ticks: u32) -> u32 {
    // 1_000_000 / 32_768 = 15_625 / 512
    (ticks >> 9) * 15_625 + (((ticks & 0x1ff) * 15_625) >> 9)
}

/// Converts microseconds to coarse ticks, rounding down.
pub fn micros_to_ticks(micros: u32) -> u32 {
    ((micros / 15_625) << 9) + (((micros % 15_625) << 9) / 15_625)
}

/// Returns how many ticks `to` lies ahead of `from` on the 24-bit coarse counter.
///
/// A result with bit 23 set means `to` is actually behind `from`.
pub fn coarse_delta(from: u32, to: u32) -> u32 {
    to.wrapping_sub(from) & COARSE_MASK
}

/// Returns whether a 24-bit coarse difference computed by [`coarse_delta`] is negative.
pub fn coarse_is_behind(delta: u32) -> bool {
    delta & COARSE_SIGN != 0
}

/// Returns whether the fine counter value `now` has already passed `deadline`.
///
/// The difference is taken modulo 2³²; anything at least half the counter range away is
/// considered to be in the past.
pub fn fine_passed(deadline: u32, now: u32) -> bool {
    deadline.wrapping_sub(now) >= 0x8000_0000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_conversions() {
        assert_eq!(ticks_to_micros(1), 30);
        assert_eq!(ticks_to_micros(2), 61);
        assert_eq!(ticks_to_micros(3), 91);
        assert_eq!(ticks_to_micros(32_768), 1_000_000);
        assert_eq!(micros_to_ticks(30), 0);
        assert_eq!(micros_to_ticks(31), 1);
        assert_eq!(micros_to_ticks(61), 1);
        assert_eq!(micros_to_ticks(62), 2);
        assert_eq!(micros_to_ticks(1_000_000), 32_768);
    }

    #[test]
    fn coarse_wraparound() {
        assert_eq!(coarse_delta(0x00ff_fffe, 0x0000_0001), 3);
        assert!(!coarse_is_behind(coarse_delta(0x00ff_fffe, 0x0000_0001)));
        assert!(coarse_is_behind(coarse_delta(10, 9)));
        // Bits above the counter width are ignored.
        assert_eq!(coarse_delta(0x0100_0005, 0x0000_0008), 3);
    }

    #[test]
    fn fine_deadline() {
        assert!(!fine_passed(1000, 999));
        assert!(!fine_passed(1000, 1000));
        assert!(fine_passed(1000, 1001));
        assert!(!fine_passed(5, 0xffff_fff0));
        assert!(fine_passed(0xffff_fff0, 5));
    }

    #[test]
    #[should_panic]
    fn remainder_bounded() {
        TimeTarget::new(0, 31);
    }

    #[test]
    fn duration_display() {
        assert_eq!(format!("{}", Duration::T_IFS), "150µs");
        assert_eq!(format!("{}", Duration::from_micros(2500)), "2.500ms");
    }
}
