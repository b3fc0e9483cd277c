//! Time units.
use core::ops::{Add as Adds, Sub as Subtracts};

/// Monotonic point in time, in milliseconds since an arbitrary origin
/// (generally system start).
///
/// Instants can be subtracted with each other to obtain a span of
/// milliseconds, and added with milliseconds to obtain another instant.
#[derive(Clone, Copy, Debug, PartialOrd, Ord, PartialEq, Eq, Hash, Default)]
pub struct Instant(pub u64);

/// Source of monotonic time.
pub trait Now: Send + Sync {
    fn now(&self) -> Instant;
}

/// PWM pulse widths and periods.
#[derive(Clone, Copy, Debug, PartialOrd, Ord, PartialEq, Eq, Default)]
pub struct Microseconds(pub u32);

#[derive(Clone, Copy, Debug, PartialOrd, Ord, PartialEq, Eq, Default)]
pub struct Milliseconds(pub u32);

#[derive(Clone, Copy, Debug, PartialOrd, Ord, PartialEq, Eq, Default)]
pub struct Seconds(pub u32);

/// Extension trait that adds convenience methods to the `u32` type
pub trait U32Ext {
    /// Wrap in `Seconds`
    fn s(self) -> Seconds;

    /// Wrap in `Milliseconds`
    fn ms(self) -> Milliseconds;
}

impl U32Ext for u32 {
    fn s(self) -> Seconds { Seconds(self) }

    fn ms(self) -> Milliseconds { Milliseconds(self) }
}

/// Saturates at `u32::MAX` milliseconds.
impl From<Seconds> for Milliseconds {
    fn from(seconds: Seconds) -> Self { Milliseconds(seconds.0.saturating_mul(1_000)) }
}

impl From<Milliseconds> for core::time::Duration {
    fn from(milliseconds: Milliseconds) -> Self {
        core::time::Duration::from_millis(milliseconds.0 as u64)
    }
}

/// Instant subtraction to obtain a time period. Saturates at zero when
/// the right hand side is later, and at `u32::MAX` milliseconds.
impl Subtracts for Instant {
    type Output = Milliseconds;

    fn sub(self, rhs: Self) -> Self::Output {
        let difference = self.0.saturating_sub(rhs.0);
        Milliseconds(u32::try_from(difference).unwrap_or(u32::MAX))
    }
}

/// Addition between any Millisecond-convertible type and an instant.
impl<T: Into<Milliseconds>> Adds<T> for Instant {
    type Output = Self;

    fn add(self, rhs: T) -> Self { Instant(self.0.saturating_add(rhs.into().0 as u64)) }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn instant_differences_and_additions() {
        // Given
        let early = Instant(1_000);
        let late = early + 500.ms();

        // Then
        assert_eq!(Milliseconds(500), late - early);
        assert_eq!(Milliseconds(0), early - late);

        // Given
        let later = late + 2.s();

        // Then
        assert_eq!(Milliseconds(2_500), later - early);
    }

    #[test]
    fn unit_conversions_saturate() {
        assert_eq!(Milliseconds::from(2.s()), Milliseconds(2_000));
        assert_eq!(Milliseconds::from(5_000_000.s()), Milliseconds(u32::MAX));
        assert_eq!(Instant(u64::MAX) + 1.ms(), Instant(u64::MAX));
    }
}
