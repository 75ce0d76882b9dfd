use core::num::NonZeroU64;

use easy_ext::ext;
use num_integer::Roots as _;

#[ext(U64Ext)]
pub impl u64 {
    /// Raises `self` to `floor` if it is smaller.
    ///
    /// The result is nonzero, so it can be used as a divisor without further checks.
    #[inline]
    #[must_use]
    fn at_least(self, floor: NonZeroU64) -> NonZeroU64 {
        NonZeroU64::new(self).map_or(floor, |value| value.max(floor))
    }

    /// Computes `self * multiplier / divisor`, returning `None` if the product overflows.
    #[inline]
    #[must_use]
    fn checked_mul_div(self, multiplier: u64, divisor: NonZeroU64) -> Option<u64> {
        self.checked_mul(multiplier).map(|product| product / divisor)
    }
}

#[ext(NonZeroU64Ext)]
pub impl NonZeroU64 {
    /// Integer square root rounded down. The root of a nonzero number is at least 1.
    #[inline]
    #[must_use]
    fn integer_sqrt(self) -> Self {
        Self::new(self.get().sqrt()).unwrap_or(Self::MIN)
    }
}
