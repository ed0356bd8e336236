//! Numeric sum, a fold with seed zero and addition as combine.

use super::fold::{Fold, FoldFn};
use crate::error::{StreamError, StreamResult};
use crate::source::Source;
use crate::stream_configuration::OverflowPolicy;

/// Numeric element types that can be summed.
pub trait Summable: Copy + Send + Sync + 'static {
    const ZERO: Self;

    /// Add under `policy`; `None` means the sum overflowed under
    /// `OverflowPolicy::Fail`.
    fn add_with(self, rhs: Self, policy: OverflowPolicy) -> Option<Self>;
}

macro_rules! summable_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl Summable for $t {
                const ZERO: Self = 0;

                fn add_with(self, rhs: Self, policy: OverflowPolicy) -> Option<Self> {
                    match policy {
                        OverflowPolicy::Fail => self.checked_add(rhs),
                        OverflowPolicy::Wrap => Some(self.wrapping_add(rhs)),
                        OverflowPolicy::Saturate => Some(self.saturating_add(rhs)),
                    }
                }
            }
        )*
    };
}

macro_rules! summable_float {
    ($($t:ty),* $(,)?) => {
        $(
            // IEEE addition saturates to infinity on its own.
            impl Summable for $t {
                const ZERO: Self = 0.0;

                fn add_with(self, rhs: Self, _policy: OverflowPolicy) -> Option<Self> {
                    Some(self + rhs)
                }
            }
        )*
    };
}

summable_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
summable_float!(f32, f64);

/// Addition as a fold combine function.
#[derive(Debug, Clone, Copy, Default)]
pub struct Summation {
    policy: OverflowPolicy,
}

impl Summation {
    pub fn new(policy: OverflowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

impl<T: Summable> FoldFn<T, T> for Summation {
    fn combine(&self, acc: T, item: T) -> StreamResult<T> {
        acc.add_with(item, self.policy).ok_or(StreamError::Overflow)
    }
}

/// Source summing the elements of `S`.
pub type Sum<S> = Fold<S, <S as Source>::Item, Summation>;
