use serde::{Deserialize, Serialize};

/// Tolerance for treating monetary values as equal / zero, in minor units.
///
/// One cent: the smallest representable difference. Custom splits may be off
/// by at most this much from the expense amount; balances within this of zero
/// count as settled.
pub const EPSILON_MINOR: i64 = 1;

/// Signed money amount represented as **integer cents**.
///
/// Amounts cross the engine as raw `i64` minor units; this wrapper exists for
/// the split arithmetic, where summing back to the exact original amount is
/// the invariant that matters.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Splits a non-negative amount evenly into `parts` shares.
    ///
    /// The shares always sum exactly to the original amount: each share gets
    /// `total / parts` cents, and the remainder cents go to the first shares
    /// in order, one each. Returns an empty vec for `parts == 0`.
    #[must_use]
    pub fn split_even(self, parts: usize) -> Vec<MoneyCents> {
        if parts == 0 {
            return Vec::new();
        }
        let parts_i = parts as i64;
        let base = self.0.div_euclid(parts_i);
        let remainder = self.0.rem_euclid(parts_i);
        (0..parts_i)
            .map(|i| MoneyCents(base + i64::from(i < remainder)))
            .collect()
    }
}
