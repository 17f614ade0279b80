use std::{fmt::Display, ops::Deref};

use serde::Serialize;

/// Whole-number share of a total. Produced by truncation, so a set of shares never sums above
/// 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Percentage(u32);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);

    /// `floor(value * 100 / whole)`. Returns [None] for an empty whole or a negative value.
    pub fn of(value: impl Into<i128>, whole: impl Into<i128>) -> Option<Percentage> {
        let (value, whole) = (value.into(), whole.into());
        if whole <= 0 || value < 0 {
            return None;
        }
        let share = value * 100 / whole;
        u32::try_from(share).ok().map(Percentage)
    }

    /// Value usable as a progress fill, always within `0..=100`.
    pub fn clamped(self) -> Percentage {
        Percentage(self.0.min(100))
    }
}

impl Deref for Percentage {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
