//! Reminder offsets, in minutes before a meeting starts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Largest accepted offset: 365 days.
pub const MAX_OFFSET_MINUTES: u32 = 365 * 24 * 60;

/// A normalized set of reminder offsets.
///
/// Values are positive, at most [`MAX_OFFSET_MINUTES`], unique, and sorted
/// descending (earliest reminder first). Anything else is dropped on
/// construction, so every value of this type is already normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<i64>", into = "Vec<u32>")]
pub struct ReminderOffsets(Vec<u32>);

impl ReminderOffsets {
    /// Normalizes raw offsets.
    pub fn new(raw: impl IntoIterator<Item = i64>) -> Self {
        let kept: BTreeSet<u32> = raw
            .into_iter()
            .filter_map(|v| u32::try_from(v).ok())
            .filter(|v| (1..=MAX_OFFSET_MINUTES).contains(v))
            .collect();
        Self(kept.into_iter().rev().collect())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// The earliest reminder's offset, or zero when there is none.
    #[must_use]
    pub fn largest(&self) -> u32 {
        self.0.first().copied().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<i64>> for ReminderOffsets {
    fn from(raw: Vec<i64>) -> Self {
        Self::new(raw)
    }
}

impl From<ReminderOffsets> for Vec<u32> {
    fn from(offsets: ReminderOffsets) -> Self {
        offsets.0
    }
}

impl FromIterator<i64> for ReminderOffsets {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_values_are_dropped() {
        let offsets = ReminderOffsets::new([0, -5, 525_601, i64::MAX, 1, 525_600]);
        assert_eq!(offsets.as_slice(), &[525_600, 1]);
    }

    #[test]
    fn duplicates_collapse_and_order_is_descending() {
        let offsets = ReminderOffsets::new([120, 2880, 120, 15, 2880, 1440]);
        assert_eq!(offsets.as_slice(), &[2880, 1440, 120, 15]);
    }

    #[test]
    fn largest_is_the_earliest_reminder() {
        assert_eq!(ReminderOffsets::new([15, 2880, 120]).largest(), 2880);
        assert_eq!(ReminderOffsets::default().largest(), 0);
    }

    #[test]
    fn normalization_holds_for_arbitrary_input() {
        // Cheap deterministic sweep over mixed-sign values.
        let raw: Vec<i64> = (-600_000..600_000).step_by(7_919).chain([60, 60, 0]).collect();
        let offsets = ReminderOffsets::new(raw);

        assert!(offsets.iter().all(|v| (1..=MAX_OFFSET_MINUTES).contains(&v)));
        assert!(offsets.as_slice().windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn deserializing_normalizes() {
        let offsets: ReminderOffsets = serde_json::from_str("[5, 0, 60, 5, -1]").expect("parse");
        assert_eq!(offsets.as_slice(), &[60, 5]);
        assert_eq!(serde_json::to_string(&offsets).expect("serialize"), "[60,5]");
    }
}
