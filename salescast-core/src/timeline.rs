//! Common chart axis built from the union of every metric's dates.
//!
//! Keys on or before "today" form the historical prefix; the suffix is the
//! forecast zone, padded to the horizon with consecutive days after the last
//! known day.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::date_key::{extend_sequence, DateKey};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    /// Chronological, deduplicated.
    pub keys: Vec<DateKey>,
    /// Length of the `≤ today` prefix.
    pub historical_count: usize,
    /// First index of the forecast zone. `None` only for an empty timeline.
    pub forecast_start_index: Option<usize>,
}

impl Timeline {
    /// Partition `seen` around `today` and pad the future to `horizon` days.
    ///
    /// Generated days start after the later of the last historical day and
    /// `today`, or after the last pre-existing future day. Pre-existing future
    /// days are kept as given, so a gap between today and the first of them
    /// stays open. No dates at all yields an empty timeline.
    pub fn assemble(seen: &BTreeSet<DateKey>, today: DateKey, horizon: usize) -> Self {
        if seen.is_empty() {
            return Self::default();
        }

        let historical: Vec<DateKey> = seen.range(..=today).copied().collect();
        let future: Vec<DateKey> = seen.iter().copied().filter(|key| *key > today).collect();

        let forecast_start_index = if !historical.is_empty() {
            Some(historical.len())
        } else if !future.is_empty() {
            Some(0)
        } else {
            None
        };

        let anchor = historical.last().map(|last| (*last).max(today));
        let extended = extend_sequence(anchor, horizon, &future, today);

        let historical_count = historical.len();
        let mut keys = historical;
        for key in extended {
            if keys.last().map_or(true, |last| key > *last) {
                keys.push(key);
            }
        }

        debug!(
            historical = historical_count,
            future = keys.len() - historical_count,
            "assembled timeline"
        );

        Self {
            keys,
            historical_count,
            forecast_start_index,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn historical_keys(&self) -> &[DateKey] {
        &self.keys[..self.historical_count]
    }

    pub fn future_keys(&self) -> &[DateKey] {
        &self.keys[self.historical_count..]
    }

    pub fn has_history(&self) -> bool {
        self.historical_count > 0
    }
}
