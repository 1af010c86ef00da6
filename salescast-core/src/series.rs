//! Sparse per-metric history: DateKey → value.
//!
//! Absence is key absence. A day with no data is never stored as 0, so
//! "no observation" stays distinguishable from "observed zero" all the way
//! to the dense projection handed to the chart.
//!
//! Every constructor allocates a fresh map. Metrics never share a series
//! instance, which keeps the in-place forecast pass local to one metric.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::date_key::DateKey;

/// Which raw values a record-list extraction keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFilter {
    #[default]
    Any,
    /// Strictly positive only. For metrics where 0 means "not ranked" or
    /// "not rated" (search position, rating).
    Positive,
    NonNegative,
}

impl ValueFilter {
    pub fn accepts(self, value: f64) -> bool {
        match self {
            ValueFilter::Any => true,
            ValueFilter::Positive => value > 0.0,
            ValueFilter::NonNegative => value >= 0.0,
        }
    }
}

/// How several values collapse into one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduce {
    #[default]
    Sum,
    Mean,
}

impl Reduce {
    /// `None` when there is nothing to reduce.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        match self {
            Reduce::Sum => Some(sum),
            Reduce::Mean => Some(sum / values.len() as f64),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SparseSeries {
    points: BTreeMap<DateKey, f64>,
}

impl SparseSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, key: &DateKey) -> Option<f64> {
        self.points.get(key).copied()
    }

    pub fn contains(&self, key: &DateKey) -> bool {
        self.points.contains_key(key)
    }

    /// Store a value, replacing any previous one for the day.
    ///
    /// Non-finite values are refused (returns `false`) so a single bad
    /// record cannot poison the window statistics downstream.
    pub fn insert(&mut self, key: DateKey, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.points.insert(key, value);
        true
    }

    /// Entries in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (DateKey, f64)> + '_ {
        self.points.iter().map(|(k, v)| (*k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = DateKey> + '_ {
        self.points.keys().copied()
    }

    pub fn last(&self) -> Option<(DateKey, f64)> {
        self.points.iter().next_back().map(|(k, v)| (*k, *v))
    }

    /// Entries dated on or before `today`, ascending.
    pub fn history(&self, today: DateKey) -> Vec<(DateKey, f64)> {
        self.points.range(..=today).map(|(k, v)| (*k, *v)).collect()
    }

    /// Zip parallel date/value arrays by index.
    ///
    /// Entries with a missing or unparseable date, or a missing/non-finite
    /// value, are skipped. A repeated date keeps the later index. Trailing
    /// elements of the longer array are ignored.
    pub fn from_parallel_arrays<D: AsRef<str>>(dates: &[Option<D>], values: &[Option<f64>]) -> Self {
        let mut series = Self::new();
        for (index, (date, value)) in dates.iter().zip(values).enumerate() {
            let Some(key) = date.as_ref().and_then(|d| DateKey::parse(d.as_ref())) else {
                trace!(index, "skipping entry without a usable date");
                continue;
            };
            let Some(value) = *value else {
                continue;
            };
            if !series.insert(key, value) {
                trace!(index, %key, "skipping non-finite value");
            }
        }
        series
    }

    /// Same semantics as [`SparseSeries::from_parallel_arrays`] over a list of
    /// records, with a predicate on the extracted value.
    pub fn from_records<R>(
        records: &[R],
        date_of: impl Fn(&R) -> Option<DateKey>,
        value_of: impl Fn(&R) -> Option<f64>,
        keep: impl Fn(f64) -> bool,
    ) -> Self {
        let mut series = Self::new();
        for record in records {
            let (Some(key), Some(value)) = (date_of(record), value_of(record)) else {
                continue;
            };
            if value.is_finite() && keep(value) {
                series.insert(key, value);
            }
        }
        series
    }

    /// Union of two sources where `primary` always wins on shared days.
    pub fn merge_with_precedence(primary: &SparseSeries, fallback: &SparseSeries) -> SparseSeries {
        let mut merged = primary.clone();
        for (key, value) in fallback.iter() {
            merged.points.entry(key).or_insert(value);
        }
        merged
    }

    /// Fill holes along `ordered_keys` with the most recent earlier value.
    ///
    /// Keys before the first observation stay empty. Returns how many days
    /// were filled.
    pub fn carry_forward(&mut self, ordered_keys: &[DateKey]) -> usize {
        let mut last_seen: Option<f64> = None;
        let mut filled = 0;
        for key in ordered_keys {
            match self.points.get(key) {
                Some(value) => last_seen = Some(*value),
                None => {
                    if let Some(value) = last_seen {
                        self.points.insert(*key, value);
                        filled += 1;
                    }
                }
            }
        }
        filled
    }

    /// The same value on every key. Used for aggregate (undated) sources.
    pub fn broadcast(value: f64, keys: &[DateKey]) -> Self {
        let mut series = Self::new();
        for key in keys {
            series.insert(*key, value);
        }
        series
    }

    /// Per-day reduction across several series. A day is present when at
    /// least one input covers it; absent inputs do not count towards a mean.
    pub fn combine(inputs: &[SparseSeries], reduce: Reduce) -> Self {
        let mut per_day: BTreeMap<DateKey, Vec<f64>> = BTreeMap::new();
        for input in inputs {
            for (key, value) in input.iter() {
                per_day.entry(key).or_default().push(value);
            }
        }
        let mut series = Self::new();
        for (key, values) in per_day {
            if let Some(value) = reduce.apply(&values) {
                series.insert(key, value);
            }
        }
        series
    }

    /// Day-wise `left × right` on days both cover.
    pub fn product(left: &SparseSeries, right: &SparseSeries) -> Self {
        let mut series = Self::new();
        for (key, value) in left.iter() {
            if let Some(other) = right.get(&key) {
                series.insert(key, value * other);
            }
        }
        series
    }

    /// Dense projection onto `keys`: `None` wherever the series has no value.
    pub fn project(&self, keys: &[DateKey]) -> Vec<Option<f64>> {
        keys.iter().map(|key| self.get(key)).collect()
    }
}

impl FromIterator<(DateKey, f64)> for SparseSeries {
    fn from_iter<I: IntoIterator<Item = (DateKey, f64)>>(iter: I) -> Self {
        let mut series = Self::new();
        for (key, value) in iter {
            series.insert(key, value);
        }
        series
    }
}
