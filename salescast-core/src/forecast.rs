//! Short-horizon extrapolation: trend + moving average + momentum blend.
//!
//! From the trailing window of history (at most `window` points on or
//! before today):
//!
//! - `moving_average` = mean of the window
//! - `slope` = (last − first) / (len − 1), or 0 for a single point
//!
//! then for each unfilled future day, in order, with `step` counting only
//! the days actually filled:
//!
//! ```text
//! trend      = last_observed + slope * (step + 1)
//! projection = 0.6 * trend + 0.3 * moving_average + 0.1 * previous_projection
//! stored     = round(max(projection, 0))
//! ```
//!
//! `previous_projection` starts at the last observed value and carries the
//! raw blend, so the pass is a strict left fold over the future days.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::UnitClass;
use crate::date_key::DateKey;
use crate::series::SparseSeries;

/// Number of future days the timeline always reaches.
pub const FORECAST_HORIZON: usize = 14;

/// Trailing history points feeding the trend and average.
pub const FORECAST_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon: usize,
    pub window: usize,
    pub trend_weight: f64,
    pub average_weight: f64,
    pub momentum_weight: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: FORECAST_HORIZON,
            window: FORECAST_WINDOW,
            trend_weight: 0.6,
            average_weight: 0.3,
            momentum_weight: 0.1,
        }
    }
}

/// Window statistics a projection is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendBlend {
    pub last_observed: f64,
    pub moving_average: f64,
    pub slope: f64,
}

impl TrendBlend {
    /// `None` for an empty history. `history` must be ascending.
    pub fn from_history(history: &[(DateKey, f64)], window: usize) -> Option<Self> {
        let (_, last_observed) = *history.last()?;
        let start = history.len().saturating_sub(window.max(1));
        let tail = &history[start..];

        let moving_average = tail.iter().map(|(_, v)| v).sum::<f64>() / tail.len() as f64;
        let slope = if tail.len() > 1 {
            (tail[tail.len() - 1].1 - tail[0].1) / (tail.len() - 1) as f64
        } else {
            0.0
        };

        Some(Self {
            last_observed,
            moving_average,
            slope,
        })
    }

    /// Raw (unclamped) projection for the `step`-th filled day.
    pub fn project(&self, step: usize, previous: f64, config: &ForecastConfig) -> f64 {
        let trend = self.last_observed + self.slope * (step + 1) as f64;
        config.trend_weight * trend + config.average_weight * self.moving_average + config.momentum_weight * previous
    }
}

/// Fill the future days of `series` in place. Returns how many days were added.
///
/// Days that already hold a value (history, or an upstream forecast feed)
/// are never overwritten and do not advance the step counter. A series with
/// nothing on or before `today` is left untouched.
pub fn extend(
    series: &mut SparseSeries,
    future_keys: &[DateKey],
    unit: UnitClass,
    today: DateKey,
    config: &ForecastConfig,
) -> usize {
    if future_keys.is_empty() {
        return 0;
    }
    let Some(blend) = TrendBlend::from_history(&series.history(today), config.window) else {
        debug!("no history on or before {today}, skipping extrapolation");
        return 0;
    };

    let mut ordered = future_keys.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    let unfilled: Vec<DateKey> = ordered.into_iter().filter(|key| !series.contains(key)).collect();

    unfilled
        .iter()
        .enumerate()
        .fold(blend.last_observed, |previous, (step, key)| {
            let projection = blend.project(step, previous, config);
            series.insert(*key, unit.round_projection(projection.max(0.0)));
            projection
        });

    debug!(
        filled = unfilled.len(),
        slope = blend.slope,
        moving_average = blend.moving_average,
        "extrapolated series"
    );
    unfilled.len()
}
