//! Salescast Core — time-series unification and short-horizon forecasting
//! for marketplace analytics charts.
//!
//! A run takes a heterogeneous JSON payload and produces one chart:
//! - Per-metric sparse series built from several raw sources with precedence
//! - A common timeline split into history and a fixed-length forecast zone
//! - Carry-forward for slowly-changing metrics (price, rating)
//! - Trend + moving-average + momentum extrapolation into the forecast zone
//! - Dense, gap-preserving series plus axis labels for the presentation layer
//!
//! Malformed input never fails a run; it only thins out the chart.

pub mod catalog;
pub mod config;
pub mod date_key;
pub mod forecast;
pub mod labels;
pub mod pipeline;
pub mod preferences;
pub mod raw;
pub mod series;
pub mod timeline;

pub use catalog::{builtin_catalog, MetricSpec, SourceSpec, UnitClass, VisualHint};
pub use config::{ConfigError, EngineConfig, MAX_FORECAST_HORIZON};
pub use date_key::DateKey;
pub use forecast::ForecastConfig;
pub use labels::LabelLocale;
pub use pipeline::{build_chart, ChartData, Metric, MetricSet, Pipeline, RenderableSeries};
pub use preferences::{PreferencesError, VisibilityPreferences};
pub use series::{Reduce, SparseSeries, ValueFilter};
pub use timeline::Timeline;
