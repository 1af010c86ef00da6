//! Payload → chart: extract, assemble, carry forward, extrapolate, materialize.
//!
//! One run is a pure function of (payload, config, today) plus the session's
//! visibility preferences, which are reconciled in place. Metrics are
//! independent, so each metric's whole sequence runs as one rayon task that
//! owns its series; results are collected in catalog order.

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::{MetricSpec, UnitClass, VisualHint};
use crate::config::EngineConfig;
use crate::date_key::DateKey;
use crate::forecast;
use crate::preferences::VisibilityPreferences;
use crate::series::SparseSeries;
use crate::timeline::Timeline;

/// A declared metric with its fully built series.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub spec: MetricSpec,
    pub series: SparseSeries,
}

impl Metric {
    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// One chart line: values aligned 1:1 with the timeline, `None` for gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderableSeries {
    pub id: String,
    pub label: String,
    pub unit: UnitClass,
    pub visual: VisualHint,
    pub values: Vec<Option<f64>>,
    pub visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    metrics: Vec<Metric>,
}

impl MetricSet {
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self { metrics }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Metric> {
        self.metrics.iter().find(|metric| metric.id() == id)
    }

    /// Drop empty metrics and project the rest onto the timeline.
    pub fn materialize(&self, timeline: &Timeline, prefs: &VisibilityPreferences) -> Vec<RenderableSeries> {
        self.metrics
            .iter()
            .filter(|metric| !metric.is_empty())
            .map(|metric| RenderableSeries {
                id: metric.spec.id.clone(),
                label: metric.spec.label.clone(),
                unit: metric.spec.unit,
                visual: metric.spec.visual.clone(),
                values: metric.series.project(&timeline.keys),
                visible: prefs.is_visible(&metric.spec.id, metric.spec.default_visible),
            })
            .collect()
    }
}

/// Everything the chart needs for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub today: DateKey,
    pub timeline: Timeline,
    /// Axis labels, one per timeline key.
    pub labels: Vec<String>,
    pub series: Vec<RenderableSeries>,
}

impl ChartData {
    /// No metric had data: the caller shows a "nothing to chart" state.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RenderableSeries> {
        self.series.iter().find(|series| series.id == id)
    }

    /// blake3 digest of the canonical JSON form. Equal inputs give equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("ChartData serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

pub struct Pipeline {
    config: EngineConfig,
    catalog: Vec<MetricSpec>,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        let catalog = config.catalog();
        Self { config, catalog }
    }

    pub fn catalog(&self) -> &[MetricSpec] {
        &self.catalog
    }

    /// Build the metric set and timeline for `payload` as of `today`.
    pub fn build_metrics(&self, payload: &Value, today: DateKey) -> (MetricSet, Timeline) {
        let dated: Vec<SparseSeries> = self
            .catalog
            .par_iter()
            .map(|spec| spec.extract(payload, &[]))
            .collect();

        let seen: BTreeSet<DateKey> = dated.iter().flat_map(|series| series.keys()).collect();
        let timeline = Timeline::assemble(&seen, today, self.config.forecast.horizon);

        // Aggregates only appear next to real history.
        let broadcast_days: Vec<DateKey> = if timeline.has_history() {
            seen.into_iter().collect()
        } else {
            Vec::new()
        };

        let metrics: Vec<Metric> = self
            .catalog
            .par_iter()
            .zip(dated.into_par_iter())
            .map(|(spec, series)| self.build_metric(spec, series, payload, &broadcast_days, &timeline, today))
            .collect();

        (MetricSet::new(metrics), timeline)
    }

    fn build_metric(
        &self,
        spec: &MetricSpec,
        mut series: SparseSeries,
        payload: &Value,
        broadcast_days: &[DateKey],
        timeline: &Timeline,
        today: DateKey,
    ) -> Metric {
        if spec.broadcasts() && !broadcast_days.is_empty() {
            series = spec.extract(payload, broadcast_days);
        }
        if series.is_empty() {
            debug!(metric = %spec.id, "no data, metric dropped");
            return Metric {
                spec: spec.clone(),
                series,
            };
        }

        if spec.carry_forward {
            let filled = series.carry_forward(timeline.historical_keys());
            if filled > 0 {
                debug!(metric = %spec.id, filled, "carried values forward");
            }
        }

        let projected = forecast::extend(
            &mut series,
            timeline.future_keys(),
            spec.unit,
            today,
            &self.config.forecast,
        );
        debug!(metric = %spec.id, points = series.len(), projected, "metric built");

        Metric {
            spec: spec.clone(),
            series,
        }
    }

    /// Full run: metrics, visibility reconciliation, dense series, labels.
    pub fn run(&self, payload: &Value, today: DateKey, prefs: &mut VisibilityPreferences) -> ChartData {
        let (metrics, timeline) = self.build_metrics(payload, today);

        prefs.reconcile(
            metrics
                .iter()
                .filter(|metric| !metric.is_empty())
                .map(|metric| (metric.spec.id.as_str(), metric.spec.default_visible)),
        );

        let series = metrics.materialize(&timeline, prefs);
        let labels = self.config.labels.locale.axis_labels(&timeline.keys);

        info!(
            %today,
            days = timeline.len(),
            forecast_start = ?timeline.forecast_start_index,
            metrics = series.len(),
            "chart built"
        );

        ChartData {
            today,
            timeline,
            labels,
            series,
        }
    }
}

/// One-shot convenience over [`Pipeline::run`].
pub fn build_chart(
    payload: &Value,
    config: &EngineConfig,
    prefs: &mut VisibilityPreferences,
    today: DateKey,
) -> ChartData {
    Pipeline::new(config.clone()).run(payload, today, prefs)
}
