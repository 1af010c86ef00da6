//! Chart output formats: JSON, CSV and a plain-text table.

use anyhow::Result;
use salescast_core::ChartData;

/// Pretty JSON of the whole chart.
pub fn json(chart: &ChartData) -> Result<String> {
    Ok(serde_json::to_string_pretty(chart)?)
}

/// One row per timeline day: `date,label,zone,<metric ids...>`.
/// Gaps are empty cells, never zero.
pub fn csv(chart: &ChartData) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["date".to_string(), "label".to_string(), "zone".to_string()];
    header.extend(chart.series.iter().map(|s| s.id.clone()));
    writer.write_record(&header)?;

    for (index, key) in chart.timeline.keys.iter().enumerate() {
        let mut row = vec![key.to_string(), chart.labels[index].clone(), zone(chart, index).to_string()];
        row.extend(chart.series.iter().map(|s| cell(s.values[index])));
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|err| anyhow::anyhow!("flush CSV: {err}"))?;
    Ok(String::from_utf8(bytes)?)
}

/// Fixed-width table of the visible metrics, with a marker where the
/// forecast zone starts.
pub fn table(chart: &ChartData) -> String {
    if chart.is_empty() {
        return "No data to chart.\n".to_string();
    }

    let visible: Vec<_> = chart.series.iter().filter(|s| s.visible).collect();
    let mut out = String::new();

    out.push_str(&format!("{:<12}{:<10}", "date", "label"));
    for series in &visible {
        out.push_str(&format!("{:>16}", truncate(&series.id, 15)));
    }
    out.push('\n');

    for (index, key) in chart.timeline.keys.iter().enumerate() {
        if Some(index) == chart.timeline.forecast_start_index {
            out.push_str("-- forecast --\n");
        }
        out.push_str(&format!("{:<12}{:<10}", key.to_string(), chart.labels[index]));
        for series in &visible {
            out.push_str(&format!("{:>16}", cell(series.values[index])));
        }
        out.push('\n');
    }

    let hidden = chart.series.len() - visible.len();
    if hidden > 0 {
        out.push_str(&format!("({hidden} hidden metrics, use `salescast toggle` to show)\n"));
    }
    out
}

fn zone(chart: &ChartData, index: usize) -> &'static str {
    if index < chart.timeline.historical_count {
        "history"
    } else {
        "forecast"
    }
}

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{v:.0}"),
        Some(v) => format!("{v:.2}"),
        None => String::new(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
