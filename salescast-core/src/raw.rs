//! Lenient access to the raw JSON payload returned by the analytics backend.
//!
//! Upstream shapes are inconsistent: numbers arrive as JSON numbers or as
//! numeric strings, dates as ISO days or full timestamps, and any field may
//! be null or missing. Everything here degrades to "no value" instead of
//! failing.

use serde_json::Value;
use tracing::trace;

use crate::date_key::DateKey;
use crate::series::{Reduce, SparseSeries, ValueFilter};

/// Follow a dot-separated path of object keys. An empty path is the root.
pub fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(payload);
    }
    path.split('.')
        .try_fold(payload, |node, segment| node.as_object()?.get(segment))
}

/// A finite number from a JSON number or a numeric string.
pub fn lenient_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

pub fn lenient_date(value: &Value) -> Option<DateKey> {
    value.as_str().and_then(DateKey::parse)
}

/// `{ "<dates_field>": [...], "<values_field>": [...] }` → sparse series.
pub fn parallel_arrays(node: &Value, dates_field: &str, values_field: &str) -> SparseSeries {
    let (Some(dates), Some(values)) = (
        node.get(dates_field).and_then(Value::as_array),
        node.get(values_field).and_then(Value::as_array),
    ) else {
        return SparseSeries::new();
    };
    if dates.len() != values.len() {
        trace!(
            dates = dates.len(),
            values = values.len(),
            "parallel arrays differ in length, zipping to the shorter"
        );
    }
    let dates: Vec<Option<&str>> = dates.iter().map(Value::as_str).collect();
    let values: Vec<Option<f64>> = values.iter().map(lenient_number).collect();
    SparseSeries::from_parallel_arrays(&dates, &values)
}

/// Array of records with named date and value fields → sparse series.
pub fn dated_records(node: &Value, date_field: &str, value_field: &str, filter: ValueFilter) -> SparseSeries {
    let Some(records) = node.as_array() else {
        return SparseSeries::new();
    };
    SparseSeries::from_records(
        records.as_slice(),
        |record| record.get(date_field).and_then(lenient_date),
        |record| record.get(value_field).and_then(lenient_number),
        |value| filter.accepts(value),
    )
}

/// A list of items, each holding a bare `values_field` array aligned by
/// index to one shared `dates` array, reduced per day across items.
///
/// An item whose array length differs from the dates is skipped whole.
/// Null entries do not count towards a mean.
pub fn per_item_arrays(items: &Value, values_field: &str, dates: &Value, reduce: Reduce) -> SparseSeries {
    let (Some(items), Some(dates)) = (items.as_array(), dates.as_array()) else {
        return SparseSeries::new();
    };
    let dates: Vec<Option<&str>> = dates.iter().map(Value::as_str).collect();

    let per_item: Vec<SparseSeries> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let values = item.get(values_field)?.as_array()?;
            if values.len() != dates.len() {
                trace!(
                    index,
                    values = values.len(),
                    dates = dates.len(),
                    "item array not aligned with shared dates, skipped"
                );
                return None;
            }
            let values: Vec<Option<f64>> = values.iter().map(lenient_number).collect();
            Some(SparseSeries::from_parallel_arrays(&dates, &values))
        })
        .collect();

    SparseSeries::combine(&per_item, reduce)
}

/// Collapse an object (or an array of objects) to one number via `field`.
///
/// Entries lacking the field are skipped rather than counted as zero.
pub fn aggregate(node: &Value, field: &str, reduce: Reduce) -> Option<f64> {
    match node {
        Value::Object(_) => node.get(field).and_then(lenient_number),
        Value::Array(items) => {
            let values: Vec<f64> = items
                .iter()
                .filter_map(|item| item.get(field).and_then(lenient_number))
                .collect();
            reduce.apply(&values)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_walks_nested_objects() {
        let payload = json!({ "charts": { "sales_graph": { "dates": [] } } });
        assert!(lookup(&payload, "charts.sales_graph").is_some());
        assert!(lookup(&payload, "charts.missing").is_none());
        assert!(lookup(&payload, "charts.sales_graph.dates.0").is_none());
        assert_eq!(lookup(&payload, ""), Some(&payload));
    }

    #[test]
    fn numbers_are_read_leniently() {
        assert_eq!(lenient_number(&json!(12)), Some(12.0));
        assert_eq!(lenient_number(&json!(" 118 ")), Some(118.0));
        assert_eq!(lenient_number(&json!("12,5")), None);
        assert_eq!(lenient_number(&json!("NaN")), None);
        assert_eq!(lenient_number(&json!(null)), None);
        assert_eq!(lenient_number(&json!(true)), None);
    }

    #[test]
    fn parallel_arrays_tolerate_nulls() {
        let node = json!({
            "dates": ["2024-01-01", null, "2024-01-03"],
            "values": [5, 6, null]
        });
        let s = parallel_arrays(&node, "dates", "values");
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&DateKey::parse("2024-01-01").unwrap()), Some(5.0));
    }

    #[test]
    fn dated_records_read_string_balances() {
        let node = json!([
            { "data": "2024-01-01", "balance": "120" },
            { "data": "2024-01-02", "balance": "oops" },
            { "data": "2024-01-03" },
            { "balance": "90" },
            "not a record"
        ]);
        let s = dated_records(&node, "data", "balance", ValueFilter::Any);
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&DateKey::parse("2024-01-01").unwrap()), Some(120.0));
    }

    #[test]
    fn per_item_arrays_reduce_across_items() {
        let dates = json!(["2024-01-01", "2024-01-02", "2024-01-03"]);
        let items = json!([
            { "graph": [1, 2, null] },
            { "graph": [10, "20", 30] },
            { "graph": [100, 200] },
            { "name": "no graph" }
        ]);
        let day = |s: &str| DateKey::parse(s).unwrap();

        let sum = per_item_arrays(&items, "graph", &dates, Reduce::Sum);
        assert_eq!(sum.get(&day("2024-01-01")), Some(11.0));
        assert_eq!(sum.get(&day("2024-01-02")), Some(22.0));
        assert_eq!(sum.get(&day("2024-01-03")), Some(30.0));

        let mean = per_item_arrays(&items, "graph", &dates, Reduce::Mean);
        assert_eq!(mean.get(&day("2024-01-01")), Some(5.5));
        assert_eq!(mean.get(&day("2024-01-03")), Some(30.0));
    }

    #[test]
    fn per_item_arrays_need_both_lists() {
        let items = json!([{ "graph": [1] }]);
        assert!(per_item_arrays(&items, "graph", &json!(null), Reduce::Sum).is_empty());
        assert!(per_item_arrays(&json!({}), "graph", &json!(["2024-01-01"]), Reduce::Sum).is_empty());
    }

    #[test]
    fn aggregate_over_list_and_object() {
        let brands = json!([{ "revenue": 100 }, { "revenue": "50" }, { "name": "x" }]);
        assert_eq!(aggregate(&brands, "revenue", Reduce::Sum), Some(150.0));
        assert_eq!(aggregate(&brands, "revenue", Reduce::Mean), Some(75.0));
        assert_eq!(aggregate(&json!({ "revenue": 7 }), "revenue", Reduce::Sum), Some(7.0));
        assert_eq!(aggregate(&json!([]), "revenue", Reduce::Sum), None);
    }
}
