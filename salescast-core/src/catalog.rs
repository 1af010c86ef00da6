//! Metric declarations and the raw sources each metric is built from.
//!
//! A metric lists its sources in precedence order: the first source that
//! covers a day supplies that day's value. Sources are declarative so a
//! TOML config can replace the built-in catalog without code changes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::date_key::DateKey;
use crate::raw;
use crate::series::{Reduce, SparseSeries, ValueFilter};

/// Money vs. count, drives axis choice in the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    Money,
    Count,
}

impl UnitClass {
    /// Rounding applied to an extrapolated value.
    ///
    /// Both classes currently round to whole units; money is not kept at
    /// kopeck precision.
    pub fn round_projection(self, value: f64) -> f64 {
        match self {
            UnitClass::Money | UnitClass::Count => value.round(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnitClass::Money => "money",
            UnitClass::Count => "count",
        }
    }
}

/// Line styling handed through to the chart untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualHint {
    pub color: String,
    /// Dash pattern in px, empty for a solid line.
    #[serde(default)]
    pub dash: Vec<u32>,
    #[serde(default)]
    pub fill_opacity: Option<f64>,
}

impl VisualHint {
    pub fn solid(color: &str) -> Self {
        Self {
            color: color.to_string(),
            dash: Vec::new(),
            fill_opacity: None,
        }
    }
}

fn default_dates_field() -> String {
    "dates".to_string()
}

fn default_values_field() -> String {
    "values".to_string()
}

/// Where a metric's values come from in the raw payload.
///
/// Paths are dot-separated object keys from the payload root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// `{ "dates": [...], "values": [...] }`
    ParallelArrays {
        path: String,
        #[serde(default = "default_dates_field")]
        dates_field: String,
        #[serde(default = "default_values_field")]
        values_field: String,
    },
    /// `[ { "<date_field>": ..., "<value_field>": ... }, ... ]`
    DatedPoints {
        path: String,
        date_field: String,
        value_field: String,
        #[serde(default)]
        filter: ValueFilter,
    },
    /// `[ { "<values_field>": [...] }, ... ]` at `items_path`, each array
    /// aligned to the shared date array at `dates_path`, reduced per day.
    PerItemArrays {
        items_path: String,
        values_field: String,
        dates_path: String,
        #[serde(default)]
        reduce: Reduce,
    },
    /// Undated object (or list of objects) reduced to one number and
    /// repeated on every broadcast day.
    Aggregate {
        path: String,
        field: String,
        #[serde(default)]
        reduce: Reduce,
    },
    /// Day-wise `left × right`.
    Product {
        left: Box<SourceSpec>,
        right: Box<SourceSpec>,
    },
    /// Day-wise reduction over several sources.
    Combine {
        sources: Vec<SourceSpec>,
        #[serde(default)]
        reduce: Reduce,
    },
}

impl SourceSpec {
    pub fn parallel_arrays(path: &str) -> Self {
        SourceSpec::ParallelArrays {
            path: path.to_string(),
            dates_field: default_dates_field(),
            values_field: default_values_field(),
        }
    }

    pub fn dated_points(path: &str, date_field: &str, value_field: &str, filter: ValueFilter) -> Self {
        SourceSpec::DatedPoints {
            path: path.to_string(),
            date_field: date_field.to_string(),
            value_field: value_field.to_string(),
            filter,
        }
    }

    pub fn per_item_arrays(items_path: &str, values_field: &str, dates_path: &str, reduce: Reduce) -> Self {
        SourceSpec::PerItemArrays {
            items_path: items_path.to_string(),
            values_field: values_field.to_string(),
            dates_path: dates_path.to_string(),
            reduce,
        }
    }

    pub fn aggregate(path: &str, field: &str, reduce: Reduce) -> Self {
        SourceSpec::Aggregate {
            path: path.to_string(),
            field: field.to_string(),
            reduce,
        }
    }

    /// Build a fresh series from `payload`.
    ///
    /// `broadcast_days` are the days an aggregate source is spread over;
    /// pass an empty slice to read dated sources only.
    pub fn resolve(&self, payload: &Value, broadcast_days: &[DateKey]) -> SparseSeries {
        match self {
            SourceSpec::ParallelArrays {
                path,
                dates_field,
                values_field,
            } => raw::lookup(payload, path)
                .map(|node| raw::parallel_arrays(node, dates_field, values_field))
                .unwrap_or_default(),
            SourceSpec::DatedPoints {
                path,
                date_field,
                value_field,
                filter,
            } => raw::lookup(payload, path)
                .map(|node| raw::dated_records(node, date_field, value_field, *filter))
                .unwrap_or_default(),
            SourceSpec::PerItemArrays {
                items_path,
                values_field,
                dates_path,
                reduce,
            } => match (raw::lookup(payload, items_path), raw::lookup(payload, dates_path)) {
                (Some(items), Some(dates)) => raw::per_item_arrays(items, values_field, dates, *reduce),
                _ => SparseSeries::new(),
            },
            SourceSpec::Aggregate { path, field, reduce } => {
                if broadcast_days.is_empty() {
                    return SparseSeries::new();
                }
                raw::lookup(payload, path)
                    .and_then(|node| raw::aggregate(node, field, *reduce))
                    .map(|value| SparseSeries::broadcast(value, broadcast_days))
                    .unwrap_or_default()
            }
            SourceSpec::Product { left, right } => SparseSeries::product(
                &left.resolve(payload, broadcast_days),
                &right.resolve(payload, broadcast_days),
            ),
            SourceSpec::Combine { sources, reduce } => {
                let inputs: Vec<SparseSeries> = sources
                    .iter()
                    .map(|source| source.resolve(payload, broadcast_days))
                    .collect();
                SparseSeries::combine(&inputs, *reduce)
            }
        }
    }

    /// Whether the result depends on the broadcast days.
    pub fn broadcasts(&self) -> bool {
        match self {
            SourceSpec::Aggregate { .. } => true,
            SourceSpec::Product { left, right } => left.broadcasts() || right.broadcasts(),
            SourceSpec::Combine { sources, .. } => sources.iter().any(SourceSpec::broadcasts),
            SourceSpec::ParallelArrays { .. }
            | SourceSpec::DatedPoints { .. }
            | SourceSpec::PerItemArrays { .. } => false,
        }
    }
}

/// Declaration of one chartable metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub id: String,
    pub label: String,
    pub unit: UnitClass,
    pub visual: VisualHint,
    #[serde(default)]
    pub default_visible: bool,
    /// Fill historical holes with the last known value before forecasting.
    #[serde(default)]
    pub carry_forward: bool,
    /// Highest precedence first.
    pub sources: Vec<SourceSpec>,
}

impl MetricSpec {
    pub fn new(id: &str, label: &str, unit: UnitClass, color: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            unit,
            visual: VisualHint::solid(color),
            default_visible: false,
            carry_forward: false,
            sources: Vec::new(),
        }
    }

    pub fn visible(mut self) -> Self {
        self.default_visible = true;
        self
    }

    pub fn carried_forward(mut self) -> Self {
        self.carry_forward = true;
        self
    }

    pub fn dashed(mut self, pattern: &[u32]) -> Self {
        self.visual.dash = pattern.to_vec();
        self
    }

    pub fn filled(mut self, opacity: f64) -> Self {
        self.visual.fill_opacity = Some(opacity);
        self
    }

    pub fn source(mut self, source: SourceSpec) -> Self {
        self.sources.push(source);
        self
    }

    /// Resolve every source and merge them by precedence.
    pub fn extract(&self, payload: &Value, broadcast_days: &[DateKey]) -> SparseSeries {
        self.sources
            .iter()
            .map(|source| source.resolve(payload, broadcast_days))
            .reduce(|merged, next| SparseSeries::merge_with_precedence(&merged, &next))
            .unwrap_or_default()
    }

    pub fn broadcasts(&self) -> bool {
        self.sources.iter().any(SourceSpec::broadcasts)
    }
}

/// The dashboard's fixed metric list, in display order.
///
/// Expected payload layout (every part optional):
///
/// - `daily_sales`: `[{ data, sales, balance, price, final_price, rating, comments, discount, visibility, position }]`
/// - `balance_by_date`: `[{ date, balance }]`
/// - `by_date`: `[{ date, revenue }]`
/// - `sales_graph`, `stocks_graph`, `price_graph`, `visibility_graph`: `{ dates, values }`
/// - `search_queries`: `[{ date, frequency }]`
/// - `ad_stats.search`, `ad_stats.catalog`: `[{ date, views }]`
/// - `forecast`: `[{ ds, yhat_sales, yhat_revenue }]`
/// - `aggregated_charts.{sales,stocks,price,visibility}_graph`: `{ dates, values }`
/// - `all_products`: `[{ graph, stocks_graph, price_graph, product_visibility_graph }]`,
///   bare arrays aligned to the matching `aggregated_charts.*.dates`
/// - `brands`: `[{ revenue, avg_price, ... }]`
/// - `sellers`: `[{ sales, revenue, avg_price, rating, comments, balance }]`
pub fn builtin_catalog() -> Vec<MetricSpec> {
    use SourceSpec as S;
    use UnitClass::{Count, Money};
    use ValueFilter::{Any, NonNegative, Positive};

    let daily = |field: &str, filter: ValueFilter| S::dated_points("daily_sales", "data", field, filter);
    let products = |field: &str, chart: &str, reduce: Reduce| {
        S::per_item_arrays("all_products", field, &format!("aggregated_charts.{chart}.dates"), reduce)
    };
    let sellers = |field: &str, reduce: Reduce| S::aggregate("sellers", field, reduce);

    vec![
        MetricSpec::new("revenue", "Выручка (₽)", Money, "#2563eb")
            .visible()
            .filled(0.1)
            .source(S::dated_points("by_date", "date", "revenue", NonNegative))
            .source(S::Product {
                left: Box::new(daily("sales", NonNegative)),
                right: Box::new(daily("price", Positive)),
            })
            .source(S::dated_points("forecast", "ds", "yhat_revenue", NonNegative)),
        MetricSpec::new("orders", "Заказы (шт.)", Count, "#f97316")
            .visible()
            .source(daily("sales", NonNegative))
            .source(S::parallel_arrays("sales_graph"))
            .source(S::parallel_arrays("aggregated_charts.sales_graph"))
            .source(S::dated_points("forecast", "ds", "yhat_sales", NonNegative)),
        MetricSpec::new("stock", "Остатки (шт.)", Count, "#8b5cf6")
            .visible()
            .source(S::dated_points("balance_by_date", "date", "balance", NonNegative))
            .source(daily("balance", NonNegative))
            .source(S::parallel_arrays("stocks_graph"))
            .source(S::parallel_arrays("aggregated_charts.stocks_graph")),
        MetricSpec::new("price", "Средняя цена (₽)", Money, "#10b981")
            .dashed(&[6, 4])
            .filled(0.18)
            .carried_forward()
            .source(daily("price", Positive))
            .source(S::parallel_arrays("price_graph"))
            .source(S::parallel_arrays("aggregated_charts.price_graph")),
        MetricSpec::new("final_price", "Цена со скидкой (₽)", Money, "#14b8a6")
            .dashed(&[4, 4])
            .carried_forward()
            .source(daily("final_price", Positive)),
        MetricSpec::new("search_frequency", "Частотность", Count, "#0ea5e9")
            .dashed(&[2, 6])
            .source(S::dated_points("search_queries", "date", "frequency", NonNegative)),
        MetricSpec::new("ad_impressions", "Показы рекламы", Count, "#ef4444")
            .dashed(&[6, 3])
            .source(S::Combine {
                sources: vec![
                    S::dated_points("ad_stats.search", "date", "views", NonNegative),
                    S::dated_points("ad_stats.catalog", "date", "views", NonNegative),
                ],
                reduce: Reduce::Sum,
            }),
        MetricSpec::new("visibility", "Видимость (%)", Count, "#f59e0b")
            .dashed(&[2, 2])
            .source(daily("visibility", NonNegative))
            .source(S::parallel_arrays("visibility_graph"))
            .source(S::parallel_arrays("aggregated_charts.visibility_graph")),
        MetricSpec::new("position", "Позиция в поиске", Count, "#6366f1")
            .dashed(&[3, 6])
            .source(daily("position", Positive)),
        MetricSpec::new("rating", "Рейтинг", Count, "#fbbf24")
            .dashed(&[2, 4])
            .carried_forward()
            .source(daily("rating", Positive)),
        MetricSpec::new("comments", "Комментарии", Count, "#a78bfa")
            .dashed(&[3, 5])
            .carried_forward()
            .source(daily("comments", NonNegative)),
        MetricSpec::new("discount", "Скидка (%)", Count, "#ec4899")
            .dashed(&[4, 6])
            .source(daily("discount", Any)),
        MetricSpec::new("brand_revenue", "Выручка бренда (₽)", Money, "#3b82f6")
            .dashed(&[5, 5])
            .source(S::aggregate("brands", "revenue", Reduce::Sum)),
        MetricSpec::new("brand_avg_price", "Средняя цена бренда (₽)", Money, "#22c55e")
            .dashed(&[3, 5])
            .source(S::aggregate("brands", "avg_price", Reduce::Mean)),
        MetricSpec::new("seller_sales", "Продажи (продавцы) (шт.)", Count, "#fb7185")
            .dashed(&[6, 3])
            .source(sellers("sales", Reduce::Sum)),
        MetricSpec::new("seller_revenue", "Выручка (продавцы) (₽)", Money, "#fda4af")
            .dashed(&[4, 5])
            .source(sellers("revenue", Reduce::Sum)),
        MetricSpec::new("seller_avg_price", "Средняя цена продавцов (₽)", Money, "#fecdd3")
            .dashed(&[5, 4])
            .source(sellers("avg_price", Reduce::Mean)),
        MetricSpec::new("seller_rating", "Рейтинг продавцов", Count, "#ffe4e6")
            .dashed(&[4, 4])
            .source(sellers("rating", Reduce::Mean)),
        MetricSpec::new("seller_comments", "Комментарии продавцов", Count, "#fff1f2")
            .dashed(&[6, 3])
            .source(sellers("comments", Reduce::Mean)),
        MetricSpec::new("seller_balance", "Остатки продавцов (шт.)", Count, "#fee2e2")
            .dashed(&[3, 6])
            .source(sellers("balance", Reduce::Sum)),
        MetricSpec::new("products_sales", "Продажи товаров (шт.)", Count, "#7c3aed")
            .dashed(&[5, 4])
            .source(products("graph", "sales_graph", Reduce::Sum)),
        MetricSpec::new("products_stocks", "Остатки товаров (шт.)", Count, "#8b5cf6")
            .dashed(&[4, 6])
            .source(products("stocks_graph", "stocks_graph", Reduce::Sum)),
        MetricSpec::new("products_price", "Средняя цена товаров (₽)", Money, "#a78bfa")
            .dashed(&[6, 3])
            .source(products("price_graph", "price_graph", Reduce::Mean)),
        MetricSpec::new("products_visibility", "Видимость товаров (%)", Count, "#c4b5fd")
            .dashed(&[5, 4])
            .source(products("product_visibility_graph", "visibility_graph", Reduce::Mean)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn find<'a>(catalog: &'a [MetricSpec], id: &str) -> &'a MetricSpec {
        catalog.iter().find(|m| m.id == id).unwrap()
    }

    #[test]
    fn builtin_ids_are_unique_and_sourced() {
        let catalog = builtin_catalog();
        let ids: HashSet<&str> = catalog.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.len());
        assert!(catalog.iter().all(|m| !m.sources.is_empty()));
    }

    #[test]
    fn only_slow_moving_metrics_carry_forward() {
        let catalog = builtin_catalog();
        let carried: Vec<&str> = catalog.iter().filter(|m| m.carry_forward).map(|m| m.id.as_str()).collect();
        assert_eq!(carried, ["price", "final_price", "rating", "comments"]);
    }

    #[test]
    fn dedicated_balance_feed_wins_over_chart_array() {
        let payload = json!({
            "balance_by_date": [
                { "date": "2024-01-01", "balance": 40 },
                { "date": "2024-01-02", "balance": 38 }
            ],
            "stocks_graph": {
                "dates": ["2024-01-01", "2024-01-02", "2024-01-03"],
                "values": [99, 99, 35]
            }
        });
        let stock = find(&builtin_catalog(), "stock").extract(&payload, &[]);
        assert_eq!(
            stock.project(&[key("2024-01-01"), key("2024-01-02"), key("2024-01-03")]),
            vec![Some(40.0), Some(38.0), Some(35.0)]
        );
    }

    #[test]
    fn revenue_falls_back_to_sales_times_price() {
        let payload = json!({
            "daily_sales": [
                { "data": "2024-01-01", "sales": 3, "price": 250 },
                { "data": "2024-01-02", "sales": 2, "price": 0 }
            ],
            "by_date": [{ "date": "2024-01-03", "revenue": 900 }]
        });
        let revenue = find(&builtin_catalog(), "revenue").extract(&payload, &[]);
        assert_eq!(revenue.get(&key("2024-01-01")), Some(750.0));
        assert_eq!(revenue.get(&key("2024-01-02")), None);
        assert_eq!(revenue.get(&key("2024-01-03")), Some(900.0));
    }

    #[test]
    fn position_drops_unranked_days() {
        let payload = json!({
            "daily_sales": [
                { "data": "2024-01-01", "position": 14 },
                { "data": "2024-01-02", "position": 0 }
            ]
        });
        let position = find(&builtin_catalog(), "position").extract(&payload, &[]);
        assert_eq!(position.len(), 1);
    }

    #[test]
    fn aggregate_needs_broadcast_days() {
        let payload = json!({ "brands": [{ "revenue": 100 }, { "revenue": 300 }] });
        let catalog = builtin_catalog();
        let spec = find(&catalog, "brand_revenue");
        assert!(spec.broadcasts());
        assert!(spec.extract(&payload, &[]).is_empty());

        let days = [key("2024-01-01"), key("2024-01-02")];
        let series = spec.extract(&payload, &days);
        assert_eq!(series.project(&days), vec![Some(400.0), Some(400.0)]);
    }

    #[test]
    fn combine_sums_ad_placements() {
        let payload = json!({
            "ad_stats": {
                "search": [{ "date": "2024-01-01", "views": 10 }],
                "catalog": [{ "date": "2024-01-01", "views": 5 }, { "date": "2024-01-02", "views": 7 }]
            }
        });
        let ads = find(&builtin_catalog(), "ad_impressions").extract(&payload, &[]);
        assert_eq!(ads.get(&key("2024-01-01")), Some(15.0));
        assert_eq!(ads.get(&key("2024-01-02")), Some(7.0));
    }

    fn category_payload() -> Value {
        json!({
            "aggregated_charts": {
                "sales_graph": { "dates": ["2024-02-01", "2024-02-02"], "values": [40, 44] },
                "price_graph": { "dates": ["2024-02-01", "2024-02-02"], "values": [500, 510] }
            },
            "all_products": [
                { "graph": [10, 12], "price_graph": [400, 420] },
                { "graph": [5, null], "price_graph": [600, 600] },
                { "graph": [1, 2, 3], "price_graph": [null, 900] }
            ]
        })
    }

    #[test]
    fn product_graphs_sum_against_shared_dates() {
        let sales = find(&builtin_catalog(), "products_sales").extract(&category_payload(), &[]);
        let days = [key("2024-02-01"), key("2024-02-02")];
        // the third product's array is misaligned and dropped
        assert_eq!(sales.project(&days), vec![Some(15.0), Some(12.0)]);
    }

    #[test]
    fn product_prices_average_over_reporting_items() {
        let price = find(&builtin_catalog(), "products_price").extract(&category_payload(), &[]);
        assert_eq!(price.get(&key("2024-02-01")), Some(500.0));
        assert_eq!(price.get(&key("2024-02-02")), Some(640.0));
    }

    #[test]
    fn aggregated_charts_back_up_the_product_page_arrays() {
        let orders = find(&builtin_catalog(), "orders").extract(&category_payload(), &[]);
        assert_eq!(orders.get(&key("2024-02-02")), Some(44.0));
    }

    #[test]
    fn per_item_source_reads_from_toml() {
        let toml_src = r#"
            kind = "per_item_arrays"
            items_path = "all_products"
            values_field = "stocks_graph"
            dates_path = "aggregated_charts.stocks_graph.dates"
        "#;
        let source: SourceSpec = toml::from_str(toml_src).unwrap();
        assert_eq!(
            source,
            SourceSpec::per_item_arrays(
                "all_products",
                "stocks_graph",
                "aggregated_charts.stocks_graph.dates",
                Reduce::Sum
            )
        );
        assert!(!source.broadcasts());
    }

    #[test]
    fn seller_aggregates_sum_and_average() {
        let payload = json!({
            "sellers": [
                { "revenue": 1000, "avg_price": 100, "sales": 10 },
                { "revenue": "3000", "avg_price": 300, "sales": 20 },
                { "name": "no numbers" }
            ]
        });
        let catalog = builtin_catalog();
        let days = [key("2024-01-01"), key("2024-01-02")];

        let revenue = find(&catalog, "seller_revenue");
        assert!(revenue.broadcasts());
        assert_eq!(revenue.extract(&payload, &days).project(&days), vec![Some(4000.0), Some(4000.0)]);

        let avg_price = find(&catalog, "seller_avg_price").extract(&payload, &days);
        assert_eq!(avg_price.get(&days[0]), Some(200.0));

        let sales = find(&catalog, "seller_sales").extract(&payload, &days);
        assert_eq!(sales.get(&days[1]), Some(30.0));

        assert!(find(&catalog, "seller_balance").extract(&payload, &days).is_empty());
    }

    #[test]
    fn missing_payload_sections_give_empty_series() {
        let payload = json!({});
        for spec in builtin_catalog() {
            assert!(spec.extract(&payload, &[key("2024-01-01")]).is_empty(), "{}", spec.id);
        }
    }

    #[test]
    fn source_spec_reads_from_toml() {
        let toml_src = r##"
            id = "returns"
            label = "Возвраты"
            unit = "count"
            carry_forward = true
            visual = { color = "#111111", dash = [2, 2] }

            [[sources]]
            kind = "dated_points"
            path = "returns"
            date_field = "date"
            value_field = "count"
            filter = "non_negative"

            [[sources]]
            kind = "parallel_arrays"
            path = "returns_graph"
        "##;
        let spec: MetricSpec = toml::from_str(toml_src).unwrap();
        assert_eq!(spec.unit, UnitClass::Count);
        assert!(spec.carry_forward);
        assert!(!spec.default_visible);
        assert_eq!(spec.sources[1], SourceSpec::parallel_arrays("returns_graph"));
    }

    #[test]
    fn unit_classes_round_alike() {
        assert_eq!(UnitClass::Money.round_projection(12.5), 13.0);
        assert_eq!(UnitClass::Count.round_projection(12.5), 13.0);
        assert_eq!(UnitClass::Money.round_projection(0.4), 0.0);
    }
}
