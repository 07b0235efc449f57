//! # Metrics
//!
//! Derived profit column, aggregate totals and top-N product rankings over
//! the unified table. Numeric cells that cannot be read count as zero.
use crate::classify::ColumnRoleMap;
use crate::classify::Role;
use crate::table::UnifiedTable;
use crate::table::Value;
use log::debug;
use std::collections::HashMap;
use std::fmt::Display;

/// Label of the derived profit column
pub const PROFIT_LABEL: &str = "PROFIT";
/// Number of entries kept in each ranking
pub const TOP_N: usize = 5;

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£'];

/// Reads a cell as a number; anything unreadable is zero
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => *number,
        Value::Text(text) => text
            .trim()
            .trim_matches(CURRENCY_SYMBOLS)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .unwrap_or(0.0),
        Value::Empty => 0.0,
    }
}

/// The column's values coerced to numbers, or `None` when it does not exist
pub fn numeric_column(table: &UnifiedTable, label: &str) -> Option<Vec<f64>> {
    Some(table.column(label)?.map(coerce_number).collect())
}

/// Appends `PROFIT = REVENUE - COST` when both roles resolve and returns the
/// label the column was stored under.
pub fn derive_profit(table: &mut UnifiedTable, roles: &ColumnRoleMap) -> Option<String> {
    let revenue = numeric_column(table, roles.get(Role::Revenue)?)?;
    let cost = numeric_column(table, roles.get(Role::Cost)?)?;
    let profit = revenue
        .iter()
        .zip(&cost)
        .map(|(revenue, cost)| Value::Number(revenue - cost))
        .collect();
    let label = table.push_column(PROFIT_LABEL, profit);
    debug!("Derived profit column '{}'", label);
    Some(label)
}

/// Aggregate totals; each is present only when its inputs resolve
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsSummary {
    pub total_revenue: Option<f64>,
    pub total_cost: Option<f64>,
    pub total_profit: Option<f64>,
    /// Profit over revenue, in percent; absent when revenue is zero
    pub profit_margin: Option<f64>,
}

impl MetricsSummary {
    pub fn compute(table: &UnifiedTable, roles: &ColumnRoleMap, profit_label: Option<&str>) -> Self {
        let total = |label: Option<&str>| label.and_then(|label| numeric_column(table, label)).map(|values| values.iter().sum::<f64>());
        let total_revenue = total(roles.get(Role::Revenue));
        let total_cost = total(roles.get(Role::Cost));
        let total_profit = total(profit_label);
        let profit_margin = match (total_profit, total_revenue) {
            (Some(profit), Some(revenue)) if revenue != 0.0 => Some(profit / revenue * 100.0),
            _ => None,
        };
        MetricsSummary {
            total_revenue,
            total_cost,
            total_profit,
            profit_margin,
        }
    }

    /// Present metrics as (name, value) pairs in display order
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        [
            ("Total Revenue", self.total_revenue),
            ("Total Cost", self.total_cost),
            ("Total Profit", self.total_profit),
            ("Profit Margin %", self.profit_margin),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Measure a ranking sums per product
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TopMetric {
    Quantity,
    Revenue,
    Profit,
}

impl Display for TopMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopMetric::Quantity => write!(f, "quantity"),
            TopMetric::Revenue => write!(f, "revenue"),
            TopMetric::Profit => write!(f, "profit"),
        }
    }
}

/// Products ranked by one metric, largest first
#[derive(Clone, Debug, PartialEq)]
pub struct TopN {
    pub metric: TopMetric,
    pub entries: Vec<(String, f64)>,
}

impl TopN {
    pub fn title(&self) -> String {
        format!("Top {} products by {}", TOP_N, self.metric)
    }

    pub fn first(&self) -> Option<&(String, f64)> {
        self.entries.first()
    }
}

/// Sums `values` per key in first-seen key order. Rows whose key is empty
/// are left out.
pub fn group_sum<'a, K, V>(keys: K, values: V) -> Vec<(String, f64)>
where
    K: IntoIterator<Item = &'a Value>,
    V: IntoIterator<Item = f64>,
{
    let mut groups = Vec::<(String, f64)>::new();
    let mut positions = HashMap::<String, usize>::new();
    for (key, value) in keys.into_iter().zip(values) {
        if key.is_empty() {
            continue;
        }
        let key = key.to_string();
        match positions.get(&key) {
            Some(index) => groups[*index].1 += value,
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, value));
            }
        }
    }
    groups
}

/// Largest `n` groups, descending; ties keep their original order
pub fn top_n(mut groups: Vec<(String, f64)>, n: usize) -> Vec<(String, f64)> {
    groups.sort_by(|left, right| right.1.total_cmp(&left.1));
    groups.truncate(n);
    groups
}

/// The largest group, the first one seen among equals
pub fn max_group(groups: Vec<(String, f64)>) -> Option<(String, f64)> {
    top_n(groups, 1).pop()
}

/// Everything computed once per set of uploads
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsReport {
    /// Label of the derived profit column, when it could be derived
    pub profit_column: Option<String>,
    pub summary: MetricsSummary,
    pub top: Vec<TopN>,
}

impl MetricsReport {
    pub fn top(&self, metric: TopMetric) -> Option<&TopN> {
        self.top.iter().find(|top| top.metric == metric)
    }
}

/// Derives the profit column, then totals and rankings
pub fn compute(table: &mut UnifiedTable, roles: &ColumnRoleMap) -> MetricsReport {
    let profit_column = derive_profit(table, roles);
    let summary = MetricsSummary::compute(table, roles, profit_column.as_deref());

    let mut top = Vec::new();
    if let Some(products) = roles.get(Role::Product).and_then(|label| table.column(label)) {
        let products = products.collect::<Vec<_>>();
        let measures = [
            (TopMetric::Quantity, roles.get(Role::Quantity)),
            (TopMetric::Revenue, roles.get(Role::Revenue)),
            (TopMetric::Profit, profit_column.as_deref()),
        ];
        for (metric, label) in measures {
            if let Some(values) = label.and_then(|label| numeric_column(table, label)) {
                let entries = top_n(group_sum(products.iter().copied(), values), TOP_N);
                debug!("Ranked {} product(s) by {}", entries.len(), metric);
                top.push(TopN { metric, entries });
            }
        }
    }

    MetricsReport {
        profit_column,
        summary,
        top,
    }
}
