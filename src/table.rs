//! Table model shared by the readers and the analysis stages, and the
//! unifier that concatenates raw tables into a single one.

use log::debug;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt::Display;

/// Label given to header cells that carry no text
pub const PLACEHOLDER_LABEL: &str = "COL";

/// A single cell value.
///
/// [`Value::Empty`] is the missing-value marker: it fills columns a source
/// table did not have, coerces to zero in numeric columns and is never used
/// as a grouping key.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl Value {
    /// Text value, or [`Value::Empty`] when the text is blank
    pub fn from_text(text: &str) -> Self {
        if text.trim().is_empty() {
            Value::Empty
        } else {
            Value::Text(text.to_owned())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(text) => write!(f, "{text}"),
            Value::Number(number) => write!(f, "{}", format_number(*number)),
        }
    }
}

/// Formats whole numbers without a fractional part and rounds the rest to
/// at most two decimals.
pub fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        let rounded = format!("{number:.2}");
        rounded.trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}

/// One table extracted from a sheet or from a PDF table region.
#[derive(Clone, Debug, PartialEq)]
pub struct RawTable {
    /// Where the table came from, e.g. `ventas.xlsx#Enero` or `informe.pdf#page2`
    pub source: String,
    /// Header labels, unique within the table
    pub columns: Vec<String>,
    /// Data rows, each aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    /// Builds a table from a header row and data rows.
    ///
    /// Blank labels become [`PLACEHOLDER_LABEL`], repeated labels are made
    /// unique, and rows are padded or truncated to the header width.
    pub fn new(source: impl Into<String>, header: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns = dedupe_labels(header.into_iter().map(|label| {
            if label.trim().is_empty() {
                PLACEHOLDER_LABEL.to_owned()
            } else {
                label
            }
        }));
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Empty);
                row
            })
            .collect();
        RawTable {
            source: source.into(),
            columns,
            rows,
        }
    }
}

/// Every raw table's rows under the union of their (normalized) columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnifiedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl UnifiedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == label)
    }

    /// Values of the column labelled `label`, top to bottom
    pub fn column<'a>(&'a self, label: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let index = self.column_index(label)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Appends a derived column and returns the label it was stored under,
    /// which gets a numeric suffix when `label` is already taken.
    pub fn push_column(&mut self, label: &str, values: Vec<Value>) -> String {
        let mut labels = self.columns.clone();
        labels.push(label.to_owned());
        let stored = dedupe_labels(labels).pop().unwrap_or_else(|| label.to_owned());
        self.columns.push(stored.clone());
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.push(values.next().unwrap_or_default());
        }
        stored
    }
}

/// Normalizes a column label for matching: trimmed and upper-cased.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_uppercase()
}

/// Makes labels unique: the first occurrence keeps its text, later ones get
/// `_1`, `_2`, … (skipping suffixes that are already in use).
pub fn dedupe_labels<I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::<String>::new();
    let mut counters = HashMap::<String, usize>::new();
    labels
        .into_iter()
        .map(|label| {
            if seen.insert(label.clone()) {
                return label;
            }
            let counter = counters.entry(label.clone()).or_insert(0);
            loop {
                *counter += 1;
                let candidate = format!("{label}_{counter}");
                if seen.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Concatenates raw tables into one table.
///
/// Rows keep input order. Columns are the union of all normalized labels in
/// first-seen order; a row gets [`Value::Empty`] for every column its source
/// table lacks. Returns `None` when there is nothing to unify.
pub fn unify(tables: Vec<RawTable>) -> Option<UnifiedTable> {
    if tables.is_empty() {
        return None;
    }

    let mut columns = Vec::<String>::new();
    let mut positions = HashMap::<String, usize>::new();
    let mappings = tables
        .iter()
        .map(|table| {
            dedupe_labels(table.columns.iter().map(|label| normalize_label(label)))
                .into_iter()
                .map(|label| {
                    *positions.entry(label.clone()).or_insert_with(|| {
                        columns.push(label);
                        columns.len() - 1
                    })
                })
                .collect::<Vec<usize>>()
        })
        .collect::<Vec<_>>();

    let mut rows = Vec::with_capacity(tables.iter().map(|table| table.rows.len()).sum());
    for (table, mapping) in tables.into_iter().zip(mappings) {
        debug!("Unifying {} row(s) from {}", table.rows.len(), table.source);
        for row in table.rows {
            let mut unified = vec![Value::Empty; columns.len()];
            for (value, index) in row.into_iter().zip(&mapping) {
                unified[*index] = value;
            }
            rows.push(unified);
        }
    }

    Some(UnifiedTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn text(value: &str) -> Value {
        Value::Text(value.to_owned())
    }

    #[test]
    fn dedupes_repeated_labels() {
        assert_eq!(dedupe_labels(labels(&["A", "A", "B"])), labels(&["A", "A_1", "B"]));
        assert_eq!(dedupe_labels(labels(&["A", "A", "A"])), labels(&["A", "A_1", "A_2"]));
        assert_eq!(dedupe_labels(labels(&["A", "A_1", "A"])), labels(&["A", "A_1", "A_2"]));
    }

    #[test]
    fn raw_table_fills_blank_labels_and_pads_rows() {
        let table = RawTable::new(
            "test",
            labels(&["", "PRODUCTO", " "]),
            vec![vec![text("x")], vec![text("a"), text("b"), text("c"), text("d")]],
        );
        assert_eq!(table.columns, labels(&["COL", "PRODUCTO", "COL_1"]));
        assert_eq!(table.rows[0], vec![text("x"), Value::Empty, Value::Empty]);
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn unify_of_nothing_is_none() {
        assert_eq!(unify(Vec::new()), None);
    }

    #[test]
    fn unify_keeps_every_row_and_every_column() {
        let first = RawTable::new(
            "a",
            labels(&["Producto", "Cantidad"]),
            vec![vec![text("x"), Value::Number(1.0)], vec![text("y"), Value::Number(2.0)]],
        );
        let second = RawTable::new("b", labels(&["Cliente"]), vec![vec![text("acme")]]);
        let third = RawTable::new(
            "c",
            labels(&[" producto ", "Cliente"]),
            vec![vec![text("z"), text("beta")]],
        );

        let table = unify(vec![first, second, third]).unwrap();

        assert_eq!(table.columns, labels(&["PRODUCTO", "CANTIDAD", "CLIENTE"]));
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows[0], vec![text("x"), Value::Number(1.0), Value::Empty]);
        assert_eq!(table.rows[2], vec![Value::Empty, Value::Empty, text("acme")]);
        assert_eq!(table.rows[3], vec![text("z"), Value::Empty, text("beta")]);
    }

    #[test]
    fn unify_separates_labels_that_collide_after_normalizing() {
        let table = RawTable::new("a", labels(&["venta", "VENTA "]), vec![vec![Value::Number(1.0), Value::Number(2.0)]]);
        let unified = unify(vec![table]).unwrap();
        assert_eq!(unified.columns, labels(&["VENTA", "VENTA_1"]));
        assert_eq!(unified.rows[0], vec![Value::Number(1.0), Value::Number(2.0)]);
    }

    #[test]
    fn push_column_avoids_taken_labels() {
        let mut table = UnifiedTable {
            columns: labels(&["PROFIT"]),
            rows: vec![vec![Value::Empty], vec![Value::Empty]],
        };
        let stored = table.push_column("PROFIT", vec![Value::Number(1.0)]);
        assert_eq!(stored, "PROFIT_1");
        assert_eq!(table.rows[0][1], Value::Number(1.0));
        assert_eq!(table.rows[1][1], Value::Empty);
    }

    #[test]
    fn formats_numbers() {
        assert_eq!(format_number(1500.0), "1500");
        assert_eq!(format_number(60.0), "60");
        assert_eq!(format_number(12.346), "12.35");
        assert_eq!(format_number(0.5), "0.5");
    }
}
