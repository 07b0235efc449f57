//! Runs unification, classification and metrics once per set of uploads.
use crate::classify::classify;
use crate::classify::ColumnRoleMap;
use crate::error::CfoError;
use crate::metrics::compute;
use crate::metrics::MetricsReport;
use crate::reader::Ingest;
use crate::responder::Answer;
use crate::responder::Context;
use crate::responder::QueryResponder;
use crate::table::unify;
use crate::table::UnifiedTable;
use log::info;

#[derive(Debug, Default)]
pub struct Analysis {
    /// All tables under one column set; absent when no file yielded a table
    pub table: Option<UnifiedTable>,
    pub roles: ColumnRoleMap,
    pub metrics: MetricsReport,
    /// Extracted text, used when there is no table
    pub raw_text: String,
    /// Files that could not be read
    pub failures: Vec<(String, CfoError)>,
}

impl Analysis {
    pub fn build(ingest: Ingest) -> Self {
        let Ingest {
            tables,
            text,
            failures,
        } = ingest;
        let mut table = unify(tables);
        let (roles, metrics) = match table.as_mut() {
            Some(table) => {
                info!("Unified table: {} row(s), {} column(s)", table.len(), table.columns.len());
                let roles = classify(&table.columns);
                let metrics = compute(table, &roles);
                (roles, metrics)
            }
            None => {
                info!("No tables found; answers will use the extracted text");
                (ColumnRoleMap::default(), MetricsReport::default())
            }
        };
        Analysis {
            table,
            roles,
            metrics,
            raw_text: text,
            failures,
        }
    }

    pub fn context(&self) -> Context<'_> {
        Context {
            table: self.table.as_ref(),
            roles: &self.roles,
            metrics: &self.metrics,
            raw_text: &self.raw_text,
        }
    }

    pub fn answer(&self, question: &str, responder: &QueryResponder) -> Answer {
        responder.answer(question, &self.context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RawTable;
    use crate::table::Value;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn builds_metrics_from_raw_tables() {
        let first = RawTable::new(
            "a.xlsx#Hoja1",
            labels(&["Producto", "Ingreso", "Costo"]),
            vec![vec![Value::Text("A".to_owned()), Value::Number(1000.0), Value::Number(400.0)]],
        );
        let second = RawTable::new(
            "b.pdf#page1",
            labels(&["PRODUCTO", "INGRESO"]),
            vec![vec![Value::Text("B".to_owned()), Value::Number(500.0)]],
        );
        let analysis = Analysis::build(Ingest {
            tables: vec![first, second],
            text: String::new(),
            failures: Vec::new(),
        });

        let table = analysis.table.as_ref().unwrap();
        assert_eq!(table.columns, labels(&["PRODUCTO", "INGRESO", "COSTO", "PROFIT"]));
        assert_eq!(table.len(), 2);
        assert_eq!(analysis.metrics.summary.total_revenue, Some(1500.0));
        assert_eq!(analysis.metrics.summary.total_profit, Some(1100.0));
    }

    #[test]
    fn without_tables_only_text_remains() {
        let analysis = Analysis::build(Ingest {
            tables: Vec::new(),
            text: "Informe anual".to_owned(),
            failures: Vec::new(),
        });
        assert!(analysis.table.is_none());
        assert!(analysis.metrics.summary.is_empty());
        assert_eq!(analysis.context().raw_text, "Informe anual");
    }
}
