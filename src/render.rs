//! Plain-text tables for the terminal and for prompt context.
use crate::metrics::MetricsReport;
use crate::metrics::MetricsSummary;
use crate::metrics::TopN;
use crate::table::format_number;
use crate::table::UnifiedTable;
use std::borrow::Cow;
use std::fmt::Write as _;

/// Renders left-aligned columns separated by two spaces, with a dashed rule
/// under the header.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|header| display_width(header)).collect::<Vec<_>>();
    for row in rows {
        for (index, cell) in row.iter().enumerate().take(column_count) {
            widths[index] = widths[index].max(display_width(&sanitize_cell(cell)));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule = widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{}{}", cell, " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.truncate(line.trim_end().len());
    line
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

/// The first `limit` rows of the unified table
pub fn render_preview(table: &UnifiedTable, limit: usize) -> String {
    let rows = table
        .rows
        .iter()
        .take(limit)
        .map(|row| row.iter().map(|value| value.to_string()).collect())
        .collect::<Vec<_>>();
    let mut output = render_table(&table.columns, &rows);
    if table.len() > limit {
        let _ = writeln!(output, "... {} more row(s)", table.len() - limit);
    }
    output
}

pub fn render_summary(summary: &MetricsSummary) -> String {
    let headers = vec!["Metric".to_owned(), "Value".to_owned()];
    let rows = summary
        .entries()
        .into_iter()
        .map(|(name, value)| vec![name.to_owned(), format_number(value)])
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

pub fn render_top(top: &TopN) -> String {
    let headers = vec!["Product".to_owned(), top.metric.to_string()];
    let rows = top
        .entries
        .iter()
        .map(|(product, value)| vec![product.to_owned(), format_number(*value)])
        .collect::<Vec<_>>();
    format!("{}\n{}", top.title(), render_table(&headers, &rows))
}

/// Summary and rankings, blank-line separated; empty when nothing resolved
pub fn render_report(report: &MetricsReport) -> String {
    let mut sections = Vec::new();
    if !report.summary.is_empty() {
        sections.push(render_summary(&report.summary));
    }
    sections.extend(report.top.iter().map(render_top));
    sections.join("\n")
}
