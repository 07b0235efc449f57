//! # PDF Reading
//!
//! Best-effort table extraction from PDF text. Each page's text is split into
//! lines; lines that break into two or more cells on tabs or wide gaps are
//! table rows, and every maximal run of such lines becomes a table whose first
//! line is the header.
use crate::error::CfoError;
use crate::table::RawTable;
use crate::table::Value;
use log::debug;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised while extracting PDF text
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Cannot extract text from '{file}': {message}")]
    ExtractError { file: String, message: String },
}

/// Tables found in a PDF and all of its text
#[derive(Debug, Default)]
pub(crate) struct PdfContent {
    pub(crate) tables: Vec<RawTable>,
    pub(crate) text: String,
}

fn cell_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\t|\s{2,}").expect("Hardcode regex pattern"))
}

/// Extracts the text of every page and the tables detected in it
pub(crate) fn read_pdf(file_name: &str, bytes: &[u8]) -> Result<PdfContent, CfoError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|error| PdfError::ExtractError {
        file: file_name.to_owned(),
        message: error.to_string(),
    })?;

    let mut content = PdfContent::default();
    for (index, page) in pages.iter().enumerate() {
        let source = format!("{}#page{}", file_name, index + 1);
        let tables = detect_tables(&source, page);
        debug!("{} table region(s) on {}", tables.len(), source);
        content.tables.extend(tables);
        if !page.trim().is_empty() {
            if !content.text.is_empty() {
                content.text.push('\n');
            }
            content.text.push_str(page.trim());
        }
    }
    Ok(content)
}

/// Splits a line into cells, or returns `None` when it is not a table row
fn split_row(line: &str) -> Option<Vec<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let cells = cell_separator()
        .split(line)
        .map(|cell| cell.trim().to_owned())
        .collect::<Vec<_>>();
    (cells.len() >= 2).then_some(cells)
}

fn to_value(cell: &str) -> Value {
    match cell.parse::<f64>() {
        Ok(number) if number.is_finite() => Value::Number(number),
        _ => Value::from_text(cell),
    }
}

/// Detects table regions in the text of one page
pub(crate) fn detect_tables(source: &str, page: &str) -> Vec<RawTable> {
    let mut regions = Vec::<Vec<Vec<String>>>::new();
    let mut current = Vec::<Vec<String>>::new();
    for line in page.lines() {
        match split_row(line) {
            Some(cells) => current.push(cells),
            None if !current.is_empty() => regions.push(std::mem::take(&mut current)),
            None => (),
        }
    }
    if !current.is_empty() {
        regions.push(current);
    }

    let count = regions.len();
    regions
        .into_iter()
        .enumerate()
        .map(|(index, region)| {
            let mut rows = region.into_iter();
            let header = rows.next().unwrap_or_default();
            let data = rows
                .map(|row| row.iter().map(|cell| to_value(cell)).collect())
                .collect();
            let source = if count > 1 {
                format!("{}#{}", source, index + 1)
            } else {
                source.to_owned()
            };
            RawTable::new(source, header, data)
        })
        .collect()
}
