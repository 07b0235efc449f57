//! # Spreadsheet Reading
//!
//! Reads Office Open XML (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument (`.ods`)
//! workbooks held in memory and turns each non-empty sheet into a
//! [`RawTable`](crate::table::RawTable).
use crate::error::CfoError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use crate::table::RawTable;
use log::debug;
use thiserror::Error;

pub(crate) mod cell;
pub mod criteria;
pub(crate) mod ods;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

/// Compound File Binary signature, used by encrypted OOXML packages and legacy `.xls`
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Errors raised while opening or walking a workbook
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing '{0}' inside the workbook")]
    FileError(String),

    #[error("'{0}' is password protected or a legacy binary workbook")]
    PasswordProtectedError(String),

    #[error("'{0}' contains no sheets")]
    EmptyError(String),

    #[error("Unsupported file format '{0}'")]
    FormatError(String),
}

/// A workbook whose sheets can be read into memory
pub(crate) trait Spreadsheet {
    /// File name of the workbook
    fn name(&self) -> String;

    /// Reads the sheets accepted by `criteria`, in workbook order
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, CfoError>;
}

/// Returns true when `extension` names a workbook format this module reads
pub(crate) fn is_spreadsheet_extension(extension: &str) -> bool {
    matches!(extension, "xlsx" | "xlsm" | "xlam" | "ods")
}

/// Opens an in-memory workbook, choosing the reader by file extension
pub(crate) fn open_spreadsheet(file_name: &str, bytes: Vec<u8>) -> Result<Box<dyn Spreadsheet>, CfoError> {
    if bytes.starts_with(&CFB_SIGNATURE) {
        Err(SpreadsheetError::PasswordProtectedError(file_name.to_owned()))?;
    }
    let extension = extension_of(file_name);
    match extension.as_str() {
        "xlsx" | "xlsm" | "xlam" => Ok(Box::new(XlsxSpreadsheet::open(file_name, bytes)?)),
        "ods" => Ok(Box::new(OdsSpreadsheet::open(file_name, bytes)?)),
        _ => Err(SpreadsheetError::FormatError(file_name.to_owned()))?,
    }
}

/// Reads every accepted sheet of a workbook into raw tables; empty sheets yield none
pub(crate) fn read_tables(file_name: &str, bytes: Vec<u8>, criteria: &Criteria) -> Result<Vec<RawTable>, CfoError> {
    let mut spreadsheet = open_spreadsheet(file_name, bytes)?;
    let sheets = spreadsheet.read_sheets(criteria)?;
    debug!("{} sheet(s) read from {}", sheets.len(), spreadsheet.name());
    Ok(sheets.into_iter().filter_map(Sheet::into_raw_table).collect())
}

/// Lower-cased extension of a file name, empty when there is none
pub(crate) fn extension_of(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}
