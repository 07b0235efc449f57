//! Container and markup helpers used by the spreadsheet readers
pub(crate) mod xml;
pub(crate) mod zip;
