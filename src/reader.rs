//! # Table Reading
//!
//! Turns uploaded files into raw tables and fallback text. Files are read one
//! by one; a file that cannot be read is logged and reported, and the rest of
//! the batch goes on.
use crate::error::CfoError;
use crate::error::ResultMessage;
use crate::pdf::read_pdf;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::extension_of;
use crate::spreadsheet::is_spreadsheet_extension;
use crate::spreadsheet::read_tables;
use crate::spreadsheet::SpreadsheetError;
use crate::table::RawTable;
use log::info;
use log::warn;
use std::path::Path;

/// An uploaded file: its name and its content
#[derive(Clone, Debug)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Upload {
            name: name.into(),
            bytes,
        }
    }

    /// Reads a file from disk, keeping only its file name
    pub fn from_path(path: &Path) -> Result<Self, CfoError> {
        let bytes = std::fs::read(path)
            .map_err(CfoError::from)
            .with_prefix(&path.display().to_string())?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Upload::new(name, bytes))
    }
}

/// What one file yielded
#[derive(Debug, Default)]
pub struct Extraction {
    pub tables: Vec<RawTable>,
    /// Extracted text; only PDFs produce any
    pub text: String,
}

/// What a batch of files yielded
#[derive(Debug, Default)]
pub struct Ingest {
    pub tables: Vec<RawTable>,
    /// Fallback text of every file, in upload order
    pub text: String,
    /// Files that could not be read, with the reason
    pub failures: Vec<(String, CfoError)>,
}

/// Reads one file, choosing the reader by its extension
pub fn read_file(upload: Upload, criteria: &Criteria) -> Result<Extraction, CfoError> {
    let extension = extension_of(&upload.name);
    if is_spreadsheet_extension(&extension) {
        let tables = read_tables(&upload.name, upload.bytes, criteria)?;
        Ok(Extraction {
            tables,
            text: String::new(),
        })
    } else if extension == "pdf" {
        let content = read_pdf(&upload.name, &upload.bytes)?;
        Ok(Extraction {
            tables: content.tables,
            text: content.text,
        })
    } else {
        Err(SpreadsheetError::FormatError(upload.name))?
    }
}

/// Reads every file, collecting tables and text and recording failures
pub fn read_files(uploads: Vec<Upload>, criteria: &Criteria) -> Ingest {
    let mut ingest = Ingest::default();
    for upload in uploads {
        let name = upload.name.clone();
        match read_file(upload, criteria) {
            Ok(extraction) => {
                info!("Read {} table(s) from {}", extraction.tables.len(), name);
                ingest.tables.extend(extraction.tables);
                if !extraction.text.is_empty() {
                    if !ingest.text.is_empty() {
                        ingest.text.push('\n');
                    }
                    ingest.text.push_str(&extraction.text);
                }
            }
            Err(error) => {
                warn!("Skipping {}: {}", name, error);
                ingest.failures.push((name, error));
            }
        }
    }
    ingest
}
