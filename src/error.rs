use thiserror::Error;

/// Main error type for the crate.
/// Aggregates errors from the standard library, dependencies and internal modules.
#[derive(Error, Debug)]
pub enum CfoError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Reading errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    OdsError(#[from] crate::spreadsheet::ods::OdsError),

    #[error("{0}")]
    PdfError(#[from] crate::pdf::PdfError),

    // Answering errors
    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("{0}")]
    ServiceError(#[from] crate::llm::ServiceError),
}

pub trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, CfoError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| CfoError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_prefix_keeps_ok() {
        let result: Result<u8, CfoError> = Ok(1);
        assert_eq!(result.with_prefix("sales.xlsx").unwrap(), 1);
    }

    #[test]
    fn with_prefix_names_the_source() {
        let result: Result<u8, CfoError> = Err(CfoError::WithContextError("broken".to_owned()));
        let message = result.with_prefix("sales.xlsx").unwrap_err().to_string();
        assert_eq!(message, "sales.xlsx: broken");
    }
}
