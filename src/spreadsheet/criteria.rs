use crate::error::CfoError;
use glob::Pattern;

/// Which sheets of a workbook to read.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    /// Sheet name patterns; `None` reads every sheet.
    pub sheet_name_patterns: Option<Vec<Pattern>>,
}

impl Criteria {
    /// Builds criteria from glob expressions such as `Ventas*`.
    /// An empty list selects every sheet.
    pub fn from_globs<S: AsRef<str>>(globs: &[S]) -> Result<Self, CfoError> {
        if globs.is_empty() {
            return Ok(Self::default());
        }
        let patterns = globs
            .iter()
            .map(|glob| Pattern::new(glob.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            sheet_name_patterns: Some(patterns),
        })
    }

    /// Returns true if no patterns are specified or if the name matches any of them.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_everything_without_patterns() {
        let criteria = Criteria::from_globs::<&str>(&[]).unwrap();
        assert!(criteria.accept("Hoja1"));
    }

    #[test]
    fn filters_by_glob() {
        let criteria = Criteria::from_globs(&["Ventas*", "Resumen"]).unwrap();
        assert!(criteria.accept("Ventas 2024"));
        assert!(criteria.accept("Resumen"));
        assert!(!criteria.accept("Costos"));
    }

    #[test]
    fn rejects_bad_globs() {
        let error = Criteria::from_globs(&["Ventas*", "[unclosed"]).unwrap_err();
        assert!(matches!(error, CfoError::PatternError(_)));
        assert!(error.to_string().contains("Pattern syntax error"));
    }
}
