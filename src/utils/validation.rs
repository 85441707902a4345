// file: src/utils/validation.rs
// description: input validation for data paths, queries and filters
// reference: input validation patterns

use crate::error::{PipelineError, Result};
use std::path::Path;

pub const MAX_QUERY_CHARS: usize = 2000;
const MAX_FILTER_CHARS: usize = 32;

pub struct Validator;

impl Validator {
    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(PipelineError::Validation(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(PipelineError::Validation(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn validate_query_text(text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(PipelineError::Validation(
                "Query text must not be empty".to_string(),
            ));
        }

        let length = text.chars().count();
        if length > MAX_QUERY_CHARS {
            return Err(PipelineError::Validation(format!(
                "Query is too long ({} characters, max {})",
                length, MAX_QUERY_CHARS
            )));
        }

        Ok(())
    }

    /// Filters are state codes or line names: short, alphanumeric, spaces
    /// and dashes only.
    pub fn validate_filter_value(field: &str, value: Option<&str>) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };

        let value = value.trim();
        if value.chars().count() > MAX_FILTER_CHARS
            || !value
                .chars()
                .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
        {
            return Err(PipelineError::Validation(format!(
                "Invalid {} filter: {:?}",
                field, value
            )));
        }

        Ok(())
    }

    pub fn validate_port(port: u16) -> Result<()> {
        if port == 0 {
            return Err(PipelineError::Validation("Port cannot be 0".to_string()));
        }
        Ok(())
    }

    pub fn truncate_text(text: &str, max_chars: usize) -> String {
        let mut chars = text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_directory() {
        let temp = TempDir::new().unwrap();
        assert!(Validator::validate_directory(temp.path()).is_ok());
        assert!(Validator::validate_directory(Path::new("/nonexistent")).is_err());

        let file = temp.path().join("rates.csv");
        std::fs::write(&file, "provider").unwrap();
        assert!(Validator::validate_directory(&file).is_err());
    }

    #[test]
    fn test_validate_query_text() {
        assert!(Validator::validate_query_text("Compare auto rates").is_ok());
        assert!(Validator::validate_query_text("  ").is_err());
        assert!(Validator::validate_query_text(&"a".repeat(MAX_QUERY_CHARS + 1)).is_err());
    }

    #[test]
    fn test_validate_filter_value() {
        assert!(Validator::validate_filter_value("region", Some("CA")).is_ok());
        assert!(Validator::validate_filter_value("region", None).is_ok());
        assert!(Validator::validate_filter_value("insurance_type", Some("all")).is_ok());
        assert!(Validator::validate_filter_value("region", Some("CA' OR 1=1")).is_err());
    }

    #[test]
    fn test_validate_port() {
        assert!(Validator::validate_port(8501).is_ok());
        assert!(Validator::validate_port(0).is_err());
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(Validator::truncate_text("short", 10), "short");
        assert_eq!(Validator::truncate_text("premium rates", 7), "premium...");
        assert_eq!(Validator::truncate_text("ñandú", 2), "ña...");
    }
}
