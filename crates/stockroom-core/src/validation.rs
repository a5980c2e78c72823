//! Upload input validation
//!
//! Validation runs before any side effect: a rejected request never reaches
//! the object store gateway and never creates a record.

use crate::models::InitiateUploadRequest;

/// Validation errors for upload initiation
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: i64, max: i64 },

    #[error("Invalid file size: {0} bytes")]
    InvalidFileSize(i64),

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

/// Upload request validator
///
/// Holds the configured size bound and content-type allow-list without
/// coupling to storage implementation details.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: i64,
    allowed_content_types: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_file_size: i64, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types,
        }
    }

    /// Validate declared file size: bounded (0, max].
    pub fn validate_file_size(&self, size: i64) -> Result<(), ValidationError> {
        if size <= 0 {
            return Err(ValidationError::InvalidFileSize(size));
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate content type against the image allow-list
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate filename length
    pub fn validate_filename(&self, filename: &str) -> Result<(), ValidationError> {
        if filename.trim().is_empty() {
            return Err(ValidationError::InvalidFilename(
                "filename must not be empty".to_string(),
            ));
        }

        if filename.len() > 255 {
            return Err(ValidationError::InvalidFilename(format!(
                "filename exceeds 255 characters ({})",
                filename.len()
            )));
        }

        Ok(())
    }

    /// Validate a full initiation request
    pub fn validate(&self, request: &InitiateUploadRequest) -> Result<(), ValidationError> {
        self.validate_filename(&request.filename)?;
        self.validate_content_type(&request.content_type)?;
        self.validate_file_size(request.file_size)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: i64 = 10 * 1024 * 1024;

    fn validator() -> UploadValidator {
        UploadValidator::new(
            MAX,
            vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
        )
    }

    #[test]
    fn test_file_size_at_max_is_valid() {
        assert!(validator().validate_file_size(MAX).is_ok());
    }

    #[test]
    fn test_file_size_over_max_fails() {
        assert!(matches!(
            validator().validate_file_size(MAX + 1),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_zero_and_negative_sizes_fail() {
        assert!(matches!(
            validator().validate_file_size(0),
            Err(ValidationError::InvalidFileSize(0))
        ));
        assert!(matches!(
            validator().validate_file_size(-1),
            Err(ValidationError::InvalidFileSize(-1))
        ));
    }

    #[test]
    fn test_content_type_allow_list() {
        assert!(validator().validate_content_type("image/png").is_ok());
        assert!(validator().validate_content_type("IMAGE/PNG").is_ok());
        assert!(matches!(
            validator().validate_content_type("application/pdf"),
            Err(ValidationError::InvalidContentType { .. })
        ));
        assert!(validator().validate_content_type("image/svg+xml").is_err());
    }

    #[test]
    fn test_filename_bounds() {
        assert!(validator().validate_filename("cat.png").is_ok());
        assert!(validator().validate_filename("").is_err());
        assert!(validator().validate_filename("   ").is_err());
        let long = "a".repeat(256);
        assert!(validator().validate_filename(&long).is_err());
    }
}
