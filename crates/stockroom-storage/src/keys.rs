//! Key generation and filename sanitization.
//!
//! Key format: `assets/{uuid}/{sanitized-filename}`. The random namespace
//! segment guarantees uniqueness; sanitization keeps caller-supplied
//! filenames from injecting path traversal or control characters into
//! storage paths.

use uuid::Uuid;

const MAX_FILENAME_LEN: usize = 255;

/// Sanitize a caller-supplied filename for embedding in a storage key.
///
/// Only the final path segment survives; within it, only alphanumerics,
/// `.`, `-` and `_` are kept. Leading dots are stripped so no `..` or
/// hidden-file form remains. Falls back to `file` when nothing survives.
pub fn sanitize_filename(filename: &str) -> String {
    let last_segment = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let cleaned: String = last_segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    let cleaned = cleaned.trim_start_matches('.');

    let mut result = if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    };

    result.truncate(MAX_FILENAME_LEN);
    result
}

/// Generate a storage key for a new upload.
pub fn build_object_key(filename: &str) -> String {
    format!("assets/{}/{}", Uuid::new_v4(), sanitize_filename(filename))
}
