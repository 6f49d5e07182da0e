use std::path::Path;

use crate::TransferError;

/// Validates a file name sent in the `filename` form field.
///
/// Rejects:
/// - Empty or whitespace-only names
/// - Path separators (`/`, `\`)
/// - `.` and `..`
/// - Control characters
pub fn validate_filename(name: &str) -> Result<(), TransferError> {
    if name.trim().is_empty() {
        return Err(TransferError::InvalidFilename("empty filename".into()));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(TransferError::InvalidFilename(format!(
            "path separators not allowed: {name}"
        )));
    }

    if name == "." || name == ".." {
        return Err(TransferError::InvalidFilename(format!(
            "reserved name not allowed: {name}"
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(TransferError::InvalidFilename(format!(
            "control characters not allowed: {name:?}"
        )));
    }

    Ok(())
}

/// Derives the upload file name from a local path (its final component).
pub fn upload_filename(path: &Path) -> Result<String, TransferError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            TransferError::InvalidFilename(format!("no usable file name in {}", path.display()))
        })?;
    validate_filename(name)?;
    Ok(name.to_string())
}
