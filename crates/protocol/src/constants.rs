/// Default chunk size: 1 MiB.
///
/// Files at or below this size take the single-request fast path.
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// Multipart field carrying the file or chunk bytes.
pub const FIELD_FILE: &str = "file";

/// Multipart field carrying the original file name.
pub const FIELD_FILENAME: &str = "filename";

/// Multipart field carrying the hex SHA-256 of the whole file.
pub const FIELD_SHA256: &str = "sha256";

/// Form fields owned by the protocol; binding metadata may not reuse them.
pub const RESERVED_FIELDS: [&str; 3] = [FIELD_FILE, FIELD_FILENAME, FIELD_SHA256];

/// Returns the chunk size to use, substituting the default for 0.
pub fn effective_chunk_size(chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    }
}
