//! Checksums and content type inference for stored files

use sha2::{Digest, Sha256};

/// Fallback for unknown or missing extensions
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Compute the lowercase hex SHA-256 digest of `data`
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Infer a MIME type from the final extension of `filename`.
///
/// Common artifact types come from a fixed table so that results never depend
/// on the `mime_guess` database version; anything else is looked up there.
pub fn guess_content_type(filename: &str) -> String {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => return OCTET_STREAM.to_string(),
    };

    let known = match ext.as_str() {
        "txt" => Some("text/plain"),
        "json" => Some("application/json"),
        "csv" => Some("text/csv"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "html" | "htm" => Some("text/html"),
        "css" => Some("text/css"),
        "js" => Some("text/javascript"),
        "pdf" => Some("application/pdf"),
        "zip" => Some("application/zip"),
        "gz" => Some("application/gzip"),
        "md" => Some("text/markdown"),
        "mp4" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "webm" => Some("video/webm"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "ogg" => Some("audio/ogg"),
        _ => None,
    };

    match known {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_ext(&ext)
            .first_raw()
            .unwrap_or(OCTET_STREAM)
            .to_string(),
    }
}

/// Whether a declared content type carries no information worth keeping
pub fn is_generic_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    essence.is_empty() || essence.eq_ignore_ascii_case(OCTET_STREAM)
}
