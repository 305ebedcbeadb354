//! Upload validation and object-key construction.

use chrono::{Datelike, Utc};

use crate::error::CoreError;
use crate::hashing::random_token;

/// Default upload size cap (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Default key prefix for uploaded files.
pub const DEFAULT_PREFIX: &str = "uploads";

/// Accepted MIME types for catalog assets.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/avif",
    "video/mp4",
    "video/webm",
    "application/pdf",
    "application/zip",
    "application/json",
    "text/plain",
    "text/css",
    "text/markdown",
];

/// Guess a MIME type from a file extension. Only covers the allowed set.
pub fn content_type_from_extension(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    let ct = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "json" => "application/json",
        "txt" => "text/plain",
        "css" => "text/css",
        "md" => "text/markdown",
        _ => return None,
    };
    Some(ct)
}

/// Resolve the effective content type of an upload and check it is allowed.
///
/// A declared type of `application/octet-stream` (what browsers send when
/// they do not know) falls back to the extension.
pub fn resolve_content_type(
    filename: &str,
    declared: Option<&str>,
) -> Result<String, CoreError> {
    let declared = declared
        .map(|d| d.split(';').next().unwrap_or(d).trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty() && d != "application/octet-stream");

    let resolved = match declared {
        Some(d) => d,
        None => content_type_from_extension(filename)
            .map(str::to_string)
            .ok_or_else(|| {
                CoreError::Validation(format!("Cannot determine file type of '{filename}'"))
            })?,
    };

    if ALLOWED_CONTENT_TYPES.contains(&resolved.as_str()) {
        Ok(resolved)
    } else {
        Err(CoreError::Validation(format!(
            "File type '{resolved}' is not allowed"
        )))
    }
}

/// Check size bounds of an upload.
pub fn validate_size(filename: &str, size: usize, max_bytes: usize) -> Result<(), CoreError> {
    if size == 0 {
        return Err(CoreError::Validation(format!("File '{filename}' is empty")));
    }
    if size > max_bytes {
        return Err(CoreError::Validation(format!(
            "File '{filename}' is {size} bytes, exceeding the {max_bytes} byte limit"
        )));
    }
    Ok(())
}

/// Reduce a client filename to a safe, lowercase `[a-z0-9._-]` form.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '-');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.chars().take(100).collect()
    }
}

/// Validate a key prefix supplied by an admin (`uploads`, `previews/buttons`).
pub fn validate_prefix(prefix: &str) -> Result<(), CoreError> {
    let ok = !prefix.is_empty()
        && prefix.len() <= 64
        && prefix.split('/').all(|seg| {
            !seg.is_empty()
                && seg != ".."
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        });
    if ok {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("Invalid key prefix '{prefix}'")))
    }
}

/// Build the storage key for an upload: `prefix/YYYY/MM/<random>-<name>`.
pub fn object_key(prefix: &str, filename: &str) -> String {
    let now = Utc::now();
    format!(
        "{}/{:04}/{:02}/{}-{}",
        prefix.trim_matches('/'),
        now.year(),
        now.month(),
        random_token(12).to_ascii_lowercase(),
        sanitize_filename(filename)
    )
}
