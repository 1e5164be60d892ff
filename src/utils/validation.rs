use crate::api::error::AppError;
use unicode_normalization::UnicodeNormalization;

/// Returns the text after the last `.` of `filename`, if any.
pub fn extension_of(filename: &str) -> Option<&str> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Case-insensitive check of the extension against the allowlist
pub fn allowed_file(filename: &str, allowed_extensions: &[String]) -> bool {
    extension_of(filename)
        .map(|ext| {
            let ext = ext.to_lowercase();
            allowed_extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}

/// Rejects uploads whose extension is not in the allowlist
pub fn validate_extension(filename: &str, allowed_extensions: &[String]) -> Result<(), AppError> {
    if allowed_file(filename, allowed_extensions) {
        return Ok(());
    }

    Err(AppError::UnsupportedType(format!(
        "File type of '{}' is not allowed. Accepted extensions: {}",
        filename,
        allowed_extensions.join(", ")
    )))
}

/// Validates file size against maximum limit
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), AppError> {
    if size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size {} bytes exceeds maximum allowed {} bytes ({} MB)",
            size,
            max_size,
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Reduces a user-supplied filename to a safe, flat ASCII name.
///
/// Only the final path component survives. The name is NFKD-decomposed so
/// accented letters keep their base letter, then anything still non-ASCII is
/// dropped, whitespace runs become `_`, characters outside `[A-Za-z0-9_.-]`
/// are removed and leading/trailing `.` and `_` are stripped. The result may
/// be empty.
pub fn secure_filename(filename: &str) -> String {
    let name = filename.rsplit(is_path_separator).next().unwrap_or("");

    if name.len() != filename.len() {
        tracing::warn!("Path components stripped from upload name: {}", filename);
    }

    let joined = name
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c: char| c == '.' || c == '_')
        .to_string()
}

/// Sanitizes an upload name whose extension has already been validated.
///
/// Stem and extension are cleaned separately so the stored name always keeps
/// its extension; a stem that sanitizes away entirely becomes `image`.
pub fn sanitize_upload_name(original: &str) -> String {
    let base = original.rsplit(is_path_separator).next().unwrap_or("");
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext),
        None => (base, ""),
    };

    let stem = match secure_filename(stem) {
        s if s.is_empty() => "image".to_string(),
        s => s,
    };
    let ext = secure_filename(ext);

    if base.len() != original.len() {
        tracing::warn!("Path components stripped from upload name: {}", original);
    }

    if ext.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, ext)
    }
}

fn is_path_separator(c: char) -> bool {
    c == '/' || c == '\\'
}
