//! Common utilities for the material upload handler

use axum::extract::Multipart;
use glossa_core::AppError;

/// Parsed parts of a file-upload form.
#[derive(Debug)]
pub struct MultipartUpload {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    /// Optional `title` text field; falls back to the filename downstream.
    pub title: Option<String>,
}

/// Extract the `file` field plus an optional `title` field from a multipart
/// form. Only one file field is accepted; multiple file fields are rejected.
pub async fn extract_multipart_upload(
    mut multipart: Multipart,
) -> Result<MultipartUpload, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "file" => {
                if file_data.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                filename = field.file_name().map(|s: &str| s.to_string());
                content_type = field.content_type().map(|s: &str| s.to_string());

                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;

                file_data = Some(data.to_vec());
            }
            "title" => {
                let text = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read title field: {}", e))
                })?;
                let text = text.trim().to_string();
                if !text.is_empty() {
                    title = Some(text);
                }
            }
            _ => {}
        }
    }

    let data = file_data.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    Ok(MultipartUpload {
        data,
        filename: filename.unwrap_or_else(|| "unknown".to_string()),
        content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        title,
    })
}

/// Validate file size
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size == 0 {
        return Err(AppError::InvalidInput("File is empty".to_string()));
    }
    if file_size > max_size {
        return Err(AppError::InvalidInput(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Validate file extension against the configured allowlist; returns the
/// lowercased extension.
pub fn validate_file_extension(
    filename: &str,
    allowed_extensions: &[String],
) -> Result<String, AppError> {
    let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    if !allowed_extensions.contains(&extension) {
        return Err(AppError::InvalidInput(format!(
            "Invalid file extension. Allowed extensions: {}",
            allowed_extensions.join(", ")
        )));
    }

    Ok(extension)
}

/// Sanitize filename to prevent path traversal and invalid characters.
/// Returns an error if the filename contains path traversal attempts.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    const MAX_FILENAME_LENGTH: usize = 255;

    if filename.contains("..") {
        return Err(AppError::InvalidInput(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let path = std::path::Path::new(filename);
    let filename_only = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim().is_empty() || sanitized.len() < 3 {
        return Ok("file".to_string());
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_rejects_path_traversal() {
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("foo/../bar").is_err());
        assert!(sanitize_filename("....").is_err());
    }

    #[test]
    fn sanitize_filename_accepts_valid_names() {
        assert_eq!(sanitize_filename("lesson.pdf").unwrap(), "lesson.pdf");
        assert_eq!(
            sanitize_filename("mi-leccion_1.txt").unwrap(),
            "mi-leccion_1.txt"
        );
    }

    #[test]
    fn sanitize_filename_replaces_odd_characters() {
        assert_eq!(
            sanitize_filename("clase de espa\u{00f1}ol.srt").unwrap(),
            "clase_de_español.srt"
        );
    }

    #[test]
    fn validate_file_extension_is_case_insensitive() {
        let allowed = vec!["pdf".to_string(), "txt".to_string()];
        assert_eq!(validate_file_extension("Lesson.PDF", &allowed).unwrap(), "pdf");
        assert!(validate_file_extension("lesson.exe", &allowed).is_err());
    }

    #[test]
    fn validate_file_size_bounds() {
        assert!(validate_file_size(0, 100).is_err());
        assert!(validate_file_size(100, 100).is_ok());
        assert!(validate_file_size(101, 100).is_err());
    }
}
