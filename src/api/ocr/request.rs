// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart upload parsing and validation

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_extra::extract::multipart::MultipartError;
use axum_extra::extract::Multipart;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::api::errors::ApiError;
use crate::vision::is_image_content_type;

/// Name used for uploads that carry no file name
const DEFAULT_UPLOAD_NAME: &str = "upload.png";

fn multipart_error(context: &str, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::InvalidRequest(format!("{}: {}", context, err.body_text()))
    }
}

/// An uploaded file part
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Fields of an OCR upload form
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    /// `file` part
    pub file: Option<UploadedFile>,
    /// `original_path` field: where the page lives on the client's disk
    pub original_path: Option<String>,
}

impl UploadForm {
    /// Read the `file` and `original_path` fields, ignoring unknown ones
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error("Malformed multipart body", e))?
        {
            match field.name() {
                Some("file") => {
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| multipart_error("Failed to read file", e))?;
                    debug!(
                        "Received file {:?} ({:?}, {} bytes)",
                        file_name,
                        content_type,
                        bytes.len()
                    );
                    form.file = Some(UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                Some("original_path") => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| multipart_error("Failed to read original_path", e))?;
                    let value = value.trim();
                    if !value.is_empty() {
                        form.original_path = Some(value.to_string());
                    }
                }
                other => debug!("Ignoring form field {:?}", other),
            }
        }

        Ok(form)
    }

    /// The uploaded file, provided it is declared as an image
    pub fn image_file(&self) -> Result<&UploadedFile, ApiError> {
        let file = self.file.as_ref().ok_or_else(|| ApiError::ValidationError {
            field: "file".to_string(),
            message: "file is required".to_string(),
        })?;

        if !is_image_content_type(file.content_type.as_deref()) {
            return Err(ApiError::NotAnImage);
        }
        Ok(file)
    }

    /// Base path for the debug image
    ///
    /// The client's `original_path` when given, else the upload's file name
    /// inside `debug_dir`.
    pub fn debug_base_path(&self, debug_dir: &Path) -> PathBuf {
        if let Some(original) = &self.original_path {
            return PathBuf::from(original);
        }

        let name = self
            .file
            .as_ref()
            .and_then(|f| f.file_name.as_deref())
            .and_then(|n| Path::new(n).file_name())
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.into());
        debug_dir.join(name)
    }

    /// Only the service's own `debug_dir` is created on demand
    pub fn may_create_debug_dir(&self) -> bool {
        self.original_path.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(file_name: Option<&str>, content_type: Option<&str>) -> UploadForm {
        UploadForm {
            file: Some(UploadedFile {
                file_name: file_name.map(str::to_string),
                content_type: content_type.map(str::to_string),
                bytes: Bytes::from_static(b"data"),
            }),
            original_path: None,
        }
    }

    #[test]
    fn test_missing_file() {
        let err = UploadForm::default().image_file().unwrap_err();
        assert!(matches!(err, ApiError::ValidationError { ref field, .. } if field == "file"));
    }

    #[test]
    fn test_content_type_must_be_image() {
        assert!(upload(None, Some("image/png")).image_file().is_ok());
        assert!(matches!(
            upload(None, Some("text/plain")).image_file(),
            Err(ApiError::NotAnImage)
        ));
        assert!(matches!(
            upload(None, None).image_file(),
            Err(ApiError::NotAnImage)
        ));
    }

    #[test]
    fn test_debug_base_path_prefers_original_path() {
        let mut form = upload(Some("p1.jpg"), Some("image/jpeg"));
        form.original_path = Some("/library/vol1/p1.jpg".to_string());
        assert_eq!(
            form.debug_base_path(Path::new("/tmp")),
            PathBuf::from("/library/vol1/p1.jpg")
        );
        assert!(!form.may_create_debug_dir());
    }

    #[test]
    fn test_debug_base_path_uses_file_name() {
        let form = upload(Some("../../etc/p2.png"), Some("image/png"));
        assert_eq!(
            form.debug_base_path(Path::new("/tmp/debug")),
            PathBuf::from("/tmp/debug/p2.png")
        );

        let anonymous = upload(None, Some("image/png"));
        assert_eq!(
            anonymous.debug_base_path(Path::new("/tmp/debug")),
            PathBuf::from("/tmp/debug/upload.png")
        );
        assert!(anonymous.may_create_debug_dir());
    }
}
