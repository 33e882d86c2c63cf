//! Multipart file uploads with local validation of type and size.

use std::path::Path;

use crate::error::{Error, Result, UploadError};
use crate::net::transport::{parse_target, RawResponse, Transport};
use crate::net::transport_config::TransportConfig;

const MEGABYTE: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub async fn from_path<P>(
        path: P,
        content_type: impl Into<String>,
    ) -> std::result::Result<Self, UploadError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::Read(format!("{}: {e}", path.to_string_lossy())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// constraints checked before a file leaves the machine. empty lists and
/// unset or zero sizes impose no restriction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRules {
    pub allowed: Vec<String>,
    pub not_allowed: Vec<String>,
    pub max_size_mb: Option<u64>,
    pub min_size_mb: Option<u64>,
}

impl UploadRules {
    pub fn validate(&self, file: &UploadFile) -> std::result::Result<(), UploadError> {
        if !self.allowed.is_empty() && !self.allowed.contains(&file.content_type) {
            return Err(UploadError::TypeNotAllowed {
                content_type: file.content_type.clone(),
                allowed: self.allowed.clone(),
            });
        }

        if self.not_allowed.contains(&file.content_type) {
            return Err(UploadError::TypeRejected {
                content_type: file.content_type.clone(),
                rejected: self.not_allowed.clone(),
            });
        }

        if let Some(max_mb) = self.max_size_mb.filter(|mb| *mb > 0) {
            if file.size() > max_mb.saturating_mul(MEGABYTE) {
                return Err(UploadError::TooLarge {
                    size: file.size(),
                    max_mb,
                });
            }
        }

        if let Some(min_mb) = self.min_size_mb.filter(|mb| *mb > 0) {
            if file.size() < min_mb.saturating_mul(MEGABYTE) {
                return Err(UploadError::TooSmall {
                    size: file.size(),
                    min_mb,
                });
            }
        }

        Ok(())
    }
}

/// sends files to a single endpoint
#[derive(Debug)]
pub struct Uploader<X> {
    url: reqwest::Url,
    config: TransportConfig,
    transport: X,
}

impl<X: Transport> Uploader<X> {
    pub fn new(url: &str, config: TransportConfig, transport: X) -> Result<Self> {
        Ok(Self {
            url: parse_target(url)?,
            config,
            transport,
        })
    }

    #[tracing::instrument(
        skip_all,
        fields(url = %self.url, file = %file.file_name, size = file.size())
    )]
    pub async fn send_file(&self, file: &UploadFile, rules: &UploadRules) -> Result<RawResponse> {
        rules.validate(file).inspect_err(|e| {
            tracing::warn!(error = %e, "file rejected before upload");
        })?;

        let response = self
            .transport
            .send_multipart(&self.url, file, &self.config)
            .await?;

        if !response.is_success() {
            tracing::error!(status = response.status, "upload failed");
            return Err(Error::Upload(UploadError::Failed(response.status)));
        }

        tracing::info!(status = response.status, "file uploaded");
        Ok(response)
    }
}
