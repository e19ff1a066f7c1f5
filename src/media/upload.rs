//! Upload pipeline
//!
//! Validates files against the configured limits before anything reaches the
//! asset host. Several files are uploaded concurrently and each reports its
//! own outcome.

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;

use crate::assets::{AssetDescriptor, AssetError, AssetHost, AssetKind, UploadSource};
use crate::config::UploadConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{filename} is {size} bytes, the limit is {limit} bytes")]
    TooLarge { filename: String, size: u64, limit: u64 },

    #[error("{filename}: file type {content_type} is not allowed")]
    UnsupportedType { filename: String, content_type: String },

    #[error("{0} is empty")]
    Empty(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Host(#[from] AssetError),
}

impl UploadError {
    /// Whether the file was refused locally, before contacting the host
    pub fn is_validation(&self) -> bool {
        !matches!(self, UploadError::Host(_))
    }
}

/// Per-source result of a batch upload
#[derive(Debug)]
pub struct UploadOutcome {
    pub source: String,
    pub result: Result<AssetDescriptor, UploadError>,
}

/// Serializable form of an `UploadOutcome`
#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&UploadOutcome> for UploadReport {
    fn from(outcome: &UploadOutcome) -> Self {
        match &outcome.result {
            Ok(asset) => Self {
                source: outcome.source.clone(),
                asset: Some(asset.clone()),
                error: None,
            },
            Err(e) => Self {
                source: outcome.source.clone(),
                asset: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadPipeline {
    limits: UploadConfig,
}

impl UploadPipeline {
    pub fn new(limits: UploadConfig) -> Self {
        Self { limits }
    }

    /// Reject a source that must not be sent to the host
    pub fn validate(&self, source: &UploadSource) -> Result<(), UploadError> {
        match source {
            UploadSource::File {
                filename,
                content_type,
                data,
            } => {
                if !self.limits.is_type_allowed(content_type) || AssetKind::from_mime(content_type).is_none() {
                    return Err(UploadError::UnsupportedType {
                        filename: filename.clone(),
                        content_type: content_type.clone(),
                    });
                }
                if data.is_empty() {
                    return Err(UploadError::Empty(filename.clone()));
                }
                let size = data.len() as u64;
                let limit = self.limits.limit_for(content_type);
                if size > limit {
                    return Err(UploadError::TooLarge {
                        filename: filename.clone(),
                        size,
                        limit,
                    });
                }
                Ok(())
            }
            UploadSource::RemoteUrl(url) => match reqwest::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => Ok(()),
                _ => Err(UploadError::InvalidUrl(url.clone())),
            },
        }
    }

    /// Validate and forward one source to the host
    pub async fn upload(&self, host: &dyn AssetHost, source: UploadSource) -> Result<AssetDescriptor, UploadError> {
        self.validate(&source)?;
        let label = source.label().to_string();
        let asset = host.upload(source).await?;
        tracing::info!("Uploaded {} as {} via {}", label, asset.public_id, host.name());
        Ok(asset)
    }

    /// Upload several sources concurrently; outcomes keep the input order
    pub async fn upload_many(&self, host: &dyn AssetHost, sources: Vec<UploadSource>) -> Vec<UploadOutcome> {
        let uploads = sources.into_iter().map(|source| async move {
            let label = source.label().to_string();
            let result = self.upload(host, source).await;
            if let Err(e) = &result {
                tracing::warn!("Upload of {} failed: {}", label, e);
            }
            UploadOutcome { source: label, result }
        });
        join_all(uploads).await
    }
}
