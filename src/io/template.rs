use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::model::tracker::TrackerData;

/// The built-in default template, compiled into the binary
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/default_tracker.json");

/// How long a remote template fetch may take before it counts as failed
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for fetching the default template
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("could not read template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("template request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("template request returned HTTP {0}")]
    Status(u16),
    #[error("template request timed out")]
    Timeout,
}

/// Shape of the default template document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    #[serde(default)]
    pub system_prompt: String,
    pub tracker_data: TrackerData,
}

/// Somewhere the default template text can be fetched from
#[async_trait::async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self) -> Result<String, FetchError>;
}

/// The template bundled with the crate
pub struct EmbeddedTemplate;

#[async_trait::async_trait]
impl TemplateSource for EmbeddedTemplate {
    async fn fetch(&self) -> Result<String, FetchError> {
        Ok(DEFAULT_TEMPLATE.to_string())
    }
}

/// A template read from a local file
pub struct FileTemplate {
    pub path: PathBuf,
}

#[async_trait::async_trait]
impl TemplateSource for FileTemplate {
    async fn fetch(&self) -> Result<String, FetchError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FetchError::Io {
                path: self.path.clone(),
                source: e,
            })
    }
}

/// A template served over HTTP(S)
pub struct HttpTemplate {
    pub url: String,
}

#[async_trait::async_trait]
impl TemplateSource for HttpTemplate {
    async fn fetch(&self) -> Result<String, FetchError> {
        tokio::time::timeout(HTTP_TIMEOUT, self.get())
            .await
            .map_err(|_| FetchError::Timeout)?
    }
}

impl HttpTemplate {
    async fn get(&self) -> Result<String, FetchError> {
        let response = reqwest::get(&self.url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}
