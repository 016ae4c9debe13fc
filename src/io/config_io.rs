use std::fs;
use std::path::{Path, PathBuf};

use crate::io::template::{EmbeddedTemplate, FileTemplate, HttpTemplate, TemplateSource};
use crate::model::config::TrackerConfig;

/// File name of the config inside the storage directory
pub const CONFIG_FILE: &str = "tracker.toml";

/// Error type for reading tracker.toml
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse tracker.toml: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Read tracker.toml from the storage directory. A missing file yields the
/// default config.
pub fn read_config(store_dir: &Path) -> Result<TrackerConfig, ConfigError> {
    let path = store_dir.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TrackerConfig::default()),
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    Ok(toml::from_str(&text)?)
}

/// Pick the template source the config asks for. A URL wins over a path;
/// relative paths resolve against the storage directory.
pub fn template_source(config: &TrackerConfig, store_dir: &Path) -> Box<dyn TemplateSource> {
    if let Some(url) = &config.template.url {
        return Box::new(HttpTemplate { url: url.clone() });
    }
    if let Some(path) = &config.template.path {
        return Box::new(FileTemplate {
            path: store_dir.join(path),
        });
    }
    Box::new(EmbeddedTemplate)
}
