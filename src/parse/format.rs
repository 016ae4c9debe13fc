use std::path::Path;

use serde::{Deserialize, Serialize};

/// Interchange formats for tracker data. JSON is the baseline.
/// A persisted tag this build does not know reads back as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DataFormat {
    #[default]
    Json,
    Yaml,
}

impl DataFormat {
    /// Every registered format, baseline first
    pub const ALL: [DataFormat; 2] = [DataFormat::Json, DataFormat::Yaml];

    pub fn tag(self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Yaml => "yaml",
        }
    }

    /// File extension used for exported files
    pub fn extension(self) -> &'static str {
        self.tag()
    }

    /// Map a format tag to a format. Unknown tags fall back to the baseline.
    pub fn from_tag(tag: &str) -> DataFormat {
        match tag.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => DataFormat::Yaml,
            _ => DataFormat::Json,
        }
    }
}

impl From<String> for DataFormat {
    fn from(tag: String) -> Self {
        DataFormat::from_tag(&tag)
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Infer the format of a file from its extension (case-insensitive).
/// Anything unrecognized is treated as JSON.
pub fn detect_format_from_filename(name: &str) -> DataFormat {
    match Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("yaml") | Some("yml") => DataFormat::Yaml,
        _ => DataFormat::Json,
    }
}
