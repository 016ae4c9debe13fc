pub mod format;
pub mod tracker_parser;
pub mod tracker_serializer;

pub use format::{DataFormat, detect_format_from_filename};
pub use tracker_parser::parse_tracker;
pub use tracker_serializer::serialize_tracker;

/// Error type for converting tracker data to and from text
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
