use super::{DataFormat, FormatError};
use crate::model::tracker::TrackerData;

/// Serialize tracker data to text. Output is deterministic: keys follow
/// struct order and JSON uses two-space indentation with no trailing newline.
pub fn serialize_tracker(data: &TrackerData, format: DataFormat) -> Result<String, FormatError> {
    let text = match format {
        DataFormat::Json => serde_json::to_string_pretty(data)?,
        DataFormat::Yaml => serde_yaml::to_string(data)?,
    };
    Ok(text)
}
