use super::{DataFormat, FormatError};
use crate::model::tracker::TrackerData;

/// Parse tracker data from text in the given format.
/// A document without `sections` parses as an empty tracker.
pub fn parse_tracker(text: &str, format: DataFormat) -> Result<TrackerData, FormatError> {
    let data = match format {
        DataFormat::Json => serde_json::from_str(text)?,
        DataFormat::Yaml => serde_yaml::from_str(text)?,
    };
    Ok(data)
}
