use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tracker::TrackerData;
use crate::parse::DataFormat;

/// Smallest accepted `updateDepth`
pub const MIN_UPDATE_DEPTH: u8 = 1;
/// Largest accepted `updateDepth`
pub const MAX_UPDATE_DEPTH: u8 = 20;

/// Error type for settings validation
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("update depth must be between 1 and 20, got {0}")]
    UpdateDepthOutOfRange(i64),
    #[error("update depth must be a whole number, got {0:?}")]
    UpdateDepthNotInteger(String),
    #[error("unknown generation mode: {0} (expected together or separate)")]
    UnknownGenerationMode(String),
}

/// How tracker updates are generated relative to chat replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Tracker update is produced in the same generation as the reply
    #[default]
    Together,
    /// Tracker update is produced by a second, dedicated generation
    Separate,
}

impl GenerationMode {
    pub fn parse_mode(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "together" => Ok(GenerationMode::Together),
            "separate" => Ok(GenerationMode::Separate),
            _ => Err(ValidationError::UnknownGenerationMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMode::Together => write!(f, "together"),
            GenerationMode::Separate => write!(f, "separate"),
        }
    }
}

/// Validate an update depth coming from user input.
/// Accepts whole numbers only, in `MIN_UPDATE_DEPTH..=MAX_UPDATE_DEPTH`.
pub fn parse_update_depth(input: &str) -> Result<u8, ValidationError> {
    let trimmed = input.trim();
    let n: i64 = trimmed
        .parse()
        .map_err(|_| ValidationError::UpdateDepthNotInteger(trimmed.to_string()))?;
    validate_update_depth(n)
}

pub fn validate_update_depth(n: i64) -> Result<u8, ValidationError> {
    if n < MIN_UPDATE_DEPTH as i64 || n > MAX_UPDATE_DEPTH as i64 {
        return Err(ValidationError::UpdateDepthOutOfRange(n));
    }
    Ok(n as u8)
}

/// The extension's whole settings object, as persisted by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSettings {
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub tracker_data: TrackerData,
    #[serde(default)]
    pub data_format: DataFormat,
    /// Name of the last loaded preset ("" = none)
    #[serde(default)]
    pub current_preset: String,
    #[serde(default = "default_update_depth")]
    pub update_depth: u8,
    #[serde(default)]
    pub generation_mode: GenerationMode,
    /// Host keys this crate does not own (theme, animation, ...), kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        ExtensionSettings {
            system_prompt: String::new(),
            tracker_data: TrackerData::default(),
            data_format: DataFormat::default(),
            current_preset: String::new(),
            update_depth: default_update_depth(),
            generation_mode: GenerationMode::default(),
            extra: Map::new(),
        }
    }
}

fn default_update_depth() -> u8 {
    3
}

/// A top-level partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub system_prompt: Option<String>,
    pub tracker_data: Option<TrackerData>,
    pub data_format: Option<DataFormat>,
    pub current_preset: Option<String>,
    pub update_depth: Option<i64>,
    pub generation_mode: Option<GenerationMode>,
}

impl ExtensionSettings {
    /// Shallow-merge `patch` into these settings. Validation happens before
    /// any field is written, so a rejected patch leaves everything unchanged.
    pub fn apply(&mut self, patch: SettingsPatch) -> Result<(), ValidationError> {
        let update_depth = patch.update_depth.map(validate_update_depth).transpose()?;

        if let Some(prompt) = patch.system_prompt {
            self.system_prompt = prompt;
        }
        if let Some(data) = patch.tracker_data {
            self.tracker_data = data;
        }
        if let Some(format) = patch.data_format {
            self.data_format = format;
        }
        if let Some(name) = patch.current_preset {
            self.current_preset = name;
        }
        if let Some(depth) = update_depth {
            self.update_depth = depth;
        }
        if let Some(mode) = patch.generation_mode {
            self.generation_mode = mode;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let settings: ExtensionSettings = serde_json::from_str(r#"{"systemPrompt":"hi"}"#).unwrap();
        assert_eq!(settings.system_prompt, "hi");
        assert_eq!(settings.update_depth, 3);
        assert_eq!(settings.generation_mode, GenerationMode::Together);
        assert_eq!(settings.data_format, DataFormat::Json);
        assert!(settings.tracker_data.sections.is_empty());
        assert!(settings.current_preset.is_empty());
    }

    #[test]
    fn unknown_host_keys_survive_round_trip() {
        let source = r#"{"systemPrompt":"","theme":"dark","animationSpeed":2}"#;
        let settings: ExtensionSettings = serde_json::from_str(source).unwrap();
        assert_eq!(settings.extra.get("theme"), Some(&Value::String("dark".into())));

        let out = serde_json::to_value(&settings).unwrap();
        assert_eq!(out["theme"], "dark");
        assert_eq!(out["animationSpeed"], 2);
        assert_eq!(out["updateDepth"], 3);
    }

    #[test]
    fn parse_update_depth_bounds() {
        assert_eq!(parse_update_depth("1"), Ok(1));
        assert_eq!(parse_update_depth(" 20 "), Ok(20));
        assert_eq!(parse_update_depth("0"), Err(ValidationError::UpdateDepthOutOfRange(0)));
        assert_eq!(parse_update_depth("21"), Err(ValidationError::UpdateDepthOutOfRange(21)));
        assert_eq!(
            parse_update_depth("2.5"),
            Err(ValidationError::UpdateDepthNotInteger("2.5".into()))
        );
        assert!(parse_update_depth("deep").is_err());
    }

    #[test]
    fn rejected_patch_changes_nothing() {
        let mut settings = ExtensionSettings::default();
        let result = settings.apply(SettingsPatch {
            system_prompt: Some("changed".into()),
            update_depth: Some(21),
            ..Default::default()
        });
        assert!(result.is_err());
        assert_eq!(settings, ExtensionSettings::default());
    }

    #[test]
    fn generation_mode_parse() {
        assert_eq!(GenerationMode::parse_mode("Separate"), Ok(GenerationMode::Separate));
        assert!(GenerationMode::parse_mode("both").is_err());
    }
}
