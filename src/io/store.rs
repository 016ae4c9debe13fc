use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::io::storage::{HostStorage, PersistenceError};
use crate::model::settings::{
    ExtensionSettings, GenerationMode, SettingsPatch, ValidationError, parse_update_depth,
    validate_update_depth,
};
use crate::model::tracker::TrackerData;

/// The per-conversation snapshot written to the chat-local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatData {
    pub tracker_data: TrackerData,
}

/// Owner of the live `ExtensionSettings`.
///
/// All mutation goes through [`SettingsStore::update_settings`] or
/// [`SettingsStore::set_settings`]. Neither persists; callers batch their
/// changes and then call [`SettingsStore::save_settings`],
/// [`SettingsStore::save_chat_data`] or [`SettingsStore::persist_all`].
pub struct SettingsStore {
    settings: ExtensionSettings,
    storage: Box<dyn HostStorage>,
}

impl SettingsStore {
    /// A store holding default settings
    pub fn new(storage: impl HostStorage + 'static) -> Self {
        SettingsStore {
            settings: ExtensionSettings::default(),
            storage: Box::new(storage),
        }
    }

    /// Merge defaults with whatever the host persisted, key by key. A key
    /// that does not decode is logged and takes its default; the others are
    /// kept. A storage read failure propagates.
    pub fn load(storage: impl HostStorage + 'static) -> Result<Self, PersistenceError> {
        let settings = match storage.load_settings()? {
            Some(json) => merge_persisted(&json),
            None => ExtensionSettings::default(),
        };
        Ok(SettingsStore {
            settings,
            storage: Box::new(storage),
        })
    }

    /// Read-only view of the live settings
    pub fn settings(&self) -> &ExtensionSettings {
        &self.settings
    }

    /// Shallow-merge `patch` into the live settings and return them.
    /// A rejected patch leaves the settings untouched.
    pub fn update_settings(
        &mut self,
        patch: SettingsPatch,
    ) -> Result<&ExtensionSettings, ValidationError> {
        self.settings.apply(patch)?;
        Ok(&self.settings)
    }

    /// Replace the live settings wholesale
    pub fn set_settings(&mut self, settings: ExtensionSettings) {
        self.settings = settings;
    }

    /// Durably store the whole settings object
    pub fn save_settings(&mut self) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(&self.settings).map_err(|e| PersistenceError::Encode {
            what: "settings",
            source: e,
        })?;
        self.storage.save_settings(&json)
    }

    /// Durably store the chat-local tracker snapshot
    pub fn save_chat_data(&mut self) -> Result<(), PersistenceError> {
        let chat = ChatData {
            tracker_data: self.settings.tracker_data.clone(),
        };
        let json = serde_json::to_string(&chat).map_err(|e| PersistenceError::Encode {
            what: "chat data",
            source: e,
        })?;
        self.storage.save_chat_data(&json)
    }

    /// Save to both stores so they never diverge
    pub fn persist_all(&mut self) -> Result<(), PersistenceError> {
        self.save_settings()?;
        self.save_chat_data()
    }

    /// Validate user input for the update depth, apply it, and save.
    /// Invalid input keeps the previous value.
    pub fn set_update_depth_str(&mut self, input: &str) -> Result<u8, StoreError> {
        let depth = parse_update_depth(input)?;
        self.update_settings(SettingsPatch {
            update_depth: Some(depth as i64),
            ..Default::default()
        })?;
        self.save_settings()?;
        Ok(depth)
    }

    pub fn set_generation_mode(&mut self, mode: GenerationMode) -> Result<(), StoreError> {
        self.update_settings(SettingsPatch {
            generation_mode: Some(mode),
            ..Default::default()
        })?;
        self.save_settings()?;
        Ok(())
    }
}

fn merge_persisted(json: &str) -> ExtensionSettings {
    let mut settings = ExtensionSettings::default();
    let map = match serde_json::from_str::<Map<String, Value>>(json) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("persisted settings are unreadable, using defaults: {}", e);
            return settings;
        }
    };

    for (key, value) in map {
        match key.as_str() {
            "systemPrompt" => decode_key(&key, value, &mut settings.system_prompt),
            "trackerData" => decode_key(&key, value, &mut settings.tracker_data),
            "dataFormat" => decode_key(&key, value, &mut settings.data_format),
            "currentPreset" => decode_key(&key, value, &mut settings.current_preset),
            "generationMode" => decode_key(&key, value, &mut settings.generation_mode),
            "updateDepth" => {
                let depth = serde_json::from_value::<i64>(value)
                    .map_err(|e| e.to_string())
                    .and_then(|n| validate_update_depth(n).map_err(|e| e.to_string()));
                match depth {
                    Ok(depth) => settings.update_depth = depth,
                    Err(e) => tracing::warn!(key = %key, "persisted setting rejected, using default: {}", e),
                }
            }
            _ => {
                settings.extra.insert(key, value);
            }
        }
    }
    settings
}

/// Overwrite `slot` with the decoded value, or leave the default in place
fn decode_key<T: DeserializeOwned>(key: &str, value: Value, slot: &mut T) {
    match serde_json::from_value(value) {
        Ok(decoded) => *slot = decoded,
        Err(e) => tracing::warn!(key, "persisted setting is unreadable, using default: {}", e),
    }
}

/// Error type for store operations that both validate and persist
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::MemoryStorage;
    use crate::model::tracker::Section;
    use pretty_assertions::assert_eq;

    #[test]
    fn load_merges_defaults_with_persisted() {
        let storage = MemoryStorage::with_settings(r#"{"systemPrompt":"Track it","updateDepth":7}"#);
        let store = SettingsStore::load(storage).unwrap();
        assert_eq!(store.settings().system_prompt, "Track it");
        assert_eq!(store.settings().update_depth, 7);
        assert_eq!(store.settings().generation_mode, GenerationMode::Together);
    }

    #[test]
    fn load_keeps_good_keys_when_one_is_bad() {
        let tracker = r#"{"sections":[{"id":"s1","name":"Mine"}]}"#;
        for bad in [r#""generationMode":"both""#, r#""updateDepth":300"#, r#""updateDepth":0"#] {
            let json = format!(
                r#"{{"trackerData":{},"systemPrompt":"keep me","hostTheme":"dark",{}}}"#,
                tracker, bad
            );
            let store = SettingsStore::load(MemoryStorage::with_settings(&json)).unwrap();
            let settings = store.settings();
            assert_eq!(settings.tracker_data.sections[0].name, "Mine", "lost data with {}", bad);
            assert_eq!(settings.system_prompt, "keep me");
            assert_eq!(settings.update_depth, 3);
            assert_eq!(settings.generation_mode, GenerationMode::Together);
            assert_eq!(settings.extra.get("hostTheme"), Some(&Value::String("dark".into())));
        }
    }

    #[tokio::test]
    async fn bad_key_does_not_trigger_reinitialization() {
        use crate::io::template::EmbeddedTemplate;
        use crate::ops::data_manager::{DataManager, InitOutcome};

        let storage = MemoryStorage::with_settings(
            r#"{"trackerData":{"sections":[{"id":"s1","name":"Mine"}]},"generationMode":"both"}"#,
        );
        let mut store = SettingsStore::load(storage.clone()).unwrap();
        let dm = DataManager::new(Box::new(EmbeddedTemplate));
        assert_eq!(dm.ensure_initialized(&mut store).await, InitOutcome::AlreadyInitialized);
        assert_eq!(storage.settings_saves(), 0);
    }

    #[test]
    fn field_value_of_wrong_type_does_not_drop_tracker() {
        let storage = MemoryStorage::with_settings(
            r#"{"trackerData":{"sections":[{"id":"s1","name":"Mine","subsections":[{"id":"b1","name":"Hero","fields":[{"id":"f1","name":"HP","type":"number","value":"lots"}]}]}]}}"#,
        );
        let store = SettingsStore::load(storage).unwrap();
        let field = store.settings().tracker_data.get_field_by_id("f1").unwrap();
        assert_eq!(field.value, crate::model::tracker::FieldValue::Text("lots".into()));
    }

    #[test]
    fn load_corrupt_settings_yields_defaults() {
        let storage = MemoryStorage::with_settings("{{{ nope");
        let store = SettingsStore::load(storage).unwrap();
        assert_eq!(store.settings(), &ExtensionSettings::default());
    }

    #[test]
    fn update_is_shallow_and_does_not_persist() {
        let storage = MemoryStorage::new();
        let mut store = SettingsStore::new(storage.clone());
        let settings = store
            .update_settings(SettingsPatch {
                system_prompt: Some("new prompt".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.system_prompt, "new prompt");
        assert_eq!(settings.update_depth, 3);
        assert_eq!(storage.settings_saves(), 0);
    }

    #[test]
    fn update_depth_bounds_keep_previous_value() {
        let storage = MemoryStorage::new();
        let mut store = SettingsStore::new(storage.clone());
        store.set_update_depth_str("5").unwrap();

        for bad in ["0", "21", "2.5"] {
            assert!(store.set_update_depth_str(bad).is_err(), "accepted {}", bad);
            assert_eq!(store.settings().update_depth, 5);
        }
        assert_eq!(storage.settings_saves(), 1);
    }

    #[test]
    fn persist_all_writes_both_stores() {
        let storage = MemoryStorage::new();
        let mut store = SettingsStore::new(storage.clone());
        let mut settings = ExtensionSettings::default();
        settings.tracker_data.sections.push(Section::new("World"));
        store.set_settings(settings);
        store.persist_all().unwrap();

        assert_eq!(storage.settings_saves(), 1);
        assert_eq!(storage.chat_saves(), 1);
        let chat: ChatData = serde_json::from_str(&storage.chat_json().unwrap()).unwrap();
        assert_eq!(chat.tracker_data, store.settings().tracker_data);
    }

    #[test]
    fn persistence_errors_propagate() {
        let storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        let mut store = SettingsStore::new(storage);
        assert!(store.persist_all().is_err());
    }
}
