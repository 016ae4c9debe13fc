use chrono::Utc;

use crate::io::storage::{KeyValueStore, PersistenceError};
use crate::io::store::SettingsStore;
use crate::model::preset::{Preset, PresetCatalog};
use crate::model::settings::SettingsPatch;
use crate::ui::dropdown::PresetDropdown;
use crate::ui::render::Renderer;

/// Key under which the whole preset catalog is stored
pub const PRESET_STORE_KEY: &str = "story_tracker_presets";

/// The raw catalog text could not be decoded
struct CorruptCatalog {
    raw: String,
    reason: String,
}

/// Named snapshots of (system prompt, tracker data), kept in their own
/// key-value store, apart from the live settings.
pub struct PresetManager<K: KeyValueStore> {
    store: K,
    dropdown: PresetDropdown,
}

impl<K: KeyValueStore> PresetManager<K> {
    pub fn new(store: K) -> Self {
        PresetManager {
            store,
            dropdown: PresetDropdown::default(),
        }
    }

    /// The selection list as last populated
    pub fn dropdown(&self) -> &PresetDropdown {
        &self.dropdown
    }

    fn read_catalog(&self) -> Result<Result<PresetCatalog, CorruptCatalog>, PersistenceError> {
        let Some(raw) = self.store.get(PRESET_STORE_KEY)? else {
            return Ok(Ok(PresetCatalog::new()));
        };
        Ok(serde_json::from_str(&raw).map_err(|e| CorruptCatalog {
            raw,
            reason: e.to_string(),
        }))
    }

    /// Every stored preset by name. A corrupted catalog reads as empty.
    pub fn list_presets(&self) -> PresetCatalog {
        match self.read_catalog() {
            Ok(Ok(catalog)) => catalog,
            Ok(Err(corrupt)) => {
                tracing::warn!("preset catalog is corrupted, treating as empty: {}", corrupt.reason);
                PresetCatalog::new()
            }
            Err(e) => {
                tracing::warn!("could not read preset catalog: {}", e);
                PresetCatalog::new()
            }
        }
    }

    /// Load the catalog for modification. A corrupted catalog is copied to
    /// `<key>.bak` first so the upcoming write does not destroy it.
    fn catalog_for_write(&mut self) -> Result<PresetCatalog, PersistenceError> {
        match self.read_catalog()? {
            Ok(catalog) => Ok(catalog),
            Err(corrupt) => {
                let backup_key = format!("{}.bak", PRESET_STORE_KEY);
                self.store.set(&backup_key, &corrupt.raw)?;
                tracing::warn!(
                    "preset catalog is corrupted ({}), backed up as {} and starting fresh",
                    corrupt.reason,
                    backup_key
                );
                Ok(PresetCatalog::new())
            }
        }
    }

    fn write_catalog(&mut self, catalog: &PresetCatalog) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(catalog).map_err(|e| PersistenceError::Encode {
            what: "preset catalog",
            source: e,
        })?;
        self.store.set(PRESET_STORE_KEY, &json)
    }

    /// Snapshot the live prompt and tracker data under `name`, replacing any
    /// preset of the same name. An empty name does nothing.
    pub fn save_preset(
        &mut self,
        settings: &SettingsStore,
        name: &str,
    ) -> Result<bool, PersistenceError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let live = settings.settings();
        let preset = Preset {
            name: name.to_string(),
            system_prompt: live.system_prompt.clone(),
            tracker_data: live.tracker_data.clone(),
            saved_at: Some(Utc::now()),
        };

        let mut catalog = self.catalog_for_write()?;
        catalog.insert(name.to_string(), preset);
        self.write_catalog(&catalog)?;
        self.dropdown = PresetDropdown::populate(&catalog, &live.current_preset);
        tracing::debug!("saved preset {:?}", name);
        Ok(true)
    }

    /// Make the named preset live and redraw. Returns false if there is no
    /// such preset. Names are trimmed, as on save.
    pub fn load_preset(
        &mut self,
        settings: &mut SettingsStore,
        renderer: &mut dyn Renderer,
        name: &str,
    ) -> Result<bool, PersistenceError> {
        let name = name.trim();
        let catalog = self.list_presets();
        let Some(preset) = catalog.get(name) else {
            return Ok(false);
        };

        let patch = SettingsPatch {
            system_prompt: Some(preset.system_prompt.clone()),
            tracker_data: Some(preset.tracker_data.clone()),
            current_preset: Some(name.to_string()),
            ..Default::default()
        };
        // A patch without an update depth cannot fail validation
        if let Err(e) = settings.update_settings(patch) {
            tracing::warn!("could not apply preset {:?}: {}", name, e);
            return Ok(false);
        }
        settings.persist_all()?;

        self.dropdown = PresetDropdown::populate(&catalog, name);
        renderer.render_tracker(&settings.settings().tracker_data);
        Ok(true)
    }

    /// Remove the named preset. `currentPreset` is left as it is, even when
    /// it names the deleted preset. Returns false if there was no such preset.
    pub fn delete_preset(
        &mut self,
        settings: &SettingsStore,
        name: &str,
    ) -> Result<bool, PersistenceError> {
        let name = name.trim();
        let mut catalog = self.catalog_for_write()?;
        let removed = catalog.shift_remove(name).is_some();
        self.write_catalog(&catalog)?;
        self.dropdown = PresetDropdown::populate(&catalog, &settings.settings().current_preset);
        Ok(removed)
    }

    /// Rebuild the selection list from the catalog, selecting the live
    /// `currentPreset`.
    pub fn populate_preset_dropdown(&mut self, settings: &SettingsStore) -> &PresetDropdown {
        let catalog = self.list_presets();
        self.dropdown = PresetDropdown::populate(&catalog, &settings.settings().current_preset);
        &self.dropdown
    }
}
