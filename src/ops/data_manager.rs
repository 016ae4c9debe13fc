use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::io::storage::PersistenceError;
use crate::io::store::SettingsStore;
use crate::io::template::{TemplateDocument, TemplateSource};
use crate::model::settings::{SettingsPatch, ValidationError};
use crate::model::tracker::{Field, FieldKind, FieldValue, Section, Subsection, TrackerData};
use crate::ops::tracker_ops::{self, EditError};
use crate::parse::{
    DataFormat, FormatError, detect_format_from_filename, parse_tracker, serialize_tracker,
};
use crate::ui::render::Renderer;

/// Preset name recorded when the default template is applied
pub const DEFAULT_PRESET_NAME: &str = "Default";

/// Error type for data manager operations
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// What `ensure_initialized` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Tracker data already had sections; nothing was done
    AlreadyInitialized,
    /// The default template was applied
    FromTemplate,
    /// The template could not be used; an empty tracker was stored
    Empty,
    /// Another initialization is running on this manager; nothing was done
    InFlight,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Apply without saving to either store
    pub skip_persist: bool,
}

/// A serialized tracker ready to be offered as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub format: DataFormat,
    pub contents: String,
}

/// Clears the in-flight flag when initialization ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the tracker data lifecycle: first-use initialization, reads,
/// writes, import/export and structural edits.
pub struct DataManager {
    template: Box<dyn TemplateSource>,
    in_flight: AtomicBool,
}

impl DataManager {
    pub fn new(template: Box<dyn TemplateSource>) -> Self {
        DataManager {
            template,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Make sure the tracker has data. Applies the default template on first
    /// use and falls back to an empty tracker if the template is unusable.
    /// Never fails: every problem is logged and recovered locally.
    pub async fn ensure_initialized(&self, store: &mut SettingsStore) -> InitOutcome {
        if !store.settings().tracker_data.sections.is_empty() {
            return InitOutcome::AlreadyInitialized;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("initialization already running, skipping");
            return InitOutcome::InFlight;
        }
        let _guard = InFlightGuard(&self.in_flight);

        match self.load_template().await {
            Ok(doc) => {
                let patch = SettingsPatch {
                    system_prompt: Some(doc.system_prompt),
                    tracker_data: Some(doc.tracker_data),
                    current_preset: Some(DEFAULT_PRESET_NAME.to_string()),
                    ..Default::default()
                };
                if let Err(e) = store.update_settings(patch) {
                    tracing::warn!("could not apply default template: {}", e);
                }
                if let Err(e) = store.persist_all() {
                    tracing::warn!("could not save initialized tracker: {}", e);
                }
                tracing::info!("tracker initialized from default template");
                InitOutcome::FromTemplate
            }
            Err(reason) => {
                tracing::warn!("default template unavailable, starting empty: {}", reason);
                let options = UpdateOptions { skip_persist: true };
                if let Err(e) = self.update_tracker_data(store, TrackerData::default(), options) {
                    tracing::warn!("could not reset tracker data: {}", e);
                }
                if let Err(e) = store.persist_all() {
                    tracing::warn!("could not save empty tracker: {}", e);
                }
                InitOutcome::Empty
            }
        }
    }

    async fn load_template(&self) -> Result<TemplateDocument, String> {
        let text = self.template.fetch().await.map_err(|e| e.to_string())?;
        serde_json::from_str(&text).map_err(|e| format!("malformed template: {}", e))
    }

    /// A copy of the live tracker data
    pub fn get_tracker_data(&self, store: &SettingsStore) -> TrackerData {
        store.settings().tracker_data.clone()
    }

    /// Replace the live tracker data and save both stores unless told not to
    pub fn update_tracker_data(
        &self,
        store: &mut SettingsStore,
        data: TrackerData,
        options: UpdateOptions,
    ) -> Result<(), TrackerError> {
        store.update_settings(SettingsPatch {
            tracker_data: Some(data),
            ..Default::default()
        })?;
        if !options.skip_persist {
            store.persist_all()?;
        }
        Ok(())
    }

    /// The live data in the baseline format
    pub fn export_tracker_data(&self, store: &SettingsStore) -> Result<String, FormatError> {
        serialize_tracker(&store.settings().tracker_data, DataFormat::Json)
    }

    /// The live data as a named file in `format`
    pub fn export_tracker_file(
        &self,
        store: &SettingsStore,
        format: DataFormat,
    ) -> Result<ExportFile, FormatError> {
        Ok(ExportFile {
            file_name: format!("tracker_data.{}", format.extension()),
            format,
            contents: serialize_tracker(&store.settings().tracker_data, format)?,
        })
    }

    /// Parse `text` and make it the live tracker data
    pub fn import_tracker_text(
        &self,
        store: &mut SettingsStore,
        renderer: &mut dyn Renderer,
        text: &str,
        format: DataFormat,
    ) -> Result<usize, TrackerError> {
        let data = parse_tracker(text, format)?;
        let count = data.sections.len();
        self.update_tracker_data(store, data, UpdateOptions::default())?;
        renderer.render_tracker(&store.settings().tracker_data);
        Ok(count)
    }

    /// Read a local file, infer its format from the extension, and make it
    /// the live tracker data. Returns the number of imported sections.
    pub async fn import_tracker_file(
        &self,
        store: &mut SettingsStore,
        renderer: &mut dyn Renderer,
        path: &Path,
    ) -> Result<usize, TrackerError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TrackerError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })?;
        let format = detect_format_from_filename(&path.to_string_lossy());
        self.import_tracker_text(store, renderer, &text, format)
    }

    /// Record the preferred interchange format and save settings
    pub fn set_data_format(
        &self,
        store: &mut SettingsStore,
        format: DataFormat,
    ) -> Result<(), TrackerError> {
        store.update_settings(SettingsPatch {
            data_format: Some(format),
            ..Default::default()
        })?;
        store.save_settings()?;
        Ok(())
    }

    pub fn set_system_prompt(
        &self,
        store: &mut SettingsStore,
        prompt: &str,
    ) -> Result<(), TrackerError> {
        store.update_settings(SettingsPatch {
            system_prompt: Some(prompt.to_string()),
            ..Default::default()
        })?;
        store.save_settings()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Structural edits
    // -----------------------------------------------------------------------

    /// Run `edit` on a copy of the live data, then store the result.
    fn edit<T>(
        &self,
        store: &mut SettingsStore,
        edit: impl FnOnce(&mut TrackerData) -> Result<T, EditError>,
    ) -> Result<T, TrackerError> {
        let mut data = self.get_tracker_data(store);
        let result = edit(&mut data)?;
        self.update_tracker_data(store, data, UpdateOptions::default())?;
        Ok(result)
    }

    pub fn add_section(
        &self,
        store: &mut SettingsStore,
        renderer: &mut dyn Renderer,
        name: &str,
    ) -> Result<Section, TrackerError> {
        let section = self.edit(store, |data| tracker_ops::add_section(data, name))?;
        renderer.add_section(&section);
        Ok(section)
    }

    pub fn add_subsection(
        &self,
        store: &mut SettingsStore,
        renderer: &mut dyn Renderer,
        section_id: &str,
        name: &str,
    ) -> Result<Subsection, TrackerError> {
        let subsection =
            self.edit(store, |data| tracker_ops::add_subsection(data, section_id, name))?;
        renderer.add_subsection(section_id, &subsection);
        Ok(subsection)
    }

    pub fn add_field(
        &self,
        store: &mut SettingsStore,
        renderer: &mut dyn Renderer,
        subsection_id: &str,
        name: &str,
        kind: FieldKind,
    ) -> Result<Field, TrackerError> {
        let field = self.edit(store, |data| {
            tracker_ops::add_field(data, subsection_id, name, kind)
        })?;
        renderer.add_field(subsection_id, &field);
        Ok(field)
    }

    pub fn update_field(
        &self,
        store: &mut SettingsStore,
        renderer: &mut dyn Renderer,
        field_id: &str,
        name: &str,
        value: FieldValue,
    ) -> Result<Field, TrackerError> {
        let field = self.edit(store, |data| {
            tracker_ops::update_field(data, field_id, name, value)
        })?;
        renderer.update_field(&field);
        Ok(field)
    }

    pub fn delete_section(
        &self,
        store: &mut SettingsStore,
        renderer: &mut dyn Renderer,
        section_id: &str,
    ) -> Result<Section, TrackerError> {
        let removed = self.edit(store, |data| tracker_ops::delete_section(data, section_id))?;
        renderer.render_tracker(&store.settings().tracker_data);
        Ok(removed)
    }

    pub fn delete_subsection(
        &self,
        store: &mut SettingsStore,
        renderer: &mut dyn Renderer,
        subsection_id: &str,
    ) -> Result<Subsection, TrackerError> {
        let removed =
            self.edit(store, |data| tracker_ops::delete_subsection(data, subsection_id))?;
        renderer.render_tracker(&store.settings().tracker_data);
        Ok(removed)
    }

    pub fn delete_field(
        &self,
        store: &mut SettingsStore,
        renderer: &mut dyn Renderer,
        field_id: &str,
    ) -> Result<Field, TrackerError> {
        let removed = self.edit(store, |data| tracker_ops::delete_field(data, field_id))?;
        renderer.render_tracker(&store.settings().tracker_data);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::MemoryStorage;
    use crate::io::template::{EmbeddedTemplate, FetchError};
    use crate::ui::render::{NullRenderer, TextRenderer};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// A template source that counts fetches and can be told to fail
    struct CountingTemplate {
        body: Option<String>,
        calls: Arc<AtomicUsize>,
        yield_first: bool,
    }

    #[async_trait::async_trait]
    impl TemplateSource for CountingTemplate {
        async fn fetch(&self) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.yield_first {
                tokio::task::yield_now().await;
            }
            self.body.clone().ok_or(FetchError::Status(404))
        }
    }

    fn manager(body: Option<&str>) -> (DataManager, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let template = CountingTemplate {
            body: body.map(str::to_string),
            calls: calls.clone(),
            yield_first: false,
        };
        (DataManager::new(Box::new(template)), calls)
    }

    const TEMPLATE: &str = r#"{
        "systemPrompt": "Keep track.",
        "trackerData": {"sections": [{"id": "s1", "name": "Scene", "subsections": []}]}
    }"#;

    #[tokio::test]
    async fn initialization_is_idempotent() {
        let storage = MemoryStorage::new();
        let mut store = SettingsStore::new(storage.clone());
        let (dm, calls) = manager(Some(TEMPLATE));

        assert_eq!(dm.ensure_initialized(&mut store).await, InitOutcome::FromTemplate);
        assert_eq!(dm.ensure_initialized(&mut store).await, InitOutcome::AlreadyInitialized);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.settings_saves(), 1);
        assert_eq!(storage.chat_saves(), 1);
        assert_eq!(store.settings().current_preset, DEFAULT_PRESET_NAME);
        assert_eq!(store.settings().system_prompt, "Keep track.");
    }

    #[tokio::test]
    async fn failed_fetch_falls_back_to_empty() {
        let storage = MemoryStorage::new();
        let mut store = SettingsStore::new(storage.clone());
        let (dm, _) = manager(None);

        assert_eq!(dm.ensure_initialized(&mut store).await, InitOutcome::Empty);
        assert_eq!(dm.get_tracker_data(&store).sections, Vec::<Section>::new());
        assert_eq!(store.settings().current_preset, "");
        assert_eq!(storage.settings_saves(), 1);
        assert_eq!(storage.chat_saves(), 1);
    }

    #[tokio::test]
    async fn malformed_template_falls_back_to_empty() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let (dm, _) = manager(Some(r#"{"systemPrompt": "no data"}"#));
        assert_eq!(dm.ensure_initialized(&mut store).await, InitOutcome::Empty);
        assert!(store.settings().tracker_data.sections.is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_does_not_escape_initialization() {
        let storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        let mut store = SettingsStore::new(storage);
        let (dm, _) = manager(None);
        assert_eq!(dm.ensure_initialized(&mut store).await, InitOutcome::Empty);
    }

    #[tokio::test]
    async fn overlapping_initialization_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dm = DataManager::new(Box::new(CountingTemplate {
            body: Some(TEMPLATE.to_string()),
            calls: calls.clone(),
            yield_first: true,
        }));
        let mut first = SettingsStore::new(MemoryStorage::new());
        let mut second = SettingsStore::new(MemoryStorage::new());

        let (a, b) = tokio::join!(
            dm.ensure_initialized(&mut first),
            dm.ensure_initialized(&mut second)
        );
        assert_eq!(a, InitOutcome::FromTemplate);
        assert_eq!(b, InitOutcome::InFlight);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The flag is released once the first call finishes
        assert_eq!(dm.ensure_initialized(&mut second).await, InitOutcome::FromTemplate);
    }

    #[tokio::test]
    async fn embedded_template_initializes() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let dm = DataManager::new(Box::new(EmbeddedTemplate));
        assert_eq!(dm.ensure_initialized(&mut store).await, InitOutcome::FromTemplate);
        assert!(store.settings().tracker_data.field_count() > 0);
    }

    #[test]
    fn returned_data_is_a_copy() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let (dm, _) = manager(None);
        dm.add_section(&mut store, &mut NullRenderer, "World").unwrap();

        let mut copy = dm.get_tracker_data(&store);
        copy.sections[0].name = "Changed".into();
        copy.sections.clear();

        assert_eq!(dm.get_tracker_data(&store).sections[0].name, "World");
    }

    #[test]
    fn update_then_get_observes_write() {
        let storage = MemoryStorage::new();
        let mut store = SettingsStore::new(storage.clone());
        let (dm, _) = manager(None);
        let mut data = TrackerData::default();
        data.sections.push(Section::new("Plot"));

        dm.update_tracker_data(&mut store, data.clone(), UpdateOptions::default())
            .unwrap();
        assert_eq!(dm.get_tracker_data(&store), data);
        assert_eq!(storage.settings_saves(), 1);

        dm.update_tracker_data(&mut store, TrackerData::default(), UpdateOptions { skip_persist: true })
            .unwrap();
        assert!(dm.get_tracker_data(&store).sections.is_empty());
        assert_eq!(storage.settings_saves(), 1);
    }

    #[test]
    fn export_is_baseline_json_and_pure() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let (dm, _) = manager(None);
        dm.add_section(&mut store, &mut NullRenderer, "World").unwrap();
        let before = dm.get_tracker_data(&store);

        let text = dm.export_tracker_data(&store).unwrap();
        assert_eq!(parse_tracker(&text, DataFormat::Json).unwrap(), before);
        assert_eq!(dm.get_tracker_data(&store), before);

        let file = dm.export_tracker_file(&store, DataFormat::Yaml).unwrap();
        assert_eq!(file.file_name, "tracker_data.yaml");
        assert_eq!(file.contents, serialize_tracker(&before, DataFormat::Yaml).unwrap());
    }

    #[tokio::test]
    async fn import_file_detects_format_and_renders() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("saved.yml");
        std::fs::write(&path, "sections:\n- id: s9\n  name: Imported\n").unwrap();

        let mut store = SettingsStore::new(MemoryStorage::new());
        let mut renderer = TextRenderer::new(false);
        let (dm, _) = manager(None);

        let count = dm
            .import_tracker_file(&mut store, &mut renderer, &path)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.settings().tracker_data.sections[0].name, "Imported");
        assert_eq!(renderer.text(), "Imported");
    }

    #[test]
    fn bad_import_keeps_existing_data() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let (dm, _) = manager(None);
        dm.add_section(&mut store, &mut NullRenderer, "Keep me").unwrap();

        let err = dm
            .import_tracker_text(&mut store, &mut NullRenderer, "{ nope", DataFormat::Json)
            .unwrap_err();
        assert!(matches!(err, TrackerError::Format(_)));
        assert_eq!(store.settings().tracker_data.sections[0].name, "Keep me");
    }

    #[tokio::test]
    async fn import_missing_file_is_read_error() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let (dm, _) = manager(None);
        let err = dm
            .import_tracker_file(&mut store, &mut NullRenderer, Path::new("/no/such/file.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::ReadError { .. }));
    }

    #[test]
    fn set_data_format_persists_settings() {
        let storage = MemoryStorage::new();
        let mut store = SettingsStore::new(storage.clone());
        let (dm, _) = manager(None);
        dm.set_data_format(&mut store, DataFormat::Yaml).unwrap();
        assert_eq!(store.settings().data_format, DataFormat::Yaml);
        assert!(storage.settings_json().unwrap().contains(r#""dataFormat":"yaml""#));
    }

    #[test]
    fn edits_notify_renderer_and_persist() {
        let storage = MemoryStorage::new();
        let mut store = SettingsStore::new(storage.clone());
        let mut renderer = TextRenderer::new(false);
        let (dm, _) = manager(None);

        let section = dm.add_section(&mut store, &mut renderer, "Characters").unwrap();
        let sub = dm
            .add_subsection(&mut store, &mut renderer, &section.id, "Hero")
            .unwrap();
        let field = dm
            .add_field(&mut store, &mut renderer, &sub.id, "HP", FieldKind::Number)
            .unwrap();
        dm.update_field(&mut store, &mut renderer, &field.id, "HP", FieldValue::Number(9.0))
            .unwrap();

        assert_eq!(renderer.text(), "Characters\n  Hero\n    HP: 9 (number)");
        assert_eq!(storage.chat_saves(), 4);

        dm.delete_field(&mut store, &mut renderer, &field.id).unwrap();
        assert_eq!(renderer.text(), "Characters\n  Hero");
        assert!(matches!(
            dm.delete_section(&mut store, &mut renderer, "section-missing"),
            Err(TrackerError::Edit(EditError::SectionNotFound(_)))
        ));
    }
}
