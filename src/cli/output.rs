use serde::Serialize;

use crate::model::preset::PresetCatalog;
use crate::model::settings::ExtensionSettings;
use crate::ui::dropdown::PresetDropdown;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct PresetJson {
    pub name: String,
    pub sections: usize,
    pub fields: usize,
    pub selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

#[derive(Serialize)]
pub struct SettingsJson {
    pub data_format: String,
    pub current_preset: Option<String>,
    pub update_depth: u8,
    pub generation_mode: String,
    pub sections: usize,
    pub fields: usize,
}

pub fn preset_list_json(catalog: &PresetCatalog, dropdown: &PresetDropdown) -> Vec<PresetJson> {
    catalog
        .values()
        .map(|p| PresetJson {
            name: p.name.clone(),
            sections: p.tracker_data.sections.len(),
            fields: p.tracker_data.field_count(),
            selected: dropdown.option(&p.name).is_some_and(|o| o.selected),
            saved_at: p
                .saved_at
                .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        })
        .collect()
}

pub fn settings_json(settings: &ExtensionSettings) -> SettingsJson {
    SettingsJson {
        data_format: settings.data_format.to_string(),
        current_preset: (!settings.current_preset.is_empty())
            .then(|| settings.current_preset.clone()),
        update_depth: settings.update_depth,
        generation_mode: settings.generation_mode.to_string(),
        sections: settings.tracker_data.sections.len(),
        fields: settings.tracker_data.field_count(),
    }
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

/// One line per preset; the selected one is marked with `*`
pub fn format_preset_list(presets: &[PresetJson]) -> String {
    if presets.is_empty() {
        return "(no presets)".to_string();
    }
    presets
        .iter()
        .map(|p| {
            let marker = if p.selected { "*" } else { " " };
            let saved = p
                .saved_at
                .as_deref()
                .map(|s| format!("  saved {}", s))
                .unwrap_or_default();
            format!(
                "{} {}  ({} sections, {} fields){}",
                marker, p.name, p.sections, p.fields, saved
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_settings(s: &SettingsJson) -> String {
    [
        format!("format:          {}", s.data_format),
        format!(
            "preset:          {}",
            s.current_preset.as_deref().unwrap_or("(none)")
        ),
        format!("update depth:    {}", s.update_depth),
        format!("generation mode: {}", s.generation_mode),
        format!("tracker:         {} sections, {} fields", s.sections, s.fields),
    ]
    .join("\n")
}
