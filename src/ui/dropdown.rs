use crate::model::preset::PresetCatalog;

/// One entry in the preset selection list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// The UI-facing preset selection list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetDropdown {
    pub options: Vec<DropdownOption>,
}

impl PresetDropdown {
    /// Build the list from the catalog, selecting `current` when it names an
    /// entry. An empty or unknown `current` leaves nothing selected.
    pub fn populate(catalog: &PresetCatalog, current: &str) -> Self {
        let options = catalog
            .keys()
            .map(|name| DropdownOption {
                value: name.clone(),
                label: name.clone(),
                selected: !current.is_empty() && name == current,
            })
            .collect();
        PresetDropdown { options }
    }

    /// Value of the selected entry
    pub fn selected_value(&self) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.selected)
            .map(|o| o.value.as_str())
    }

    pub fn option(&self, value: &str) -> Option<&DropdownOption> {
        self.options.iter().find(|o| o.value == value)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::preset::Preset;
    use crate::model::tracker::TrackerData;

    fn catalog(names: &[&str]) -> PresetCatalog {
        names
            .iter()
            .map(|n| {
                (
                    n.to_string(),
                    Preset {
                        name: n.to_string(),
                        system_prompt: String::new(),
                        tracker_data: TrackerData::default(),
                        saved_at: None,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn selects_current_entry() {
        let dropdown = PresetDropdown::populate(&catalog(&["Default", "Noir"]), "Noir");
        assert_eq!(dropdown.selected_value(), Some("Noir"));
        assert!(!dropdown.option("Default").unwrap().selected);
        assert_eq!(dropdown.len(), 2);
    }

    #[test]
    fn empty_or_stale_current_selects_nothing() {
        let presets = catalog(&["Default"]);
        assert_eq!(PresetDropdown::populate(&presets, "").selected_value(), None);
        assert_eq!(PresetDropdown::populate(&presets, "Gone").selected_value(), None);
    }

    #[test]
    fn keeps_catalog_order() {
        let dropdown = PresetDropdown::populate(&catalog(&["b", "a", "c"]), "");
        let values: Vec<&str> = dropdown.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["b", "a", "c"]);
    }
}
