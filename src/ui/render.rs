use crate::model::tracker::{Field, FieldValue, Section, Subsection, TrackerData};

/// The presentation layer that displays the tracker tree.
///
/// The core calls these after every mutation that must be reflected
/// visually; it never touches presentation state itself.
pub trait Renderer {
    /// Rebuild the whole view from `data`
    fn render_tracker(&mut self, data: &TrackerData);
    fn add_section(&mut self, section: &Section);
    fn add_subsection(&mut self, section_id: &str, subsection: &Subsection);
    fn add_field(&mut self, subsection_id: &str, field: &Field);
    fn update_field(&mut self, field: &Field);
    /// The field as currently displayed
    fn get_field_by_id(&self, field_id: &str) -> Option<&Field>;
}

/// A renderer that displays nothing
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render_tracker(&mut self, _data: &TrackerData) {}
    fn add_section(&mut self, _section: &Section) {}
    fn add_subsection(&mut self, _section_id: &str, _subsection: &Subsection) {}
    fn add_field(&mut self, _subsection_id: &str, _field: &Field) {}
    fn update_field(&mut self, _field: &Field) {}
    fn get_field_by_id(&self, _field_id: &str) -> Option<&Field> {
        None
    }
}

/// Renders the tree as indented plain text. Keeps its own copy of the
/// displayed tree, the way a widget tree would.
#[derive(Debug, Default)]
pub struct TextRenderer {
    view: TrackerData,
    show_ids: bool,
    /// Number of full re-renders performed
    pub full_renders: usize,
}

impl TextRenderer {
    pub fn new(show_ids: bool) -> Self {
        TextRenderer {
            show_ids,
            ..Default::default()
        }
    }

    fn label(&self, name: &str, id: &str) -> String {
        if self.show_ids {
            format!("{} [{}]", name, id)
        } else {
            name.to_string()
        }
    }

    /// The current view as text, one line per node
    pub fn text(&self) -> String {
        if self.view.sections.is_empty() {
            return "(no sections)".to_string();
        }
        let mut lines = Vec::new();
        for section in &self.view.sections {
            lines.push(self.label(&section.name, &section.id));
            for sub in &section.subsections {
                lines.push(format!("  {}", self.label(&sub.name, &sub.id)));
                for field in &sub.fields {
                    let value = match &field.value {
                        FieldValue::Text(s) if s.is_empty() => "-".to_string(),
                        FieldValue::Text(s) => s.clone(),
                        other => other.to_string(),
                    };
                    lines.push(format!(
                        "    {}: {} ({})",
                        self.label(&field.name, &field.id),
                        value,
                        field.kind()
                    ));
                }
            }
        }
        lines.join("\n")
    }
}

impl Renderer for TextRenderer {
    fn render_tracker(&mut self, data: &TrackerData) {
        self.view = data.clone();
        self.full_renders += 1;
    }

    fn add_section(&mut self, section: &Section) {
        self.view.sections.push(section.clone());
    }

    fn add_subsection(&mut self, section_id: &str, subsection: &Subsection) {
        if let Some(section) = self.view.section_mut(section_id) {
            section.subsections.push(subsection.clone());
        }
    }

    fn add_field(&mut self, subsection_id: &str, field: &Field) {
        if let Some(sub) = self.view.subsection_mut(subsection_id) {
            sub.fields.push(field.clone());
        }
    }

    fn update_field(&mut self, field: &Field) {
        if let Some(shown) = self.view.field_mut(&field.id) {
            *shown = field.clone();
        }
    }

    fn get_field_by_id(&self, field_id: &str) -> Option<&Field> {
        self.view.get_field_by_id(field_id)
    }
}
