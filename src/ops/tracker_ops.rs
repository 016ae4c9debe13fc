use crate::model::tracker::{Field, FieldKind, FieldValue, Section, Subsection, TrackerData};

/// Error type for structural edits of the tracker tree
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditError {
    #[error("section not found: {0}")]
    SectionNotFound(String),
    #[error("subsection not found: {0}")]
    SubsectionNotFound(String),
    #[error("field not found: {0}")]
    FieldNotFound(String),
    #[error("name must not be empty")]
    EmptyName,
}

fn clean_name(name: &str) -> Result<String, EditError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EditError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Append a new empty section. Returns a copy of it.
pub fn add_section(data: &mut TrackerData, name: &str) -> Result<Section, EditError> {
    let section = Section::new(clean_name(name)?);
    data.sections.push(section.clone());
    Ok(section)
}

/// Append a new empty subsection to a section. Returns a copy of it.
pub fn add_subsection(
    data: &mut TrackerData,
    section_id: &str,
    name: &str,
) -> Result<Subsection, EditError> {
    let name = clean_name(name)?;
    let section = data
        .section_mut(section_id)
        .ok_or_else(|| EditError::SectionNotFound(section_id.to_string()))?;
    let subsection = Subsection::new(name);
    section.subsections.push(subsection.clone());
    Ok(subsection)
}

/// Append a new field with the kind's empty value. Returns a copy of it.
pub fn add_field(
    data: &mut TrackerData,
    subsection_id: &str,
    name: &str,
    kind: FieldKind,
) -> Result<Field, EditError> {
    let name = clean_name(name)?;
    let subsection = data
        .subsection_mut(subsection_id)
        .ok_or_else(|| EditError::SubsectionNotFound(subsection_id.to_string()))?;
    let field = Field::new(name, kind);
    subsection.fields.push(field.clone());
    Ok(field)
}

/// Rename a field and replace its value. The value's kind becomes the
/// field's kind.
pub fn update_field(
    data: &mut TrackerData,
    field_id: &str,
    name: &str,
    value: FieldValue,
) -> Result<Field, EditError> {
    let name = clean_name(name)?;
    let field = data
        .field_mut(field_id)
        .ok_or_else(|| EditError::FieldNotFound(field_id.to_string()))?;
    field.name = name;
    field.value = value;
    Ok(field.clone())
}

/// Remove a section and everything under it
pub fn delete_section(data: &mut TrackerData, section_id: &str) -> Result<Section, EditError> {
    let idx = data
        .sections
        .iter()
        .position(|s| s.id == section_id)
        .ok_or_else(|| EditError::SectionNotFound(section_id.to_string()))?;
    Ok(data.sections.remove(idx))
}

pub fn delete_subsection(
    data: &mut TrackerData,
    subsection_id: &str,
) -> Result<Subsection, EditError> {
    for section in &mut data.sections {
        if let Some(idx) = section.subsections.iter().position(|s| s.id == subsection_id) {
            return Ok(section.subsections.remove(idx));
        }
    }
    Err(EditError::SubsectionNotFound(subsection_id.to_string()))
}

pub fn delete_field(data: &mut TrackerData, field_id: &str) -> Result<Field, EditError> {
    for subsection in data.sections.iter_mut().flat_map(|s| s.subsections.iter_mut()) {
        if let Some(idx) = subsection.fields.iter().position(|f| f.id == field_id) {
            return Ok(subsection.fields.remove(idx));
        }
    }
    Err(EditError::FieldNotFound(field_id.to_string()))
}
