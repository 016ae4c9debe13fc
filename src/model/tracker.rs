use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of the tracker tree. Section order is display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerData {
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A top-level group of subsections (e.g. "Characters", "World")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default = "new_section_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subsections: Vec<Subsection>,
}

/// A group of fields inside a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsection {
    #[serde(default = "new_subsection_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// The kind tag of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Boolean,
}

impl FieldKind {
    pub fn parse_kind(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Some(FieldKind::Text),
            "number" => Some(FieldKind::Number),
            "boolean" | "bool" => Some(FieldKind::Boolean),
            _ => None,
        }
    }

    /// The value a freshly created field of this kind starts with
    pub fn empty_value(self) -> FieldValue {
        match self {
            FieldKind::Text => FieldValue::Text(String::new()),
            FieldKind::Number => FieldValue::Number(0.0),
            FieldKind::Boolean => FieldValue::Boolean(false),
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Text => write!(f, "text"),
            FieldKind::Number => write!(f, "number"),
            FieldKind::Boolean => write!(f, "boolean"),
        }
    }
}

/// 2^53; integral numbers below this are exactly representable as i64 and f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Boolean(_) => FieldKind::Boolean,
        }
    }

    /// Coerce a loosely typed value into `kind`. Strings are accepted for
    /// numbers and booleans; numbers and booleans are stringified for text.
    pub fn coerce(kind: FieldKind, raw: &Value) -> Result<FieldValue, String> {
        match (kind, raw) {
            (FieldKind::Text, Value::Null) => Ok(FieldValue::Text(String::new())),
            (FieldKind::Text, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
            (FieldKind::Text, Value::Number(n)) => Ok(FieldValue::Text(n.to_string())),
            (FieldKind::Text, Value::Bool(b)) => Ok(FieldValue::Text(b.to_string())),

            (FieldKind::Number, Value::Null) => Ok(FieldValue::Number(0.0)),
            (FieldKind::Number, Value::Number(n)) => n
                .as_f64()
                .map(FieldValue::Number)
                .ok_or_else(|| format!("number out of range: {}", n)),
            (FieldKind::Number, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(FieldValue::Number(n)),
                _ => Err(format!("not a finite number: {:?}", s)),
            },

            (FieldKind::Boolean, Value::Null) => Ok(FieldValue::Boolean(false)),
            (FieldKind::Boolean, Value::Bool(b)) => Ok(FieldValue::Boolean(*b)),
            (FieldKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(FieldValue::Boolean(true)),
                "false" => Ok(FieldValue::Boolean(false)),
                _ => Err(format!("not a boolean: {:?}", s)),
            },
            (FieldKind::Boolean, Value::Number(n)) => match n.as_f64() {
                Some(v) if v == 0.0 => Ok(FieldValue::Boolean(false)),
                Some(v) if v == 1.0 => Ok(FieldValue::Boolean(true)),
                _ => Err(format!("not a boolean: {}", n)),
            },

            (kind, other) => Err(format!("cannot use {} as a {} value", other, kind)),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            // Whole numbers go out as integers: 100, not 100.0
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                Value::from(*n as i64)
            }
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Boolean(b) => Value::Bool(*b),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// A single named value inside a subsection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawField", into = "RawField")]
pub struct Field {
    pub id: String,
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            id: new_field_id(),
            name: name.into(),
            value: kind.empty_value(),
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.value.kind()
    }
}

/// Wire shape of a field: `{ id, name, type, value }`
#[derive(Serialize, Deserialize)]
struct RawField {
    #[serde(default = "new_field_id")]
    id: String,
    name: String,
    #[serde(rename = "type", default)]
    kind: FieldKind,
    #[serde(default)]
    value: Value,
}

/// A value that does not fit its declared type is kept as text rather than
/// failing the whole document.
impl From<RawField> for Field {
    fn from(raw: RawField) -> Self {
        let value = FieldValue::coerce(raw.kind, &raw.value).unwrap_or_else(|e| {
            tracing::warn!(field = %raw.name, "keeping value as text: {}", e);
            FieldValue::Text(match &raw.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        });
        Field {
            id: raw.id,
            name: raw.name,
            value,
        }
    }
}

impl From<Field> for RawField {
    fn from(field: Field) -> Self {
        RawField {
            id: field.id,
            name: field.name,
            kind: field.value.kind(),
            value: field.value.to_json(),
        }
    }
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Section {
            id: new_section_id(),
            name: name.into(),
            subsections: Vec::new(),
        }
    }
}

impl Subsection {
    pub fn new(name: impl Into<String>) -> Self {
        Subsection {
            id: new_subsection_id(),
            name: name.into(),
            fields: Vec::new(),
        }
    }
}

impl TrackerData {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn section_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == id)
    }

    pub fn subsection_mut(&mut self, id: &str) -> Option<&mut Subsection> {
        self.sections
            .iter_mut()
            .flat_map(|s| s.subsections.iter_mut())
            .find(|sub| sub.id == id)
    }

    /// Look up a field anywhere in the tree
    pub fn get_field_by_id(&self, id: &str) -> Option<&Field> {
        self.sections
            .iter()
            .flat_map(|s| s.subsections.iter())
            .flat_map(|sub| sub.fields.iter())
            .find(|f| f.id == id)
    }

    pub fn field_mut(&mut self, id: &str) -> Option<&mut Field> {
        self.sections
            .iter_mut()
            .flat_map(|s| s.subsections.iter_mut())
            .flat_map(|sub| sub.fields.iter_mut())
            .find(|f| f.id == id)
    }

    /// Total number of fields across all sections
    pub fn field_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.subsections.iter())
            .map(|sub| sub.fields.len())
            .sum()
    }
}

fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

fn new_section_id() -> String {
    new_id("section")
}

fn new_subsection_id() -> String {
    new_id("subsection")
}

fn new_field_id() -> String {
    new_id("field")
}
