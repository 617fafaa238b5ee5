//! Typed field values.
//!
//! The aggregate stores values untyped by field (any key may hold any
//! variant), but each variant's shape is explicit: allow-other pairs,
//! composite widget payloads and file handles are their own types instead
//! of loosely shaped JSON objects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::schema::{FieldDefinition, FieldType, WidgetKind};

/// A file attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FileHandle {
    /// Picked on this device, not yet uploaded. Forces multipart encoding.
    Local {
        file_name: String,
        content_type: String,
        #[serde(default)]
        bytes: Vec<u8>,
        /// Where the contents live on disk until they are read.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    /// Already stored by the server.
    Remote {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
}

impl FileHandle {
    pub fn local(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self::Local {
            file_name,
            content_type,
            bytes,
            path: None,
        }
    }

    /// Read a file from disk into a local handle named after its basename.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::Local {
            content_type: content_type_for(&file_name).to_string(),
            file_name,
            bytes,
            path: Some(path.to_path_buf()),
        })
    }

    /// Fill in the contents of a local handle that only knows its path.
    /// Relative paths resolve against `base`. Returns whether a file was read.
    pub fn read_contents(&mut self, base: &Path) -> std::io::Result<bool> {
        let Self::Local {
            bytes,
            path: Some(path),
            ..
        } = self
        else {
            return Ok(false);
        };
        if !bytes.is_empty() {
            return Ok(false);
        }
        *bytes = std::fs::read(base.join(&*path))?;
        Ok(true)
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote {
            url: url.into(),
            file_name: None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    pub fn file_name(&self) -> &str {
        match self {
            Self::Local { file_name, .. } => file_name,
            Self::Remote {
                file_name: Some(name),
                ..
            } => name,
            Self::Remote { url, .. } => url.rsplit('/').next().unwrap_or(url),
        }
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    fn from_json(json: &Value) -> Option<Self> {
        match json {
            Value::String(url) if !url.is_empty() => Some(Self::remote(url.clone())),
            Value::Object(obj) => {
                if let Some(url) = obj.get("url").and_then(Value::as_str) {
                    return Some(Self::Remote {
                        url: url.to_string(),
                        file_name: obj.get("name").and_then(Value::as_str).map(String::from),
                    });
                }
                let path = obj.get("path").and_then(Value::as_str);
                let name = path
                    .or_else(|| obj.get("file_name").and_then(Value::as_str))
                    .or_else(|| obj.get("name").and_then(Value::as_str))?;
                let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name).to_string();
                let content_type = obj
                    .get("content_type")
                    .and_then(Value::as_str)
                    .unwrap_or_else(|| content_type_for(&file_name))
                    .to_string();
                Some(Self::Local {
                    file_name,
                    content_type,
                    bytes: Vec::new(),
                    path: path.map(PathBuf::from),
                })
            }
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Local {
                file_name,
                content_type,
                bytes,
                ..
            } => json!({
                "file_name": file_name,
                "content_type": content_type,
                "size": bytes.len(),
            }),
            Self::Remote { url, file_name } => match file_name {
                Some(name) => json!({ "url": url, "name": name }),
                None => Value::String(url.clone()),
            },
        }
    }
}

/// Guess a MIME type from a file name.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

/// What an allow-other field currently has selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    One(String),
    Many(Vec<String>),
}

impl Selection {
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::One(v) if v.is_empty() => Vec::new(),
            Self::One(v) => vec![v.as_str()],
            Self::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values().contains(&value)
    }
}

/// Value of a select/radio field that allows a free-text "other".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowOtherValue {
    pub selected_value: Selection,
    #[serde(default)]
    pub other_value: String,
}

impl AllowOtherValue {
    pub fn one(selected: impl Into<String>) -> Self {
        Self {
            selected_value: Selection::One(selected.into()),
            other_value: String::new(),
        }
    }

    pub fn many(selected: &[&str]) -> Self {
        Self {
            selected_value: Selection::Many(selected.iter().map(|s| s.to_string()).collect()),
            other_value: String::new(),
        }
    }

    pub fn with_other(mut self, other: impl Into<String>) -> Self {
        self.other_value = other.into();
        self
    }

    /// Whether the `"other"` sentinel is among the selected values.
    pub fn other_selected(&self) -> bool {
        self.selected_value.contains(crate::schema::OTHER_SENTINEL)
    }
}

/// One row of the project table widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub capacity: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<FileHandle>,
}

/// Structured payload owned by a composite widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "widget", content = "data", rename_all = "kebab-case")]
pub enum CompositeValue {
    ProjectTable(Vec<ProjectRow>),
    CurrencyAmount { amount: String, currency: String },
    SizeWithUnit { size: String, unit: String },
    PercentageTable(BTreeMap<String, String>),
    Metrics(BTreeMap<String, String>),
    Consent(bool),
    /// Payload of a widget this build does not understand.
    Opaque(Value),
}

impl CompositeValue {
    /// Widget-specific "filled" rule used for `required` composites.
    pub fn is_filled(&self) -> bool {
        match self {
            Self::ProjectTable(rows) => !rows.is_empty(),
            Self::CurrencyAmount { amount, .. } => !amount.trim().is_empty(),
            Self::SizeWithUnit { size, .. } => !size.trim().is_empty(),
            Self::PercentageTable(cells) | Self::Metrics(cells) => {
                cells.values().any(|v| !v.trim().is_empty())
            }
            Self::Consent(accepted) => *accepted,
            Self::Opaque(value) => !json_is_empty(value),
        }
    }

    fn contains_local_file(&self) -> bool {
        match self {
            Self::ProjectTable(rows) => rows
                .iter()
                .any(|r| r.attachment.as_ref().is_some_and(FileHandle::is_local)),
            Self::Opaque(value) => json_contains_file_marker(value),
            _ => false,
        }
    }

    fn from_json(widget: WidgetKind, json: &Value) -> Option<Self> {
        let value = match widget {
            WidgetKind::ProjectTable => {
                let rows = json.as_array()?;
                Self::ProjectTable(rows.iter().filter_map(project_row_from_json).collect())
            }
            WidgetKind::CurrencyAmount => Self::CurrencyAmount {
                amount: scalar_to_string(json.get("amount")?),
                currency: json
                    .get("currency")
                    .map(scalar_to_string)
                    .unwrap_or_default(),
            },
            WidgetKind::SizeWithUnit => Self::SizeWithUnit {
                size: scalar_to_string(json.get("size")?),
                unit: json.get("unit").map(scalar_to_string).unwrap_or_default(),
            },
            WidgetKind::PercentageTable => Self::PercentageTable(string_map(json)?),
            WidgetKind::Metrics => Self::Metrics(string_map(json)?),
            WidgetKind::Consent => Self::Consent(match json {
                Value::Bool(b) => *b,
                Value::String(s) => matches!(s.as_str(), "true" | "yes"),
                _ => false,
            }),
            WidgetKind::Unknown => Self::Opaque(json.clone()),
        };
        Some(value)
    }

    fn to_json(&self) -> Value {
        match self {
            Self::ProjectTable(rows) => Value::Array(
                rows.iter()
                    .map(|r| {
                        let mut obj = Map::new();
                        obj.insert("name".into(), Value::String(r.name.clone()));
                        obj.insert("location".into(), Value::String(r.location.clone()));
                        obj.insert("capacity".into(), Value::String(r.capacity.clone()));
                        obj.insert("status".into(), Value::String(r.status.clone()));
                        if let Some(file) = &r.attachment {
                            obj.insert("attachment".into(), file.to_json());
                        }
                        Value::Object(obj)
                    })
                    .collect(),
            ),
            Self::CurrencyAmount { amount, currency } => {
                json!({ "amount": amount, "currency": currency })
            }
            Self::SizeWithUnit { size, unit } => json!({ "size": size, "unit": unit }),
            Self::PercentageTable(cells) | Self::Metrics(cells) => json!(cells),
            Self::Consent(accepted) => Value::Bool(*accepted),
            Self::Opaque(value) => value.clone(),
        }
    }
}

/// A field's current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Bool(bool),
    List(Vec<String>),
    AllowOther(AllowOtherValue),
    TextMap(BTreeMap<String, String>),
    File(FileHandle),
    Files(Vec<FileHandle>),
    Composite(CompositeValue),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Generic emptiness: missing, `""`, zero-length collections, or an
    /// allow-other pair with nothing selected. Composite payloads are
    /// judged by their widget in the validation engine.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Bool(_) => false,
            Self::List(items) => items.is_empty(),
            Self::AllowOther(v) => v.selected_value.is_empty(),
            Self::TextMap(map) => map.is_empty(),
            Self::File(_) => false,
            Self::Files(files) => files.is_empty(),
            Self::Composite(CompositeValue::ProjectTable(rows)) => rows.is_empty(),
            Self::Composite(CompositeValue::PercentageTable(cells))
            | Self::Composite(CompositeValue::Metrics(cells)) => cells.is_empty(),
            Self::Composite(CompositeValue::Opaque(value)) => json_is_empty(value),
            Self::Composite(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Values a visibility condition compares against.
    ///
    /// Allow-other pairs contribute their `selected_value`; structured
    /// values contribute nothing and so never satisfy a condition.
    pub fn condition_values(&self) -> Vec<&str> {
        match self {
            Self::Text(s) if !s.is_empty() => vec![s.as_str()],
            Self::Bool(true) => vec!["true"],
            Self::Bool(false) => vec!["false"],
            Self::List(items) => items.iter().map(String::as_str).collect(),
            Self::AllowOther(v) => v.selected_value.values(),
            _ => Vec::new(),
        }
    }

    /// Recursive scan for files picked on this device.
    pub fn contains_local_file(&self) -> bool {
        match self {
            Self::File(handle) => handle.is_local(),
            Self::Files(handles) => handles.iter().any(FileHandle::is_local),
            Self::Composite(composite) => composite.contains_local_file(),
            _ => false,
        }
    }

    /// All file handles carried by this value.
    pub fn files(&self) -> Vec<&FileHandle> {
        match self {
            Self::File(handle) => vec![handle],
            Self::Files(handles) => handles.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Interpret renderer/draft JSON according to the field's declared type.
    pub fn from_json(field: &FieldDefinition, json: &Value) -> Self {
        if json.is_null() {
            return Self::Empty;
        }
        match field.field_type {
            FieldType::ShortText | FieldType::LongText | FieldType::Date => match json {
                Value::Bool(b) => Self::Bool(*b),
                other => Self::Text(scalar_to_string(other)),
            },
            FieldType::SingleSelect if field.allow_other => {
                Self::AllowOther(allow_other_from_json(json, false))
            }
            FieldType::SingleSelect => Self::Text(scalar_to_string(json)),
            FieldType::RadioWithOther => Self::AllowOther(allow_other_from_json(json, false)),
            FieldType::MultiSelectWithOther => {
                Self::AllowOther(allow_other_from_json(json, true))
            }
            FieldType::GroupedTextMap => string_map(json).map(Self::TextMap).unwrap_or_default(),
            FieldType::File => FileHandle::from_json(json)
                .map(Self::File)
                .unwrap_or_default(),
            FieldType::MultiFile => match json {
                Value::Array(items) => {
                    Self::Files(items.iter().filter_map(FileHandle::from_json).collect())
                }
                single => FileHandle::from_json(single)
                    .map(|f| Self::Files(vec![f]))
                    .unwrap_or_default(),
            },
            FieldType::CompositeWidget { widget } => CompositeValue::from_json(widget, json)
                .map(Self::Composite)
                .unwrap_or_default(),
            FieldType::Unknown => Self::Composite(CompositeValue::Opaque(json.clone())),
        }
    }

    /// Render back to the shape a renderer or draft file uses.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Text(s) => Value::String(s.clone()),
            Self::Bool(b) => Value::Bool(*b),
            Self::List(items) => json!(items),
            Self::AllowOther(v) => json!({
                "selectedValue": v.selected_value,
                "otherValue": v.other_value,
            }),
            Self::TextMap(map) => json!(map),
            Self::File(handle) => handle.to_json(),
            Self::Files(handles) => Value::Array(handles.iter().map(FileHandle::to_json).collect()),
            Self::Composite(composite) => composite.to_json(),
        }
    }
}

/// Canonical spelling of a size unit, or `None` when the unit is unknown.
pub fn canonical_unit(raw: &str) -> Option<&'static str> {
    let folded: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_lowercase();
    let unit = match folded.as_str() {
        "m2" | "m²" | "sqm" | "squaremeters" | "squaremetres" => "m2",
        "sqft" | "ft2" | "ft²" | "squarefeet" => "sqft",
        "ha" | "hectare" | "hectares" => "hectare",
        "acre" | "acres" | "ac" => "acre",
        "km2" | "km²" => "km2",
        "kw" | "kwp" => "kW",
        "mw" | "mwp" => "MW",
        "gw" => "GW",
        "mwh" => "MWh",
        "gwh" => "GWh",
        _ => return None,
    };
    Some(unit)
}

/// Parse a human-entered number: thousands separators and spaces are ignored.
pub fn parse_decimal(raw: &str) -> Option<rust_decimal::Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '_'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// The accumulated value map of a wizard session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, FieldValue>);

static EMPTY: FieldValue = FieldValue::Empty;

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key`, or `Empty` when unset.
    pub fn get(&self, key: &str) -> &FieldValue {
        self.0.get(key).unwrap_or(&EMPTY)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Copy of the entries whose keys are in `keys`.
    pub fn subset<'a, I>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self(
            keys.into_iter()
                .filter_map(|k| self.0.get(k).map(|v| (k.to_string(), v.clone())))
                .collect(),
        )
    }

    /// Read the contents of every local file that was given by path only,
    /// including project row attachments. Returns how many files were read.
    pub fn load_files(&mut self, base: &Path) -> std::io::Result<usize> {
        let mut loaded = 0;
        for value in self.0.values_mut() {
            let handles: Vec<&mut FileHandle> = match value {
                FieldValue::File(handle) => vec![handle],
                FieldValue::Files(handles) => handles.iter_mut().collect(),
                FieldValue::Composite(CompositeValue::ProjectTable(rows)) => rows
                    .iter_mut()
                    .filter_map(|r| r.attachment.as_mut())
                    .collect(),
                _ => Vec::new(),
            };
            for handle in handles {
                if handle.read_contents(base)? {
                    loaded += 1;
                }
            }
        }
        Ok(loaded)
    }

    /// Parse a renderer-shaped JSON object, typing each entry by the schema.
    /// Keys the schema does not know are skipped.
    pub fn from_json(registry: &crate::schema::SchemaRegistry, json: &Value) -> Self {
        let mut values = Self::new();
        if let Some(obj) = json.as_object() {
            for (key, raw) in obj {
                match registry.field(key) {
                    Some(field) => {
                        values.insert(key.clone(), FieldValue::from_json(field, raw));
                    }
                    None => tracing::debug!(key = %key, "Skipping value for unknown field"),
                }
            }
        }
        values
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, FieldValue)> for FormValues {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn allow_other_from_json(json: &Value, multiple: bool) -> AllowOtherValue {
    let (selected, other) = match json {
        Value::Object(obj) if obj.contains_key("selectedValue") => (
            obj.get("selectedValue").cloned().unwrap_or(Value::Null),
            obj.get("otherValue").map(scalar_to_string).unwrap_or_default(),
        ),
        bare => (bare.clone(), String::new()),
    };
    let selected_value = match (selected, multiple) {
        (Value::Array(items), true) => {
            Selection::Many(items.iter().map(scalar_to_string).collect())
        }
        (Value::Array(items), false) => {
            Selection::One(items.first().map(scalar_to_string).unwrap_or_default())
        }
        (Value::Null, true) => Selection::Many(Vec::new()),
        (scalar, true) => Selection::Many(vec![scalar_to_string(&scalar)]),
        (scalar, false) => Selection::One(scalar_to_string(&scalar)),
    };
    AllowOtherValue {
        selected_value,
        other_value: other,
    }
}

fn project_row_from_json(json: &Value) -> Option<ProjectRow> {
    let obj = json.as_object()?;
    let text = |key: &str| obj.get(key).map(scalar_to_string).unwrap_or_default();
    Some(ProjectRow {
        name: text("name"),
        location: text("location"),
        capacity: text("capacity"),
        status: text("status"),
        attachment: obj.get("attachment").and_then(FileHandle::from_json),
    })
}

fn string_map(json: &Value) -> Option<BTreeMap<String, String>> {
    let obj = json.as_object()?;
    Some(
        obj.iter()
            .map(|(k, v)| (k.clone(), scalar_to_string(v)))
            .collect(),
    )
}

/// Stringify a JSON scalar the way a text input would hold it.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn json_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

/// Opaque widgets may carry local files as `{"path": ...}` objects at any depth.
fn json_contains_file_marker(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(json_contains_file_marker),
        Value::Object(obj) => {
            obj.contains_key("path") || obj.values().any(json_contains_file_marker)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, FieldType};

    #[test]
    fn allow_other_object_parses_for_radio() {
        let field = FieldDefinition::new("industry", "Industry", FieldType::RadioWithOther);
        let value = FieldValue::from_json(
            &field,
            &json!({ "selectedValue": "other", "otherValue": "Fintech" }),
        );
        match value {
            FieldValue::AllowOther(v) => {
                assert_eq!(v.selected_value, Selection::One("other".into()));
                assert_eq!(v.other_value, "Fintech");
                assert!(v.other_selected());
            }
            other => panic!("expected AllowOther, got {other:?}"),
        }
    }

    #[test]
    fn bare_scalar_on_allow_other_field_is_wrapped() {
        let field = FieldDefinition::new("sector", "Sector", FieldType::MultiSelectWithOther);
        let value = FieldValue::from_json(&field, &json!(["solar", "wind"]));
        assert_eq!(
            value,
            FieldValue::AllowOther(AllowOtherValue::many(&["solar", "wind"]))
        );
    }

    #[test]
    fn emptiness_per_shape() {
        assert!(FieldValue::Empty.is_empty());
        assert!(FieldValue::text("").is_empty());
        assert!(!FieldValue::text(" ").is_empty());
        assert!(FieldValue::List(vec![]).is_empty());
        assert!(FieldValue::TextMap(BTreeMap::new()).is_empty());
        assert!(FieldValue::AllowOther(AllowOtherValue::one("")).is_empty());
        assert!(!FieldValue::Composite(CompositeValue::Consent(false)).is_empty());
        assert!(FieldValue::Composite(CompositeValue::Opaque(json!({}))).is_empty());
    }

    #[test]
    fn composite_filled_rules() {
        assert!(!CompositeValue::Consent(false).is_filled());
        assert!(CompositeValue::Consent(true).is_filled());
        assert!(!CompositeValue::CurrencyAmount {
            amount: " ".into(),
            currency: "USD".into()
        }
        .is_filled());
        let mut cells = BTreeMap::new();
        cells.insert("founders".to_string(), String::new());
        assert!(!CompositeValue::PercentageTable(cells).is_filled());
    }

    #[test]
    fn local_file_detected_inside_project_rows() {
        let rows = vec![
            ProjectRow {
                name: "Plant A".into(),
                ..Default::default()
            },
            ProjectRow {
                name: "Plant B".into(),
                attachment: Some(FileHandle::local("plan.pdf", vec![1, 2, 3])),
                ..Default::default()
            },
        ];
        assert!(FieldValue::Composite(CompositeValue::ProjectTable(rows)).contains_local_file());
        assert!(!FieldValue::File(FileHandle::remote("https://cdn/x.pdf")).contains_local_file());
    }

    #[test]
    fn file_load_reads_bytes_and_basename() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("deck.pdf");
        std::fs::write(&path, b"%PDF-1.7 pitch").unwrap();

        let handle = FileHandle::load(&path).unwrap();
        match &handle {
            FileHandle::Local {
                file_name,
                content_type,
                bytes,
                ..
            } => {
                assert_eq!(file_name, "deck.pdf");
                assert_eq!(content_type, "application/pdf");
                assert_eq!(bytes.len(), 14);
            }
            other => panic!("expected Local, got {other:?}"),
        }
        assert!(FileHandle::load(dir.path().join("missing.pdf")).is_err());
    }

    #[test]
    fn path_only_files_load_relative_to_base() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/deck.pdf"), b"deck").unwrap();
        std::fs::write(dir.path().join("plan.pdf"), b"site plan").unwrap();

        let file = FieldDefinition::new("pitch_deck", "Deck", FieldType::File);
        let mut values = FormValues::new();
        values.insert(
            "pitch_deck",
            FieldValue::from_json(&file, &json!({ "path": "docs/deck.pdf" })),
        );
        values.insert(
            "projects",
            FieldValue::Composite(CompositeValue::ProjectTable(vec![ProjectRow {
                name: "Plant".into(),
                attachment: FileHandle::from_json(&json!({ "path": "plan.pdf" })),
                ..Default::default()
            }])),
        );
        values.insert("cert", FieldValue::File(FileHandle::local("cert.pdf", vec![9])));

        assert_eq!(values.load_files(dir.path()).unwrap(), 2);
        assert_eq!(values.get("pitch_deck").files()[0].file_name(), "deck.pdf");
        match values.get("pitch_deck") {
            FieldValue::File(FileHandle::Local { bytes, .. }) => assert_eq!(bytes, b"deck"),
            other => panic!("expected local file, got {other:?}"),
        }
        // Already-read files are left alone.
        assert_eq!(values.load_files(dir.path()).unwrap(), 0);
    }

    #[test]
    fn missing_path_only_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = FieldDefinition::new("pitch_deck", "Deck", FieldType::File);
        let mut values = FormValues::new();
        values.insert(
            "pitch_deck",
            FieldValue::from_json(&file, &json!({ "path": "nowhere.pdf" })),
        );
        assert!(values.load_files(dir.path()).is_err());
    }

    #[test]
    fn opaque_json_scanned_recursively_for_files() {
        let value = FieldValue::Composite(CompositeValue::Opaque(json!({
            "pages": [{ "scan": { "path": "./page1.png" } }]
        })));
        assert!(value.contains_local_file());
    }

    #[test]
    fn file_extension_from_remote_url() {
        let file = FileHandle::remote("https://files.example.com/docs/Cert.PDF");
        assert_eq!(file.file_name(), "Cert.PDF");
        assert_eq!(file.extension().as_deref(), Some("pdf"));
    }

    #[test]
    fn composite_currency_from_numeric_amount() {
        let field = FieldDefinition::composite(
            "investment",
            "Investment",
            crate::schema::WidgetKind::CurrencyAmount,
        );
        let value = FieldValue::from_json(&field, &json!({ "amount": 2500000, "currency": "usd" }));
        assert_eq!(
            value,
            FieldValue::Composite(CompositeValue::CurrencyAmount {
                amount: "2500000".into(),
                currency: "usd".into()
            })
        );
    }

    #[test]
    fn units_are_canonicalized() {
        assert_eq!(canonical_unit("sq ft"), Some("sqft"));
        assert_eq!(canonical_unit("Hectares"), Some("hectare"));
        assert_eq!(canonical_unit("MWp"), Some("MW"));
        assert_eq!(canonical_unit("furlongs"), None);
    }

    #[test]
    fn decimal_parsing_ignores_separators() {
        assert_eq!(parse_decimal("1,250,000.50").unwrap().to_string(), "1250000.50");
        assert_eq!(parse_decimal("1 042.5"), Some(rust_decimal_macros::dec!(1042.5)));
        assert!(parse_decimal("abc").is_none());
        assert!(parse_decimal("  ").is_none());
    }

    #[test]
    fn snapshot_serde_is_lossless() {
        let mut values = FormValues::new();
        values.insert("a", FieldValue::text("x"));
        values.insert(
            "b",
            FieldValue::AllowOther(AllowOtherValue::one("other").with_other("Fintech")),
        );
        values.insert("c", FieldValue::File(FileHandle::local("a.pdf", vec![9])));
        let json = serde_json::to_string(&values).unwrap();
        let parsed: FormValues = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, values);
    }
}
