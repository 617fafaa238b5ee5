//! The outbound payload and its wire encoding.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TransformError;
use crate::form::FormValues;

/// How a payload travels over the wire. Chosen once per payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WireEncoding {
    /// A single JSON document.
    Json,
    /// `multipart/form-data`, needed as soon as any local file is attached.
    Multipart,
}

impl std::fmt::Display for WireEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::Multipart => "multipart",
        };
        write!(f, "{s}")
    }
}

/// A local file carried as its own multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Backend field name of the part.
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Backend-shaped payload for one step save.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiPayload {
    pub fields: Map<String, Value>,
    pub files: Vec<FilePart>,
    pub encoding: WireEncoding,
    /// Coercions that fell back to a default value.
    pub warnings: Vec<TransformError>,
}

impl ApiPayload {
    pub fn new(encoding: WireEncoding) -> Self {
        Self {
            fields: Map::new(),
            files: Vec::new(),
            encoding,
            warnings: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// The JSON document sent under [`WireEncoding::Json`].
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Non-file fields as multipart text parts. Strings are sent as-is,
    /// everything else as its JSON text.
    pub fn text_parts(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), text)
            })
            .collect()
    }
}

/// Scan every value, recursing into lists and composite payloads, for a
/// file picked on this device.
pub fn detect_encoding(values: &FormValues) -> WireEncoding {
    if values.iter().any(|(_, v)| v.contains_local_file()) {
        WireEncoding::Multipart
    } else {
        WireEncoding::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{CompositeValue, FieldValue, FileHandle, ProjectRow};

    #[test]
    fn remote_files_stay_json() {
        let mut values = FormValues::new();
        values.insert("cert", FieldValue::File(FileHandle::remote("https://cdn/cert.pdf")));
        assert_eq!(detect_encoding(&values), WireEncoding::Json);
    }

    #[test]
    fn nested_local_file_forces_multipart() {
        let mut values = FormValues::new();
        values.insert("name", FieldValue::text("Acme"));
        values.insert(
            "projects",
            FieldValue::Composite(CompositeValue::ProjectTable(vec![ProjectRow {
                name: "Plant".into(),
                attachment: Some(FileHandle::local("site.pdf", vec![1])),
                ..Default::default()
            }])),
        );
        assert_eq!(detect_encoding(&values), WireEncoding::Multipart);
    }

    #[test]
    fn text_parts_stringify_non_strings() {
        let mut payload = ApiPayload::new(WireEncoding::Multipart);
        payload.fields.insert("name".into(), Value::String("Acme".into()));
        payload.fields.insert("employees".into(), Value::from(12));
        payload.fields.insert("sectors".into(), serde_json::json!(["solar"]));
        let parts = payload.text_parts();
        assert!(parts.contains(&("name".to_string(), "Acme".to_string())));
        assert!(parts.contains(&("employees".to_string(), "12".to_string())));
        assert!(parts.contains(&("sectors".to_string(), "[\"solar\"]".to_string())));
    }
}
