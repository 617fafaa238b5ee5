//! Field definitions: the declarative unit of the form schema.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Stable identifier of a field within its phase.
pub type FieldKey = String;

/// Sentinel option value that activates free-text capture on allow-other fields.
pub const OTHER_SENTINEL: &str = "other";

/// Named sub-variant of a composite widget.
///
/// The generic engine never looks inside a composite value; each widget
/// owns its shape, its "filled" rule, and its outbound destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    /// Rows of `{name, location, capacity, status, attachment}`.
    ProjectTable,
    /// `{amount, currency}`.
    CurrencyAmount,
    /// `{size, unit}`.
    SizeWithUnit,
    /// Named shares that must total at most 100.
    PercentageTable,
    /// Named numeric indicators.
    Metrics,
    /// A single acknowledgment checkbox.
    Consent,
    /// A widget this engine build does not know about.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ProjectTable => "project-table",
            Self::CurrencyAmount => "currency-amount",
            Self::SizeWithUnit => "size-with-unit",
            Self::PercentageTable => "percentage-table",
            Self::Metrics => "metrics",
            Self::Consent => "consent",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// The input type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FieldType {
    ShortText,
    LongText,
    Date,
    SingleSelect,
    MultiSelectWithOther,
    RadioWithOther,
    GroupedTextMap,
    File,
    MultiFile,
    CompositeWidget { widget: WidgetKind },
    /// Forward-compatible catch-all: never validated, never mapped by type.
    #[serde(other)]
    Unknown,
}

impl FieldType {
    /// Whether values of this type are plain strings.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::ShortText | Self::LongText | Self::Date | Self::SingleSelect)
    }

    /// Whether this type carries file handles.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File | Self::MultiFile)
    }

    /// The composite widget this type wraps, if any.
    pub fn widget(&self) -> Option<WidgetKind> {
        match self {
            Self::CompositeWidget { widget } => Some(*widget),
            _ => None,
        }
    }
}

/// Optional constraints checked by the validation engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed file extensions, without the dot.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,
}

/// Target of a visibility condition: one value or a set of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionTarget {
    One(String),
    Many(Vec<String>),
}

impl ConditionTarget {
    /// Normalize to a set for membership tests.
    pub fn to_set(&self) -> BTreeSet<&str> {
        match self {
            Self::One(v) => std::iter::once(v.as_str()).collect(),
            Self::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// Show a field only when another field currently holds one of `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub depends_on: FieldKey,
    pub value: ConditionTarget,
    /// Set by the registry when `depends_on` names no field in the same
    /// phase. A dangling condition never matches.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dangling: bool,
}

/// Reference tables that back dynamic option lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicSource {
    Countries,
    Currencies,
}

/// A single selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Where a field's options come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsSource {
    Static(Vec<SelectOption>),
    Dynamic(DynamicSource),
}

/// One logical input unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub key: FieldKey,
    pub label: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default)]
    pub validation: ValidationRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionsSource>,
    #[serde(default)]
    pub allow_other: bool,
}

impl FieldDefinition {
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        let allow_other = matches!(
            field_type,
            FieldType::MultiSelectWithOther | FieldType::RadioWithOther
        );
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
            validation: ValidationRules::default(),
            condition: None,
            options: None,
            allow_other,
        }
    }

    pub fn short_text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, FieldType::ShortText)
    }

    pub fn long_text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, FieldType::LongText)
    }

    pub fn date(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, FieldType::Date)
    }

    pub fn composite(key: impl Into<String>, label: impl Into<String>, widget: WidgetKind) -> Self {
        Self::new(key, label, FieldType::CompositeWidget { widget })
    }

    pub fn required(mut self) -> Self {
        self.validation.required = true;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.validation.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.validation.max_length = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.validation.pattern = Some(pattern.into());
        self
    }

    pub fn file_types(mut self, types: &[&str]) -> Self {
        self.validation.file_types = types.iter().map(|t| t.to_ascii_lowercase()).collect();
        self
    }

    pub fn max_files(mut self, n: usize) -> Self {
        self.validation.max_files = Some(n);
        self
    }

    /// Make the field visible only when `depends_on` holds one of `values`.
    pub fn visible_when(mut self, depends_on: impl Into<String>, values: &[&str]) -> Self {
        let value = match values {
            [single] => ConditionTarget::One(single.to_string()),
            many => ConditionTarget::Many(many.iter().map(|v| v.to_string()).collect()),
        };
        self.condition = Some(Condition {
            depends_on: depends_on.into(),
            value,
            dangling: false,
        });
        self
    }

    pub fn static_options(mut self, options: &[(&str, &str)]) -> Self {
        self.options = Some(OptionsSource::Static(
            options
                .iter()
                .map(|(label, value)| SelectOption::new(*label, *value))
                .collect(),
        ));
        self
    }

    pub fn dynamic_options(mut self, source: DynamicSource) -> Self {
        self.options = Some(OptionsSource::Dynamic(source));
        self
    }

    pub fn allow_other(mut self) -> Self {
        self.allow_other = true;
        self
    }
}
