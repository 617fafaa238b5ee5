//! Validation engine: per-field rules and per-section aggregation.
//!
//! Validation never fails: a missing rule means no check, an unknown field
//! type is always valid, and an uncompilable pattern is logged and skipped.
//!
//! Per field, first match wins:
//! 1. hidden fields are skipped entirely;
//! 2. `required` on an empty value;
//! 3. text rules: `min_length`, then `max_length`, then `pattern`;
//!    allow-other "other" without free text; file type and count rules;
//! 4. composite widgets: widget "filled" rule for `required`, then the
//!    widget's own consistency checks.

use std::collections::BTreeMap;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::schema::{FieldDefinition, FieldType, Section, ValidationRules};

use super::value::{
    AllowOtherValue, CompositeValue, FieldValue, FormValues, ProjectRow, canonical_unit,
    parse_decimal,
};
use super::visibility::is_visible;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const PATTERN_MESSAGE: &str = "Invalid format";
pub const SPECIFY_OTHER_MESSAGE: &str = "Please specify";
pub const FILE_TYPE_MESSAGE: &str = "File type not allowed";

/// `{ field key → error message }` for one section. An absent key passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult(BTreeMap<String, String>);

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// A section is valid iff its result is empty.
    pub fn is_valid(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.insert(key.into(), message.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge another result in; entries from `other` win on conflict.
    pub fn merge(&mut self, other: ValidationResult) {
        self.0.extend(other.0);
    }
}

impl FromIterator<(String, String)> for ValidationResult {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Validate every visible field of a section.
pub fn validate_section(section: &Section, values: &FormValues) -> ValidationResult {
    section
        .fields
        .iter()
        .filter(|field| is_visible(field, values))
        .filter_map(|field| {
            validate_field(field, values.get(&field.key)).map(|msg| (field.key.clone(), msg))
        })
        .collect()
}

/// Validate one value against its field definition, ignoring visibility.
pub fn validate_field(field: &FieldDefinition, value: &FieldValue) -> Option<String> {
    if field.field_type == FieldType::Unknown {
        return None;
    }
    let rules = &field.validation;

    if rules.required && value.is_empty() {
        return Some(REQUIRED_MESSAGE.to_string());
    }
    if value.is_empty() {
        return None;
    }

    match value {
        FieldValue::Text(text) => check_text(&field.key, text, rules),
        FieldValue::AllowOther(choice) => check_allow_other(choice),
        FieldValue::File(_) | FieldValue::Files(_) => check_files(value, rules),
        FieldValue::Composite(composite) => {
            if rules.required && !composite.is_filled() {
                return Some(REQUIRED_MESSAGE.to_string());
            }
            if !composite.is_filled() {
                return None;
            }
            check_composite(composite)
        }
        FieldValue::Empty
        | FieldValue::Bool(_)
        | FieldValue::List(_)
        | FieldValue::TextMap(_) => None,
    }
}

fn check_text(key: &str, text: &str, rules: &ValidationRules) -> Option<String> {
    let length = text.chars().count();
    if let Some(min) = rules.min_length {
        if length < min {
            return Some(format!("Minimum {min} characters required"));
        }
    }
    if let Some(max) = rules.max_length {
        if length > max {
            return Some(format!("Maximum {max} characters allowed"));
        }
    }
    if let Some(pattern) = &rules.pattern {
        match Regex::new(pattern) {
            Ok(regex) if !regex.is_match(text) => return Some(PATTERN_MESSAGE.to_string()),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    field = %key,
                    pattern = %pattern,
                    error = %e,
                    "Skipping invalid pattern"
                );
            }
        }
    }
    None
}

fn check_allow_other(choice: &AllowOtherValue) -> Option<String> {
    if choice.other_selected() && choice.other_value.trim().is_empty() {
        return Some(SPECIFY_OTHER_MESSAGE.to_string());
    }
    None
}

fn check_files(value: &FieldValue, rules: &ValidationRules) -> Option<String> {
    let files = value.files();
    if !rules.file_types.is_empty() {
        let all_allowed = files.iter().all(|file| {
            file.extension()
                .is_some_and(|ext| rules.file_types.iter().any(|t| t.eq_ignore_ascii_case(&ext)))
        });
        if !all_allowed {
            return Some(FILE_TYPE_MESSAGE.to_string());
        }
    }
    if let Some(max) = rules.max_files {
        if files.len() > max {
            return Some(format!("Maximum {max} files allowed"));
        }
    }
    None
}

fn check_composite(composite: &CompositeValue) -> Option<String> {
    match composite {
        CompositeValue::CurrencyAmount { amount, currency } => {
            match parse_decimal(amount) {
                Some(n) if n >= Decimal::ZERO => {}
                _ => return Some("Enter a valid amount".to_string()),
            }
            if currency.trim().is_empty() {
                return Some("Select a currency".to_string());
            }
            None
        }
        CompositeValue::SizeWithUnit { size, unit } => {
            match parse_decimal(size) {
                Some(n) if n >= Decimal::ZERO => {}
                _ => return Some("Enter a valid size".to_string()),
            }
            if canonical_unit(unit).is_none() {
                return Some("Select a unit".to_string());
            }
            None
        }
        CompositeValue::PercentageTable(cells) => check_percentages(cells),
        CompositeValue::Metrics(cells) => {
            let all_numeric = cells
                .values()
                .filter(|v| !v.trim().is_empty())
                .all(|v| parse_decimal(v).is_some());
            if all_numeric {
                None
            } else {
                Some("Metrics must be numeric".to_string())
            }
        }
        CompositeValue::ProjectTable(rows) => check_project_rows(rows),
        CompositeValue::Consent(_) | CompositeValue::Opaque(_) => None,
    }
}

fn check_percentages(cells: &BTreeMap<String, String>) -> Option<String> {
    let mut total = Decimal::ZERO;
    for raw in cells.values().filter(|v| !v.trim().is_empty()) {
        match parse_decimal(raw.trim_end_matches('%')) {
            Some(n) if n >= Decimal::ZERO => total += n,
            _ => return Some("Percentages must be numbers".to_string()),
        }
    }
    if total > Decimal::ONE_HUNDRED {
        return Some("Percentages cannot exceed 100% in total".to_string());
    }
    None
}

fn check_project_rows(rows: &[ProjectRow]) -> Option<String> {
    if rows.iter().any(|r| r.name.trim().is_empty()) {
        return Some("Each project needs a name".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::value::FileHandle;
    use crate::schema::{FieldDefinition, FieldType, Section, WidgetKind};

    fn text_field() -> FieldDefinition {
        FieldDefinition::short_text("name", "Name").required().min_length(5)
    }

    #[test]
    fn required_then_min_length_then_ok() {
        let field = text_field();
        assert_eq!(
            validate_field(&field, &FieldValue::text("")).as_deref(),
            Some("This field is required")
        );
        assert_eq!(
            validate_field(&field, &FieldValue::text("ok")).as_deref(),
            Some("Minimum 5 characters required")
        );
        assert_eq!(validate_field(&field, &FieldValue::text("ok ok ok")), None);
    }

    #[test]
    fn only_first_text_rule_surfaces() {
        let field = FieldDefinition::short_text("code", "Code")
            .min_length(3)
            .max_length(4)
            .pattern("^[0-9]+$");
        assert_eq!(
            validate_field(&field, &FieldValue::text("ab")).as_deref(),
            Some("Minimum 3 characters required")
        );
        assert_eq!(
            validate_field(&field, &FieldValue::text("abcdef")).as_deref(),
            Some("Maximum 4 characters allowed")
        );
        assert_eq!(
            validate_field(&field, &FieldValue::text("abc")).as_deref(),
            Some(PATTERN_MESSAGE)
        );
        assert_eq!(validate_field(&field, &FieldValue::text("123")), None);
    }

    #[test]
    fn optional_empty_field_passes_other_rules() {
        let field = FieldDefinition::short_text("site", "Site").pattern("^https?://");
        assert_eq!(validate_field(&field, &FieldValue::Empty), None);
        assert_eq!(validate_field(&field, &FieldValue::text("")), None);
    }

    #[test]
    fn invalid_pattern_is_skipped() {
        let field = FieldDefinition::short_text("x", "X").pattern("([unclosed");
        assert_eq!(validate_field(&field, &FieldValue::text("anything")), None);
    }

    #[test]
    fn unknown_type_always_valid() {
        let mut field = FieldDefinition::new("sig", "Signature", FieldType::Unknown);
        field.validation.required = true;
        assert_eq!(validate_field(&field, &FieldValue::Empty), None);
    }

    #[test]
    fn other_requires_free_text() {
        let field =
            FieldDefinition::new("industry", "Industry", FieldType::RadioWithOther).required();
        let value = FieldValue::AllowOther(AllowOtherValue::one("other"));
        assert_eq!(validate_field(&field, &value).as_deref(), Some(SPECIFY_OTHER_MESSAGE));
        let value = FieldValue::AllowOther(AllowOtherValue::one("other").with_other("Fintech"));
        assert_eq!(validate_field(&field, &value), None);
    }

    #[test]
    fn file_rules() {
        let field = FieldDefinition::new("docs", "Docs", FieldType::MultiFile)
            .file_types(&["pdf"])
            .max_files(1);
        let wrong_type = FieldValue::Files(vec![FileHandle::local("photo.gif", vec![])]);
        assert_eq!(validate_field(&field, &wrong_type).as_deref(), Some(FILE_TYPE_MESSAGE));
        let too_many = FieldValue::Files(vec![
            FileHandle::local("a.pdf", vec![]),
            FileHandle::local("b.PDF", vec![]),
        ]);
        assert_eq!(
            validate_field(&field, &too_many).as_deref(),
            Some("Maximum 1 files allowed")
        );
    }

    #[test]
    fn required_consent_must_be_true() {
        let field = FieldDefinition::composite("terms", "Terms", WidgetKind::Consent).required();
        let unchecked = FieldValue::Composite(CompositeValue::Consent(false));
        assert_eq!(validate_field(&field, &unchecked).as_deref(), Some(REQUIRED_MESSAGE));
        let checked = FieldValue::Composite(CompositeValue::Consent(true));
        assert_eq!(validate_field(&field, &checked), None);
    }

    #[test]
    fn currency_amount_checks() {
        let field =
            FieldDefinition::composite("rev", "Revenue", WidgetKind::CurrencyAmount).required();
        let bad = FieldValue::Composite(CompositeValue::CurrencyAmount {
            amount: "lots".into(),
            currency: "USD".into(),
        });
        assert_eq!(validate_field(&field, &bad).as_deref(), Some("Enter a valid amount"));
        let no_currency = FieldValue::Composite(CompositeValue::CurrencyAmount {
            amount: "1,000".into(),
            currency: "".into(),
        });
        assert_eq!(validate_field(&field, &no_currency).as_deref(), Some("Select a currency"));
    }

    #[test]
    fn percentage_table_total_capped() {
        let field = FieldDefinition::composite("split", "Split", WidgetKind::PercentageTable);
        let mut cells = BTreeMap::new();
        cells.insert("founders".to_string(), "70".to_string());
        cells.insert("investors".to_string(), "40%".to_string());
        let value = FieldValue::Composite(CompositeValue::PercentageTable(cells));
        assert_eq!(
            validate_field(&field, &value).as_deref(),
            Some("Percentages cannot exceed 100% in total")
        );
    }

    #[test]
    fn project_rows_need_names() {
        let field = FieldDefinition::composite("projects", "Projects", WidgetKind::ProjectTable);
        let rows = vec![ProjectRow::default()];
        let value = FieldValue::Composite(CompositeValue::ProjectTable(rows));
        assert_eq!(
            validate_field(&field, &value).as_deref(),
            Some("Each project needs a name")
        );
    }

    #[test]
    fn hiding_a_field_removes_its_error() {
        let section = Section::new("s", "S")
            .field(FieldDefinition::new("b", "B", FieldType::SingleSelect))
            .field(
                FieldDefinition::short_text("a", "A")
                    .required()
                    .visible_when("b", &["x", "y"]),
            );
        let mut values = FormValues::new();
        values.insert("b", FieldValue::text("x"));
        let result = validate_section(&section, &values);
        assert_eq!(result.get("a"), Some(REQUIRED_MESSAGE));

        values.insert("b", FieldValue::text("z"));
        let result = validate_section(&section, &values);
        assert!(result.get("a").is_none());
        assert!(result.is_valid());
    }

    #[test]
    fn merge_prefers_incoming_entries() {
        let mut local = ValidationResult::new();
        local.insert("a", "local");
        local.insert("b", "local");
        let mut server = ValidationResult::new();
        server.insert("b", "server");
        local.merge(server);
        assert_eq!(local.get("a"), Some("local"));
        assert_eq!(local.get("b"), Some("server"));
    }
}
