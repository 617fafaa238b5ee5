//! Reference tables for dynamic option sources (countries, currencies).
//!
//! Unsupported entries stay in the option list, flagged `disabled`, so the
//! renderer can show them greyed out.

use serde::{Deserialize, Serialize};

use super::field::{DynamicSource, OptionsSource};

/// One row of a reference table, keyed by a stable code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub code: String,
    pub label: String,
    #[serde(default = "default_supported")]
    pub is_supported: bool,
}

fn default_supported() -> bool {
    true
}

/// An option ready for a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOption {
    pub label: String,
    pub value: String,
    pub disabled: bool,
}

/// Lookup tables for every dynamic source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub countries: Vec<ReferenceEntry>,
    pub currencies: Vec<ReferenceEntry>,
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self {
            countries: table(&[
                ("KE", "Kenya", true),
                ("NG", "Nigeria", true),
                ("GH", "Ghana", true),
                ("ZA", "South Africa", true),
                ("EG", "Egypt", true),
                ("MA", "Morocco", true),
                ("RW", "Rwanda", true),
                ("UG", "Uganda", true),
                ("TZ", "Tanzania", true),
                ("ET", "Ethiopia", false),
                ("SN", "Senegal", true),
                ("CI", "Côte d'Ivoire", true),
                ("GB", "United Kingdom", true),
                ("US", "United States", true),
                ("FR", "France", true),
                ("DE", "Germany", true),
                ("SD", "Sudan", false),
                ("SO", "Somalia", false),
            ]),
            currencies: table(&[
                ("USD", "US Dollar", true),
                ("EUR", "Euro", true),
                ("GBP", "Pound Sterling", true),
                ("KES", "Kenyan Shilling", true),
                ("NGN", "Nigerian Naira", true),
                ("GHS", "Ghanaian Cedi", true),
                ("ZAR", "South African Rand", true),
                ("EGP", "Egyptian Pound", false),
                ("XOF", "West African CFA Franc", true),
                ("ETB", "Ethiopian Birr", false),
            ]),
        }
    }
}

fn table(rows: &[(&str, &str, bool)]) -> Vec<ReferenceEntry> {
    rows.iter()
        .map(|(code, label, is_supported)| ReferenceEntry {
            code: code.to_string(),
            label: label.to_string(),
            is_supported: *is_supported,
        })
        .collect()
}

impl ReferenceData {
    /// Load tables fetched from a remote source.
    ///
    /// Expects `{"countries": [...], "currencies": [...]}`; a missing table
    /// falls back to the built-in one.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let defaults = Self::default();
        let countries = match value.get("countries") {
            Some(v) => serde_json::from_value(v.clone())?,
            None => defaults.countries,
        };
        let currencies = match value.get("currencies") {
            Some(v) => serde_json::from_value(v.clone())?,
            None => defaults.currencies,
        };
        Ok(Self {
            countries,
            currencies,
        })
    }

    pub fn table(&self, source: DynamicSource) -> &[ReferenceEntry] {
        match source {
            DynamicSource::Countries => &self.countries,
            DynamicSource::Currencies => &self.currencies,
        }
    }

    pub fn lookup(&self, source: DynamicSource, code: &str) -> Option<&ReferenceEntry> {
        self.table(source)
            .iter()
            .find(|e| e.code.eq_ignore_ascii_case(code))
    }

    /// Resolve an options source into the list a renderer shows.
    pub fn resolve(&self, options: &OptionsSource) -> Vec<ResolvedOption> {
        match options {
            OptionsSource::Static(list) => list
                .iter()
                .map(|o| ResolvedOption {
                    label: o.label.clone(),
                    value: o.value.clone(),
                    disabled: false,
                })
                .collect(),
            OptionsSource::Dynamic(source) => self
                .table(*source)
                .iter()
                .map(|e| ResolvedOption {
                    label: e.label.clone(),
                    value: e.code.clone(),
                    disabled: !e.is_supported,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::SelectOption;

    #[test]
    fn unsupported_entries_are_disabled_not_removed() {
        let data = ReferenceData::default();
        let resolved = data.resolve(&OptionsSource::Dynamic(DynamicSource::Countries));
        assert_eq!(resolved.len(), data.countries.len());
        let sudan = resolved.iter().find(|o| o.value == "SD").unwrap();
        assert!(sudan.disabled);
        let kenya = resolved.iter().find(|o| o.value == "KE").unwrap();
        assert!(!kenya.disabled);
    }

    #[test]
    fn static_options_are_never_disabled() {
        let data = ReferenceData::default();
        let resolved = data.resolve(&OptionsSource::Static(vec![SelectOption::new("Yes", "yes")]));
        assert_eq!(resolved.len(), 1);
        assert!(!resolved[0].disabled);
    }

    #[test]
    fn from_json_overrides_one_table() {
        let json = serde_json::json!({
            "currencies": [
                { "code": "USD", "label": "Dollar" },
                { "code": "JPY", "label": "Yen", "is_supported": false }
            ]
        });
        let data = ReferenceData::from_json(&json).unwrap();
        assert_eq!(data.currencies.len(), 2);
        assert!(data.currencies[0].is_supported);
        assert!(!data.lookup(DynamicSource::Currencies, "jpy").unwrap().is_supported);
        assert_eq!(data.countries, ReferenceData::default().countries);
    }
}
