//! Declared key-rename table between frontend field keys and backend
//! payload keys, with the coercion each entry needs.

/// How a frontend value becomes backend fields, and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// String passed through, trimmed.
    Text,
    /// Reference code (country, currency), upper-cased.
    Code,
    /// Normalized to `YYYY-MM-DD`.
    Date,
    /// `"yes"` / `"no"` become booleans.
    YesNo,
    /// Parsed as a whole number, `0` on failure.
    Integer,
    /// Parsed as a decimal number, `0` on failure.
    Float,
    /// Grouped text map emitted as an object.
    Object,
    /// Selection under the main key, free text under `other_key`.
    AllowOther { other_key: &'static str },
    /// Single file: remote URL inline, local file as a multipart part.
    File,
    /// File list, split the same way as [`Coercion::File`].
    Files,
    /// Amount (2 dp) under the main key, upper-cased code under `currency_key`.
    CurrencyAmount { currency_key: &'static str },
    /// Numeric size under the main key, canonical unit under `unit_key`.
    SizeWithUnit { unit_key: &'static str },
    /// Named cells spread into one numeric backend field each, plus an
    /// optional computed total. The main key itself is never emitted, and
    /// these fields are not rehydrated on the way back in.
    Destructure {
        columns: &'static [(&'static str, &'static str)],
        total_key: Option<&'static str>,
    },
    /// Project table rows emitted as an array of objects.
    Rows,
    /// Boolean acknowledgment.
    Consent,
}

impl Coercion {
    /// Whether `from_api_payload(to_api_payload(v)) == v` holds for this
    /// entry given canonical input.
    pub fn round_trips(&self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::Code
                | Self::Date
                | Self::YesNo
                | Self::Integer
                | Self::Float
                | Self::Object
                | Self::AllowOther { .. }
                | Self::Consent
        )
    }

    /// Backend keys written in addition to the main one.
    pub fn auxiliary_keys(&self) -> Vec<&'static str> {
        match self {
            Self::AllowOther { other_key } => vec![*other_key],
            Self::CurrencyAmount { currency_key } => vec![*currency_key],
            Self::SizeWithUnit { unit_key } => vec![*unit_key],
            Self::Destructure { columns, total_key } => columns
                .iter()
                .map(|(_, backend)| *backend)
                .chain(total_key.iter().copied())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub frontend_key: &'static str,
    pub backend_key: &'static str,
    pub coercion: Coercion,
}

const fn map(
    frontend_key: &'static str,
    backend_key: &'static str,
    coercion: Coercion,
) -> FieldMapping {
    FieldMapping {
        frontend_key,
        backend_key,
        coercion,
    }
}

const OWNERSHIP_COLUMNS: &[(&str, &str)] = &[
    ("founders", "founder_equity_pct"),
    ("investors", "investor_equity_pct"),
    ("employees", "employee_equity_pct"),
    ("other", "other_equity_pct"),
];

const METRIC_COLUMNS: &[(&str, &str)] = &[
    ("irr", "irr_pct"),
    ("npv", "npv"),
    ("payback_years", "payback_period_years"),
    ("jobs_created", "jobs_created"),
];

const ONBOARDING: &[FieldMapping] = &[
    // Business information
    map("company_name", "company_name", Coercion::Text),
    map("registration_number", "registration_no", Coercion::Text),
    map("incorporation_date", "date_of_incorporation", Coercion::Date),
    map("country_of_incorporation", "country_of_incorporation", Coercion::Code),
    map("industry", "industry", Coercion::AllowOther { other_key: "industry_other" }),
    map("website", "website", Coercion::Text),
    map("employee_count", "number_of_employees", Coercion::Integer),
    map(
        "annual_revenue",
        "annual_revenue",
        Coercion::CurrencyAmount { currency_key: "annual_revenue_currency" },
    ),
    map("has_subsidiaries", "has_subsidiaries", Coercion::YesNo),
    map("subsidiary_details", "subsidiary_details", Coercion::Text),
    map("office_size", "office_size", Coercion::SizeWithUnit { unit_key: "office_size_unit" }),
    map(
        "operating_countries",
        "operating_countries",
        Coercion::AllowOther { other_key: "operating_countries_other" },
    ),
    map("incorporation_certificate", "certificate_of_incorporation", Coercion::File),
    map("financial_statements", "financial_statements", Coercion::Files),
    map("tax_clearance", "tax_clearance_certificate", Coercion::File),
    // Legal representative
    map("rep_first_name", "first_name", Coercion::Text),
    map("rep_last_name", "last_name", Coercion::Text),
    map("rep_position", "position", Coercion::Text),
    map("rep_email", "email", Coercion::Text),
    map("rep_phone", "phone_number", Coercion::Text),
    map("rep_date_of_birth", "date_of_birth", Coercion::Date),
    map("rep_address", "address", Coercion::Object),
    map("rep_id_document", "id_document", Coercion::File),
    map("is_pep", "is_politically_exposed", Coercion::YesNo),
    map("pep_details", "pep_details", Coercion::Text),
    // Project upload
    map("project_name", "project_name", Coercion::Text),
    map("project_sector", "sectors", Coercion::AllowOther { other_key: "sectors_other" }),
    map(
        "project_stage",
        "development_stage",
        Coercion::AllowOther { other_key: "development_stage_other" },
    ),
    map("project_capacity", "capacity", Coercion::SizeWithUnit { unit_key: "capacity_unit" }),
    map("project_description", "description", Coercion::Text),
    map(
        "investment_required",
        "investment_amount",
        Coercion::CurrencyAmount { currency_key: "investment_currency" },
    ),
    map("funding_currency", "funding_currency", Coercion::Code),
    map(
        "ownership_split",
        "ownership_split",
        Coercion::Destructure {
            columns: OWNERSHIP_COLUMNS,
            total_key: Some("total_equity_pct"),
        },
    ),
    map(
        "financial_metrics",
        "financial_metrics",
        Coercion::Destructure {
            columns: METRIC_COLUMNS,
            total_key: None,
        },
    ),
    map("project_portfolio", "projects", Coercion::Rows),
    map("pitch_deck", "pitch_deck", Coercion::File),
    map("terms_accepted", "terms_accepted", Coercion::Consent),
];

/// Lookup over a fixed list of [`FieldMapping`]s.
#[derive(Debug, Clone)]
pub struct MappingTable {
    entries: Vec<FieldMapping>,
}

impl MappingTable {
    pub fn new(entries: Vec<FieldMapping>) -> Self {
        Self { entries }
    }

    /// The table for the built-in onboarding schema.
    pub fn onboarding() -> Self {
        Self::new(ONBOARDING.to_vec())
    }

    pub fn entries(&self) -> &[FieldMapping] {
        &self.entries
    }

    pub fn by_frontend(&self, key: &str) -> Option<&FieldMapping> {
        self.entries.iter().find(|m| m.frontend_key == key)
    }

    pub fn by_backend(&self, key: &str) -> Option<&FieldMapping> {
        self.entries.iter().find(|m| m.backend_key == key)
    }

    /// Frontend key owning a backend key, including auxiliary keys such as
    /// a currency column or a destructured cell.
    pub fn frontend_key_for(&self, backend_key: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|m| {
                m.backend_key == backend_key
                    || m.coercion.auxiliary_keys().iter().any(|k| *k == backend_key)
            })
            .map(|m| m.frontend_key)
    }
}
