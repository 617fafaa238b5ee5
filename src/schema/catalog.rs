//! The onboarding wizard: business information, legal representative, and
//! project upload.

use crate::error::SchemaError;

use super::field::{DynamicSource, FieldDefinition, FieldType, WidgetKind};
use super::registry::{Phase, SchemaRegistry, Section};

pub const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$";
pub const PHONE_PATTERN: &str = r"^\+?[0-9 ()\-]{7,20}$";
pub const REGISTRATION_PATTERN: &str = r"^[A-Za-z0-9/\-]{4,30}$";
pub const URL_PATTERN: &str = r"^https?://\S+$";
pub const DIGITS_PATTERN: &str = r"^[0-9]+$";

const YES_NO: &[(&str, &str)] = &[("Yes", "yes"), ("No", "no")];

/// Build the registry for the full onboarding wizard.
pub fn onboarding_schema() -> Result<SchemaRegistry, SchemaError> {
    SchemaRegistry::new(vec![
        business_information(),
        legal_representative(),
        project_upload(),
    ])
}

fn single_select(key: &str, label: &str) -> FieldDefinition {
    FieldDefinition::new(key, label, FieldType::SingleSelect)
}

fn business_information() -> Phase {
    Phase::new("business-information", "Business information")
        .section(
            Section::new("company_details", "Company details")
                .step(1)
                .field(
                    FieldDefinition::short_text("company_name", "Registered company name")
                        .required()
                        .min_length(2)
                        .max_length(120),
                )
                .field(
                    FieldDefinition::short_text("registration_number", "Registration number")
                        .required()
                        .pattern(REGISTRATION_PATTERN),
                )
                .field(
                    FieldDefinition::date("incorporation_date", "Date of incorporation").required(),
                )
                .field(
                    single_select("country_of_incorporation", "Country of incorporation")
                        .required()
                        .dynamic_options(DynamicSource::Countries),
                )
                .field(
                    FieldDefinition::new("industry", "Industry", FieldType::RadioWithOther)
                        .required()
                        .static_options(&[
                            ("Energy", "energy"),
                            ("Agriculture", "agriculture"),
                            ("Manufacturing", "manufacturing"),
                            ("Technology", "technology"),
                            ("Other", "other"),
                        ]),
                )
                .field(FieldDefinition::short_text("website", "Website").pattern(URL_PATTERN)),
        )
        .section(
            Section::new("operations", "Operations")
                .step(2)
                .field(
                    FieldDefinition::short_text("employee_count", "Number of employees")
                        .required()
                        .pattern(DIGITS_PATTERN),
                )
                .field(
                    FieldDefinition::composite(
                        "annual_revenue",
                        "Annual revenue",
                        WidgetKind::CurrencyAmount,
                    )
                    .required(),
                )
                .field(
                    single_select("has_subsidiaries", "Does the company have subsidiaries?")
                        .required()
                        .static_options(YES_NO),
                )
                .field(
                    FieldDefinition::long_text("subsidiary_details", "Describe your subsidiaries")
                        .required()
                        .max_length(2000)
                        .visible_when("has_subsidiaries", &["yes"]),
                )
                .field(FieldDefinition::composite(
                    "office_size",
                    "Office size",
                    WidgetKind::SizeWithUnit,
                ))
                .field(
                    FieldDefinition::new(
                        "operating_countries",
                        "Countries of operation",
                        FieldType::MultiSelectWithOther,
                    )
                    .dynamic_options(DynamicSource::Countries),
                ),
        )
        .section(
            Section::new("company_documents", "Company documents")
                .step(3)
                .congrats("Business information complete. Next: your legal representative.")
                .field(
                    FieldDefinition::new(
                        "incorporation_certificate",
                        "Certificate of incorporation",
                        FieldType::File,
                    )
                    .required()
                    .file_types(&["pdf", "jpg", "png"]),
                )
                .field(
                    FieldDefinition::new(
                        "financial_statements",
                        "Audited financial statements",
                        FieldType::MultiFile,
                    )
                    .max_files(5)
                    .file_types(&["pdf", "xlsx"]),
                )
                .field(
                    FieldDefinition::new(
                        "tax_clearance",
                        "Tax clearance certificate",
                        FieldType::File,
                    )
                    .file_types(&["pdf"]),
                ),
        )
}

fn legal_representative() -> Phase {
    Phase::new("legal-representative", "Legal representative")
        .section(
            Section::new("representative_details", "Representative details")
                .step(1)
                .field(
                    FieldDefinition::short_text("rep_first_name", "First name")
                        .required()
                        .max_length(60),
                )
                .field(
                    FieldDefinition::short_text("rep_last_name", "Last name")
                        .required()
                        .max_length(60),
                )
                .field(FieldDefinition::short_text("rep_position", "Position / title").required())
                .field(
                    FieldDefinition::short_text("rep_email", "Email address")
                        .required()
                        .pattern(EMAIL_PATTERN),
                )
                .field(
                    FieldDefinition::short_text("rep_phone", "Phone number").pattern(PHONE_PATTERN),
                )
                .field(FieldDefinition::date("rep_date_of_birth", "Date of birth")),
        )
        .section(
            Section::new("representative_verification", "Address and identity")
                .step(2)
                .congrats("Legal representative saved. Last stop: your project.")
                .field(
                    FieldDefinition::new(
                        "rep_address",
                        "Residential address",
                        FieldType::GroupedTextMap,
                    )
                    .required()
                    .static_options(&[
                        ("Street", "street"),
                        ("City", "city"),
                        ("Postal code", "postal_code"),
                        ("Country", "country"),
                    ]),
                )
                .field(
                    FieldDefinition::new(
                        "rep_id_document",
                        "Passport or national ID",
                        FieldType::File,
                    )
                    .required()
                    .file_types(&["pdf", "jpg", "png"]),
                )
                .field(
                    single_select("is_pep", "Is the representative a politically exposed person?")
                        .required()
                        .static_options(YES_NO),
                )
                .field(
                    FieldDefinition::long_text("pep_details", "Describe the public function held")
                        .required()
                        .visible_when("is_pep", &["yes"]),
                ),
        )
}

fn project_upload() -> Phase {
    Phase::new("project-upload", "Project upload")
        .section(
            Section::new("project_overview", "Project overview")
                .step(1)
                .field(
                    FieldDefinition::short_text("project_name", "Project name")
                        .required()
                        .max_length(150),
                )
                .field(
                    FieldDefinition::new(
                        "project_sector",
                        "Sector",
                        FieldType::MultiSelectWithOther,
                    )
                    .required()
                    .static_options(&[
                        ("Solar", "solar"),
                        ("Wind", "wind"),
                        ("Hydro", "hydro"),
                        ("Agriculture", "agriculture"),
                        ("Other", "other"),
                    ]),
                )
                .field(
                    FieldDefinition::new(
                        "project_stage",
                        "Development stage",
                        FieldType::RadioWithOther,
                    )
                    .required()
                    .static_options(&[
                        ("Concept", "concept"),
                        ("Feasibility", "feasibility"),
                        ("Construction", "construction"),
                        ("Operational", "operational"),
                        ("Other", "other"),
                    ]),
                )
                .field(
                    FieldDefinition::composite(
                        "project_capacity",
                        "Installed capacity",
                        WidgetKind::SizeWithUnit,
                    )
                    .required()
                    .visible_when("project_sector", &["solar", "wind", "hydro"]),
                )
                .field(
                    FieldDefinition::long_text("project_description", "Project description")
                        .required()
                        .min_length(50)
                        .max_length(5000),
                ),
        )
        .section(
            Section::new("project_financials", "Financials")
                .step(2)
                .field(
                    FieldDefinition::composite(
                        "investment_required",
                        "Investment required",
                        WidgetKind::CurrencyAmount,
                    )
                    .required(),
                )
                .field(
                    single_select("funding_currency", "Preferred funding currency")
                        .required()
                        .dynamic_options(DynamicSource::Currencies),
                )
                .field(
                    FieldDefinition::composite(
                        "ownership_split",
                        "Ownership structure",
                        WidgetKind::PercentageTable,
                    )
                    .required(),
                )
                .field(FieldDefinition::composite(
                    "financial_metrics",
                    "Key financial metrics",
                    WidgetKind::Metrics,
                )),
        )
        .section(
            Section::new("project_portfolio", "Portfolio and submission")
                .step(3)
                .congrats("Your project has been submitted for review.")
                .field(FieldDefinition::composite(
                    "project_portfolio",
                    "Other projects in your portfolio",
                    WidgetKind::ProjectTable,
                ))
                .field(
                    FieldDefinition::new("pitch_deck", "Pitch deck", FieldType::File)
                        .file_types(&["pdf", "pptx"]),
                )
                .field(
                    FieldDefinition::composite(
                        "terms_accepted",
                        "I accept the terms",
                        WidgetKind::Consent,
                    )
                    .required(),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_builds_and_has_three_phases() {
        let registry = onboarding_schema().unwrap();
        let slugs: Vec<&str> = registry.phases().iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec!["business-information", "legal-representative", "project-upload"]
        );
    }

    #[test]
    fn catalog_has_no_dangling_conditions() {
        let registry = onboarding_schema().unwrap();
        assert!(registry.dangling_conditions().is_empty());
    }

    #[test]
    fn catalog_patterns_compile() {
        let registry = onboarding_schema().unwrap();
        for field in registry.all_fields() {
            if let Some(pattern) = &field.validation.pattern {
                assert!(regex::Regex::new(pattern).is_ok(), "bad pattern on {}", field.key);
            }
        }
    }

    #[test]
    fn last_section_of_each_phase_congratulates() {
        let registry = onboarding_schema().unwrap();
        for phase in registry.phases() {
            let last = phase.sections.last().unwrap();
            assert!(last.congrats_message.is_some(), "{} has no congrats", phase.slug);
        }
    }
}
