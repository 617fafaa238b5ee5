use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use serde_json::json;

use onboard_wizard::config::EngineConfig;
use onboard_wizard::form::{FormValues, validate_section, visible_fields};
use onboard_wizard::mapping::{MappingTable, UserContext, to_api_payload};
use onboard_wizard::persistence::HttpBackend;
use onboard_wizard::schema::{SchemaRegistry, onboarding_schema};
use onboard_wizard::wizard::{NextOutcome, WizardController};

const USAGE: &str = "\
Usage: onboard-wizard <command> [args]

Commands:
  schema                 Print the onboarding schema as JSON
  check <values.json>    Validate every section against a values file
  payload <values.json>  Print the API payload each section would send
  submit <values.json>   Walk the wizard against the configured API";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let registry = onboarding_schema().context("building onboarding schema")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["schema"] => {
            println!("{}", serde_json::to_string_pretty(registry.phases())?);
        }
        ["check", path] => {
            let values = load_values(&registry, Path::new(path))?;
            let mut failed = false;
            for phase in registry.phases() {
                for section in &phase.sections {
                    let result = validate_section(section, &values);
                    if result.is_valid() {
                        println!("✓ {}/{}", phase.slug, section.key);
                        continue;
                    }
                    failed = true;
                    println!("✗ {}/{}", phase.slug, section.key);
                    for (field, message) in result.iter() {
                        println!("    {field}: {message}");
                    }
                }
            }
            if failed {
                std::process::exit(2);
            }
        }
        ["payload", path] => {
            let values = load_values(&registry, Path::new(path))?;
            let table = MappingTable::onboarding();
            let user = UserContext::default();
            let mut out = serde_json::Map::new();
            for phase in registry.phases() {
                for section in &phase.sections {
                    let scoped = values
                        .subset(visible_fields(section, &values).map(|f| f.key.as_str()));
                    let payload = to_api_payload(&scoped, &table, &user);
                    for warning in &payload.warnings {
                        eprintln!("warning: {warning}");
                    }
                    out.insert(
                        format!("{}/{}", phase.slug, section.key),
                        json!({
                            "encoding": payload.encoding.to_string(),
                            "fields": payload.to_json(),
                            "files": payload
                                .files
                                .iter()
                                .map(|f| &f.file_name)
                                .collect::<Vec<_>>(),
                        }),
                    );
                }
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        ["submit", path] => {
            let values = load_values(&registry, Path::new(path))?;
            submit(registry, values).await?;
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn load_values(registry: &SchemaRegistry, path: &Path) -> anyhow::Result<FormValues> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    if !json.is_object() {
        bail!("{} must contain a JSON object of field values", path.display());
    }
    let mut values = FormValues::from_json(registry, &json);
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let loaded = values
        .load_files(base)
        .with_context(|| format!("reading files listed in {}", path.display()))?;
    tracing::debug!(loaded, "Read attached files");
    Ok(values)
}

async fn submit(registry: SchemaRegistry, values: FormValues) -> anyhow::Result<()> {
    let config = EngineConfig::from_env()?;
    eprintln!("Onboard Wizard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.api_base_url);

    let backend = Arc::new(HttpBackend::new(config.clone())?);
    let wizard = Arc::new(WizardController::new(Arc::new(registry), backend, &config));
    let adopted = wizard.resume().await?;
    if adopted > 0 {
        eprintln!("   Resumed {adopted} values from draft");
    }
    for (key, value) in values.iter() {
        wizard.set_field_value(key, value.clone()).await?;
    }

    loop {
        let at = wizard.position().await;
        let section = wizard
            .current_section()
            .await
            .map(|s| s.key)
            .unwrap_or_default();
        match wizard.next().await {
            NextOutcome::Advanced(next) => {
                eprintln!(
                    "✓ {section} saved, now at phase {} section {}",
                    next.phase, next.section
                );
            }
            NextOutcome::AwaitingAcknowledgement { message } => {
                eprintln!("✓ {section} saved: {message}");
                if let NextOutcome::Terminal = wizard.acknowledge_completion().await? {
                    break;
                }
            }
            NextOutcome::Terminal => break,
            NextOutcome::Invalid(errors) => {
                eprintln!(
                    "✗ {section} is incomplete (phase {} section {})",
                    at.phase, at.section
                );
                for (field, message) in errors.iter() {
                    eprintln!("    {field}: {message}");
                }
                std::process::exit(2);
            }
            NextOutcome::SaveFailed { message, errors } => {
                eprintln!("✗ {section} was not saved: {message}");
                for (field, message) in errors.iter() {
                    eprintln!("    {field}: {message}");
                }
                std::process::exit(3);
            }
            NextOutcome::Ignored(e) => bail!(e),
        }
    }

    eprintln!("✓ Onboarding complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use onboard_wizard::form::FieldValue;

    #[test]
    fn load_values_reads_frontend_shape() {
        let registry = onboarding_schema().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"company_name": "Acme", "has_subsidiaries": "no", "unknown_key": 1}}"#
        )
        .unwrap();

        let values = load_values(&registry, file.path()).unwrap();
        assert_eq!(values.get("company_name"), &FieldValue::text("Acme"));
        assert_eq!(values.get("has_subsidiaries"), &FieldValue::text("no"));
    }

    #[test]
    fn load_values_reads_listed_files() {
        let registry = onboarding_schema().unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let contents = b"%PDF-1.7 certificate of incorporation";
        std::fs::write(dir.path().join("certificate.pdf"), contents).unwrap();
        let path = dir.path().join("values.json");
        std::fs::write(
            &path,
            r#"{"incorporation_certificate": {"path": "certificate.pdf"}}"#,
        )
        .unwrap();

        let values = load_values(&registry, &path).unwrap();
        let scoped = values.subset(["incorporation_certificate"]);
        let payload = to_api_payload(&scoped, &MappingTable::onboarding(), &UserContext::default());
        assert_eq!(payload.files.len(), 1);
        assert_eq!(payload.files[0].file_name, "certificate.pdf");
        assert_eq!(payload.files[0].bytes.len(), contents.len());
    }

    #[test]
    fn load_values_fails_on_missing_listed_file() {
        let registry = onboarding_schema().unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("values.json");
        std::fs::write(&path, r#"{"incorporation_certificate": {"path": "gone.pdf"}}"#).unwrap();
        assert!(load_values(&registry, &path).is_err());
    }

    #[test]
    fn load_values_rejects_non_object() {
        let registry = onboarding_schema().unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("values.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(load_values(&registry, &path).is_err());
        assert!(load_values(&registry, &dir.path().join("missing.json")).is_err());
    }
}
