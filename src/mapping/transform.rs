//! Bidirectional conversion between form values and backend payloads.
//!
//! Outbound is total: every mapped, non-empty value produces concrete
//! backend fields, and coercion failures fall back to a default that is
//! recorded on the payload instead of failing the transform. Inbound is the
//! inverse for primitive fields; destructured aggregates are write-only.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::TransformError;
use crate::form::value::{canonical_unit, parse_decimal, scalar_to_string};
use crate::form::{
    AllowOtherValue, CompositeValue, FieldValue, FileHandle, FormValues, ProjectRow, Selection,
    ValidationResult,
};

use super::payload::{ApiPayload, FilePart, detect_encoding};
use super::table::{Coercion, FieldMapping, MappingTable};

/// Date formats accepted on input, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Who is submitting. Attached to every outbound payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

/// Build the backend payload for `values`.
pub fn to_api_payload(values: &FormValues, table: &MappingTable, user: &UserContext) -> ApiPayload {
    let mut payload = ApiPayload::new(detect_encoding(values));

    for (key, value) in values.iter() {
        let Some(mapping) = table.by_frontend(key) else {
            debug!(field = %key, "Unmapped field dropped from payload");
            continue;
        };
        if value.is_empty() {
            continue;
        }
        emit(mapping, value, &mut payload);
    }

    if let Some(id) = user.user_id {
        payload.fields.insert("user_id".into(), Value::String(id.to_string()));
    }
    if let Some(id) = user.organization_id {
        payload
            .fields
            .insert("organization_id".into(), Value::String(id.to_string()));
    }

    payload
}

fn emit(mapping: &FieldMapping, value: &FieldValue, out: &mut ApiPayload) {
    let key = mapping.backend_key;
    let field = mapping.frontend_key;

    match (mapping.coercion, value) {
        (Coercion::Text, FieldValue::Text(s)) => put_text(out, key, s),
        (Coercion::Code, FieldValue::Text(s)) => put_text(out, key, &s.trim().to_uppercase()),
        (Coercion::Date, FieldValue::Text(s)) => match normalize_date(s) {
            Some(date) => put(out, key, Value::String(date.format("%Y-%m-%d").to_string())),
            None => {
                substitute(out, field, "date", s);
                put_text(out, key, s);
            }
        },
        (Coercion::YesNo, value) => {
            let flag = match value {
                FieldValue::Bool(b) => Some(*b),
                FieldValue::Text(s) => parse_yes_no(s),
                _ => None,
            };
            let flag = flag.unwrap_or_else(|| {
                substitute(out, field, "boolean", &scalar_to_string(&value.to_json()));
                false
            });
            put(out, key, Value::Bool(flag));
        }
        (Coercion::Integer, FieldValue::Text(s)) => {
            let n = parse_decimal(s).and_then(|d| d.trunc().to_i64()).unwrap_or_else(|| {
                substitute(out, field, "integer", s);
                0
            });
            put(out, key, Value::from(n));
        }
        (Coercion::Float, FieldValue::Text(s)) => {
            let n = number_or_default(out, field, s);
            put(out, key, decimal_to_json(n));
        }
        (Coercion::Object, FieldValue::TextMap(map)) => {
            let obj: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            put(out, key, Value::Object(obj));
        }
        (Coercion::AllowOther { other_key }, FieldValue::AllowOther(choice)) => {
            let selected = match &choice.selected_value {
                Selection::One(v) => Value::String(v.clone()),
                Selection::Many(vs) => {
                    Value::Array(vs.iter().cloned().map(Value::String).collect())
                }
            };
            put(out, key, selected);
            if choice.other_selected() {
                put_text(out, other_key, &choice.other_value);
            }
        }
        (Coercion::AllowOther { .. }, FieldValue::Text(s)) => put_text(out, key, s),
        (Coercion::File, FieldValue::File(handle)) => {
            emit_files(out, key, std::slice::from_ref(handle))
        }
        (Coercion::Files, FieldValue::Files(handles)) => emit_files(out, key, handles),
        (
            Coercion::CurrencyAmount { currency_key },
            FieldValue::Composite(CompositeValue::CurrencyAmount { amount, currency }),
        ) => {
            let n = number_or_default(out, field, amount).round_dp(2);
            put(out, key, decimal_to_json(n));
            put_text(out, currency_key, &currency.trim().to_uppercase());
        }
        (
            Coercion::SizeWithUnit { unit_key },
            FieldValue::Composite(CompositeValue::SizeWithUnit { size, unit }),
        ) => {
            let n = number_or_default(out, field, size);
            put(out, key, decimal_to_json(n));
            match canonical_unit(unit) {
                Some(canonical) => put_text(out, unit_key, canonical),
                None if unit.trim().is_empty() => {}
                None => {
                    substitute(out, field, "unit", unit);
                    put_text(out, unit_key, unit.trim());
                }
            }
        }
        (
            Coercion::Destructure { columns, total_key },
            FieldValue::Composite(
                CompositeValue::PercentageTable(cells) | CompositeValue::Metrics(cells),
            ),
        ) => {
            let mut total = Decimal::ZERO;
            let mut emitted = false;
            for (cell, backend) in columns {
                let Some(raw) = cells.get(*cell).filter(|v| !v.trim().is_empty()) else {
                    continue;
                };
                let n = number_or_default(out, field, raw.trim().trim_end_matches('%'));
                total += n;
                emitted = true;
                put(out, backend, decimal_to_json(n));
            }
            for cell in cells.keys().filter(|c| !columns.iter().any(|(k, _)| *k == c.as_str())) {
                debug!(field = %field, cell = %cell, "Cell has no backend column, dropped");
            }
            if let (Some(total_key), true) = (total_key, emitted) {
                put(out, total_key, decimal_to_json(total));
            }
        }
        (Coercion::Rows, FieldValue::Composite(CompositeValue::ProjectTable(rows))) => {
            let array = rows
                .iter()
                .enumerate()
                .map(|(i, row)| row_to_json(out, key, i, row))
                .collect();
            put(out, key, Value::Array(array));
        }
        (
            Coercion::Consent,
            FieldValue::Composite(CompositeValue::Consent(b)) | FieldValue::Bool(b),
        ) => {
            put(out, key, Value::Bool(*b));
        }
        (coercion, value) => {
            debug!(
                field = %field,
                coercion = ?coercion,
                "Value shape does not match mapping, sending as-is"
            );
            put(out, key, value.to_json());
        }
    }
}

fn put(out: &mut ApiPayload, key: &str, value: Value) {
    out.fields.insert(key.to_string(), value);
}

/// Empty strings are omitted rather than sent.
fn put_text(out: &mut ApiPayload, key: &str, text: &str) {
    if !text.is_empty() {
        put(out, key, Value::String(text.to_string()));
    }
}

fn substitute(out: &mut ApiPayload, field: &str, expected: &'static str, raw: &str) {
    warn!(field = %field, expected, raw = %raw, "Coercion failed, substituting default");
    out.warnings.push(TransformError {
        field: field.to_string(),
        expected,
        raw: raw.to_string(),
    });
}

fn number_or_default(out: &mut ApiPayload, field: &str, raw: &str) -> Decimal {
    parse_decimal(raw).unwrap_or_else(|| {
        substitute(out, field, "number", raw);
        Decimal::ZERO
    })
}

fn emit_files(out: &mut ApiPayload, key: &str, handles: &[FileHandle]) {
    let mut urls = Vec::new();
    for handle in handles {
        match handle {
            FileHandle::Local {
                file_name,
                content_type,
                bytes,
                ..
            } => out.files.push(FilePart {
                field: key.to_string(),
                file_name: file_name.clone(),
                content_type: content_type.clone(),
                bytes: bytes.clone(),
            }),
            FileHandle::Remote { url, .. } => urls.push(Value::String(url.clone())),
        }
    }
    match (handles.len(), urls.len()) {
        (_, 0) => {}
        (1, 1) => put(out, key, urls.remove(0)),
        _ => put(out, key, Value::Array(urls)),
    }
}

fn row_to_json(out: &mut ApiPayload, key: &str, index: usize, row: &ProjectRow) -> Value {
    let mut obj = Map::new();
    for (name, text) in [
        ("name", &row.name),
        ("location", &row.location),
        ("capacity", &row.capacity),
        ("status", &row.status),
    ] {
        if !text.is_empty() {
            obj.insert(name.into(), Value::String(text.clone()));
        }
    }
    match &row.attachment {
        Some(FileHandle::Remote { url, .. }) => {
            obj.insert("attachment".into(), Value::String(url.clone()));
        }
        Some(FileHandle::Local {
            file_name,
            content_type,
            bytes,
            ..
        }) => out.files.push(FilePart {
            field: format!("{key}[{index}][attachment]"),
            file_name: file_name.clone(),
            content_type: content_type.clone(),
            bytes: bytes.clone(),
        }),
        None => {}
    }
    Value::Object(obj)
}

fn parse_yes_no(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

/// Parse a date in any accepted format.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Whole numbers go out as integers, everything else as a float.
fn decimal_to_json(d: Decimal) -> Value {
    let d = d.normalize();
    if d.scale() == 0 {
        if let Some(i) = d.to_i64() {
            return Value::from(i);
        }
    }
    d.to_string()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::from(0))
}

fn number_to_text(value: &Value) -> String {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or_default();
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
        }
        other => scalar_to_string(other),
    }
}

/// Rebuild form values from backend data, e.g. a server echo or a draft.
pub fn from_api_payload(data: &Map<String, Value>, table: &MappingTable) -> FormValues {
    let mut values = FormValues::new();
    for mapping in table.entries() {
        let raw = data.get(mapping.backend_key).filter(|v| !v.is_null());
        if let Some(value) = absorb(mapping, raw, data) {
            values.insert(mapping.frontend_key, value);
        }
    }
    for key in data.keys() {
        if table.frontend_key_for(key).is_none() {
            debug!(key = %key, "Ignoring unmapped backend field");
        }
    }
    values
}

fn absorb(
    mapping: &FieldMapping,
    raw: Option<&Value>,
    data: &Map<String, Value>,
) -> Option<FieldValue> {
    let aux = |key: &str| {
        data.get(key)
            .filter(|v| !v.is_null())
            .map(scalar_to_string)
            .unwrap_or_default()
    };

    let value = match mapping.coercion {
        Coercion::Destructure { .. } => return None,
        Coercion::Text | Coercion::Code | Coercion::Date => {
            FieldValue::Text(scalar_to_string(raw?))
        }
        Coercion::Integer | Coercion::Float => FieldValue::Text(number_to_text(raw?)),
        Coercion::YesNo => {
            let flag = match raw? {
                Value::Bool(b) => Some(*b),
                other => parse_yes_no(&scalar_to_string(other)),
            }?;
            FieldValue::text(if flag { "yes" } else { "no" })
        }
        Coercion::Object => {
            let obj = raw?.as_object()?;
            FieldValue::TextMap(
                obj.iter()
                    .map(|(k, v)| (k.clone(), scalar_to_string(v)))
                    .collect::<BTreeMap<_, _>>(),
            )
        }
        Coercion::AllowOther { other_key } => {
            let selected_value = match raw? {
                Value::Array(items) => {
                    Selection::Many(items.iter().map(scalar_to_string).collect())
                }
                other => Selection::One(scalar_to_string(other)),
            };
            FieldValue::AllowOther(AllowOtherValue {
                selected_value,
                other_value: aux(other_key),
            })
        }
        Coercion::File => FieldValue::File(remote_file(raw?)?),
        Coercion::Files => match raw? {
            Value::Array(items) => {
                FieldValue::Files(items.iter().filter_map(remote_file).collect())
            }
            single => FieldValue::Files(vec![remote_file(single)?]),
        },
        Coercion::CurrencyAmount { currency_key } => {
            FieldValue::Composite(CompositeValue::CurrencyAmount {
                amount: number_to_text(raw?),
                currency: aux(currency_key),
            })
        }
        Coercion::SizeWithUnit { unit_key } => FieldValue::Composite(CompositeValue::SizeWithUnit {
            size: number_to_text(raw?),
            unit: aux(unit_key),
        }),
        Coercion::Rows => {
            let rows = raw?.as_array()?.iter().filter_map(row_from_json).collect();
            FieldValue::Composite(CompositeValue::ProjectTable(rows))
        }
        Coercion::Consent => FieldValue::Composite(CompositeValue::Consent(match raw? {
            Value::Bool(b) => *b,
            other => parse_yes_no(&scalar_to_string(other)).unwrap_or(false),
        })),
    };
    Some(value)
}

fn remote_file(value: &Value) -> Option<FileHandle> {
    match value {
        Value::String(url) if !url.is_empty() => Some(FileHandle::remote(url.clone())),
        Value::Object(obj) => {
            let url = obj.get("url").and_then(Value::as_str)?;
            Some(FileHandle::Remote {
                url: url.to_string(),
                file_name: obj.get("name").and_then(Value::as_str).map(String::from),
            })
        }
        _ => None,
    }
}

fn row_from_json(value: &Value) -> Option<ProjectRow> {
    let obj = value.as_object()?;
    let text = |key: &str| obj.get(key).map(scalar_to_string).unwrap_or_default();
    Some(ProjectRow {
        name: text("name"),
        location: text("location"),
        capacity: text("capacity"),
        status: text("status"),
        attachment: obj.get("attachment").and_then(remote_file),
    })
}

/// Translate server field errors (backend keys) into a result keyed by
/// frontend field. Errors for keys the table does not know are dropped.
pub fn map_field_errors(
    errors: &BTreeMap<String, String>,
    table: &MappingTable,
) -> ValidationResult {
    errors
        .iter()
        .filter_map(|(backend, message)| match table.frontend_key_for(backend) {
            Some(frontend) => Some((frontend.to_string(), message.clone())),
            None => {
                debug!(key = %backend, "Server error for unmapped field dropped");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mapping::WireEncoding;

    fn make_table() -> MappingTable {
        MappingTable::onboarding()
    }

    fn make_primitive_values() -> FormValues {
        let mut address = BTreeMap::new();
        address.insert("city".to_string(), "Nairobi".to_string());
        address.insert("street".to_string(), "1 Kenyatta Ave".to_string());

        let mut values = FormValues::new();
        values.insert("company_name", FieldValue::text("Acme Renewables Ltd"));
        values.insert("registration_number", FieldValue::text("PVT-2019/0042"));
        values.insert("incorporation_date", FieldValue::text("2019-04-01"));
        values.insert("country_of_incorporation", FieldValue::text("KE"));
        values.insert("employee_count", FieldValue::text("25"));
        values.insert("has_subsidiaries", FieldValue::text("yes"));
        values.insert(
            "industry",
            FieldValue::AllowOther(AllowOtherValue::one("other").with_other("Fintech")),
        );
        values.insert(
            "operating_countries",
            FieldValue::AllowOther(AllowOtherValue::many(&["KE", "TZ"])),
        );
        values.insert("rep_address", FieldValue::TextMap(address));
        values.insert("is_pep", FieldValue::text("no"));
        values.insert("terms_accepted", FieldValue::Composite(CompositeValue::Consent(true)));
        values
    }

    #[test]
    fn primitive_fields_round_trip() {
        let table = make_table();
        let values = make_primitive_values();
        let payload = to_api_payload(&values, &table, &UserContext::default());
        assert!(payload.warnings.is_empty(), "{:?}", payload.warnings);
        let back = from_api_payload(&payload.fields, &table);
        assert_eq!(back, values);
    }

    #[test]
    fn surrounding_whitespace_survives_round_trip() {
        let table = make_table();
        let mut values = FormValues::new();
        values.insert("company_name", FieldValue::text(" Acme "));
        values.insert(
            "industry",
            FieldValue::AllowOther(AllowOtherValue::one("other").with_other("  Agritech")),
        );
        let payload = to_api_payload(&values, &table, &UserContext::default());
        assert_eq!(payload.get("company_name"), Some(&json!(" Acme ")));

        let back = from_api_payload(&payload.fields, &table);
        assert_eq!(back, values);
    }

    #[test]
    fn keys_are_renamed_and_coerced() {
        let payload =
            to_api_payload(&make_primitive_values(), &make_table(), &UserContext::default());
        assert_eq!(payload.get("registration_no"), Some(&json!("PVT-2019/0042")));
        assert_eq!(payload.get("number_of_employees"), Some(&json!(25)));
        assert_eq!(payload.get("has_subsidiaries"), Some(&json!(true)));
        assert_eq!(payload.get("is_politically_exposed"), Some(&json!(false)));
        assert_eq!(payload.get("industry"), Some(&json!("other")));
        assert_eq!(payload.get("industry_other"), Some(&json!("Fintech")));
        assert_eq!(payload.get("operating_countries"), Some(&json!(["KE", "TZ"])));
        assert!(payload.get("registration_number").is_none());
    }

    #[test]
    fn unknown_and_empty_values_are_omitted() {
        let mut values = FormValues::new();
        values.insert("not_in_table", FieldValue::text("x"));
        values.insert("company_name", FieldValue::text(""));
        values.insert("website", FieldValue::Empty);
        let payload = to_api_payload(&values, &make_table(), &UserContext::default());
        assert!(payload.fields.is_empty());
        assert!(payload.fields.values().all(|v| !v.is_null()));
    }

    #[test]
    fn bad_number_defaults_to_zero_with_warning() {
        let mut values = FormValues::new();
        values.insert("employee_count", FieldValue::text("about ten"));
        let payload = to_api_payload(&values, &make_table(), &UserContext::default());
        assert_eq!(payload.get("number_of_employees"), Some(&json!(0)));
        assert_eq!(payload.warnings.len(), 1);
        assert_eq!(payload.warnings[0].field, "employee_count");
    }

    #[test]
    fn dates_are_normalized() {
        assert_eq!(
            normalize_date("01/04/2019"),
            NaiveDate::from_ymd_opt(2019, 4, 1)
        );
        assert_eq!(
            normalize_date("2019-04-01T10:00:00Z"),
            NaiveDate::from_ymd_opt(2019, 4, 1)
        );
        assert!(normalize_date("last spring").is_none());

        let mut values = FormValues::new();
        values.insert("incorporation_date", FieldValue::text("01.04.2019"));
        let payload = to_api_payload(&values, &make_table(), &UserContext::default());
        assert_eq!(payload.get("date_of_incorporation"), Some(&json!("2019-04-01")));
    }

    #[test]
    fn currency_amount_is_split_and_normalized() {
        let mut values = FormValues::new();
        values.insert(
            "investment_required",
            FieldValue::Composite(CompositeValue::CurrencyAmount {
                amount: "2,500,000.456".into(),
                currency: " usd ".into(),
            }),
        );
        let payload = to_api_payload(&values, &make_table(), &UserContext::default());
        assert_eq!(payload.get("investment_amount"), Some(&json!(2500000.46)));
        assert_eq!(payload.get("investment_currency"), Some(&json!("USD")));
    }

    #[test]
    fn size_unit_is_canonicalized() {
        let mut values = FormValues::new();
        values.insert(
            "project_capacity",
            FieldValue::Composite(CompositeValue::SizeWithUnit {
                size: "12.5".into(),
                unit: "MWp".into(),
            }),
        );
        let payload = to_api_payload(&values, &make_table(), &UserContext::default());
        assert_eq!(payload.get("capacity"), Some(&json!(12.5)));
        assert_eq!(payload.get("capacity_unit"), Some(&json!("MW")));
    }

    #[test]
    fn percentage_table_is_destructured_and_not_rehydrated() {
        let mut cells = BTreeMap::new();
        cells.insert("founders".to_string(), "60%".to_string());
        cells.insert("investors".to_string(), "30".to_string());
        cells.insert("unlisted".to_string(), "10".to_string());
        let mut values = FormValues::new();
        values.insert(
            "ownership_split",
            FieldValue::Composite(CompositeValue::PercentageTable(cells)),
        );

        let table = make_table();
        let payload = to_api_payload(&values, &table, &UserContext::default());
        assert_eq!(payload.get("founder_equity_pct"), Some(&json!(60)));
        assert_eq!(payload.get("investor_equity_pct"), Some(&json!(30)));
        assert_eq!(payload.get("total_equity_pct"), Some(&json!(90)));
        assert!(payload.get("ownership_split").is_none());
        assert!(payload.get("employee_equity_pct").is_none());

        let back = from_api_payload(&payload.fields, &table);
        assert!(!back.contains_key("ownership_split"));
    }

    #[test]
    fn structured_section_stays_json_until_a_file_is_added() {
        let table = make_table();
        let mut values = FormValues::new();
        values.insert("project_name", FieldValue::text("Lake Solar"));
        values.insert("pitch_deck", FieldValue::File(FileHandle::remote("https://cdn/deck.pdf")));
        let payload = to_api_payload(&values, &table, &UserContext::default());
        assert_eq!(payload.encoding, WireEncoding::Json);
        assert_eq!(payload.get("pitch_deck"), Some(&json!("https://cdn/deck.pdf")));

        values.insert(
            "pitch_deck",
            FieldValue::File(FileHandle::local("deck.pdf", b"%PDF".to_vec())),
        );
        let payload = to_api_payload(&values, &table, &UserContext::default());
        assert_eq!(payload.encoding, WireEncoding::Multipart);
        assert!(payload.get("pitch_deck").is_none());
        assert_eq!(payload.files.len(), 1);
        assert_eq!(payload.files[0].field, "pitch_deck");
        assert_eq!(payload.files[0].content_type, "application/pdf");
    }

    #[test]
    fn project_row_attachments_become_parts() {
        let mut values = FormValues::new();
        values.insert(
            "project_portfolio",
            FieldValue::Composite(CompositeValue::ProjectTable(vec![ProjectRow {
                name: "Hill Wind".into(),
                attachment: Some(FileHandle::local("permit.pdf", vec![1])),
                ..Default::default()
            }])),
        );
        let payload = to_api_payload(&values, &make_table(), &UserContext::default());
        assert_eq!(payload.get("projects"), Some(&json!([{ "name": "Hill Wind" }])));
        assert_eq!(payload.files[0].field, "projects[0][attachment]");
    }

    #[test]
    fn user_context_is_attached() {
        let user = UserContext {
            user_id: Some(Uuid::nil()),
            organization_id: None,
        };
        let payload = to_api_payload(&FormValues::new(), &make_table(), &user);
        assert_eq!(
            payload.get("user_id"),
            Some(&json!("00000000-0000-0000-0000-000000000000"))
        );
        assert!(payload.get("organization_id").is_none());
    }

    #[test]
    fn payload_is_deterministic() {
        let values = make_primitive_values();
        let a = to_api_payload(&values, &make_table(), &UserContext::default());
        let b = to_api_payload(&values, &make_table(), &UserContext::default());
        assert_eq!(a, b);
    }

    #[test]
    fn server_echo_rehydrates_composites() {
        let data = json!({
            "investment_amount": 2500000.0,
            "investment_currency": "USD",
            "capacity": 12.5,
            "capacity_unit": "MW",
            "projects": [{ "name": "Hill Wind", "attachment": "https://cdn/permit.pdf" }],
            "server_computed_score": 7
        });
        let values = from_api_payload(data.as_object().unwrap(), &make_table());
        assert_eq!(
            values.get("investment_required"),
            &FieldValue::Composite(CompositeValue::CurrencyAmount {
                amount: "2500000".into(),
                currency: "USD".into()
            })
        );
        assert_eq!(
            values.get("project_capacity"),
            &FieldValue::Composite(CompositeValue::SizeWithUnit {
                size: "12.5".into(),
                unit: "MW".into()
            })
        );
        match values.get("project_portfolio") {
            FieldValue::Composite(CompositeValue::ProjectTable(rows)) => {
                assert_eq!(rows[0].name, "Hill Wind");
                assert!(rows[0].attachment.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn server_errors_map_to_frontend_keys() {
        let mut errors = BTreeMap::new();
        errors.insert("registration_no".to_string(), "Already registered".to_string());
        errors.insert("investment_currency".to_string(), "Unsupported currency".to_string());
        errors.insert("mystery".to_string(), "?".to_string());
        let result = map_field_errors(&errors, &make_table());
        assert_eq!(result.get("registration_number"), Some("Already registered"));
        assert_eq!(result.get("investment_required"), Some("Unsupported currency"));
        assert_eq!(result.len(), 2);
    }
}
