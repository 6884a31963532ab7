use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::InsightFields;

/// Canonical field a model-supplied key maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Eps,
    Revenue,
    Guidance,
    KeyRisks,
    CeoQuote,
}

fn canonical_field(key: &str) -> Option<Field> {
    let normalized: String = key
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect();

    match normalized.as_str() {
        "eps" | "earnings_per_share" | "diluted_eps" => Some(Field::Eps),
        "revenue" | "revenues" | "total_revenue" => Some(Field::Revenue),
        "guidance" | "forward_guidance" | "outlook" => Some(Field::Guidance),
        "key_risks" | "risks" | "risk_factors" => Some(Field::KeyRisks),
        "ceo_quote" | "quote" | "executive_quote" => Some(Field::CeoQuote),
        _ => None,
    }
}

/// Parse the structured-fields reply into insight fields
///
/// Tries JSON first (tolerating code fences and surrounding prose), then a
/// regex scan for the known fields. Never fails; unusable input yields empty
/// fields.
pub fn parse_structured_fields(text: &str) -> InsightFields {
    if let Some(Value::Object(map)) = extract_json_object(text) {
        return normalize_fields(map);
    }
    regex_fallback(text)
}

/// Locate and parse the JSON object in a model reply
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

/// Map arbitrary keys and value types onto the insight shape
pub fn normalize_fields(map: Map<String, Value>) -> InsightFields {
    let mut fields = InsightFields::default();

    for (key, value) in map {
        match canonical_field(&key) {
            Some(Field::Eps) => set_once(&mut fields.eps, value_to_string(&value)),
            Some(Field::Revenue) => set_once(&mut fields.revenue, value_to_string(&value)),
            Some(Field::Guidance) => set_once(&mut fields.guidance, value_to_string(&value)),
            Some(Field::CeoQuote) => set_once(&mut fields.ceo_quote, value_to_string(&value)),
            Some(Field::KeyRisks) => {
                if fields.key_risks.is_empty() {
                    fields.key_risks = value_to_list(&value);
                }
            }
            None => {
                fields.extra.insert(key, value);
            }
        }
    }

    fields
}

fn set_once(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Render a scalar-ish JSON value as a trimmed, non-empty string
fn value_to_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_to_string)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(_) => value.to_string(),
    };
    if text.is_empty() { None } else { Some(text) }
}

fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_to_string).collect(),
        other => value_to_string(other).into_iter().collect(),
    }
}

static STRING_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(eps|revenue|guidance|ceo_quote)"\s*:\s*"([^"]+)""#).expect("valid regex")
});

static RISKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"key_risks"\s*:\s*\[(.*?)\]"#).expect("valid regex")
});

/// Scan text that is not valid JSON for the known quoted fields
fn regex_fallback(text: &str) -> InsightFields {
    let mut fields = InsightFields::default();

    for caps in STRING_FIELD_RE.captures_iter(text) {
        let value = Some(caps[2].trim().to_string()).filter(|v| !v.is_empty());
        match canonical_field(&caps[1]) {
            Some(Field::Eps) => set_once(&mut fields.eps, value),
            Some(Field::Revenue) => set_once(&mut fields.revenue, value),
            Some(Field::Guidance) => set_once(&mut fields.guidance, value),
            Some(Field::CeoQuote) => set_once(&mut fields.ceo_quote, value),
            _ => {}
        }
    }

    if let Some(caps) = RISKS_RE.captures(text) {
        let inner = &caps[1];
        fields.key_risks = match serde_json::from_str::<Vec<Value>>(&format!("[{}]", inner)) {
            Ok(items) => items.iter().filter_map(value_to_string).collect(),
            Err(_) => inner
                .split(',')
                .map(|r| r.trim().trim_matches('"').trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
        };
    }

    fields
}
