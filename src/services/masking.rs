use serde_json::{Map, Value};

const BEARER_MASK: &str = "Bearer *****";

enum Rule {
    Prefix(usize, &'static str),
    Fixed(&'static str),
}

fn rule_for(key: &str) -> Option<Rule> {
    match key {
        "access_token" => Some(Rule::Prefix(6, "******")),
        "client_id" => Some(Rule::Prefix(4, "****")),
        "Authorization" => Some(Rule::Fixed(BEARER_MASK)),
        "Merchant-Id" => Some(Rule::Prefix(4, "****")),
        "api_key" => Some(Rule::Prefix(4, "****")),
        _ => None,
    }
}

fn apply(rule: &Rule, value: &Value) -> Value {
    match rule {
        Rule::Fixed(literal) => Value::String((*literal).to_string()),
        Rule::Prefix(keep, suffix) => {
            let raw = match value {
                Value::String(s) => s.clone(),
                Value::Null => return Value::Null,
                other => other.to_string(),
            };
            let prefix: String = raw.chars().take(*keep).collect();
            Value::String(format!("{prefix}{suffix}"))
        }
    }
}

/// Returns a copy of `value` with sensitive keys redacted at any depth.
pub fn mask_sensitive(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(mask_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(mask_sensitive).collect()),
        other => other.clone(),
    }
}

pub fn mask_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let masked = match rule_for(key) {
                Some(rule) => apply(&rule, value),
                None => mask_sensitive(value),
            };
            (key.clone(), masked)
        })
        .collect()
}
