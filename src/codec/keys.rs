//! Object key casing conversion over raw structured data.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::strategy::KeyStrategy;

fn identifier() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^_*[A-Za-z][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Convert `camelCase` (and `PascalCase`) to `snake_case`.
///
/// Acronyms are kept together: `userID` becomes `user_id` and
/// `HTTPServer` becomes `http_server`.
#[must_use]
pub fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary && prev != '_' {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Convert `snake_case` to `camelCase`.
///
/// Leading underscores are preserved; keys without an inner underscore are
/// returned unchanged.
#[must_use]
pub fn to_camel_case(key: &str) -> String {
    let body = key.trim_start_matches('_');
    let leading = &key[..key.len() - body.len()];
    if !body.contains('_') {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len());
    out.push_str(leading);
    for (i, part) in body.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    out
}

/// Rename identifier keys with `forward`, but only where `back` restores the
/// original; every other key is kept verbatim so decoding sees it unchanged.
fn convert(value: Value, forward: fn(&str) -> String, back: fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                let key = rename(k, forward, back);
                out.insert(key, convert(v, forward, back));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| convert(v, forward, back))
                .collect(),
        ),
        other => other,
    }
}

fn rename(key: String, forward: fn(&str) -> String, back: fn(&str) -> String) -> String {
    if !identifier().is_match(&key) {
        return key;
    }
    let renamed = forward(&key);
    if back(&renamed) == key {
        renamed
    } else {
        key
    }
}

/// Rewrite keys from their Rust-side form to their stored form.
pub(crate) fn encode_keys(value: Value, strategy: KeyStrategy) -> Value {
    match strategy {
        KeyStrategy::UseDefaultKeys => value,
        KeyStrategy::CamelCase => convert(value, to_camel_case, to_snake_case),
        KeyStrategy::SnakeCase => convert(value, to_snake_case, to_camel_case),
    }
}

/// Rewrite keys from their stored form to their Rust-side form.
pub(crate) fn decode_keys(value: Value, strategy: KeyStrategy) -> Value {
    match strategy {
        KeyStrategy::UseDefaultKeys => value,
        KeyStrategy::CamelCase => convert(value, to_snake_case, to_camel_case),
        KeyStrategy::SnakeCase => convert(value, to_camel_case, to_snake_case),
    }
}
