//! Extraction helpers from the dynamic front-matter mapping.
//!
//! Every helper takes the dotted key path it is reading and pushes a
//! user-category error (citing that path) on a type mismatch, returning
//! `None` so the caller can keep collecting further findings.

use aflow_core::{Category, Diagnostic, Diagnostics};
use serde_yaml::{Mapping, Value};

pub fn type_error(path: &str, expected: &str, got: &Value, diags: &mut Diagnostics) {
    diags.push(
        Diagnostic::error(
            Category::User,
            format!("expected {expected}, got {}", describe(got)),
        )
        .at(path),
    );
}

pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

pub fn get<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a Value> {
    mapping.get(Value::String(key.to_string()))
}

pub fn as_str(value: &Value, path: &str, diags: &mut Diagnostics) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        other => {
            type_error(path, "a string", other, diags);
            None
        }
    }
}

pub fn as_bool(value: &Value, path: &str, diags: &mut Diagnostics) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        other => {
            type_error(path, "a boolean", other, diags);
            None
        }
    }
}

pub fn as_u32(value: &Value, path: &str, diags: &mut Diagnostics) -> Option<u32> {
    match value.as_u64() {
        Some(n) if n <= u64::from(u32::MAX) => Some(n as u32),
        _ => {
            type_error(path, "a non-negative integer", value, diags);
            None
        }
    }
}

pub fn as_positive_u32(value: &Value, path: &str, diags: &mut Diagnostics) -> Option<u32> {
    match as_u32(value, path, diags) {
        Some(0) => {
            diags.push(
                Diagnostic::error(Category::User, "must be greater than zero").at(path),
            );
            None
        }
        other => other,
    }
}

pub fn as_mapping<'a>(
    value: &'a Value,
    path: &str,
    diags: &mut Diagnostics,
) -> Option<&'a Mapping> {
    match value {
        Value::Mapping(m) => Some(m),
        other => {
            type_error(path, "a mapping", other, diags);
            None
        }
    }
}

pub fn as_sequence<'a>(
    value: &'a Value,
    path: &str,
    diags: &mut Diagnostics,
) -> Option<&'a [Value]> {
    match value {
        Value::Sequence(s) => Some(s),
        other => {
            type_error(path, "a sequence", other, diags);
            None
        }
    }
}

/// A list of strings. Each non-string element is reported at its index.
pub fn as_str_seq(value: &Value, path: &str, diags: &mut Diagnostics) -> Option<Vec<String>> {
    let seq = as_sequence(value, path, diags)?;
    let mut out = Vec::with_capacity(seq.len());
    for (i, item) in seq.iter().enumerate() {
        if let Some(s) = as_str(item, &format!("{path}[{i}]"), diags) {
            out.push(s);
        }
    }
    Some(out)
}

/// A scalar string or a list of strings (`roles: admin` / `roles: [admin]`).
pub fn as_str_or_seq(value: &Value, path: &str, diags: &mut Diagnostics) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Sequence(_) => as_str_seq(value, path, diags),
        other => {
            type_error(path, "a string or a sequence of strings", other, diags);
            None
        }
    }
}

/// A mapping whose values are all strings (env blocks, headers).
pub fn as_str_map(
    value: &Value,
    path: &str,
    diags: &mut Diagnostics,
) -> Option<indexmap::IndexMap<String, String>> {
    let mapping = as_mapping(value, path, diags)?;
    let mut out = indexmap::IndexMap::new();
    for (k, v) in mapping {
        let Some(key) = k.as_str() else {
            type_error(path, "string keys", k, diags);
            continue;
        };
        let item_path = format!("{path}.{key}");
        match v {
            Value::String(s) => {
                out.insert(key.to_string(), s.clone());
            }
            Value::Number(n) => {
                out.insert(key.to_string(), n.to_string());
            }
            Value::Bool(b) => {
                out.insert(key.to_string(), b.to_string());
            }
            other => type_error(&item_path, "a scalar", other, diags),
        }
    }
    Some(out)
}

/// Report keys of `mapping` that are not in `known`.
pub fn reject_unknown_keys(
    mapping: &Mapping,
    known: &[&str],
    path_prefix: &str,
    diags: &mut Diagnostics,
) {
    for key in mapping.keys() {
        let Some(name) = key.as_str() else { continue };
        if !known.contains(&name) {
            let path = if path_prefix.is_empty() {
                name.to_string()
            } else {
                format!("{path_prefix}.{name}")
            };
            diags.push(
                Diagnostic::error(Category::User, format!("unknown field '{name}'"))
                    .at(path)
                    .with_hint(format!("known fields: {}", known.join(", "))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_as_str_mismatch_cites_path() {
        let mut diags = Diagnostics::new();
        assert!(as_str(&yaml("42"), "engine.model", &mut diags).is_none());
        let d = diags.iter().next().unwrap();
        assert_eq!(d.path.as_deref(), Some("engine.model"));
        assert!(d.message.contains("expected a string"));
        assert!(d.message.contains("a number"));
    }

    #[test]
    fn test_as_str_seq_reports_bad_index() {
        let mut diags = Diagnostics::new();
        let out = as_str_seq(&yaml("[ok, 7, fine]"), "network.allowed", &mut diags).unwrap();
        assert_eq!(out, ["ok", "fine"]);
        let d = diags.iter().next().unwrap();
        assert_eq!(d.path.as_deref(), Some("network.allowed[1]"));
    }

    #[test]
    fn test_as_positive_u32_rejects_zero() {
        let mut diags = Diagnostics::new();
        assert!(as_positive_u32(&yaml("0"), "timeout-minutes", &mut diags).is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn test_as_str_map_coerces_scalars() {
        let mut diags = Diagnostics::new();
        let map = as_str_map(&yaml("A: x\nB: 3\nC: true"), "env", &mut diags).unwrap();
        assert_eq!(map.get("B").unwrap(), "3");
        assert_eq!(map.get("C").unwrap(), "true");
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_reject_unknown_keys_hints_known_set() {
        let mut diags = Diagnostics::new();
        let Value::Mapping(m) = yaml("mode: remote\nbogus: 1") else {
            panic!()
        };
        reject_unknown_keys(&m, &["mode", "allowed"], "tools.github", &mut diags);
        let d = diags.iter().next().unwrap();
        assert_eq!(d.path.as_deref(), Some("tools.github.bogus"));
        assert!(d.hint.as_deref().unwrap().contains("mode"));
    }
}
