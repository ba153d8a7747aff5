//! Scalar and value formatting for the lock file.
//!
//! The hosted runner parses its workflow files with YAML 1.1 semantics,
//! where `on`, `yes`, and `off` are booleans and `017` is octal. Every
//! scalar that a 1.1 consumer could misread is quoted, so the emitted
//! document round-trips with its intended meaning.

use serde_yaml::Value;

/// Plain words a YAML 1.1 parser resolves to booleans or null.
const AMBIGUOUS_WORDS: [&str; 22] = [
    "y", "Y", "yes", "Yes", "YES", "n", "N", "no", "No", "NO", "true", "True", "TRUE", "false",
    "False", "FALSE", "on", "On", "ON", "off", "Off", "OFF",
];

/// Would a bare emission of `s` be misread by a YAML 1.1 consumer?
pub fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if AMBIGUOUS_WORDS.contains(&s) || s == "~" || s.eq_ignore_ascii_case("null") {
        return true;
    }
    if looks_numeric(s) {
        return true;
    }
    let first = s.chars().next().unwrap_or(' ');
    if "!&*?{}[]#|>@`\"'%,-".contains(first) {
        return true;
    }
    if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
        return true;
    }
    if s.contains(": ") || s.ends_with(':') || s.contains(" #") {
        return true;
    }
    s.contains('\n') || s.contains('\t')
}

/// Integer, float, octal, or hex shapes (YAML 1.1 resolves `017` as octal
/// and `0x1f` as hex).
fn looks_numeric(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    if body.is_empty() {
        return false;
    }
    if body.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if let Some(hex) = body.strip_prefix("0x") {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(oct) = body.strip_prefix("0o") {
        return !oct.is_empty() && oct.chars().all(|c| ('0'..='7').contains(&c));
    }
    body.parse::<f64>().is_ok()
}

/// Format a single-line scalar, quoting when a 1.1 consumer would misread
/// it. Multi-line strings belong in [`block_scalar`].
pub fn scalar(s: &str) -> String {
    if needs_quoting(s) {
        // Double-quoted style escapes everything unambiguously.
        let mut quoted = String::with_capacity(s.len() + 2);
        quoted.push('"');
        for c in s.chars() {
            match c {
                '"' => quoted.push_str("\\\""),
                '\\' => quoted.push_str("\\\\"),
                '\n' => quoted.push_str("\\n"),
                '\t' => quoted.push_str("\\t"),
                other => quoted.push(other),
            }
        }
        quoted.push('"');
        quoted
    } else {
        s.to_string()
    }
}

/// Emit a literal block scalar (`|`) with its content indented one level
/// past `indent` spaces.
pub fn block_scalar(text: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let chomp = if text.ends_with('\n') { "" } else { "-" };
    let mut out = format!("|{chomp}\n");
    for line in text.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&pad);
            out.push_str(line);
            out.push('\n');
        }
    }
    out.pop();
    out
}

/// Emit an arbitrary YAML value (trigger filters, raw steps) at `indent`,
/// preserving mapping insertion order.
pub fn write_value(out: &mut String, value: &Value, indent: usize) {
    let pad = " ".repeat(indent);
    match value {
        Value::Mapping(m) if m.is_empty() => out.push_str(" {}\n"),
        Value::Mapping(m) => {
            out.push('\n');
            for (key, item) in m {
                let key_text = key.as_str().map(scalar).unwrap_or_else(|| {
                    serde_yaml::to_string(key)
                        .unwrap_or_default()
                        .trim()
                        .to_string()
                });
                out.push_str(&format!("{pad}{key_text}:"));
                write_value(out, item, indent + 2);
            }
        }
        Value::Sequence(seq) if seq.is_empty() => out.push_str(" []\n"),
        Value::Sequence(seq) => {
            out.push('\n');
            for item in seq {
                match item {
                    Value::Mapping(m) if !m.is_empty() => {
                        out.push_str(&format!("{pad}-"));
                        let mut first = true;
                        for (key, val) in m {
                            let key_text =
                                key.as_str().map(scalar).unwrap_or_default();
                            if first {
                                out.push_str(&format!(" {key_text}:"));
                                first = false;
                            } else {
                                out.push_str(&format!("{pad}  {key_text}:"));
                            }
                            write_value(out, val, indent + 4);
                        }
                    }
                    other => {
                        out.push_str(&format!("{pad}- "));
                        write_scalar_value(out, other);
                        out.push('\n');
                    }
                }
            }
        }
        other => {
            out.push(' ');
            write_scalar_value(out, other);
            out.push('\n');
        }
    }
}

fn write_scalar_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(&scalar(s)),
        other => {
            out.push_str(
                serde_yaml::to_string(other)
                    .unwrap_or_default()
                    .trim_end(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_strings_unquoted() {
        assert_eq!(scalar("ubuntu-latest"), "ubuntu-latest");
        assert_eq!(scalar("Checkout repository"), "Checkout repository");
    }

    #[test]
    fn test_yaml11_booleans_quoted() {
        for word in ["on", "off", "yes", "no", "true", "False", "YES"] {
            assert!(scalar(word).starts_with('"'), "{word} should be quoted");
        }
    }

    #[test]
    fn test_octal_and_numeric_quoted() {
        assert_eq!(scalar("017"), "\"017\"");
        assert_eq!(scalar("42"), "\"42\"");
        assert_eq!(scalar("0x1f"), "\"0x1f\"");
        assert_eq!(scalar("1.5"), "\"1.5\"");
    }

    #[test]
    fn test_empty_and_whitespace_quoted() {
        assert_eq!(scalar(""), "\"\"");
        assert!(scalar(" leading").starts_with('"'));
        assert!(scalar("trailing ").starts_with('"'));
    }

    #[test]
    fn test_special_leading_chars_quoted() {
        assert!(scalar("*wild").starts_with('"'));
        assert!(scalar("{inline}").starts_with('"'));
        assert!(scalar("- item").starts_with('"'));
    }

    #[test]
    fn test_colon_space_quoted() {
        assert!(scalar("key: value").starts_with('"'));
        assert_eq!(scalar("no-colon-here"), "no-colon-here");
    }

    #[test]
    fn test_expressions_unquoted() {
        assert_eq!(
            scalar("${{ github.run_id }}"),
            "${{ github.run_id }}"
        );
    }

    #[test]
    fn test_quote_escaping() {
        assert_eq!(scalar("say \"hi\"\nbye"), "\"say \\\"hi\\\"\\nbye\"");
    }

    #[test]
    fn test_block_scalar_literal() {
        let block = block_scalar("echo one\necho two\n", 6);
        assert_eq!(block, "|\n      echo one\n      echo two");
    }

    #[test]
    fn test_block_scalar_chomps_when_no_trailing_newline() {
        let block = block_scalar("echo one", 2);
        assert_eq!(block, "|-\n  echo one");
    }

    #[test]
    fn test_write_value_mapping_order() {
        let value: Value = serde_yaml::from_str("types: [opened, labeled]\nbranches: [main]").unwrap();
        let mut out = String::new();
        write_value(&mut out, &value, 4);
        assert_eq!(
            out,
            "\n    types:\n      - opened\n      - labeled\n    branches:\n      - main\n"
        );
    }
}
