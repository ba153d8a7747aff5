//! Trigger-text sanitization.
//!
//! The activation job reduces the raw trigger payload to a single `text`
//! output; this module is the reference implementation of the rules, and
//! the embedded runtime script mirrors them. The output contract:
//! no un-neutralized @-mention, no bot trigger phrase outside backticks,
//! no raw `<`, no control characters, only https URIs on trusted hosts,
//! at most 0.5 MB and 65,000 lines (truncation is explicit).

use std::sync::LazyLock;

use regex::Regex;

pub const MAX_TEXT_BYTES: usize = 512 * 1024;
pub const MAX_TEXT_LINES: usize = 65_000;
pub const TRUNCATION_MARKER: &str = "\n[truncated: activation text exceeded size limits]";

/// Hosts a URI may reference and survive sanitization.
pub const TRUSTED_URI_HOSTS: [&str; 4] = [
    "github.com",
    "api.github.com",
    "raw.githubusercontent.com",
    "objects.githubusercontent.com",
];

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    // An @ at start of text or after a non-word, non-backtick character.
    Regex::new(r"(^|[^\w`])@([A-Za-z0-9][A-Za-z0-9-]{0,38})").expect("valid regex")
});

static BOT_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(fix(?:e[sd])?|close[sd]?|resolve[sd]?)\s+#(\d+)").expect("valid regex")
});

static URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[A-Za-z][A-Za-z0-9+.-]*://[^\s<>)\]'"]+"#).expect("valid regex")
});

/// Apply every sanitization rule in order.
pub fn sanitize_text(input: &str) -> String {
    let text = strip_control_chars(input);
    let text = escape_angle_brackets(&text);
    let text = neutralize_mentions(&text);
    let text = neutralize_bot_phrases(&text);
    let text = filter_uris(&text);
    truncate(&text)
}

/// Remove control characters other than newline and tab; CR is dropped so
/// CRLF payloads normalize to LF.
fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// `<` becomes `&lt;` so XML-ish tags cannot reach a downstream renderer
/// in executable form.
fn escape_angle_brackets(input: &str) -> String {
    input.replace('<', "&lt;")
}

/// Wrap @mentions in backticks so the host platform never notifies.
fn neutralize_mentions(input: &str) -> String {
    MENTION_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            format!("{}`@{}`", &caps[1], &caps[2])
        })
        .into_owned()
}

/// Wrap issue-closing phrases (`fixes #12`) in backticks so merges do not
/// act on agent-authored text.
fn neutralize_bot_phrases(input: &str) -> String {
    BOT_PHRASE_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            format!("`{} #{}`", &caps[1], &caps[2])
        })
        .into_owned()
}

/// Keep https URIs on trusted hosts; redact everything else.
fn filter_uris(input: &str) -> String {
    URI_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let uri = &caps[0];
            if uri_is_trusted(uri) {
                uri.to_string()
            } else {
                "(redacted)".to_string()
            }
        })
        .into_owned()
}

fn uri_is_trusted(uri: &str) -> bool {
    let Some(rest) = uri.strip_prefix("https://") else {
        return false;
    };
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("");
    TRUSTED_URI_HOSTS.contains(&host)
}

/// Enforce the byte and line caps, appending an explicit marker when
/// anything was dropped.
fn truncate(input: &str) -> String {
    let mut truncated = false;
    let mut text: String = {
        let lines: Vec<&str> = input.lines().collect();
        if lines.len() > MAX_TEXT_LINES {
            truncated = true;
            lines[..MAX_TEXT_LINES].join("\n")
        } else {
            input.to_string()
        }
    };

    if text.len() > MAX_TEXT_BYTES {
        truncated = true;
        let mut cut = MAX_TEXT_BYTES;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }

    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
