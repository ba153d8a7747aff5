use super::*;

#[test]
fn test_mention_neutralized() {
    let out = sanitize_text("@octocat please take a look");
    assert_eq!(out, "`@octocat` please take a look");
}

#[test]
fn test_mention_mid_sentence() {
    let out = sanitize_text("ping @octocat now");
    assert_eq!(out, "ping `@octocat` now");
}

#[test]
fn test_already_backticked_mention_untouched() {
    let out = sanitize_text("`@octocat` already safe");
    assert_eq!(out, "`@octocat` already safe");
}

#[test]
fn test_email_addresses_left_alone() {
    let out = sanitize_text("contact me at dev@example.com");
    assert_eq!(out, "contact me at dev@example.com");
}

#[test]
fn test_bot_phrase_wrapped() {
    let out = sanitize_text("this fixes #123 for real");
    assert_eq!(out, "this `fixes #123` for real");
}

#[test]
fn test_bot_phrase_variants() {
    assert!(sanitize_text("closes #1").contains("`closes #1`"));
    assert!(sanitize_text("Resolved #42").contains("#42`"));
    assert!(sanitize_text("fix #9").contains("`fix #9`"));
}

#[test]
fn test_angle_brackets_escaped() {
    let out = sanitize_text("hello <script>alert(1)</script>");
    assert!(!out.contains('<'), "got: {out}");
    assert!(out.contains("&lt;script>"), "got: {out}");
}

#[test]
fn test_control_chars_removed() {
    let out = sanitize_text("a\u{0007}b\u{001b}[31mc");
    assert_eq!(out, "ab[31mc");
    assert!(out.chars().all(|c| !c.is_control()));
}

#[test]
fn test_newlines_and_tabs_survive() {
    let out = sanitize_text("line1\nline2\tend");
    assert_eq!(out, "line1\nline2\tend");
}

#[test]
fn test_crlf_normalized() {
    let out = sanitize_text("a\r\nb");
    assert_eq!(out, "a\nb");
}

#[test]
fn test_trusted_https_uri_kept() {
    let out = sanitize_text("see https://github.com/acme/repo/issues/1");
    assert!(out.contains("https://github.com/acme/repo/issues/1"));
}

#[test]
fn test_untrusted_uri_redacted() {
    let out = sanitize_text("grab https://evil.example.com/payload");
    assert!(!out.contains("evil.example.com"), "got: {out}");
    assert!(out.contains("(redacted)"));
}

#[test]
fn test_non_https_scheme_redacted() {
    let out = sanitize_text("open ftp://files.example.com/x and http://github.com/y");
    assert_eq!(out.matches("(redacted)").count(), 2, "got: {out}");
}

#[test]
fn test_scenario_issue_body() {
    // The canonical activation-sanitization scenario.
    let out = sanitize_text("@octocat please fix #123 <script>");
    assert!(out.contains("`@octocat`"), "got: {out}");
    assert!(out.contains("`fix #123`"), "got: {out}");
    assert!(!out.contains('<'), "got: {out}");
    assert!(out.contains("&lt;script>"), "got: {out}");
}

#[test]
fn test_line_cap_truncates_with_marker() {
    let input = "x\n".repeat(MAX_TEXT_LINES + 10);
    let out = sanitize_text(&input);
    assert!(out.ends_with(TRUNCATION_MARKER));
    let body = out.strip_suffix(TRUNCATION_MARKER).unwrap();
    assert_eq!(body.lines().count(), MAX_TEXT_LINES);
}

#[test]
fn test_byte_cap_truncates_on_char_boundary() {
    let input = "é".repeat(MAX_TEXT_BYTES); // 2 bytes per char
    let out = sanitize_text(&input);
    assert!(out.ends_with(TRUNCATION_MARKER));
    assert!(out.len() <= MAX_TEXT_BYTES + TRUNCATION_MARKER.len());
}

#[test]
fn test_under_caps_untouched() {
    let out = sanitize_text("short text");
    assert!(!out.contains("[truncated"));
}

#[test]
fn test_sanitize_is_idempotent_for_mentions() {
    let once = sanitize_text("@octocat hi");
    let twice = sanitize_text(&once);
    assert_eq!(once, twice);
}
