use aflow_core::Diagnostics;
use serde_yaml::Mapping;

use super::*;

fn parse(s: &str) -> (Vec<ToolSpec>, Diagnostics) {
    let mapping: Mapping = serde_yaml::from_str(s).unwrap();
    let mut diags = Diagnostics::new();
    let tools = tools_from_mapping(&mapping, &mut diags);
    (tools, diags)
}

#[test]
fn test_github_defaults() {
    let (tools, diags) = parse("github:\n");
    assert!(!diags.has_errors());
    match &tools[0] {
        ToolSpec::Github(g) => {
            assert_eq!(g.mode, GithubMode::Remote);
            assert!(g.allowed.is_empty());
        }
        other => panic!("expected Github, got {other:?}"),
    }
}

#[test]
fn test_github_with_allowlist() {
    let (tools, diags) = parse("github:\n  mode: local\n  toolsets: [issues]\n  allowed: [issue_read, add_comment]");
    assert!(!diags.has_errors());
    match &tools[0] {
        ToolSpec::Github(g) => {
            assert_eq!(g.mode, GithubMode::Local);
            assert_eq!(g.toolsets, ["issues"]);
            assert_eq!(g.allowed, ["issue_read", "add_comment"]);
        }
        other => panic!("expected Github, got {other:?}"),
    }
}

#[test]
fn test_bash_shorthand_list() {
    let (tools, diags) = parse("bash: [\"git status\", \"ls\"]");
    assert!(!diags.has_errors());
    match &tools[0] {
        ToolSpec::Bash(b) => assert_eq!(b.allowed, ["git status", "ls"]),
        other => panic!("expected Bash, got {other:?}"),
    }
}

#[test]
fn test_browser_domains() {
    let (tools, diags) = parse("browser:\n  allowed-domains: [example.com]");
    assert!(!diags.has_errors());
    match &tools[0] {
        ToolSpec::Browser(b) => assert_eq!(b.allowed_domains, ["example.com"]),
        other => panic!("expected Browser, got {other:?}"),
    }
}

#[test]
fn test_memory_flag() {
    let (tools, diags) = parse("memory: true");
    assert!(!diags.has_errors());
    assert!(matches!(tools[0], ToolSpec::Memory));
}

#[test]
fn test_memory_false_omits_tool() {
    let (tools, diags) = parse("memory: false");
    assert!(!diags.has_errors());
    assert!(tools.is_empty());
}

#[test]
fn test_mcp_stdio_command() {
    let (tools, diags) = parse(
        "repo-search:\n  mcp:\n    command: npx\n    args: [\"-y\", \"repo-search-mcp\"]\n    env:\n      TOKEN: abc\n  allowed: [search]",
    );
    assert!(!diags.has_errors());
    match &tools[0] {
        ToolSpec::McpStdio(t) => {
            assert_eq!(t.id, "repo-search");
            assert_eq!(t.command.as_deref(), Some("npx"));
            assert!(t.container.is_none());
            assert_eq!(t.env.get("TOKEN").unwrap(), "abc");
            assert_eq!(t.allowed, ["search"]);
        }
        other => panic!("expected McpStdio, got {other:?}"),
    }
}

#[test]
fn test_mcp_container_with_network() {
    let (tools, diags) = parse(
        "scanner:\n  mcp:\n    container: ghcr.io/acme/scanner:1\n    network:\n      allowed: [defaults]",
    );
    assert!(!diags.has_errors());
    match &tools[0] {
        ToolSpec::McpStdio(t) => {
            assert_eq!(t.container.as_deref(), Some("ghcr.io/acme/scanner:1"));
            assert!(t.network.is_some());
        }
        other => panic!("expected McpStdio, got {other:?}"),
    }
}

#[test]
fn test_mcp_http() {
    let (tools, diags) = parse(
        "wiki:\n  mcp:\n    url: https://mcp.example.com/mcp\n    headers:\n      Authorization: Bearer x",
    );
    assert!(!diags.has_errors());
    match &tools[0] {
        ToolSpec::McpHttp(t) => {
            assert_eq!(t.url, "https://mcp.example.com/mcp");
            assert_eq!(t.headers.get("Authorization").unwrap(), "Bearer x");
        }
        other => panic!("expected McpHttp, got {other:?}"),
    }
}

#[test]
fn test_mcp_mixing_command_and_url_rejected() {
    let (_, diags) = parse("bad:\n  mcp:\n    command: npx\n    url: https://x.com");
    assert!(diags.has_errors());
    let msg = diags.errors().next().unwrap().message.clone();
    assert!(msg.contains("exactly one"), "got: {msg}");
}

#[test]
fn test_mcp_mixing_command_and_container_rejected() {
    let (_, diags) = parse("bad:\n  mcp:\n    command: npx\n    container: img");
    assert!(diags.has_errors());
}

#[test]
fn test_mcp_http_with_container_rejected() {
    let (_, diags) = parse("bad:\n  mcp:\n    url: https://x.com\n    container: img");
    assert!(diags.has_errors());
}

#[test]
fn test_mcp_none_of_the_three_rejected() {
    let (_, diags) = parse("bad:\n  mcp:\n    args: [x]");
    assert!(diags.has_errors());
}

#[test]
fn test_custom_without_mcp_or_input_rejected() {
    let (_, diags) = parse("mystery:\n  allowed: [x]");
    assert!(diags.has_errors());
}

#[test]
fn test_safe_input_tool() {
    let (tools, diags) = parse(
        "lookup-owner:\n  description: Find the code owner\n  input:\n    path:\n      type: string\n      required: true\n  run: |\n    grep \"$path\" CODEOWNERS",
    );
    assert!(!diags.has_errors());
    match &tools[0] {
        ToolSpec::SafeInput(t) => {
            assert_eq!(t.id, "lookup-owner");
            assert_eq!(t.inputs.len(), 1);
            assert_eq!(t.inputs[0].name, "path");
            assert!(t.inputs[0].required);
            assert!(t.run.contains("CODEOWNERS"));
        }
        other => panic!("expected SafeInput, got {other:?}"),
    }
}

#[test]
fn test_safe_input_choice_requires_choices() {
    let (_, diags) = parse(
        "pick:\n  input:\n    level:\n      type: choice\n  run: echo\n",
    );
    assert!(diags.has_errors());
}

#[test]
fn test_reserved_safe_outputs_id_rejected() {
    let (_, diags) = parse("safe-outputs:\n  mcp:\n    command: x");
    assert!(diags.has_errors());
}
