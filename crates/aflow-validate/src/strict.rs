//! Strict-mode policy: hard refusals for patterns that widen the blast
//! radius of a compromised agent. Runs last, only under `strict: true`,
//! and only produces errors.

use std::sync::LazyLock;

use aflow_core::{Category, Diagnostic, Diagnostics};
use aflow_model::{EngineSpec, ToolSpec, Workflow};
use regex::Regex;

static PINNED_ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[0-9a-f]{40}$").expect("valid regex"));

pub fn validate_strict(workflow: &Workflow, diags: &mut Diagnostics) {
    refuse_write_permissions(workflow, diags);
    refuse_bash_wildcards(workflow, diags);
    refuse_network_wildcards(workflow, diags);
    refuse_unfirewalled_containers(workflow, diags);
    refuse_unpinned_actions(workflow, diags);
}

fn refuse_write_permissions(workflow: &Workflow, diags: &mut Diagnostics) {
    for scope in workflow.permissions.write_scopes() {
        diags.push(
            Diagnostic::error(
                Category::Config,
                format!(
                    "strict mode: write permission '{}: write' is not allowed; use safe-outputs",
                    scope.as_str()
                ),
            )
            .at(format!("permissions.{}", scope.as_str()))
            .with_hint(
                "a top-level write scope reaches the agent job; declare the matching \
                 safe-output kind and the write moves to a dedicated job",
            ),
        );
    }
}

fn refuse_bash_wildcards(workflow: &Workflow, diags: &mut Diagnostics) {
    for tool in &workflow.tools {
        let ToolSpec::Bash(bash) = tool else { continue };
        for entry in &bash.allowed {
            if entry.contains('*') {
                diags.push(
                    Diagnostic::error(
                        Category::Config,
                        format!("strict mode: bash allowlist entry '{entry}' contains a wildcard"),
                    )
                    .at("tools.bash.allowed")
                    .with_hint("list exact command prefixes instead"),
                );
            }
        }
    }
}

fn refuse_network_wildcards(workflow: &Workflow, diags: &mut Diagnostics) {
    for domain in workflow.network.explicit_domains() {
        if domain.contains('*') {
            diags.push(
                Diagnostic::error(
                    Category::Config,
                    format!("strict mode: network.allowed entry '{domain}' contains a wildcard"),
                )
                .at("network.allowed")
                .with_hint("list the exact domains the workflow needs"),
            );
        }
    }
}

fn refuse_unfirewalled_containers(workflow: &Workflow, diags: &mut Diagnostics) {
    for tool in &workflow.tools {
        let ToolSpec::McpStdio(mcp) = tool else { continue };
        if mcp.container.is_some() && mcp.network.is_none() {
            diags.push(
                Diagnostic::error(
                    Category::Config,
                    format!(
                        "strict mode: container MCP server '{}' requires a network policy",
                        mcp.id
                    ),
                )
                .at(format!("tools.{}.mcp", mcp.id))
                .with_hint("add mcp.network.allowed listing the server's required domains"),
            );
        }
    }
}

fn refuse_unpinned_actions(workflow: &Workflow, diags: &mut Diagnostics) {
    let EngineSpec::Custom { steps } = &workflow.engine else {
        return;
    };
    for (i, step) in steps.iter().enumerate() {
        let Some(uses) = step
            .raw
            .get(serde_yaml::Value::String("uses".into()))
            .and_then(|v| v.as_str())
        else {
            continue;
        };
        if !PINNED_ACTION_RE.is_match(uses) {
            diags.push(
                Diagnostic::error(
                    Category::Config,
                    format!("strict mode: action '{uses}' is not pinned to a commit SHA"),
                )
                .at(format!("engine.steps[{i}].uses"))
                .with_hint("pin the reference: owner/action@<40-char commit sha>"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow_from_yaml;

    #[test]
    fn test_write_permission_refused() {
        let wf = workflow_from_yaml(
            "on: issues\nstrict: true\nengine: copilot\npermissions:\n  contents: write",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_strict(&wf, &mut diags);
        assert!(diags.has_errors());
        let msg = diags.to_string();
        assert!(
            msg.contains("strict mode: write permission 'contents: write' is not allowed"),
            "got: {msg}"
        );
        assert!(msg.contains("use safe-outputs"), "got: {msg}");
    }

    #[test]
    fn test_bash_wildcard_refused() {
        let wf = workflow_from_yaml(
            "on: issues\nstrict: true\nengine: copilot\ntools:\n  bash: [\"git *\"]",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_strict(&wf, &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_network_wildcard_refused() {
        let wf = workflow_from_yaml(
            "on: issues\nstrict: true\nengine: copilot\nnetwork:\n  allowed: [\"*\"]",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_strict(&wf, &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_container_without_network_refused() {
        let wf = workflow_from_yaml(
            "on: issues\nstrict: true\nengine: copilot\ntools:\n  scan:\n    mcp:\n      container: ghcr.io/a/b:1",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_strict(&wf, &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_unpinned_custom_action_refused() {
        let wf = workflow_from_yaml(
            "on: issues\nstrict: true\nengine:\n  id: custom\n  steps:\n    - uses: acme/agent-action@v2",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_strict(&wf, &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_pinned_custom_action_passes() {
        let wf = workflow_from_yaml(
            "on: issues\nstrict: true\nengine:\n  id: custom\n  steps:\n    - uses: acme/agent-action@0123456789abcdef0123456789abcdef01234567",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_strict(&wf, &mut diags);
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn test_clean_strict_workflow_passes() {
        let wf = workflow_from_yaml(
            "on: issues\nstrict: true\nengine: copilot\ntools:\n  bash: [\"git status\"]\nsafe-outputs:\n  add-comment:\n",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_strict(&wf, &mut diags);
        assert!(diags.is_empty(), "{diags}");
    }
}
