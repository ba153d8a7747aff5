//! Network policy validation: domain syntax and container egress rules.

use std::sync::LazyLock;

use aflow_core::{Category, Diagnostic, Diagnostics};
use aflow_model::{NetworkPolicy, ToolSpec, Workflow};
use regex::Regex;

/// Domain entries: dotted labels, optional single leading `*.` wildcard,
/// optional port. A bare `*` is syntactically accepted here and refused by
/// strict mode.
static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*\.)?[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?)+(:\d{1,5})?$")
        .expect("valid regex")
});

pub fn validate_network(workflow: &Workflow, diags: &mut Diagnostics) {
    check_policy(&workflow.network, "network.allowed", diags);

    for tool in &workflow.tools {
        if let ToolSpec::McpStdio(mcp) = tool {
            if let Some(policy) = &mcp.network {
                check_policy(
                    policy,
                    &format!("tools.{}.mcp.network.allowed", mcp.id),
                    diags,
                );
            }
            if mcp.container.is_some() && mcp.network.is_none() {
                diags.push(
                    Diagnostic::warning(
                        Category::Config,
                        format!(
                            "container MCP server '{}' declares no network policy; it will run with egress denied",
                            mcp.id
                        ),
                    )
                    .at(format!("tools.{}.mcp", mcp.id))
                    .with_hint("add mcp.network.allowed with the domains the server needs"),
                );
            }
        }
        if let ToolSpec::Browser(browser) = tool {
            for domain in &browser.allowed_domains {
                if domain != "*" && !DOMAIN_RE.is_match(domain) {
                    diags.push(
                        Diagnostic::error(
                            Category::User,
                            format!("'{domain}' is not a valid domain"),
                        )
                        .at("tools.browser.allowed-domains"),
                    );
                }
            }
        }
    }
}

fn check_policy(policy: &NetworkPolicy, path: &str, diags: &mut Diagnostics) {
    for domain in policy.explicit_domains() {
        if domain == "*" {
            // Tolerated outside strict mode; the firewall becomes allow-all.
            diags.push(
                Diagnostic::warning(
                    Category::Config,
                    "'*' disables the egress firewall entirely",
                )
                .at(path.to_string())
                .with_hint("list the domains the workflow actually needs"),
            );
            continue;
        }
        if !DOMAIN_RE.is_match(domain) {
            diags.push(
                Diagnostic::error(
                    Category::User,
                    format!("'{domain}' is not a valid domain (expected e.g. api.example.com)"),
                )
                .at(path.to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow_from_yaml;

    #[test]
    fn test_valid_domains_pass() {
        let wf = workflow_from_yaml(
            "on: issues\nengine: copilot\nnetwork:\n  allowed: [defaults, \"api.example.com\", \"*.internal.example.com\", \"host.example.com:8443\"]",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_network(&wf, &mut diags);
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn test_invalid_domain_rejected() {
        let wf = workflow_from_yaml(
            "on: issues\nengine: copilot\nnetwork:\n  allowed: [\"not a domain\"]",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_network(&wf, &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_bare_wildcard_warns_outside_strict() {
        let wf = workflow_from_yaml(
            "on: issues\nengine: copilot\nnetwork:\n  allowed: [\"*\"]",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_network(&wf, &mut diags);
        assert!(!diags.has_errors());
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_container_without_policy_warns() {
        let wf = workflow_from_yaml(
            "on: issues\nengine: copilot\ntools:\n  scanner:\n    mcp:\n      container: ghcr.io/a/b:1",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_network(&wf, &mut diags);
        assert_eq!(diags.warnings().count(), 1);
        assert!(diags.to_string().contains("scanner"));
    }

    #[test]
    fn test_mcp_network_domains_checked() {
        let wf = workflow_from_yaml(
            "on: issues\nengine: copilot\ntools:\n  scanner:\n    mcp:\n      container: ghcr.io/a/b:1\n      network:\n        allowed: [\"bad domain\"]",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_network(&wf, &mut diags);
        assert!(diags.has_errors());
    }
}
