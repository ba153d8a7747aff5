//! MCP gateway configuration.
//!
//! For each declared tool the agent job materializes an MCP endpoint; the
//! gateway reads one JSON document describing every server plus its tool
//! allowlist. Built-in GitHub tools resolve to the remote GitHub MCP
//! endpoint (or a local container) with an allowlist equal to the user's
//! list unioned with the toolset-implied set. Safe-input tools register as
//! a locally exposed server.

use aflow_model::{GithubMode, NetworkPolicy, ToolSpec, Workflow};
use serde_json::{Map, Value, json};

/// Remote GitHub MCP endpoint used in `mode: remote`.
pub const GITHUB_MCP_URL: &str = "https://api.githubcopilot.com/mcp/";
/// Image used for `mode: local`.
pub const GITHUB_MCP_IMAGE: &str = "ghcr.io/github/github-mcp-server:v0.18.0";

/// Fine-grained tool names implied by each GitHub toolset.
pub fn toolset_tools(toolset: &str) -> &'static [&'static str] {
    match toolset {
        "issues" => &["issue_read", "issue_search", "issue_update", "add_comment"],
        "pulls" => &[
            "pull_request_read",
            "pull_request_diff",
            "pull_request_review",
        ],
        "repos" => &["file_read", "list_branches", "search_code"],
        "discussions" => &["discussion_read", "discussion_search"],
        "actions" => &["workflow_run_read", "job_log_read"],
        _ => &[],
    }
}

/// Render the gateway configuration document for the agent job.
pub fn render(workflow: &Workflow) -> Value {
    let mut servers = Map::new();

    for tool in &workflow.tools {
        match tool {
            ToolSpec::Github(github) => {
                let mut allowed: Vec<String> = Vec::new();
                for toolset in &github.toolsets {
                    for name in toolset_tools(toolset) {
                        if !allowed.iter().any(|a| a == name) {
                            allowed.push((*name).to_string());
                        }
                    }
                }
                for name in &github.allowed {
                    if !allowed.contains(name) {
                        allowed.push(name.clone());
                    }
                }
                let server = match github.mode {
                    GithubMode::Remote => json!({
                        "type": "http",
                        "url": GITHUB_MCP_URL,
                        "headers": {
                            "Authorization": format!(
                                "Bearer {}",
                                github.token.as_deref().unwrap_or("${{ secrets.GITHUB_TOKEN }}")
                            ),
                        },
                        "allowed": allowed,
                    }),
                    GithubMode::Local => json!({
                        "type": "stdio",
                        "container": GITHUB_MCP_IMAGE,
                        "env": {
                            "GITHUB_PERSONAL_ACCESS_TOKEN": github
                                .token
                                .as_deref()
                                .unwrap_or("${{ secrets.GITHUB_TOKEN }}"),
                        },
                        "network": network_json(&NetworkPolicy::default()),
                        "allowed": allowed,
                    }),
                };
                servers.insert("github".to_string(), server);
            }
            ToolSpec::McpStdio(stdio) => {
                let mut server = Map::new();
                server.insert("type".into(), json!("stdio"));
                if let Some(command) = &stdio.command {
                    server.insert("command".into(), json!(command));
                    server.insert("args".into(), json!(stdio.args));
                }
                if let Some(container) = &stdio.container {
                    server.insert("container".into(), json!(container));
                    // Containers run under their own egress policy; absent
                    // means deny-all.
                    let policy = stdio.network.clone().unwrap_or(NetworkPolicy::DenyAll);
                    server.insert("network".into(), network_json(&policy));
                }
                if !stdio.env.is_empty() {
                    server.insert("env".into(), json!(stdio.env));
                }
                server.insert("allowed".into(), json!(stdio.allowed));
                servers.insert(stdio.id.clone(), Value::Object(server));
            }
            ToolSpec::McpHttp(http) => {
                servers.insert(
                    http.id.clone(),
                    json!({
                        "type": "http",
                        "url": http.url,
                        "headers": http.headers,
                        "allowed": http.allowed,
                    }),
                );
            }
            ToolSpec::SafeInput(tool) => {
                let inputs: Vec<Value> = tool
                    .inputs
                    .iter()
                    .map(|field| {
                        json!({
                            "name": field.name,
                            "type": field.kind,
                            "description": field.description,
                            "required": field.required,
                            "default": field.default,
                            "choices": field.choices,
                        })
                    })
                    .collect();
                servers.insert(
                    tool.id.clone(),
                    json!({
                        "type": "local",
                        "description": tool.description,
                        "inputs": inputs,
                        "run": tool.run,
                    }),
                );
            }
            // Bash and browser run inside the engine process; memory is
            // wired through the cache, not the gateway.
            ToolSpec::Bash(_) | ToolSpec::Browser(_) | ToolSpec::Memory => {}
        }
    }

    json!({ "servers": Value::Object(servers) })
}

fn network_json(policy: &NetworkPolicy) -> Value {
    json!({ "allowed_domains": policy.resolved_domains() })
}
