//! Tool declarations: built-ins, MCP servers, and safe-input tools.
//!
//! Each entry under `tools:` becomes a tagged [`ToolSpec`]. The reserved
//! ids (`github`, `bash`, `browser`, `memory`) select built-in shapes; any
//! other id must declare either an `mcp:` block (a tool server) or an
//! `input:` schema plus `run:` body (a locally exposed safe-input tool).

use aflow_core::{Category, Diagnostic, Diagnostics};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::extract;
use crate::network::NetworkPolicy;

/// Ids owned by built-in tools; user MCP servers may not reuse them.
pub const RESERVED_TOOL_IDS: [&str; 5] = ["github", "bash", "browser", "memory", "safe-outputs"];

/// Where the built-in GitHub MCP endpoint runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GithubMode {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubTool {
    pub mode: GithubMode,
    /// Toolset subsets (issues, pulls, repos, ...); each implies a group of
    /// fine-grained tool names.
    pub toolsets: Vec<String>,
    /// Fine-grained tool-name allowlist, unioned with the toolset-implied set.
    pub allowed: Vec<String>,
    /// Expression for a token other than the default workflow token.
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BashTool {
    /// Allowed command prefixes. `*` entries are refused under strict mode.
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserTool {
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpStdioTool {
    pub id: String,
    /// Host command to spawn, exclusive with `container`.
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Container image to run, exclusive with `command`.
    pub container: Option<String>,
    pub env: IndexMap<String, String>,
    /// Egress policy for containerized servers; required under strict mode.
    pub network: Option<NetworkPolicy>,
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpHttpTool {
    pub id: String,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub allowed: Vec<String>,
}

/// Input field of a safe-input tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeInputField {
    pub name: String,
    pub kind: SafeInputKind,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<String>,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeInputKind {
    String,
    Boolean,
    Number,
    Choice,
}

impl SafeInputKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "number" => Some(Self::Number),
            "choice" => Some(Self::Choice),
            _ => None,
        }
    }
}

/// User-defined inline tool: a typed input schema and a shell body,
/// exposed to the agent as a local MCP tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeInputTool {
    pub id: String,
    pub description: Option<String>,
    pub inputs: Vec<SafeInputField>,
    pub run: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolSpec {
    Github(GithubTool),
    Bash(BashTool),
    Browser(BrowserTool),
    Memory,
    McpStdio(McpStdioTool),
    McpHttp(McpHttpTool),
    SafeInput(SafeInputTool),
}

impl ToolSpec {
    pub fn id(&self) -> &str {
        match self {
            ToolSpec::Github(_) => "github",
            ToolSpec::Bash(_) => "bash",
            ToolSpec::Browser(_) => "browser",
            ToolSpec::Memory => "memory",
            ToolSpec::McpStdio(t) => &t.id,
            ToolSpec::McpHttp(t) => &t.id,
            ToolSpec::SafeInput(t) => &t.id,
        }
    }
}

/// Parse the `tools:` mapping into specs. Ids are unique by construction
/// (the YAML layer rejects duplicate mapping keys).
pub fn tools_from_mapping(mapping: &Mapping, diags: &mut Diagnostics) -> Vec<ToolSpec> {
    let mut tools = Vec::new();
    for (key, value) in mapping {
        let Some(id) = key.as_str() else {
            extract::type_error("tools", "string tool ids", key, diags);
            continue;
        };
        let path = format!("tools.{id}");
        let spec = match id {
            "github" => parse_github(value, &path, diags).map(ToolSpec::Github),
            "bash" => parse_bash(value, &path, diags).map(ToolSpec::Bash),
            "browser" => parse_browser(value, &path, diags).map(ToolSpec::Browser),
            "memory" => parse_memory(value, &path, diags),
            "safe-outputs" => {
                diags.push(
                    Diagnostic::error(
                        Category::User,
                        "'safe-outputs' is a reserved tool id",
                    )
                    .at(path.clone())
                    .with_hint("declare safe outputs under the top-level safe-outputs key"),
                );
                None
            }
            _ => parse_custom(id, value, &path, diags),
        };
        if let Some(spec) = spec {
            tools.push(spec);
        }
    }
    tools
}

fn parse_github(value: &Value, path: &str, diags: &mut Diagnostics) -> Option<GithubTool> {
    let m = match value {
        Value::Null => return Some(default_github()),
        _ => extract::as_mapping(value, path, diags)?,
    };
    extract::reject_unknown_keys(m, &["mode", "toolsets", "allowed", "token"], path, diags);

    let mode = match extract::get(m, "mode") {
        Some(v) => {
            let raw = extract::as_str(v, &format!("{path}.mode"), diags)?;
            match raw.as_str() {
                "remote" => GithubMode::Remote,
                "local" => GithubMode::Local,
                other => {
                    diags.push(
                        Diagnostic::error(
                            Category::User,
                            format!("invalid mode '{other}', expected remote or local"),
                        )
                        .at(format!("{path}.mode")),
                    );
                    return None;
                }
            }
        }
        None => GithubMode::Remote,
    };

    Some(GithubTool {
        mode,
        toolsets: extract::get(m, "toolsets")
            .and_then(|v| extract::as_str_seq(v, &format!("{path}.toolsets"), diags))
            .unwrap_or_default(),
        allowed: extract::get(m, "allowed")
            .and_then(|v| extract::as_str_seq(v, &format!("{path}.allowed"), diags))
            .unwrap_or_default(),
        token: extract::get(m, "token")
            .and_then(|v| extract::as_str(v, &format!("{path}.token"), diags)),
    })
}

fn default_github() -> GithubTool {
    GithubTool {
        mode: GithubMode::Remote,
        toolsets: Vec::new(),
        allowed: Vec::new(),
        token: None,
    }
}

fn parse_bash(value: &Value, path: &str, diags: &mut Diagnostics) -> Option<BashTool> {
    let m = match value {
        Value::Null => {
            return Some(BashTool {
                allowed: Vec::new(),
            });
        }
        Value::Sequence(_) => {
            // Shorthand: `bash: [git status, ls]`
            let allowed = extract::as_str_seq(value, path, diags)?;
            return Some(BashTool { allowed });
        }
        _ => extract::as_mapping(value, path, diags)?,
    };
    extract::reject_unknown_keys(m, &["allowed"], path, diags);
    Some(BashTool {
        allowed: extract::get(m, "allowed")
            .and_then(|v| extract::as_str_seq(v, &format!("{path}.allowed"), diags))
            .unwrap_or_default(),
    })
}

fn parse_browser(value: &Value, path: &str, diags: &mut Diagnostics) -> Option<BrowserTool> {
    let m = extract::as_mapping(value, path, diags)?;
    extract::reject_unknown_keys(m, &["allowed-domains"], path, diags);
    Some(BrowserTool {
        allowed_domains: extract::get(m, "allowed-domains")
            .and_then(|v| extract::as_str_seq(v, &format!("{path}.allowed-domains"), diags))
            .unwrap_or_default(),
    })
}

fn parse_memory(value: &Value, path: &str, diags: &mut Diagnostics) -> Option<ToolSpec> {
    match value {
        Value::Bool(true) | Value::Null => Some(ToolSpec::Memory),
        Value::Bool(false) => None,
        other => {
            extract::type_error(path, "true or nothing", other, diags);
            None
        }
    }
}

fn parse_custom(id: &str, value: &Value, path: &str, diags: &mut Diagnostics) -> Option<ToolSpec> {
    let m = extract::as_mapping(value, path, diags)?;

    let has_mcp = extract::get(m, "mcp").is_some();
    let has_input = extract::get(m, "input").is_some();
    match (has_mcp, has_input) {
        (true, true) => {
            diags.push(
                Diagnostic::error(
                    Category::User,
                    "a tool cannot be both an MCP server and a safe-input tool",
                )
                .at(path.to_string()),
            );
            None
        }
        (true, false) => parse_mcp(id, m, path, diags),
        (false, true) => parse_safe_input(id, m, path, diags).map(ToolSpec::SafeInput),
        (false, false) => {
            diags.push(
                Diagnostic::error(
                    Category::User,
                    format!("tool '{id}' declares neither an mcp: block nor an input: schema"),
                )
                .at(path.to_string())
                .with_hint("add mcp: {command|container|url} or input: plus run:"),
            );
            None
        }
    }
}

fn parse_mcp(id: &str, m: &Mapping, path: &str, diags: &mut Diagnostics) -> Option<ToolSpec> {
    extract::reject_unknown_keys(m, &["mcp", "allowed"], path, diags);
    let mcp_path = format!("{path}.mcp");
    let mcp = extract::as_mapping(extract::get(m, "mcp")?, &mcp_path, diags)?;
    extract::reject_unknown_keys(
        mcp,
        &["command", "args", "container", "env", "network", "url", "headers"],
        &mcp_path,
        diags,
    );

    let allowed = extract::get(m, "allowed")
        .and_then(|v| extract::as_str_seq(v, &format!("{path}.allowed"), diags))
        .unwrap_or_default();

    let command = extract::get(mcp, "command")
        .and_then(|v| extract::as_str(v, &format!("{mcp_path}.command"), diags));
    let container = extract::get(mcp, "container")
        .and_then(|v| extract::as_str(v, &format!("{mcp_path}.container"), diags));
    let url = extract::get(mcp, "url")
        .and_then(|v| extract::as_str(v, &format!("{mcp_path}.url"), diags));

    // Exactly one transport: command-stdio, container-stdio, or HTTP.
    let declared = [command.is_some(), container.is_some(), url.is_some()]
        .iter()
        .filter(|b| **b)
        .count();
    if declared != 1 {
        diags.push(
            Diagnostic::error(
                Category::Config,
                format!(
                    "MCP server '{id}' must declare exactly one of command, container, or url \
                     (found {declared})"
                ),
            )
            .at(mcp_path.clone())
            .with_hint("command runs a host process, container runs an image, url connects over HTTP"),
        );
        return None;
    }

    if url.is_some() {
        for forbidden in ["command", "args", "container", "env", "network"] {
            if extract::get(mcp, forbidden).is_some() {
                diags.push(
                    Diagnostic::error(
                        Category::Config,
                        format!("HTTP MCP server '{id}' cannot carry '{forbidden}'"),
                    )
                    .at(format!("{mcp_path}.{forbidden}")),
                );
            }
        }
        return Some(ToolSpec::McpHttp(McpHttpTool {
            id: id.to_string(),
            url: url.unwrap_or_default(),
            headers: extract::get(mcp, "headers")
                .and_then(|v| extract::as_str_map(v, &format!("{mcp_path}.headers"), diags))
                .unwrap_or_default(),
            allowed,
        }));
    }

    if extract::get(mcp, "headers").is_some() {
        diags.push(
            Diagnostic::error(
                Category::Config,
                format!("stdio MCP server '{id}' cannot carry 'headers'"),
            )
            .at(format!("{mcp_path}.headers")),
        );
    }

    let network = extract::get(mcp, "network")
        .map(|v| NetworkPolicy::from_value(v, &format!("{mcp_path}.network"), diags));

    Some(ToolSpec::McpStdio(McpStdioTool {
        id: id.to_string(),
        command,
        args: extract::get(mcp, "args")
            .and_then(|v| extract::as_str_seq(v, &format!("{mcp_path}.args"), diags))
            .unwrap_or_default(),
        container,
        env: extract::get(mcp, "env")
            .and_then(|v| extract::as_str_map(v, &format!("{mcp_path}.env"), diags))
            .unwrap_or_default(),
        network,
        allowed,
    }))
}

fn parse_safe_input(
    id: &str,
    m: &Mapping,
    path: &str,
    diags: &mut Diagnostics,
) -> Option<SafeInputTool> {
    extract::reject_unknown_keys(m, &["description", "input", "run"], path, diags);

    let Some(run) = extract::get(m, "run")
        .and_then(|v| extract::as_str(v, &format!("{path}.run"), diags))
    else {
        diags.push(
            Diagnostic::error(
                Category::User,
                format!("safe-input tool '{id}' requires a run: shell body"),
            )
            .at(path.to_string()),
        );
        return None;
    };

    let mut inputs = Vec::new();
    let input_path = format!("{path}.input");
    if let Some(input_map) = extract::get(m, "input")
        .and_then(|v| extract::as_mapping(v, &input_path, diags))
    {
        for (key, field_val) in input_map {
            let Some(name) = key.as_str() else {
                extract::type_error(&input_path, "string field names", key, diags);
                continue;
            };
            let field_path = format!("{input_path}.{name}");
            let Some(field) = extract::as_mapping(field_val, &field_path, diags) else {
                continue;
            };
            extract::reject_unknown_keys(
                field,
                &["type", "description", "required", "default", "choices"],
                &field_path,
                diags,
            );
            let kind = match extract::get(field, "type") {
                Some(v) => {
                    let raw = extract::as_str(v, &format!("{field_path}.type"), diags)?;
                    match SafeInputKind::parse(&raw) {
                        Some(k) => k,
                        None => {
                            diags.push(
                                Diagnostic::error(
                                    Category::User,
                                    format!(
                                        "invalid input type '{raw}', expected string, boolean, number, or choice"
                                    ),
                                )
                                .at(format!("{field_path}.type")),
                            );
                            continue;
                        }
                    }
                }
                None => SafeInputKind::String,
            };
            let choices = extract::get(field, "choices")
                .and_then(|v| extract::as_str_seq(v, &format!("{field_path}.choices"), diags))
                .unwrap_or_default();
            if kind == SafeInputKind::Choice && choices.is_empty() {
                diags.push(
                    Diagnostic::error(
                        Category::User,
                        "choice inputs require a non-empty choices list",
                    )
                    .at(field_path.clone()),
                );
            }
            inputs.push(SafeInputField {
                name: name.to_string(),
                kind,
                description: extract::get(field, "description")
                    .and_then(|v| extract::as_str(v, &format!("{field_path}.description"), diags)),
                required: extract::get(field, "required")
                    .and_then(|v| extract::as_bool(v, &format!("{field_path}.required"), diags))
                    .unwrap_or(false),
                default: extract::get(field, "default")
                    .and_then(|v| extract::as_str(v, &format!("{field_path}.default"), diags)),
                choices,
            });
        }
    }

    Some(SafeInputTool {
        id: id.to_string(),
        description: extract::get(m, "description")
            .and_then(|v| extract::as_str(v, &format!("{path}.description"), diags)),
        inputs,
        run,
    })
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
