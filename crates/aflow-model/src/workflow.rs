//! The top-level typed workflow, built from the merged front-matter in a
//! single conversion pass.

use aflow_core::{Category, Diagnostic, Diagnostics};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use url::Url;

use crate::engine::EngineSpec;
use crate::extract;
use crate::network::NetworkPolicy;
use crate::permissions::PermissionSet;
use crate::safe_outputs::SafeOutputs;
use crate::tools::{self, ToolSpec};
use crate::triggers::TriggerSet;

/// Top-level keys the conversion pass understands. `metadata` and `env`
/// are pass-through; everything else is typed.
const KNOWN_KEYS: [&str; 20] = [
    "name",
    "description",
    "on",
    "permissions",
    "engine",
    "tools",
    "network",
    "safe-outputs",
    "imports",
    "strict",
    "timeout-minutes",
    "runs-on",
    "roles",
    "project",
    "cache",
    "runtimes",
    "packages",
    "env",
    "metadata",
    "skip-if-match",
];

/// Actor privilege levels accepted for `roles:`.
pub const KNOWN_ROLES: [&str; 4] = ["admin", "maintainer", "write", "all"];

/// Packages installed into the agent container before the engine runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Packages {
    pub pip: Vec<String>,
    pub npm: Vec<String>,
}

impl Packages {
    pub fn is_empty(&self) -> bool {
        self.pip.is_empty() && self.npm.is_empty()
    }
}

/// One cache declaration, emitted as a cache step in the agent job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: String,
    pub path: String,
    pub key: String,
    pub restore_keys: Vec<String>,
}

/// The validated, immutable source-of-truth for one compile invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Derived from the source file basename; the job-name root.
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub on: TriggerSet,
    pub permissions: PermissionSet,
    pub engine: EngineSpec,
    pub tools: Vec<ToolSpec>,
    pub network: NetworkPolicy,
    pub safe_outputs: SafeOutputs,
    pub strict: bool,
    pub timeout_minutes: Option<u32>,
    pub runs_on: String,
    pub roles: Vec<String>,
    /// Default GitHub Projects URL for project-related safe outputs.
    pub project: Option<String>,
    pub cache: Vec<CacheEntry>,
    /// Runtime name → version requests forwarded to the setup action.
    pub runtimes: IndexMap<String, String>,
    pub packages: Packages,
    /// Extra env threaded into the agent job, pass-through.
    pub env: IndexMap<String, String>,
    /// Free-form mapping, pass-through.
    pub metadata: Mapping,
    /// Search-style queries gating activation.
    pub skip_if_match: Option<String>,
    pub skip_if_no_match: Option<String>,
    /// The merged prompt body.
    pub prompt: String,
}

impl Workflow {
    /// Convert the merged mapping. Returns the workflow (when every typed
    /// field extracted) plus all findings; a catastrophic mismatch in a
    /// parent key skips that subtree but the rest still reports.
    pub fn from_merged(id: &str, frontmatter: &Mapping, body: &str) -> (Option<Self>, Diagnostics) {
        let mut diags = Diagnostics::new();

        extract::reject_unknown_keys(
            frontmatter,
            &KNOWN_KEYS
                .iter()
                .copied()
                .chain(["skip-if-no-match"])
                .collect::<Vec<_>>(),
            "",
            &mut diags,
        );

        let on = match extract::get(frontmatter, "on") {
            Some(v) => TriggerSet::from_value(v, &mut diags),
            None => {
                diags.push(
                    Diagnostic::error(Category::User, "missing required 'on' trigger declaration")
                        .at("on")
                        .with_hint("e.g. `on: workflow_dispatch` for manual runs"),
                );
                TriggerSet::default()
            }
        };

        let engine = match extract::get(frontmatter, "engine") {
            Some(v) => EngineSpec::from_value(v, &mut diags),
            None => EngineSpec::default(),
        };

        let permissions = extract::get(frontmatter, "permissions")
            .and_then(|v| {
                extract::as_mapping(v, "permissions", &mut diags)
                    .map(|m| PermissionSet::from_mapping(m, &mut diags))
            })
            .unwrap_or_default();

        let tools = extract::get(frontmatter, "tools")
            .and_then(|v| {
                extract::as_mapping(v, "tools", &mut diags)
                    .map(|m| tools::tools_from_mapping(m, &mut diags))
            })
            .unwrap_or_default();

        let network = extract::get(frontmatter, "network")
            .map(|v| NetworkPolicy::from_value(v, "network", &mut diags))
            .unwrap_or_default();

        let safe_outputs = extract::get(frontmatter, "safe-outputs")
            .and_then(|v| {
                extract::as_mapping(v, "safe-outputs", &mut diags)
                    .map(|m| SafeOutputs::from_mapping(m, &mut diags))
            })
            .unwrap_or_default();

        let strict = extract::get(frontmatter, "strict")
            .and_then(|v| extract::as_bool(v, "strict", &mut diags))
            .unwrap_or(false);

        let timeout_minutes = extract::get(frontmatter, "timeout-minutes")
            .and_then(|v| extract::as_positive_u32(v, "timeout-minutes", &mut diags));

        let runs_on = extract::get(frontmatter, "runs-on")
            .and_then(|v| extract::as_str(v, "runs-on", &mut diags))
            .unwrap_or_else(|| "ubuntu-latest".to_string());

        let roles = extract::get(frontmatter, "roles")
            .and_then(|v| extract::as_str_or_seq(v, "roles", &mut diags))
            .unwrap_or_default();
        for role in &roles {
            if !KNOWN_ROLES.contains(&role.as_str()) {
                diags.push(
                    Diagnostic::error(Category::User, format!("unrecognized role '{role}'"))
                        .at("roles")
                        .with_hint(format!("known roles: {}", KNOWN_ROLES.join(", "))),
                );
            }
        }

        let project = extract::get(frontmatter, "project")
            .and_then(|v| extract::as_str(v, "project", &mut diags));
        if let Some(url) = &project {
            validate_project_url(url, "project", &mut diags);
        }
        for spec in safe_outputs.entries.values() {
            if let Some(url) = &spec.project_url {
                validate_project_url(
                    url,
                    &format!("safe-outputs.{}.project", spec.kind.as_str()),
                    &mut diags,
                );
            }
        }

        let cache = extract::get(frontmatter, "cache")
            .map(|v| parse_cache(v, &mut diags))
            .unwrap_or_default();

        let runtimes = extract::get(frontmatter, "runtimes")
            .and_then(|v| extract::as_str_map(v, "runtimes", &mut diags))
            .unwrap_or_default();

        let packages = extract::get(frontmatter, "packages")
            .and_then(|v| extract::as_mapping(v, "packages", &mut diags))
            .map(|m| {
                extract::reject_unknown_keys(m, &["pip", "npm"], "packages", &mut diags);
                Packages {
                    pip: extract::get(m, "pip")
                        .and_then(|v| extract::as_str_seq(v, "packages.pip", &mut diags))
                        .unwrap_or_default(),
                    npm: extract::get(m, "npm")
                        .and_then(|v| extract::as_str_seq(v, "packages.npm", &mut diags))
                        .unwrap_or_default(),
                }
            })
            .unwrap_or_default();

        let env = extract::get(frontmatter, "env")
            .and_then(|v| extract::as_str_map(v, "env", &mut diags))
            .unwrap_or_default();

        let metadata = extract::get(frontmatter, "metadata")
            .and_then(|v| extract::as_mapping(v, "metadata", &mut diags).cloned())
            .unwrap_or_default();

        let skip_if_match = extract::get(frontmatter, "skip-if-match")
            .and_then(|v| extract::as_str(v, "skip-if-match", &mut diags));
        let skip_if_no_match = extract::get(frontmatter, "skip-if-no-match")
            .and_then(|v| extract::as_str(v, "skip-if-no-match", &mut diags));

        let workflow = Workflow {
            id: id.to_string(),
            name: extract::get(frontmatter, "name")
                .and_then(|v| extract::as_str(v, "name", &mut diags)),
            description: extract::get(frontmatter, "description")
                .and_then(|v| extract::as_str(v, "description", &mut diags)),
            on,
            permissions,
            engine,
            tools,
            network,
            safe_outputs,
            strict,
            timeout_minutes,
            runs_on,
            roles,
            project,
            cache,
            runtimes,
            packages,
            env,
            metadata,
            skip_if_match,
            skip_if_no_match,
            prompt: body.to_string(),
        };

        if diags.has_errors() {
            (None, diags)
        } else {
            (Some(workflow), diags)
        }
    }

    /// Workflow id from a source path basename (`triage-bot.md` → `triage-bot`).
    pub fn id_from_path(path: &std::path::Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "workflow".to_string())
    }

    /// Effective timeout: user value wins, engine default otherwise.
    pub fn effective_timeout_minutes(&self) -> u32 {
        self.timeout_minutes
            .unwrap_or_else(|| self.engine.default_timeout_minutes())
    }
}

fn validate_project_url(raw: &str, path: &str, diags: &mut Diagnostics) {
    let parsed = match Url::parse(raw) {
        Ok(u) => u,
        Err(e) => {
            diags.push(
                Diagnostic::error(Category::User, format!("invalid project URL: {e}")).at(path),
            );
            return;
        }
    };
    let host_ok = parsed.host_str() == Some("github.com");
    let path_ok = parsed.path().contains("/projects/");
    if parsed.scheme() != "https" || !host_ok || !path_ok {
        diags.push(
            Diagnostic::error(
                Category::User,
                format!("'{raw}' is not a GitHub Projects URL"),
            )
            .at(path)
            .with_hint("expected https://github.com/orgs/<org>/projects/<n>"),
        );
    }
}

fn parse_cache(value: &Value, diags: &mut Diagnostics) -> Vec<CacheEntry> {
    let items: Vec<(String, &Mapping)> = match value {
        Value::Mapping(m) => vec![("cache".to_string(), m)],
        Value::Sequence(seq) => seq
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                extract::as_mapping(item, &format!("cache[{i}]"), diags)
                    .map(|m| (format!("cache[{i}]"), m))
            })
            .collect(),
        other => {
            extract::type_error("cache", "a mapping or a sequence of mappings", other, diags);
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for (path, m) in items {
        extract::reject_unknown_keys(m, &["id", "path", "key", "restore-keys"], &path, diags);
        let Some(cache_path) = extract::get(m, "path")
            .and_then(|v| extract::as_str(v, &format!("{path}.path"), diags))
        else {
            diags.push(
                Diagnostic::error(Category::User, "cache entry requires a path").at(path.clone()),
            );
            continue;
        };
        let Some(key) = extract::get(m, "key")
            .and_then(|v| extract::as_str(v, &format!("{path}.key"), diags))
        else {
            diags.push(
                Diagnostic::error(Category::User, "cache entry requires a key").at(path.clone()),
            );
            continue;
        };
        let id = extract::get(m, "id")
            .and_then(|v| extract::as_str(v, &format!("{path}.id"), diags))
            .unwrap_or_else(|| format!("cache-{}", entries.len()));
        entries.push(CacheEntry {
            id,
            path: cache_path,
            key,
            restore_keys: extract::get(m, "restore-keys")
                .and_then(|v| extract::as_str_seq(v, &format!("{path}.restore-keys"), diags))
                .unwrap_or_default(),
        });
    }
    entries
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
