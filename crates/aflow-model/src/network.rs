//! Network policy: ecosystem presets plus explicit domains, deny by default.

use aflow_core::{Category, Diagnostic, Diagnostics};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::extract;

/// Shorthand identifiers that expand to a curated domain set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Defaults,
    Github,
    Node,
    Python,
    Go,
    Java,
    Dotnet,
    Containers,
}

impl Ecosystem {
    pub const ALL: [Ecosystem; 8] = [
        Ecosystem::Defaults,
        Ecosystem::Github,
        Ecosystem::Node,
        Ecosystem::Python,
        Ecosystem::Go,
        Ecosystem::Java,
        Ecosystem::Dotnet,
        Ecosystem::Containers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Defaults => "defaults",
            Ecosystem::Github => "github",
            Ecosystem::Node => "node",
            Ecosystem::Python => "python",
            Ecosystem::Go => "go",
            Ecosystem::Java => "java",
            Ecosystem::Dotnet => "dotnet",
            Ecosystem::Containers => "containers",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Ecosystem::ALL.iter().copied().find(|e| e.as_str() == s)
    }

    /// Curated domain set the firewall allows for this ecosystem.
    pub fn domains(&self) -> &'static [&'static str] {
        match self {
            Ecosystem::Defaults => &[
                "api.github.com",
                "github.com",
                "raw.githubusercontent.com",
                "objects.githubusercontent.com",
            ],
            Ecosystem::Github => &[
                "api.github.com",
                "github.com",
                "codeload.github.com",
                "uploads.github.com",
                "raw.githubusercontent.com",
                "objects.githubusercontent.com",
                "ghcr.io",
            ],
            Ecosystem::Node => &["registry.npmjs.org", "registry.yarnpkg.com", "nodejs.org"],
            Ecosystem::Python => &["pypi.org", "files.pythonhosted.org", "pythonhosted.org"],
            Ecosystem::Go => &["proxy.golang.org", "sum.golang.org", "index.golang.org"],
            Ecosystem::Java => &["repo.maven.apache.org", "repo1.maven.org", "plugins.gradle.org"],
            Ecosystem::Dotnet => &["api.nuget.org", "nuget.org", "dist.nuget.org"],
            Ecosystem::Containers => &[
                "registry-1.docker.io",
                "auth.docker.io",
                "production.cloudflare.docker.com",
                "ghcr.io",
                "quay.io",
            ],
        }
    }
}

/// Allowed egress for the agent container. The firewall denies everything
/// not covered by the union of ecosystem presets and explicit domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkPolicy {
    DenyAll,
    Allow {
        ecosystems: Vec<Ecosystem>,
        domains: Vec<String>,
    },
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        NetworkPolicy::Allow {
            ecosystems: vec![Ecosystem::Defaults],
            domains: Vec::new(),
        }
    }
}

impl NetworkPolicy {
    /// The resolved domain allowlist: ecosystem presets first, explicit
    /// domains after, deduplicated in insertion order.
    pub fn resolved_domains(&self) -> Vec<String> {
        match self {
            NetworkPolicy::DenyAll => Vec::new(),
            NetworkPolicy::Allow {
                ecosystems,
                domains,
            } => {
                let mut out: Vec<String> = Vec::new();
                for eco in ecosystems {
                    for domain in eco.domains() {
                        if !out.iter().any(|d| d == domain) {
                            out.push((*domain).to_string());
                        }
                    }
                }
                for domain in domains {
                    if !out.contains(domain) {
                        out.push(domain.clone());
                    }
                }
                out
            }
        }
    }

    pub fn explicit_domains(&self) -> &[String] {
        match self {
            NetworkPolicy::DenyAll => &[],
            NetworkPolicy::Allow { domains, .. } => domains,
        }
    }

    /// Parse the `network:` value. Accepted shapes:
    /// - `network: defaults` (single ecosystem shorthand)
    /// - `network: deny-all`
    /// - `network: { allowed: [defaults, node, "api.example.com"] }`
    pub fn from_value(value: &Value, path: &str, diags: &mut Diagnostics) -> Self {
        match value {
            Value::String(s) if s == "deny-all" => NetworkPolicy::DenyAll,
            Value::String(s) => match Ecosystem::parse(s) {
                Some(eco) => NetworkPolicy::Allow {
                    ecosystems: vec![eco],
                    domains: Vec::new(),
                },
                None => {
                    diags.push(
                        Diagnostic::error(
                            Category::User,
                            format!("unrecognized network shorthand '{s}'"),
                        )
                        .at(path)
                        .with_hint("use deny-all, an ecosystem identifier, or an allowed: list"),
                    );
                    NetworkPolicy::DenyAll
                }
            },
            Value::Mapping(m) => {
                extract::reject_unknown_keys(m, &["allowed"], path, diags);
                let Some(allowed) = extract::get(m, "allowed") else {
                    // An empty network block means deny everything.
                    return NetworkPolicy::DenyAll;
                };
                let entries = extract::as_str_seq(allowed, &format!("{path}.allowed"), diags)
                    .unwrap_or_default();
                let mut ecosystems = Vec::new();
                let mut domains = Vec::new();
                for entry in entries {
                    match Ecosystem::parse(&entry) {
                        Some(eco) => {
                            if !ecosystems.contains(&eco) {
                                ecosystems.push(eco);
                            }
                        }
                        None => {
                            if !domains.contains(&entry) {
                                domains.push(entry);
                            }
                        }
                    }
                }
                NetworkPolicy::Allow {
                    ecosystems,
                    domains,
                }
            }
            other => {
                extract::type_error(path, "a string or a mapping", other, diags);
                NetworkPolicy::DenyAll
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_shorthand_ecosystem() {
        let mut diags = Diagnostics::new();
        let policy = NetworkPolicy::from_value(&yaml("defaults"), "network", &mut diags);
        assert!(!diags.has_errors());
        assert!(policy.resolved_domains().contains(&"api.github.com".to_string()));
    }

    #[test]
    fn test_deny_all() {
        let mut diags = Diagnostics::new();
        let policy = NetworkPolicy::from_value(&yaml("deny-all"), "network", &mut diags);
        assert_eq!(policy, NetworkPolicy::DenyAll);
        assert!(policy.resolved_domains().is_empty());
    }

    #[test]
    fn test_empty_mapping_denies() {
        let mut diags = Diagnostics::new();
        let policy = NetworkPolicy::from_value(&yaml("{}"), "network", &mut diags);
        assert_eq!(policy, NetworkPolicy::DenyAll);
    }

    #[test]
    fn test_allowed_mixes_ecosystems_and_domains() {
        let mut diags = Diagnostics::new();
        let policy = NetworkPolicy::from_value(
            &yaml("allowed: [node, \"api.example.com\", python]"),
            "network",
            &mut diags,
        );
        let domains = policy.resolved_domains();
        assert!(domains.contains(&"registry.npmjs.org".to_string()));
        assert!(domains.contains(&"pypi.org".to_string()));
        assert!(domains.contains(&"api.example.com".to_string()));
    }

    #[test]
    fn test_resolved_domains_dedup_insertion_order() {
        let mut diags = Diagnostics::new();
        let policy = NetworkPolicy::from_value(
            &yaml("allowed: [\"b.com\", \"a.com\", \"b.com\"]"),
            "network",
            &mut diags,
        );
        assert_eq!(policy.resolved_domains(), ["b.com", "a.com"]);
    }

    #[test]
    fn test_unknown_shorthand_reported() {
        let mut diags = Diagnostics::new();
        NetworkPolicy::from_value(&yaml("everything"), "network", &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_default_policy_is_defaults_ecosystem() {
        let policy = NetworkPolicy::default();
        assert!(policy.resolved_domains().contains(&"github.com".to_string()));
    }
}
