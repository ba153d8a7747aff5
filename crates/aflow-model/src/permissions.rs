//! Permission scopes and access levels.

use aflow_core::{Category, Diagnostic, Diagnostics};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::extract;

/// Capability scopes the runner recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    Contents,
    Issues,
    PullRequests,
    Discussions,
    Actions,
    SecurityEvents,
    Packages,
    Statuses,
    Checks,
    Deployments,
}

impl Scope {
    pub const ALL: [Scope; 10] = [
        Scope::Contents,
        Scope::Issues,
        Scope::PullRequests,
        Scope::Discussions,
        Scope::Actions,
        Scope::SecurityEvents,
        Scope::Packages,
        Scope::Statuses,
        Scope::Checks,
        Scope::Deployments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Contents => "contents",
            Scope::Issues => "issues",
            Scope::PullRequests => "pull-requests",
            Scope::Discussions => "discussions",
            Scope::Actions => "actions",
            Scope::SecurityEvents => "security-events",
            Scope::Packages => "packages",
            Scope::Statuses => "statuses",
            Scope::Checks => "checks",
            Scope::Deployments => "deployments",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Scope::ALL.iter().copied().find(|scope| scope.as_str() == s)
    }
}

/// Access level for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    Read,
    Write,
    None,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Access::Read),
            "write" => Some(Access::Write),
            "none" => Some(Access::None),
            _ => None,
        }
    }
}

/// Declared scope→access mapping, insertion order preserved for emission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    entries: IndexMap<Scope, Access>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The agent job's fixed permission block: `contents: read`, nothing else.
    pub fn read_contents_only() -> Self {
        let mut set = Self::new();
        set.insert(Scope::Contents, Access::Read);
        set
    }

    pub fn insert(&mut self, scope: Scope, access: Access) {
        self.entries.insert(scope, access);
    }

    pub fn get(&self, scope: Scope) -> Option<Access> {
        self.entries.get(&scope).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Scope, Access)> + '_ {
        self.entries.iter().map(|(s, a)| (*s, *a))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scopes declared with write access.
    pub fn write_scopes(&self) -> Vec<Scope> {
        self.entries
            .iter()
            .filter(|(_, a)| **a == Access::Write)
            .map(|(s, _)| *s)
            .collect()
    }

    /// Effective access: `contents` defaults to read when undeclared.
    pub fn effective(&self, scope: Scope) -> Access {
        self.get(scope).unwrap_or(match scope {
            Scope::Contents => Access::Read,
            _ => Access::None,
        })
    }

    /// Parse a `permissions:` mapping, reporting unknown scopes and bad
    /// access values with their key paths.
    pub fn from_mapping(mapping: &Mapping, diags: &mut Diagnostics) -> Self {
        let mut set = Self::new();
        for (key, value) in mapping {
            let Some(name) = key.as_str() else {
                extract::type_error("permissions", "string scope names", key, diags);
                continue;
            };
            let path = format!("permissions.{name}");
            let Some(scope) = Scope::parse(name) else {
                diags.push(
                    Diagnostic::error(Category::User, format!("unrecognized scope '{name}'"))
                        .at(path)
                        .with_hint("one of: contents, issues, pull-requests, discussions, actions, security-events, packages, statuses, checks, deployments"),
                );
                continue;
            };
            let Some(raw) = extract::as_str(value, &path, diags) else {
                continue;
            };
            let Some(access) = Access::parse(&raw) else {
                diags.push(
                    Diagnostic::error(
                        Category::User,
                        format!("invalid access '{raw}', expected read, write, or none"),
                    )
                    .at(path),
                );
                continue;
            };
            set.insert(scope, access);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(s: &str) -> Mapping {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_basic() {
        let mut diags = Diagnostics::new();
        let set = PermissionSet::from_mapping(
            &mapping("contents: read\nissues: write"),
            &mut diags,
        );
        assert!(!diags.has_errors());
        assert_eq!(set.get(Scope::Contents), Some(Access::Read));
        assert_eq!(set.get(Scope::Issues), Some(Access::Write));
        assert_eq!(set.write_scopes(), vec![Scope::Issues]);
    }

    #[test]
    fn test_unknown_scope_reported_with_path() {
        let mut diags = Diagnostics::new();
        PermissionSet::from_mapping(&mapping("repo: write"), &mut diags);
        let d = diags.iter().next().unwrap();
        assert_eq!(d.path.as_deref(), Some("permissions.repo"));
    }

    #[test]
    fn test_invalid_access_reported() {
        let mut diags = Diagnostics::new();
        PermissionSet::from_mapping(&mapping("issues: admin"), &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_contents_defaults_to_read() {
        let set = PermissionSet::new();
        assert_eq!(set.effective(Scope::Contents), Access::Read);
        assert_eq!(set.effective(Scope::Issues), Access::None);
    }

    #[test]
    fn test_read_contents_only_has_no_write_scope() {
        let set = PermissionSet::read_contents_only();
        assert!(set.write_scopes().is_empty());
        assert_eq!(set.get(Scope::Contents), Some(Access::Read));
        assert_eq!(set.iter().count(), 1);
    }
}
