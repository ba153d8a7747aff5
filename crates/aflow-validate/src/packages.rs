//! Package declarations: syntactic checks plus an existence seam.
//!
//! Registry lookups are side-effecting and live behind [`PackageRegistry`]
//! so offline compiles stay pure. When a registry cannot answer, the
//! finding is a warning, never an error.

use std::sync::LazyLock;

use aflow_core::{Category, Diagnostic, Diagnostics};
use aflow_model::Workflow;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageEcosystem {
    Pip,
    Npm,
}

impl PackageEcosystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageEcosystem::Pip => "pip",
            PackageEcosystem::Npm => "npm",
        }
    }
}

/// Seam for consulting a package registry. Implementations may hit the
/// network; the in-tree [`OfflineRegistry`] never does.
pub trait PackageRegistry {
    /// `Ok(true)` when the package provably exists, `Ok(false)` when it
    /// provably does not, `Err` when the registry cannot answer.
    fn exists(&self, ecosystem: PackageEcosystem, name: &str) -> Result<bool, String>;
}

/// Registry used for offline compilation: declines every lookup.
pub struct OfflineRegistry;

impl PackageRegistry for OfflineRegistry {
    fn exists(&self, _ecosystem: PackageEcosystem, _name: &str) -> Result<bool, String> {
        Err("offline compilation".to_string())
    }
}

// Names without version suffixes; versions are split off before matching.
static NPM_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@[a-z0-9][a-z0-9._-]*/)?[a-z0-9][a-z0-9._-]*$").expect("valid regex")
});
static PIP_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("valid regex")
});

pub fn validate_packages(
    workflow: &Workflow,
    registry: &dyn PackageRegistry,
    diags: &mut Diagnostics,
) {
    for name in &workflow.packages.pip {
        check(PackageEcosystem::Pip, name, registry, diags);
    }
    for name in &workflow.packages.npm {
        check(PackageEcosystem::Npm, name, registry, diags);
    }
}

fn check(
    ecosystem: PackageEcosystem,
    declared: &str,
    registry: &dyn PackageRegistry,
    diags: &mut Diagnostics,
) {
    let path = format!("packages.{}", ecosystem.as_str());
    let name = base_name(ecosystem, declared);

    let well_formed = match ecosystem {
        PackageEcosystem::Pip => PIP_NAME_RE.is_match(name),
        PackageEcosystem::Npm => NPM_NAME_RE.is_match(name),
    };
    if !well_formed {
        diags.push(
            Diagnostic::error(
                Category::User,
                format!("'{declared}' is not a valid {} package name", ecosystem.as_str()),
            )
            .at(path),
        );
        return;
    }

    match registry.exists(ecosystem, name) {
        Ok(true) => {}
        Ok(false) => {
            diags.push(
                Diagnostic::error(
                    Category::System,
                    format!("{} package '{name}' does not exist in the registry", ecosystem.as_str()),
                )
                .at(path),
            );
        }
        Err(reason) => {
            diags.push(
                Diagnostic::warning(
                    Category::System,
                    format!(
                        "cannot verify {} package '{name}' exists ({reason})",
                        ecosystem.as_str()
                    ),
                )
                .at(path),
            );
        }
    }
}

/// Strip a trailing version specifier so the name alone is validated.
fn base_name<'a>(ecosystem: PackageEcosystem, declared: &'a str) -> &'a str {
    match ecosystem {
        PackageEcosystem::Pip => declared
            .find(['=', '<', '>', '!', '~'])
            .map_or(declared, |i| &declared[..i])
            .trim(),
        PackageEcosystem::Npm => {
            // `@scope/name@1.2.3`: the version separator is the last `@`
            // past position zero.
            match declared.rfind('@') {
                Some(i) if i > 0 => &declared[..i],
                _ => declared,
            }
        }
    }
}
