//! Embedded action pin registry.
//!
//! Every reusable action the compiler references is pinned here to a
//! commit SHA with a human-readable version. The table is loaded once at
//! startup; a malformed table is a fatal internal error, never a silent
//! fallback to floating tags.

use std::sync::LazyLock;

use aflow_core::CompilerError;
use indexmap::IndexMap;
use serde::Deserialize;

const PINS_TOML: &str = include_str!("../pins.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Pin {
    pub sha: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct PinFile {
    actions: IndexMap<String, Pin>,
}

#[derive(Debug)]
pub struct PinRegistry {
    actions: IndexMap<String, Pin>,
}

static REGISTRY: LazyLock<Result<PinRegistry, String>> = LazyLock::new(|| {
    let file: PinFile =
        toml::from_str(PINS_TOML).map_err(|e| format!("pins.toml does not parse: {e}"))?;
    for (name, pin) in &file.actions {
        if pin.sha.len() != 40 || !pin.sha.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("action '{name}' has a malformed sha '{}'", pin.sha));
        }
        if !pin.version.starts_with('v') {
            return Err(format!(
                "action '{name}' has a malformed version '{}'",
                pin.version
            ));
        }
    }
    Ok(PinRegistry {
        actions: file.actions,
    })
});

impl PinRegistry {
    /// The process-wide registry, loaded and checked on first use.
    pub fn global() -> Result<&'static PinRegistry, CompilerError> {
        REGISTRY.as_ref().map_err(|detail| CompilerError::PinRegistry {
            detail: detail.clone(),
        })
    }

    /// Pin for a known action name.
    pub fn resolve(&self, name: &str) -> Result<&Pin, CompilerError> {
        self.actions.get(name).ok_or_else(|| CompilerError::PinRegistry {
            detail: format!("no pin recorded for action '{name}'"),
        })
    }

    /// `owner/repo@<sha>` reference plus the version comment text.
    pub fn reference(&self, name: &str) -> Result<(String, String), CompilerError> {
        let pin = self.resolve(name)?;
        Ok((format!("{name}@{}", pin.sha), pin.version.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_loads() {
        let registry = PinRegistry::global().unwrap();
        assert!(registry.resolve("actions/checkout").is_ok());
    }

    #[test]
    fn test_reference_format() {
        let registry = PinRegistry::global().unwrap();
        let (reference, version) = registry.reference("actions/github-script").unwrap();
        let (name, sha) = reference.split_once('@').unwrap();
        assert_eq!(name, "actions/github-script");
        assert_eq!(sha.len(), 40);
        assert!(version.starts_with('v'));
    }

    #[test]
    fn test_unknown_action_is_internal_error() {
        let registry = PinRegistry::global().unwrap();
        let err = registry.resolve("acme/not-pinned").unwrap_err();
        assert!(matches!(err, CompilerError::PinRegistry { .. }));
    }

    #[test]
    fn test_every_pin_is_wellformed() {
        let registry = PinRegistry::global().unwrap();
        for name in [
            "actions/checkout",
            "actions/cache",
            "actions/upload-artifact",
            "actions/download-artifact",
            "actions/github-script",
            "aflow/setup-agent",
        ] {
            registry.resolve(name).unwrap();
        }
    }
}
