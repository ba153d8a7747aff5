//! Validation passes over a typed [`Workflow`].
//!
//! Passes run in a fixed order and all of them execute; findings
//! accumulate into one [`Diagnostics`] so the user sees everything at
//! once. Structural (schema) validation already happened during model
//! construction; these passes cover the domain rules. The strict-mode
//! policy runs last and only when the workflow opts in.

use aflow_core::{Category, Diagnostic, Diagnostics};
use aflow_model::Workflow;

pub mod engine;
pub mod expressions;
pub mod mcp;
pub mod network;
pub mod packages;
pub mod permissions;
pub mod strict;

pub use packages::{OfflineRegistry, PackageEcosystem, PackageRegistry};

/// Run every validation pass with the given package registry.
pub fn validate(workflow: &Workflow, registry: &dyn PackageRegistry) -> Diagnostics {
    let mut diags = Diagnostics::new();

    engine::validate_engine(workflow, &mut diags);
    permissions::validate_permissions(workflow, &mut diags);
    network::validate_network(workflow, &mut diags);
    mcp::validate_mcp(workflow, &mut diags);
    packages::validate_packages(workflow, registry, &mut diags);
    expressions::validate_expression_budget(workflow, &mut diags);
    validate_cache_ids(workflow, &mut diags);
    if workflow.strict {
        strict::validate_strict(workflow, &mut diags);
    }

    tracing::debug!(
        target: "aflow::validate",
        errors = diags.error_count(),
        total = diags.len(),
        "validation finished"
    );
    diags
}

/// Run every pass without consulting external registries.
pub fn validate_offline(workflow: &Workflow) -> Diagnostics {
    validate(workflow, &OfflineRegistry)
}

/// No two cache steps may share an id.
fn validate_cache_ids(workflow: &Workflow, diags: &mut Diagnostics) {
    let mut seen: Vec<&str> = Vec::new();
    for entry in &workflow.cache {
        if seen.contains(&entry.id.as_str()) {
            diags.push(
                Diagnostic::error(
                    Category::User,
                    format!("duplicate cache id '{}'", entry.id),
                )
                .at("cache")
                .with_hint("give each cache entry a distinct id"),
            );
        } else {
            seen.push(&entry.id);
        }
    }
}

#[cfg(test)]
pub(crate) fn workflow_from_yaml(yaml: &str, body: &str) -> Workflow {
    let mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml).unwrap();
    let (wf, diags) = Workflow::from_merged("test-wf", &mapping, body);
    match wf {
        Some(wf) => wf,
        None => panic!("model construction failed: {diags}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_workflow_validates() {
        let wf = workflow_from_yaml("on: issues\nengine: copilot", "body");
        let diags = validate_offline(&wf);
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn test_duplicate_cache_id_rejected() {
        let wf = workflow_from_yaml(
            "on: issues\nengine: copilot\ncache:\n  - id: deps\n    path: a\n    key: k1\n  - id: deps\n    path: b\n    key: k2",
            "",
        );
        let diags = validate_offline(&wf);
        assert!(diags.has_errors());
        assert!(diags.to_string().contains("duplicate cache id"));
    }

    #[test]
    fn test_all_passes_accumulate() {
        // Bad model name AND a bash wildcard under strict: both reported.
        let wf = workflow_from_yaml(
            "on: issues\nstrict: true\nengine:\n  id: claude\n  model: not-a-model\ntools:\n  bash: [\"*\"]",
            "",
        );
        let diags = validate_offline(&wf);
        assert!(diags.error_count() >= 2, "{diags}");
    }
}
