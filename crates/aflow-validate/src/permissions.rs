//! Permission validation.
//!
//! Write capability belongs on safe-output jobs, not on the workflow.
//! A top-level write scope that no declared safe output needs is a soft
//! warning here; strict mode upgrades every top-level write to a refusal.

use aflow_core::{Category, Diagnostic, Diagnostics};
use aflow_model::{Access, Scope, Workflow};

pub fn validate_permissions(workflow: &Workflow, diags: &mut Diagnostics) {
    let needed: Vec<Scope> = workflow
        .safe_outputs
        .kinds()
        .flat_map(|k| k.required_scopes().iter().map(|(s, _)| *s))
        .collect();

    for scope in workflow.permissions.write_scopes() {
        if !needed.contains(&scope) {
            diags.push(
                Diagnostic::warning(
                    Category::Config,
                    format!(
                        "top-level '{}: write' grants write access to every job, including the agent",
                        scope.as_str()
                    ),
                )
                .at(format!("permissions.{}", scope.as_str()))
                .with_hint("declare a safe-output kind instead; its job receives the scope automatically"),
            );
        }
    }

    // `none` on contents disables checkout; flag it since the agent job
    // cannot materialize the repository without it.
    if workflow.permissions.get(Scope::Contents) == Some(Access::None) {
        diags.push(
            Diagnostic::warning(
                Category::Config,
                "'contents: none' prevents the agent job from checking out the repository",
            )
            .at("permissions.contents"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow_from_yaml;

    #[test]
    fn test_unneeded_write_scope_warns() {
        let wf = workflow_from_yaml(
            "on: issues\nengine: copilot\npermissions:\n  deployments: write",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_permissions(&wf, &mut diags);
        assert!(!diags.has_errors());
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_write_scope_matching_safe_output_is_quiet() {
        let wf = workflow_from_yaml(
            "on: issues\nengine: copilot\npermissions:\n  issues: write\nsafe-outputs:\n  create-issue:\n",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_permissions(&wf, &mut diags);
        assert!(diags.is_empty(), "{diags}");
    }

    #[test]
    fn test_contents_none_warns() {
        let wf = workflow_from_yaml(
            "on: issues\nengine: copilot\npermissions:\n  contents: none",
            "",
        );
        let mut diags = Diagnostics::new();
        validate_permissions(&wf, &mut diags);
        assert_eq!(diags.warnings().count(), 1);
    }
}
