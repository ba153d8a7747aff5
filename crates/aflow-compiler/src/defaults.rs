//! Default resolution and implicit expansion, applied after validation
//! and before job construction.

use aflow_model::{SafeOutputKind, SafeOutputSpec, Workflow};

/// Implicit caps for the project kinds a top-level `project:` pulls in.
const IMPLICIT_UPDATE_PROJECT_MAX: u32 = 100;
const IMPLICIT_STATUS_UPDATE_MAX: u32 = 1;

/// Expand a workflow in place. Currently: a top-level `project:` fills in
/// only the project safe-output kinds the user did not declare, bound to
/// the declared URL.
pub fn expand(workflow: &mut Workflow) {
    let Some(project) = workflow.project.clone() else {
        return;
    };

    if workflow.safe_outputs.get(SafeOutputKind::UpdateProject).is_none() {
        let mut spec = SafeOutputSpec::new(SafeOutputKind::UpdateProject);
        spec.max = IMPLICIT_UPDATE_PROJECT_MAX;
        spec.project_url = Some(project.clone());
        workflow.safe_outputs.declare(spec);
        tracing::debug!(target: "aflow::compile", "implicitly declared update-project");
    }
    if workflow
        .safe_outputs
        .get(SafeOutputKind::CreateProjectStatusUpdate)
        .is_none()
    {
        let mut spec = SafeOutputSpec::new(SafeOutputKind::CreateProjectStatusUpdate);
        spec.max = IMPLICIT_STATUS_UPDATE_MAX;
        spec.project_url = Some(project);
        workflow.safe_outputs.declare(spec);
        tracing::debug!(
            target: "aflow::compile",
            "implicitly declared create-project-status-update"
        );
    }
}
