//! Engine validation: the declared model must be in the engine's
//! recognized set. Custom engines pass through untouched.

use aflow_core::{Category, Diagnostic, Diagnostics};
use aflow_model::Workflow;

pub fn validate_engine(workflow: &Workflow, diags: &mut Diagnostics) {
    let Some(models) = workflow.engine.recognized_models() else {
        return;
    };
    let Some(model) = workflow.engine.model() else {
        return;
    };
    if !models.contains(&model) {
        diags.push(
            Diagnostic::error(
                Category::User,
                format!(
                    "model '{model}' is not recognized by the {} engine",
                    workflow.engine.id()
                ),
            )
            .at("engine.model")
            .with_hint(format!("recognized models: {}", models.join(", "))),
        );
    }
}
