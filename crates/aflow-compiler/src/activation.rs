//! The activation job: first in every pipeline.
//!
//! It evaluates the trigger predicate, applies skip conditions and the
//! fork policy, and reduces the payload to the sanitized `text` output,
//! the only value downstream jobs may treat as (partially untrusted)
//! input.

use aflow_core::CompilerError;
use aflow_model::{PermissionSet, Workflow};
use indexmap::IndexMap;

use crate::graph::{Job, JobRole};
use crate::pins::PinRegistry;
use crate::sanitize::{MAX_TEXT_BYTES, MAX_TEXT_LINES};
use crate::scripts;

pub fn build(workflow: &Workflow, pins: &PinRegistry) -> Result<Job, CompilerError> {
    let mut job = Job::new("activation", "Activation", JobRole::Activation);
    job.runs_on = workflow.runs_on.clone();
    job.permissions = PermissionSet::read_contents_only();
    job.timeout_minutes = Some(5);

    let mut env = IndexMap::new();
    env.insert(
        "AFLOW_MAX_TEXT_BYTES".to_string(),
        MAX_TEXT_BYTES.to_string(),
    );
    env.insert(
        "AFLOW_MAX_TEXT_LINES".to_string(),
        MAX_TEXT_LINES.to_string(),
    );
    env.insert(
        "AFLOW_FORK_ALLOWLIST".to_string(),
        serde_json::to_string(&workflow.on.fork_allowlist).unwrap_or_else(|_| "[]".to_string()),
    );
    if let Some(query) = &workflow.skip_if_match {
        env.insert("AFLOW_SKIP_IF_MATCH".to_string(), query.clone());
    }
    if let Some(query) = &workflow.skip_if_no_match {
        env.insert("AFLOW_SKIP_IF_NO_MATCH".to_string(), query.clone());
    }

    job.steps
        .push(scripts::write_script_step("activation.cjs", scripts::ACTIVATION_SCRIPT));
    job.steps.push(
        scripts::github_script_step(pins, "Evaluate trigger", "activation.cjs", env)?
            .with_id("activation"),
    );

    job.outputs.insert(
        "text".to_string(),
        "${{ steps.activation.outputs.text }}".to_string(),
    );
    job.outputs.insert(
        "skip".to_string(),
        "${{ steps.activation.outputs.skip }}".to_string(),
    );

    Ok(job)
}

/// The membership gate, present only when `roles:` is declared.
pub fn build_membership(workflow: &Workflow, pins: &PinRegistry) -> Result<Job, CompilerError> {
    let mut job = Job::new("check_membership", "Check membership", JobRole::Membership);
    job.runs_on = workflow.runs_on.clone();
    job.needs = vec!["activation".to_string()];
    job.cond = Some("needs.activation.outputs.skip != 'true'".to_string());
    job.permissions = PermissionSet::read_contents_only();
    job.timeout_minutes = Some(5);

    let mut env = IndexMap::new();
    env.insert(
        "AFLOW_REQUIRED_ROLES".to_string(),
        serde_json::to_string(&workflow.roles).unwrap_or_else(|_| "[]".to_string()),
    );

    job.steps.push(scripts::write_script_step(
        "check_membership.cjs",
        scripts::CHECK_MEMBERSHIP_SCRIPT,
    ));
    job.steps.push(scripts::github_script_step(
        pins,
        "Verify actor privilege",
        "check_membership.cjs",
        env,
    )?);

    Ok(job)
}
