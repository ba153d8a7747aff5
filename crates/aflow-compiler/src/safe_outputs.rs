//! Safe-output jobs: the write path.
//!
//! One job per declared kind, each carrying only the minimum write scope
//! that kind needs, gated on the agent having succeeded and actually
//! emitted a request of the kind. When threat detection is enabled, an
//! aggregate scan job sits between the agent and every effect.

use aflow_core::CompilerError;
use aflow_model::{PermissionSet, SafeOutputKind, SafeOutputSpec, Workflow};
use indexmap::IndexMap;

use crate::graph::{Job, JobRole, Step};
use crate::pins::PinRegistry;
use crate::scripts::{self, ARTIFACT_DIR, SAFE_OUTPUTS_ARTIFACT};

/// Build the detection job (when enabled), one job per declared kind, and
/// the trailing post job.
pub fn build_jobs(workflow: &Workflow, pins: &PinRegistry) -> Result<Vec<Job>, CompilerError> {
    let mut jobs = Vec::new();

    if workflow.safe_outputs.threat_detection {
        jobs.push(detection_job(workflow, pins)?);
    }

    for (kind, spec) in &workflow.safe_outputs.entries {
        jobs.push(safe_output_job(workflow, pins, *kind, spec)?);
    }

    Ok(jobs)
}

fn detection_job(workflow: &Workflow, pins: &PinRegistry) -> Result<Job, CompilerError> {
    let mut job = Job::new("detection", "Threat detection", JobRole::Detection);
    job.runs_on = workflow.runs_on.clone();
    job.needs = vec!["agent".to_string()];
    job.cond = Some(
        "needs.agent.result == 'success' && needs.agent.outputs.safe_output_kinds != '[]'"
            .to_string(),
    );
    job.permissions = PermissionSet::read_contents_only();
    job.timeout_minutes = Some(10);

    job.steps.push(download_step(pins)?);
    job.steps.push(scripts::write_script_step(
        "threat_detection.cjs",
        scripts::THREAT_DETECTION_SCRIPT,
    ));
    let mut env = IndexMap::new();
    env.insert("AFLOW_ARTIFACT_DIR".to_string(), ARTIFACT_DIR.to_string());
    job.steps.push(
        scripts::github_script_step(pins, "Scan agent output", "threat_detection.cjs", env)?
            .with_id("scan"),
    );
    job.outputs.insert(
        "verdict".to_string(),
        "${{ steps.scan.outputs.verdict }}".to_string(),
    );
    Ok(job)
}

fn safe_output_job(
    workflow: &Workflow,
    pins: &PinRegistry,
    kind: SafeOutputKind,
    spec: &SafeOutputSpec,
) -> Result<Job, CompilerError> {
    let mut job = Job::new(
        format!("safe_output_{}", kind.job_suffix()),
        format!("Safe output: {}", kind.as_str()),
        JobRole::SafeOutput(kind.as_str().to_string()),
    );
    job.runs_on = workflow.runs_on.clone();
    job.timeout_minutes = Some(10);

    job.needs = vec!["agent".to_string()];
    let mut cond = format!(
        "needs.agent.result == 'success' && contains(fromJSON(needs.agent.outputs.safe_output_kinds), '{}')",
        kind.as_str()
    );
    if workflow.safe_outputs.threat_detection {
        job.needs.push("detection".to_string());
        cond.push_str(" && needs.detection.outputs.verdict == 'clean'");
    }
    job.cond = Some(cond);

    for (scope, access) in kind.required_scopes() {
        job.permissions.insert(*scope, *access);
    }

    job.steps.push(download_step(pins)?);
    job.steps.push(scripts::write_script_step(
        "handle_safe_output.cjs",
        scripts::HANDLE_SAFE_OUTPUT_SCRIPT,
    ));

    let mut env = IndexMap::new();
    env.insert("AFLOW_KIND".to_string(), kind.as_str().to_string());
    env.insert("AFLOW_MAX".to_string(), spec.max.to_string());
    env.insert("AFLOW_ARTIFACT_DIR".to_string(), ARTIFACT_DIR.to_string());
    env.insert(
        "AFLOW_STAGED".to_string(),
        workflow.safe_outputs.staged.to_string(),
    );
    env.insert(
        "AFLOW_WORKFLOW_NAME".to_string(),
        workflow.name.clone().unwrap_or_else(|| workflow.id.clone()),
    );
    env.insert(
        "AFLOW_RUN_URL".to_string(),
        "${{ github.server_url }}/${{ github.repository }}/actions/runs/${{ github.run_id }}"
            .to_string(),
    );
    if let Some(prefix) = &spec.title_prefix {
        env.insert("AFLOW_TITLE_PREFIX".to_string(), prefix.clone());
    }
    if !spec.labels.is_empty() {
        env.insert(
            "AFLOW_ALLOWED_LABELS".to_string(),
            serde_json::to_string(&spec.labels).unwrap_or_else(|_| "[]".to_string()),
        );
    }
    if !spec.target_repos.is_empty() {
        env.insert(
            "AFLOW_TARGET_REPOS".to_string(),
            serde_json::to_string(&spec.target_repos).unwrap_or_else(|_| "[]".to_string()),
        );
    }
    if kind.is_project_kind() {
        let url = spec
            .project_url
            .clone()
            .or_else(|| workflow.project.clone())
            .unwrap_or_default();
        env.insert("AFLOW_PROJECT_URL".to_string(), url);
        env.insert(
            "AFLOW_PROJECT_TOKEN".to_string(),
            "${{ secrets.AFLOW_PROJECT_TOKEN }}".to_string(),
        );
    }

    job.steps.push(scripts::github_script_step(
        pins,
        &format!("Apply {}", kind.as_str()),
        "handle_safe_output.cjs",
        env,
    )?);

    Ok(job)
}

/// The trailing post job: fan-in of everything, always runs, renders the
/// run summary.
pub fn post_job(workflow: &Workflow, prior_job_ids: &[String]) -> Job {
    let mut job = Job::new("post", "Post", JobRole::Post);
    job.runs_on = workflow.runs_on.clone();
    job.needs = prior_job_ids.to_vec();
    job.cond = Some("always()".to_string());
    job.timeout_minutes = Some(5);

    let mut summary = String::from("{\n  echo '## Agentic run summary'\n");
    for id in prior_job_ids {
        summary.push_str(&format!(
            "  echo '- {id}: ${{{{ needs.{id}.result }}}}'\n"
        ));
    }
    summary.push_str("} >> \"$GITHUB_STEP_SUMMARY\"");
    job.steps.push(Step::run("Render run summary", summary));
    job
}

fn download_step(pins: &PinRegistry) -> Result<Step, CompilerError> {
    let (action, version) = pins.reference("actions/download-artifact")?;
    let mut with = IndexMap::new();
    with.insert("name".to_string(), SAFE_OUTPUTS_ARTIFACT.to_string());
    with.insert("path".to_string(), ARTIFACT_DIR.to_string());
    Ok(Step::Uses {
        name: "Download safe-output artifact".to_string(),
        action,
        version,
        id: None,
        with,
        env: IndexMap::new(),
        cond: None,
    })
}

#[cfg(test)]
#[path = "safe_outputs_tests.rs"]
mod tests;
