//! Pipeline-graph construction.
//!
//! `compile` turns a validated [`Workflow`] into a [`PipelineGraph`]:
//! activation first, the read-only agent job, one safe-output job per
//! declared kind, and the post fan-in. The graph is a pure function of
//! the workflow plus the embedded pin registry; it never touches the
//! filesystem or network.

use aflow_core::CompilerError;
use aflow_model::Workflow;

pub mod activation;
pub mod agent;
pub mod defaults;
pub mod engines;
pub mod graph;
pub mod mcp_config;
pub mod pins;
pub mod safe_outputs;
pub mod sanitize;
pub mod scripts;

pub use graph::{Job, JobRole, PipelineGraph, Step};
pub use pins::PinRegistry;

/// Build the pipeline graph for a validated workflow.
pub fn compile(workflow: &Workflow) -> Result<PipelineGraph, CompilerError> {
    let pins = PinRegistry::global()?;

    let mut workflow = workflow.clone();
    defaults::expand(&mut workflow);

    let membership_gate = !workflow.roles.is_empty() && !workflow.roles.iter().any(|r| r == "all");

    let mut jobs = Vec::new();
    jobs.push(activation::build(&workflow, pins)?);
    if membership_gate {
        jobs.push(activation::build_membership(&workflow, pins)?);
    }
    jobs.push(agent::build(&workflow, pins, membership_gate)?);
    jobs.extend(safe_outputs::build_jobs(&workflow, pins)?);

    let prior_ids: Vec<String> = jobs.iter().map(|j| j.id.clone()).collect();
    jobs.push(safe_outputs::post_job(&workflow, &prior_ids));

    let graph = PipelineGraph {
        name: workflow.name.clone().unwrap_or_else(|| workflow.id.clone()),
        source_id: workflow.id.clone(),
        on: workflow
            .on
            .triggers
            .iter()
            .map(|t| (t.event.clone(), t.filters.clone()))
            .collect(),
        concurrency_group: format!("aflow-{}", workflow.id),
        jobs,
    };

    enforce_invariants(&graph)?;
    tracing::debug!(
        target: "aflow::compile",
        jobs = graph.jobs.len(),
        "pipeline graph built"
    );
    Ok(graph)
}

/// The load-bearing security invariants, re-checked on every compile so a
/// future re-ordering cannot silently break them.
fn enforce_invariants(graph: &PipelineGraph) -> Result<(), CompilerError> {
    let agent = graph
        .job_by_role(&JobRole::Agent)
        .ok_or_else(|| CompilerError::Invariant {
            detail: "pipeline has no agent job".to_string(),
        })?;

    // The agent never holds a write scope.
    if !agent.permissions.write_scopes().is_empty() {
        return Err(CompilerError::Invariant {
            detail: format!(
                "agent job declares write scopes: {:?}",
                agent.permissions.write_scopes()
            ),
        });
    }

    // Each write scope is held by safe-output jobs only, and every
    // safe-output job depends on the agent.
    for job in &graph.jobs {
        let is_safe_output = matches!(job.role, JobRole::SafeOutput(_));
        if is_safe_output {
            if !job.needs.iter().any(|n| n == &agent.id) {
                return Err(CompilerError::Invariant {
                    detail: format!("safe-output job '{}' does not need the agent", job.id),
                });
            }
        } else if !job.permissions.write_scopes().is_empty() {
            return Err(CompilerError::Invariant {
                detail: format!(
                    "job '{}' holds write scopes but is not a safe-output job",
                    job.id
                ),
            });
        }
    }

    Ok(())
}
