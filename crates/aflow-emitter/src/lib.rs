//! Lock-file emission.
//!
//! Serializes a [`PipelineGraph`] to the hosted runner's YAML surface
//! syntax. The output is deterministic (stable key and list order straight
//! from the IR), YAML 1.1-safe (`on` and friends are quoted), pins every
//! action reference with a trailing version comment, and refuses to emit
//! any single `${{ ... }}` expression over the runner's 20 KB cap. Writes
//! are atomic: either the whole lock file lands or nothing does.

use std::path::Path;

use aflow_compiler::{Job, PipelineGraph, Step};
use aflow_core::CompilerError;

pub mod yaml;

use yaml::{block_scalar, scalar, write_value};

/// Runner hard cap on a single expression, in bytes.
pub const EXPRESSION_LIMIT: usize = 20 * 1024;

/// Conventional lock-file name for a workflow id.
pub fn lockfile_name(source_id: &str) -> String {
    format!("{source_id}.lock.yml")
}

/// Serialize the graph to the lock-file text.
pub fn emit(graph: &PipelineGraph) -> Result<String, CompilerError> {
    let mut out = String::new();
    out.push_str("# Generated by aflow from the agentic workflow source. Do not edit.\n");
    out.push_str(&format!("# source: {}.md\n\n", graph.source_id));

    out.push_str(&format!("name: {}\n\n", scalar(&graph.name)));

    // Quoted so YAML 1.1 consumers read the key as a string, not `true`.
    out.push_str("\"on\":\n");
    for (event, filters) in &graph.on {
        out.push_str(&format!("  {}:", scalar(event)));
        write_value(&mut out, &serde_yaml::Value::Mapping(filters.clone()), 4);
    }
    out.push('\n');

    out.push_str("concurrency:\n");
    out.push_str(&format!("  group: {}\n", scalar(&graph.concurrency_group)));
    out.push_str("  cancel-in-progress: false\n\n");

    out.push_str("jobs:\n");
    for (i, job) in graph.jobs.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let chunk = emit_job(job);
        check_expression_budget(&job.id, &chunk)?;
        out.push_str(&chunk);
    }

    tracing::debug!(
        target: "aflow::emit",
        bytes = out.len(),
        jobs = graph.jobs.len(),
        "lock file rendered"
    );
    Ok(out)
}

/// Emit and write atomically: the lock file appears only on success.
pub fn emit_to_file(graph: &PipelineGraph, path: &Path) -> Result<(), CompilerError> {
    let content = emit(graph)?;
    let tmp = path.with_extension("yml.tmp");
    std::fs::write(&tmp, &content).map_err(|e| CompilerError::Unreadable {
        path: tmp.clone(),
        detail: e.to_string(),
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        CompilerError::Unreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }
    })
}

fn emit_job(job: &Job) -> String {
    let mut out = String::new();
    out.push_str(&format!("  {}:\n", scalar(&job.id)));
    out.push_str(&format!("    name: {}\n", scalar(&job.name)));
    out.push_str(&format!("    runs-on: {}\n", scalar(&job.runs_on)));

    match job.needs.len() {
        0 => {}
        1 => out.push_str(&format!("    needs: {}\n", scalar(&job.needs[0]))),
        _ => {
            out.push_str("    needs:\n");
            for need in &job.needs {
                out.push_str(&format!("      - {}\n", scalar(need)));
            }
        }
    }

    if let Some(cond) = &job.cond {
        out.push_str(&format!("    if: {}\n", scalar(cond)));
    }

    if job.permissions.is_empty() {
        out.push_str("    permissions: {}\n");
    } else {
        out.push_str("    permissions:\n");
        for (scope, access) in job.permissions.iter() {
            out.push_str(&format!("      {}: {}\n", scope.as_str(), access.as_str()));
        }
    }

    if let Some(timeout) = job.timeout_minutes {
        out.push_str(&format!("    timeout-minutes: {timeout}\n"));
    }

    if !job.env.is_empty() {
        out.push_str("    env:\n");
        for (key, value) in &job.env {
            out.push_str(&format!("      {}: {}\n", scalar(key), scalar(value)));
        }
    }

    if !job.outputs.is_empty() {
        out.push_str("    outputs:\n");
        for (key, value) in &job.outputs {
            out.push_str(&format!("      {}: {}\n", scalar(key), scalar(value)));
        }
    }

    out.push_str("    steps:\n");
    for step in &job.steps {
        emit_step(&mut out, step);
    }
    out
}

fn emit_step(out: &mut String, step: &Step) {
    match step {
        Step::Run {
            name,
            run,
            id,
            env,
            cond,
        } => {
            out.push_str(&format!("      - name: {}\n", scalar(name)));
            if let Some(id) = id {
                out.push_str(&format!("        id: {}\n", scalar(id)));
            }
            if let Some(cond) = cond {
                out.push_str(&format!("        if: {}\n", scalar(cond)));
            }
            if !env.is_empty() {
                out.push_str("        env:\n");
                for (key, value) in env {
                    out.push_str(&format!("          {}: {}\n", scalar(key), scalar(value)));
                }
            }
            out.push_str(&format!("        run: {}\n", block_scalar(run, 10)));
        }
        Step::Uses {
            name,
            action,
            version,
            id,
            with,
            env,
            cond,
        } => {
            out.push_str(&format!("      - name: {}\n", scalar(name)));
            if let Some(id) = id {
                out.push_str(&format!("        id: {}\n", scalar(id)));
            }
            if let Some(cond) = cond {
                out.push_str(&format!("        if: {}\n", scalar(cond)));
            }
            out.push_str(&format!("        uses: {action} # {version}\n"));
            if !env.is_empty() {
                out.push_str("        env:\n");
                for (key, value) in env {
                    out.push_str(&format!("          {}: {}\n", scalar(key), scalar(value)));
                }
            }
            if !with.is_empty() {
                out.push_str("        with:\n");
                for (key, value) in with {
                    if value.contains('\n') {
                        out.push_str(&format!(
                            "          {}: {}\n",
                            scalar(key),
                            block_scalar(value, 12)
                        ));
                    } else {
                        out.push_str(&format!("          {}: {}\n", scalar(key), scalar(value)));
                    }
                }
            }
        }
        Step::Raw { mapping } => {
            // User-authored step, passed through field by field.
            let mut first = true;
            for (key, value) in mapping {
                let key_text = key.as_str().map(scalar).unwrap_or_default();
                if first {
                    out.push_str(&format!("      - {key_text}:"));
                    first = false;
                } else {
                    out.push_str(&format!("        {key_text}:"));
                }
                match value {
                    serde_yaml::Value::String(s) if s.contains('\n') => {
                        out.push_str(&format!(" {}\n", block_scalar(s, 10)));
                    }
                    other => write_value(out, other, 10),
                }
            }
        }
    }
}

/// Every `${{ ... }}` span in the rendered job must fit the runner cap.
fn check_expression_budget(job_id: &str, chunk: &str) -> Result<(), CompilerError> {
    let mut rest = chunk;
    while let Some(start) = rest.find("${{") {
        let after = &rest[start..];
        let len = after.find("}}").map(|i| i + 2).unwrap_or(after.len());
        if len > EXPRESSION_LIMIT {
            return Err(CompilerError::ExpressionTooLarge {
                job: job_id.to_string(),
                size: len,
                limit: EXPRESSION_LIMIT,
            });
        }
        rest = &after[len..];
    }
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
