//! The agent job: sandbox setup, firewall, MCP gateway, prompt
//! materialization, engine invocation, log capture, and safe-output
//! collection. Its permission block is fixed at `contents: read`; write
//! capability lives only on the downstream safe-output jobs.

use aflow_core::CompilerError;
use aflow_model::{PermissionSet, ToolSpec, Workflow};
use indexmap::IndexMap;

use crate::engines;
use crate::graph::{Job, JobRole, Step};
use crate::mcp_config;
use crate::pins::PinRegistry;
use crate::scripts::{
    self, ARTIFACT_DIR, LOGS_DIR, MCP_CONFIG_FILE, PROMPT_FILE, SAFE_OUTPUTS_ARTIFACT,
    SAFE_OUTPUTS_FILE, WORK_DIR,
};

/// Upper bound on MCP log bytes kept per server (the guardrail against
/// token-flooding the log step).
const MCP_LOG_CAP_BYTES: u64 = 1_048_576;

pub fn build(
    workflow: &Workflow,
    pins: &PinRegistry,
    membership_gate: bool,
) -> Result<Job, CompilerError> {
    let mut job = Job::new("agent", "Agent", JobRole::Agent);
    job.runs_on = workflow.runs_on.clone();
    job.permissions = PermissionSet::read_contents_only();
    job.timeout_minutes = Some(workflow.effective_timeout_minutes());
    job.needs = if membership_gate {
        vec!["activation".to_string(), "check_membership".to_string()]
    } else {
        vec!["activation".to_string()]
    };
    job.cond = Some("needs.activation.outputs.skip != 'true'".to_string());

    // Read-only context threaded into every step.
    for (key, value) in &workflow.env {
        job.env.insert(key.clone(), value.clone());
    }
    if let Some(project) = &workflow.project {
        job.env
            .insert("AFLOW_PROJECT_URL".to_string(), project.clone());
    }

    job.steps.push(checkout_step(pins)?);
    cache_steps(workflow, pins, &mut job.steps)?;
    job.steps.push(mcp_config_step(workflow));
    job.steps.push(setup_step(workflow, pins)?);
    job.steps.push(firewall_step(workflow));
    package_steps(workflow, &mut job.steps);
    job.steps.push(prompt_step(workflow));
    job.steps.extend(engines::engine_steps(workflow));
    job.steps.push(log_capture_step());
    job.steps.extend(collect_steps(workflow, pins)?);
    job.steps.push(upload_step(pins)?);

    job.outputs.insert(
        "safe_output_kinds".to_string(),
        "${{ steps.collect.outputs.safe_output_kinds }}".to_string(),
    );

    Ok(job)
}

fn checkout_step(pins: &PinRegistry) -> Result<Step, CompilerError> {
    let (action, version) = pins.reference("actions/checkout")?;
    let mut with = IndexMap::new();
    with.insert("persist-credentials".to_string(), "false".to_string());
    Ok(Step::Uses {
        name: "Checkout repository".to_string(),
        action,
        version,
        id: None,
        with,
        env: IndexMap::new(),
        cond: None,
    })
}

fn cache_steps(
    workflow: &Workflow,
    pins: &PinRegistry,
    steps: &mut Vec<Step>,
) -> Result<(), CompilerError> {
    for entry in &workflow.cache {
        let (action, version) = pins.reference("actions/cache")?;
        let mut with = IndexMap::new();
        with.insert("path".to_string(), entry.path.clone());
        with.insert("key".to_string(), entry.key.clone());
        if !entry.restore_keys.is_empty() {
            with.insert("restore-keys".to_string(), entry.restore_keys.join("\n"));
        }
        steps.push(Step::Uses {
            name: format!("Cache {}", entry.id),
            action,
            version,
            id: Some(entry.id.clone()),
            with,
            env: IndexMap::new(),
            cond: None,
        });
    }

    // The memory tool keeps its store warm across runs through a cache
    // keyed per workflow id.
    if has_memory_tool(workflow) {
        let (action, version) = pins.reference("actions/cache")?;
        let mut with = IndexMap::new();
        with.insert("path".to_string(), format!("{WORK_DIR}/memory"));
        with.insert(
            "key".to_string(),
            format!("aflow-memory-{}-${{{{ github.run_id }}}}", workflow.id),
        );
        with.insert(
            "restore-keys".to_string(),
            format!("aflow-memory-{}-", workflow.id),
        );
        steps.push(Step::Uses {
            name: "Cache agent memory".to_string(),
            action,
            version,
            id: Some("memory".to_string()),
            with,
            env: IndexMap::new(),
            cond: None,
        });
    }
    Ok(())
}

fn has_memory_tool(workflow: &Workflow) -> bool {
    workflow.tools.iter().any(|t| matches!(t, ToolSpec::Memory))
}

fn mcp_config_step(workflow: &Workflow) -> Step {
    let config = mcp_config::render(workflow);
    let rendered = serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string());
    Step::run(
        "Write MCP gateway configuration",
        format!(
            "mkdir -p {WORK_DIR}\ncat > {MCP_CONFIG_FILE} <<'AFLOW_MCP_EOF'\n{rendered}\nAFLOW_MCP_EOF"
        ),
    )
}

fn setup_step(workflow: &Workflow, pins: &PinRegistry) -> Result<Step, CompilerError> {
    let (action, version) = pins.reference("aflow/setup-agent")?;
    let mut with = IndexMap::new();
    with.insert("engine".to_string(), workflow.engine.id().to_string());
    with.insert(
        "engine_version".to_string(),
        workflow.engine.version().unwrap_or("latest").to_string(),
    );
    with.insert(
        "runtimes".to_string(),
        serde_json::to_string(&workflow.runtimes).unwrap_or_else(|_| "{}".to_string()),
    );
    with.insert(
        "network_policy".to_string(),
        serde_json::to_string(&workflow.network.resolved_domains())
            .unwrap_or_else(|_| "[]".to_string()),
    );
    with.insert("mcp_config".to_string(), MCP_CONFIG_FILE.to_string());
    with.insert(
        "cache_memory".to_string(),
        has_memory_tool(workflow).to_string(),
    );
    Ok(Step::Uses {
        name: "Set up agent environment".to_string(),
        action,
        version,
        id: None,
        with,
        env: IndexMap::new(),
        cond: None,
    })
}

fn firewall_step(workflow: &Workflow) -> Step {
    let domains = serde_json::to_string(&workflow.network.resolved_domains())
        .unwrap_or_else(|_| "[]".to_string());
    Step::run(
        "Enable egress firewall",
        "sudo aflow-firewall enable --allowed-domains \"$AFLOW_ALLOWED_DOMAINS\"",
    )
    .with_env("AFLOW_ALLOWED_DOMAINS", domains)
}

fn package_steps(workflow: &Workflow, steps: &mut Vec<Step>) {
    if !workflow.packages.npm.is_empty() {
        let list = workflow.packages.npm.join(" ");
        steps.push(Step::run(
            "Install npm packages",
            format!(
                "for attempt in 1 2 3; do\n  npm install -g {list} && break\n  if [ \"$attempt\" = 3 ]; then exit 1; fi\n  sleep $((attempt * 10))\ndone"
            ),
        ));
    }
    if !workflow.packages.pip.is_empty() {
        let list = workflow.packages.pip.join(" ");
        steps.push(Step::run(
            "Install pip packages",
            format!(
                "for attempt in 1 2 3; do\n  pip install {list} && break\n  if [ \"$attempt\" = 3 ]; then exit 1; fi\n  sleep $((attempt * 10))\ndone"
            ),
        ));
    }
}

fn prompt_step(workflow: &Workflow) -> Step {
    // The activation text is threaded through env and appended with
    // printf, never interpolated into the heredoc, so payload content
    // cannot escape into the shell.
    let prompt = &workflow.prompt;
    Step::run(
        "Materialize prompt",
        format!(
            "mkdir -p {WORK_DIR}\ncat > {PROMPT_FILE} <<'AFLOW_PROMPT_EOF'\n{prompt}\nAFLOW_PROMPT_EOF\n{{\n  printf '\\n\\n## Run context\\n\\n'\n  printf 'Repository: %s\\n' \"$GITHUB_REPOSITORY\"\n  printf 'Run id: %s\\n' \"$GITHUB_RUN_ID\"\n  printf '\\n### Trigger text\\n\\n'\n  printf '%s\\n' \"$AFLOW_ACTIVATION_TEXT\"\n}} >> {PROMPT_FILE}\ntouch {SAFE_OUTPUTS_FILE}"
        ),
    )
    .with_env(
        "AFLOW_ACTIVATION_TEXT",
        "${{ needs.activation.outputs.text }}",
    )
}

fn log_capture_step() -> Step {
    Step::run(
        "Capture logs",
        format!(
            "mkdir -p {LOGS_DIR}/mcp {ARTIFACT_DIR}\nif [ -d {WORK_DIR}/firewall ]; then cp -r {WORK_DIR}/firewall {LOGS_DIR}/firewall; fi\nfor log in {LOGS_DIR}/mcp/*; do\n  [ -f \"$log\" ] || continue\n  tail -c {MCP_LOG_CAP_BYTES} \"$log\" > \"$log.bounded\" && mv \"$log.bounded\" \"$log\"\ndone\ncp -r {LOGS_DIR} {ARTIFACT_DIR}/logs"
        ),
    )
    .with_cond("always()")
}

fn collect_steps(workflow: &Workflow, pins: &PinRegistry) -> Result<Vec<Step>, CompilerError> {
    let kinds: Vec<&str> = workflow
        .safe_outputs
        .kinds()
        .map(|k| k.as_str())
        .collect();
    let mut env = IndexMap::new();
    env.insert(
        "AFLOW_SAFE_OUTPUTS".to_string(),
        SAFE_OUTPUTS_FILE.to_string(),
    );
    env.insert("AFLOW_ARTIFACT_DIR".to_string(), ARTIFACT_DIR.to_string());
    env.insert(
        "AFLOW_DECLARED_KINDS".to_string(),
        serde_json::to_string(&kinds).unwrap_or_else(|_| "[]".to_string()),
    );

    let writer = scripts::write_script_step("collect_outputs.cjs", scripts::COLLECT_OUTPUTS_SCRIPT)
        .with_cond("always()");
    let collector =
        scripts::github_script_step(pins, "Collect safe outputs", "collect_outputs.cjs", env)?
            .with_id("collect")
            .with_cond("always()");
    Ok(vec![writer, collector])
}

fn upload_step(pins: &PinRegistry) -> Result<Step, CompilerError> {
    let (action, version) = pins.reference("actions/upload-artifact")?;
    let mut with = IndexMap::new();
    with.insert("name".to_string(), SAFE_OUTPUTS_ARTIFACT.to_string());
    with.insert("path".to_string(), ARTIFACT_DIR.to_string());
    with.insert("if-no-files-found".to_string(), "ignore".to_string());
    Ok(Step::Uses {
        name: "Upload safe-output artifact".to_string(),
        action,
        version,
        id: None,
        with,
        env: IndexMap::new(),
        cond: Some("always()".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow(yaml: &str) -> Workflow {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml).unwrap();
        let (wf, diags) = Workflow::from_merged("t", &mapping, "prompt");
        wf.unwrap_or_else(|| panic!("{diags}"))
    }

    fn build_agent(yaml: &str) -> Job {
        build(&workflow(yaml), PinRegistry::global().unwrap(), false).unwrap()
    }

    #[test]
    fn test_agent_permissions_are_contents_read_only() {
        let job = build_agent("on: issues\nengine: copilot");
        assert_eq!(job.permissions, PermissionSet::read_contents_only());
    }

    #[test]
    fn test_agent_needs_activation_with_skip_guard() {
        let job = build_agent("on: issues\nengine: copilot");
        assert_eq!(job.needs, ["activation"]);
        assert!(job.cond.as_deref().unwrap().contains("skip"));
    }

    #[test]
    fn test_membership_gate_added_to_needs() {
        let job = build(
            &workflow("on: issues\nengine: copilot\nroles: [admin]"),
            PinRegistry::global().unwrap(),
            true,
        )
        .unwrap();
        assert_eq!(job.needs, ["activation", "check_membership"]);
    }

    #[test]
    fn test_step_order_setup_before_engine() {
        let job = build_agent("on: issues\nengine: copilot");
        let names: Vec<&str> = job
            .steps
            .iter()
            .map(|s| match s {
                Step::Run { name, .. } | Step::Uses { name, .. } => name.as_str(),
                Step::Raw { .. } => "(raw)",
            })
            .collect();
        let pos = |needle: &str| {
            names
                .iter()
                .position(|n| n.contains(needle))
                .unwrap_or_else(|| panic!("missing step '{needle}' in {names:?}"))
        };
        assert!(pos("Checkout") < pos("Set up agent environment"));
        assert!(pos("Set up agent environment") < pos("Enable egress firewall"));
        assert!(pos("Enable egress firewall") < pos("Materialize prompt"));
        assert!(pos("Materialize prompt") < pos("Run Copilot"));
        assert!(pos("Run Copilot") < pos("Capture logs"));
        assert!(pos("Capture logs") < pos("Collect safe outputs"));
        assert!(pos("Collect safe outputs") < pos("Upload safe-output artifact"));
    }

    #[test]
    fn test_timeout_from_engine_default() {
        let job = build_agent("on: issues\nengine: claude");
        assert_eq!(job.timeout_minutes, Some(30));
    }

    #[test]
    fn test_memory_tool_adds_cache_step() {
        let job = build_agent("on: issues\nengine: copilot\ntools:\n  memory: true");
        assert!(job.steps.iter().any(|s| matches!(
            s,
            Step::Uses { name, .. } if name == "Cache agent memory"
        )));
    }

    #[test]
    fn test_cache_entries_become_steps_with_ids() {
        let job = build_agent(
            "on: issues\nengine: copilot\ncache:\n  id: deps\n  path: node_modules\n  key: npm-v1",
        );
        assert!(job.steps.iter().any(|s| matches!(
            s,
            Step::Uses { id: Some(id), .. } if id == "deps"
        )));
    }

    #[test]
    fn test_project_url_threaded_read_only() {
        let job = build_agent(
            "on: issues\nengine: copilot\nproject: https://github.com/orgs/acme/projects/2",
        );
        assert_eq!(
            job.env.get("AFLOW_PROJECT_URL").unwrap(),
            "https://github.com/orgs/acme/projects/2"
        );
    }

    #[test]
    fn test_prompt_step_uses_env_for_activation_text() {
        let job = build_agent("on: issues\nengine: copilot");
        let prompt = job
            .steps
            .iter()
            .find_map(|s| match s {
                Step::Run { name, run, env, .. } if name == "Materialize prompt" => {
                    Some((run.clone(), env.clone()))
                }
                _ => None,
            })
            .unwrap();
        assert!(prompt.0.contains("AFLOW_PROMPT_EOF"));
        assert!(!prompt.0.contains("needs.activation"));
        assert_eq!(
            prompt.1.get("AFLOW_ACTIVATION_TEXT").unwrap(),
            "${{ needs.activation.outputs.text }}"
        );
    }

    #[test]
    fn test_packages_install_with_retry() {
        let job = build_agent(
            "on: issues\nengine: copilot\npackages:\n  npm: [lodash]\n  pip: [requests]",
        );
        let runs: Vec<&str> = job
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::Run { name, run, .. } if name.contains("packages") => Some(run.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.contains("for attempt in 1 2 3")));
    }

    #[test]
    fn test_collect_outputs_exposed_as_job_output() {
        let job = build_agent("on: issues\nengine: copilot\nsafe-outputs:\n  create-issue:\n");
        assert_eq!(
            job.outputs.get("safe_output_kinds").unwrap(),
            "${{ steps.collect.outputs.safe_output_kinds }}"
        );
    }
}
