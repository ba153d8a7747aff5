//! Engine-specific step sequences for the agent job.
//!
//! Each built-in engine resolves to an install step (retried; registry
//! installs are the classic transient failure) and an invocation step.
//! Custom engines splice the user's steps between the same sandbox
//! boilerplate the built-ins get.

use aflow_model::{EngineSpec, Workflow};

use crate::graph::Step;
use crate::scripts::{LOGS_DIR, MCP_CONFIG_FILE, PROMPT_FILE, SAFE_OUTPUTS_FILE};

/// Shell retry wrapper for registry installs: 3 attempts, linear backoff.
fn retried_install(command: &str) -> String {
    format!(
        "for attempt in 1 2 3; do\n  {command} && break\n  if [ \"$attempt\" = 3 ]; then exit 1; fi\n  sleep $((attempt * 10))\ndone"
    )
}

pub fn engine_steps(workflow: &Workflow) -> Vec<Step> {
    match &workflow.engine {
        EngineSpec::Copilot {
            model,
            version,
            args,
        } => copilot_steps(model.as_deref(), version.as_deref(), args),
        EngineSpec::Claude {
            model,
            version,
            max_turns,
            args,
        } => claude_steps(model.as_deref(), version.as_deref(), *max_turns, args),
        EngineSpec::Codex {
            model,
            version,
            max_turns,
            args,
        } => codex_steps(model.as_deref(), version.as_deref(), *max_turns, args),
        EngineSpec::Custom { steps } => steps
            .iter()
            .map(|s| Step::Raw {
                mapping: s.raw.clone(),
            })
            .collect(),
    }
}

fn copilot_steps(model: Option<&str>, version: Option<&str>, args: &[String]) -> Vec<Step> {
    let install = retried_install(&format!(
        "npm install -g @github/copilot-cli@{}",
        version.unwrap_or("latest")
    ));

    let mut invocation = format!(
        "mkdir -p {LOGS_DIR}/engine\ncopilot --banner none --no-interactive \\\n  --prompt-file {PROMPT_FILE} \\\n  --log-dir {LOGS_DIR}/engine"
    );
    if let Some(model) = model {
        invocation.push_str(&format!(" \\\n  --model {model}"));
    }
    for arg in args {
        invocation.push_str(&format!(" \\\n  {arg}"));
    }

    vec![
        Step::run("Install Copilot CLI", install),
        Step::run("Run Copilot", invocation)
            .with_env("COPILOT_MCP_CONFIG", MCP_CONFIG_FILE)
            .with_env("AFLOW_SAFE_OUTPUTS", SAFE_OUTPUTS_FILE)
            .with_env("GH_TOKEN", "${{ secrets.COPILOT_CLI_TOKEN }}"),
    ]
}

fn claude_steps(
    model: Option<&str>,
    version: Option<&str>,
    max_turns: Option<u32>,
    args: &[String],
) -> Vec<Step> {
    let install = retried_install(&format!(
        "npm install -g @anthropic-ai/claude-code@{}",
        version.unwrap_or("latest")
    ));

    let mut invocation = format!(
        "mkdir -p {LOGS_DIR}/engine\nclaude --print --verbose \\\n  --output-format stream-json \\\n  --mcp-config {MCP_CONFIG_FILE}"
    );
    if let Some(turns) = max_turns {
        invocation.push_str(&format!(" \\\n  --max-turns {turns}"));
    }
    if let Some(model) = model {
        invocation.push_str(&format!(" \\\n  --model {model}"));
    }
    for arg in args {
        invocation.push_str(&format!(" \\\n  {arg}"));
    }
    invocation.push_str(&format!(
        " \\\n  \"$(cat {PROMPT_FILE})\" | tee {LOGS_DIR}/engine/claude.jsonl"
    ));

    vec![
        Step::run("Install Claude Code", install),
        Step::run("Run Claude", invocation)
            .with_env("ANTHROPIC_API_KEY", "${{ secrets.ANTHROPIC_API_KEY }}")
            .with_env("AFLOW_SAFE_OUTPUTS", SAFE_OUTPUTS_FILE),
    ]
}

fn codex_steps(
    model: Option<&str>,
    version: Option<&str>,
    max_turns: Option<u32>,
    args: &[String],
) -> Vec<Step> {
    let install = retried_install(&format!(
        "npm install -g @openai/codex@{}",
        version.unwrap_or("latest")
    ));

    let mut invocation = format!(
        "mkdir -p {LOGS_DIR}/engine\ncodex exec --skip-git-repo-check \\\n  --mcp-config {MCP_CONFIG_FILE}"
    );
    if let Some(turns) = max_turns {
        invocation.push_str(&format!(" \\\n  --max-turns {turns}"));
    }
    if let Some(model) = model {
        invocation.push_str(&format!(" \\\n  --model {model}"));
    }
    for arg in args {
        invocation.push_str(&format!(" \\\n  {arg}"));
    }
    invocation.push_str(&format!(
        " \\\n  \"$(cat {PROMPT_FILE})\" 2>&1 | tee {LOGS_DIR}/engine/codex.log"
    ));

    vec![
        Step::run("Install Codex CLI", install),
        Step::run("Run Codex", invocation)
            .with_env("OPENAI_API_KEY", "${{ secrets.OPENAI_API_KEY }}")
            .with_env("AFLOW_SAFE_OUTPUTS", SAFE_OUTPUTS_FILE),
    ]
}
