//! Embedded runtime scripts and the steps that materialize them.
//!
//! The lock file must be self-contained, so each script is written to the
//! runner's filesystem by a heredoc step and then invoked through the
//! pinned github-script action.

use aflow_core::CompilerError;
use indexmap::IndexMap;

use crate::graph::Step;
use crate::pins::PinRegistry;

/// Scratch root shared by every job on the runner.
pub const WORK_DIR: &str = "/tmp/aflow";
pub const SCRIPTS_DIR: &str = "/tmp/aflow/scripts";
pub const LOGS_DIR: &str = "/tmp/aflow/logs";
pub const ARTIFACT_DIR: &str = "/tmp/aflow/artifact";
pub const PROMPT_FILE: &str = "/tmp/aflow/prompt.md";
pub const SAFE_OUTPUTS_FILE: &str = "/tmp/aflow/safe-outputs.jsonl";
pub const MCP_CONFIG_FILE: &str = "/tmp/aflow/mcp-config.json";
/// Artifact carrying the collected safe-output requests between jobs.
pub const SAFE_OUTPUTS_ARTIFACT: &str = "aflow-safe-outputs";

pub const ACTIVATION_SCRIPT: &str = include_str!("../assets/activation.cjs");
pub const COLLECT_OUTPUTS_SCRIPT: &str = include_str!("../assets/collect_outputs.cjs");
pub const HANDLE_SAFE_OUTPUT_SCRIPT: &str = include_str!("../assets/handle_safe_output.cjs");
pub const THREAT_DETECTION_SCRIPT: &str = include_str!("../assets/threat_detection.cjs");
pub const CHECK_MEMBERSHIP_SCRIPT: &str = include_str!("../assets/check_membership.cjs");

const HEREDOC_DELIMITER: &str = "AFLOW_SCRIPT_EOF";

/// Step that writes `content` to `{SCRIPTS_DIR}/{filename}` verbatim.
pub fn write_script_step(filename: &str, content: &str) -> Step {
    debug_assert!(!content.contains(HEREDOC_DELIMITER));
    Step::run(
        format!("Materialize {filename}"),
        format!(
            "mkdir -p {SCRIPTS_DIR}\ncat > {SCRIPTS_DIR}/{filename} <<'{HEREDOC_DELIMITER}'\n{content}\n{HEREDOC_DELIMITER}"
        ),
    )
}

/// Step that runs a previously materialized script through github-script.
pub fn github_script_step(
    pins: &PinRegistry,
    name: &str,
    filename: &str,
    env: IndexMap<String, String>,
) -> Result<Step, CompilerError> {
    let (action, version) = pins.reference("actions/github-script")?;
    let mut with = IndexMap::new();
    with.insert(
        "script".to_string(),
        format!(
            "const handler = require(\"{SCRIPTS_DIR}/{filename}\");\nawait handler({{ github, context, core }});"
        ),
    );
    Ok(Step::Uses {
        name: name.to_string(),
        action,
        version,
        id: None,
        with,
        env,
        cond: None,
    })
}
