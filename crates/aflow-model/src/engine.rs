//! Agent engine variants.
//!
//! Exactly one engine drives a workflow. Copilot has no turn knob (turn
//! pressure is applied through prompt optimization); Claude and Codex take
//! an explicit `max-turns`. Custom splices user steps into the agent job
//! while keeping the sandbox, token, and log-capture boilerplate.

use aflow_core::{Category, Diagnostic, Diagnostics};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::extract;

/// Model identifiers each engine accepts. Custom engines pass through.
pub const COPILOT_MODELS: [&str; 4] = [
    "gpt-5",
    "gpt-5-mini",
    "claude-sonnet-4",
    "claude-sonnet-4.5",
];
pub const CLAUDE_MODELS: [&str; 5] = [
    "claude-opus-4-1",
    "claude-opus-4-5",
    "claude-sonnet-4",
    "claude-sonnet-4-5",
    "claude-haiku-4-5",
];
pub const CODEX_MODELS: [&str; 3] = ["gpt-5-codex", "o4-mini", "gpt-5"];

/// A user-supplied step for the custom engine, passed through to the agent
/// job verbatim (run/uses mapping in runner syntax).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomStep {
    pub raw: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "lowercase")]
pub enum EngineSpec {
    Copilot {
        model: Option<String>,
        version: Option<String>,
        args: Vec<String>,
    },
    Claude {
        model: Option<String>,
        version: Option<String>,
        max_turns: Option<u32>,
        args: Vec<String>,
    },
    Codex {
        model: Option<String>,
        version: Option<String>,
        max_turns: Option<u32>,
        args: Vec<String>,
    },
    Custom {
        steps: Vec<CustomStep>,
    },
}

impl Default for EngineSpec {
    fn default() -> Self {
        EngineSpec::Copilot {
            model: None,
            version: None,
            args: Vec::new(),
        }
    }
}

impl EngineSpec {
    pub fn id(&self) -> &'static str {
        match self {
            EngineSpec::Copilot { .. } => "copilot",
            EngineSpec::Claude { .. } => "claude",
            EngineSpec::Codex { .. } => "codex",
            EngineSpec::Custom { .. } => "custom",
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            EngineSpec::Copilot { model, .. }
            | EngineSpec::Claude { model, .. }
            | EngineSpec::Codex { model, .. } => model.as_deref(),
            EngineSpec::Custom { .. } => None,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            EngineSpec::Copilot { version, .. }
            | EngineSpec::Claude { version, .. }
            | EngineSpec::Codex { version, .. } => version.as_deref(),
            EngineSpec::Custom { .. } => None,
        }
    }

    pub fn max_turns(&self) -> Option<u32> {
        match self {
            EngineSpec::Claude { max_turns, .. } | EngineSpec::Codex { max_turns, .. } => {
                *max_turns
            }
            _ => None,
        }
    }

    /// Recognized model set, or `None` when anything passes (custom).
    pub fn recognized_models(&self) -> Option<&'static [&'static str]> {
        match self {
            EngineSpec::Copilot { .. } => Some(&COPILOT_MODELS),
            EngineSpec::Claude { .. } => Some(&CLAUDE_MODELS),
            EngineSpec::Codex { .. } => Some(&CODEX_MODELS),
            EngineSpec::Custom { .. } => None,
        }
    }

    /// Per-engine `timeout-minutes` default when the workflow declares none.
    pub fn default_timeout_minutes(&self) -> u32 {
        match self {
            EngineSpec::Copilot { .. } => 20,
            EngineSpec::Claude { .. } | EngineSpec::Codex { .. } => 30,
            EngineSpec::Custom { .. } => 30,
        }
    }

    /// Parse the `engine:` value: a bare id string or a mapping with `id`
    /// plus engine-specific fields.
    pub fn from_value(value: &Value, diags: &mut Diagnostics) -> Self {
        match value {
            Value::String(id) => Self::from_parts(id, &Mapping::new(), diags),
            Value::Mapping(m) => {
                let Some(id_value) = extract::get(m, "id") else {
                    diags.push(
                        Diagnostic::error(Category::User, "engine mapping requires an 'id' field")
                            .at("engine")
                            .with_hint("one of: copilot, claude, codex, custom"),
                    );
                    return EngineSpec::default();
                };
                let Some(id) = extract::as_str(id_value, "engine.id", diags) else {
                    return EngineSpec::default();
                };
                Self::from_parts(&id, m, diags)
            }
            other => {
                extract::type_error("engine", "a string or a mapping", other, diags);
                EngineSpec::default()
            }
        }
    }

    fn from_parts(id: &str, m: &Mapping, diags: &mut Diagnostics) -> Self {
        let model = extract::get(m, "model")
            .and_then(|v| extract::as_str(v, "engine.model", diags));
        let version = extract::get(m, "version")
            .and_then(|v| extract::as_str(v, "engine.version", diags));
        let max_turns = extract::get(m, "max-turns")
            .and_then(|v| extract::as_positive_u32(v, "engine.max-turns", diags));
        let args = extract::get(m, "args")
            .and_then(|v| extract::as_str_seq(v, "engine.args", diags))
            .unwrap_or_default();

        match id {
            "copilot" => {
                extract::reject_unknown_keys(
                    m,
                    &["id", "model", "version", "max-turns", "args"],
                    "engine",
                    diags,
                );
                if extract::get(m, "max-turns").is_some() {
                    diags.push(
                        Diagnostic::error(
                            Category::User,
                            "the copilot engine has no max-turns knob",
                        )
                        .at("engine.max-turns")
                        .with_hint("turn pressure is applied through prompt optimization; remove the field"),
                    );
                }
                EngineSpec::Copilot {
                    model,
                    version,
                    args,
                }
            }
            "claude" => {
                extract::reject_unknown_keys(
                    m,
                    &["id", "model", "version", "max-turns", "args"],
                    "engine",
                    diags,
                );
                EngineSpec::Claude {
                    model,
                    version,
                    max_turns,
                    args,
                }
            }
            "codex" => {
                extract::reject_unknown_keys(
                    m,
                    &["id", "model", "version", "max-turns", "args"],
                    "engine",
                    diags,
                );
                EngineSpec::Codex {
                    model,
                    version,
                    max_turns,
                    args,
                }
            }
            "custom" => {
                extract::reject_unknown_keys(m, &["id", "steps"], "engine", diags);
                let mut steps = Vec::new();
                if let Some(raw_steps) = extract::get(m, "steps") {
                    if let Some(seq) = extract::as_sequence(raw_steps, "engine.steps", diags) {
                        for (i, item) in seq.iter().enumerate() {
                            let path = format!("engine.steps[{i}]");
                            if let Some(step) = extract::as_mapping(item, &path, diags) {
                                steps.push(CustomStep { raw: step.clone() });
                            }
                        }
                    }
                }
                if steps.is_empty() {
                    diags.push(
                        Diagnostic::error(
                            Category::User,
                            "custom engine requires at least one step",
                        )
                        .at("engine.steps"),
                    );
                }
                EngineSpec::Custom { steps }
            }
            other => {
                diags.push(
                    Diagnostic::error(Category::User, format!("unrecognized engine '{other}'"))
                        .at("engine")
                        .with_hint("one of: copilot, claude, codex, custom"),
                );
                EngineSpec::default()
            }
        }
    }
}
