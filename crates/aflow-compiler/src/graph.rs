//! The pipeline-graph intermediate representation.
//!
//! A compile builds one [`PipelineGraph`] per invocation; the emitter is a
//! thin projection from it. The IR is serializable so tests can assert on
//! structure (and byte-stability) without going through YAML.

use aflow_model::PermissionSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

/// Invariant role tag. The compiler keys its cross-job invariants off the
/// tag rather than job ids, so re-orderings cannot silently break them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobRole {
    Activation,
    Membership,
    Agent,
    SafeOutput(String),
    Detection,
    Post,
}

/// One step inside a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Shell invocation.
    Run {
        name: String,
        run: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        env: IndexMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cond: Option<String>,
    },
    /// Reusable action, pinned to a commit SHA.
    Uses {
        name: String,
        /// `owner/repo@<sha>`
        action: String,
        /// Trailing comment the emitter appends (`# vX.Y.Z`).
        version: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        with: IndexMap<String, String>,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        env: IndexMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cond: Option<String>,
    },
    /// User-supplied raw step (custom engines), passed through.
    Raw { mapping: Mapping },
}

impl Step {
    pub fn run(name: impl Into<String>, script: impl Into<String>) -> Self {
        Step::Run {
            name: name.into(),
            run: script.into(),
            id: None,
            env: IndexMap::new(),
            cond: None,
        }
    }

    pub fn with_id(mut self, step_id: impl Into<String>) -> Self {
        match &mut self {
            Step::Run { id, .. } | Step::Uses { id, .. } => *id = Some(step_id.into()),
            Step::Raw { .. } => {}
        }
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self {
            Step::Run { env, .. } | Step::Uses { env, .. } => {
                env.insert(key.into(), value.into());
            }
            Step::Raw { .. } => {}
        }
        self
    }

    pub fn with_cond(mut self, expression: impl Into<String>) -> Self {
        match &mut self {
            Step::Run { cond, .. } | Step::Uses { cond, .. } => *cond = Some(expression.into()),
            Step::Raw { .. } => {}
        }
        self
    }
}

/// One job in the emitted pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub role: JobRole,
    pub runs_on: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<String>,
    pub permissions: PermissionSet,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, String>,
    pub steps: Vec<Step>,
}

impl Job {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: JobRole) -> Self {
        Job {
            id: id.into(),
            name: name.into(),
            role,
            runs_on: "ubuntu-latest".to_string(),
            needs: Vec::new(),
            cond: None,
            permissions: PermissionSet::new(),
            env: IndexMap::new(),
            timeout_minutes: None,
            outputs: IndexMap::new(),
            steps: Vec::new(),
        }
    }
}

/// The whole pipeline: triggers plus an ordered job set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineGraph {
    /// Display name of the emitted workflow.
    pub name: String,
    /// Source workflow id (job-name root, concurrency group).
    pub source_id: String,
    /// Trigger events with their pass-through filter mappings.
    pub on: Vec<(String, Mapping)>,
    /// Concurrency group so overlapping runs queue per workflow.
    pub concurrency_group: String,
    pub jobs: Vec<Job>,
}

impl PipelineGraph {
    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn job_by_role(&self, role: &JobRole) -> Option<&Job> {
        self.jobs.iter().find(|j| &j.role == role)
    }

    pub fn jobs_with_role(&self, pred: impl Fn(&JobRole) -> bool) -> Vec<&Job> {
        self.jobs.iter().filter(|j| pred(&j.role)).collect()
    }
}
