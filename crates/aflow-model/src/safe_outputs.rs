//! Safe-output declarations: the side effects the agent may request.
//!
//! The agent itself runs read-only; each declared kind here becomes a
//! dedicated downstream job carrying exactly the write scope that kind
//! needs. The per-kind `max` cap is enforced both here (compile time) and
//! by the generated handler (run time).

use aflow_core::{Category, Diagnostic, Diagnostics};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::extract;
use crate::permissions::{Access, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafeOutputKind {
    CreateIssue,
    UpdateIssue,
    CreatePullRequest,
    CreateDiscussion,
    AddComment,
    CreateReview,
    AddLabels,
    UploadAsset,
    DispatchWorkflow,
    CreateProject,
    UpdateProject,
    CopyProject,
    CreateProjectStatusUpdate,
    AutofixCodeScanningAlert,
    Noop,
}

impl SafeOutputKind {
    pub const ALL: [SafeOutputKind; 15] = [
        SafeOutputKind::CreateIssue,
        SafeOutputKind::UpdateIssue,
        SafeOutputKind::CreatePullRequest,
        SafeOutputKind::CreateDiscussion,
        SafeOutputKind::AddComment,
        SafeOutputKind::CreateReview,
        SafeOutputKind::AddLabels,
        SafeOutputKind::UploadAsset,
        SafeOutputKind::DispatchWorkflow,
        SafeOutputKind::CreateProject,
        SafeOutputKind::UpdateProject,
        SafeOutputKind::CopyProject,
        SafeOutputKind::CreateProjectStatusUpdate,
        SafeOutputKind::AutofixCodeScanningAlert,
        SafeOutputKind::Noop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SafeOutputKind::CreateIssue => "create-issue",
            SafeOutputKind::UpdateIssue => "update-issue",
            SafeOutputKind::CreatePullRequest => "create-pull-request",
            SafeOutputKind::CreateDiscussion => "create-discussion",
            SafeOutputKind::AddComment => "add-comment",
            SafeOutputKind::CreateReview => "create-review",
            SafeOutputKind::AddLabels => "add-labels",
            SafeOutputKind::UploadAsset => "upload-asset",
            SafeOutputKind::DispatchWorkflow => "dispatch-workflow",
            SafeOutputKind::CreateProject => "create-project",
            SafeOutputKind::UpdateProject => "update-project",
            SafeOutputKind::CopyProject => "copy-project",
            SafeOutputKind::CreateProjectStatusUpdate => "create-project-status-update",
            SafeOutputKind::AutofixCodeScanningAlert => "autofix-code-scanning-alert",
            SafeOutputKind::Noop => "noop",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        SafeOutputKind::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Job id fragment (runner job keys use underscores).
    pub fn job_suffix(&self) -> String {
        self.as_str().replace('-', "_")
    }

    /// Minimum write scopes the dedicated job needs. Project kinds talk to
    /// the Projects API through a separately provisioned token, so they
    /// carry no workflow-token write scope.
    pub fn required_scopes(&self) -> &'static [(Scope, Access)] {
        match self {
            SafeOutputKind::CreateIssue
            | SafeOutputKind::UpdateIssue
            | SafeOutputKind::AddComment
            | SafeOutputKind::AddLabels => &[(Scope::Issues, Access::Write)],
            SafeOutputKind::CreatePullRequest => &[
                (Scope::Contents, Access::Write),
                (Scope::PullRequests, Access::Write),
            ],
            SafeOutputKind::CreateDiscussion => &[(Scope::Discussions, Access::Write)],
            SafeOutputKind::CreateReview => &[(Scope::PullRequests, Access::Write)],
            SafeOutputKind::UploadAsset => &[(Scope::Contents, Access::Write)],
            SafeOutputKind::DispatchWorkflow => &[(Scope::Actions, Access::Write)],
            SafeOutputKind::AutofixCodeScanningAlert => {
                &[(Scope::SecurityEvents, Access::Write)]
            }
            SafeOutputKind::CreateProject
            | SafeOutputKind::UpdateProject
            | SafeOutputKind::CopyProject
            | SafeOutputKind::CreateProjectStatusUpdate
            | SafeOutputKind::Noop => &[],
        }
    }

    pub fn default_max(&self) -> u32 {
        match self {
            SafeOutputKind::AddComment | SafeOutputKind::CreateReview => 1,
            SafeOutputKind::AddLabels => 5,
            SafeOutputKind::UpdateProject => 100,
            SafeOutputKind::Noop => 1,
            _ => 1,
        }
    }

    /// Kinds that operate on the GitHub Projects surface and accept a
    /// project URL binding.
    pub fn is_project_kind(&self) -> bool {
        matches!(
            self,
            SafeOutputKind::CreateProject
                | SafeOutputKind::UpdateProject
                | SafeOutputKind::CopyProject
                | SafeOutputKind::CreateProjectStatusUpdate
        )
    }
}

/// Per-kind declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeOutputSpec {
    pub kind: SafeOutputKind,
    /// Cap on accepted requests per run; excess requests are dropped with a
    /// reported count.
    pub max: u32,
    pub title_prefix: Option<String>,
    /// Labels the handler may apply; empty means any.
    pub labels: Vec<String>,
    /// Cross-repo targets allowed for this kind; empty means current repo only.
    pub target_repos: Vec<String>,
    /// Project URL binding for project kinds.
    pub project_url: Option<String>,
}

impl SafeOutputSpec {
    pub fn new(kind: SafeOutputKind) -> Self {
        Self {
            kind,
            max: kind.default_max(),
            title_prefix: None,
            labels: Vec::new(),
            target_repos: Vec::new(),
            project_url: None,
        }
    }
}

/// The `safe-outputs:` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafeOutputs {
    pub entries: IndexMap<SafeOutputKind, SafeOutputSpec>,
    /// Run an aggregate threat-detection pass before any effect applies.
    pub threat_detection: bool,
    /// Render every effect as a dry-run preview instead of calling the API.
    pub staged: bool,
}

impl SafeOutputs {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, kind: SafeOutputKind) -> Option<&SafeOutputSpec> {
        self.entries.get(&kind)
    }

    pub fn declare(&mut self, spec: SafeOutputSpec) {
        self.entries.insert(spec.kind, spec);
    }

    /// Kinds in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = SafeOutputKind> + '_ {
        self.entries.keys().copied()
    }

    pub fn from_mapping(mapping: &Mapping, diags: &mut Diagnostics) -> Self {
        let mut outputs = SafeOutputs::default();
        for (key, value) in mapping {
            let Some(name) = key.as_str() else {
                extract::type_error("safe-outputs", "string output kinds", key, diags);
                continue;
            };
            let path = format!("safe-outputs.{name}");

            match name {
                "threat-detection" => {
                    if let Some(flag) = extract::as_bool(value, &path, diags) {
                        outputs.threat_detection = flag;
                    }
                    continue;
                }
                "staged" => {
                    if let Some(flag) = extract::as_bool(value, &path, diags) {
                        outputs.staged = flag;
                    }
                    continue;
                }
                _ => {}
            }

            let Some(kind) = SafeOutputKind::parse(name) else {
                diags.push(
                    Diagnostic::error(
                        Category::User,
                        format!("unrecognized safe-output kind '{name}'"),
                    )
                    .at(path)
                    .with_hint(format!(
                        "recognized kinds: {}",
                        SafeOutputKind::ALL
                            .iter()
                            .map(|k| k.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                );
                continue;
            };

            let mut spec = SafeOutputSpec::new(kind);
            match value {
                Value::Null => {}
                Value::Mapping(m) => {
                    extract::reject_unknown_keys(
                        m,
                        &["max", "title-prefix", "labels", "target-repo", "project"],
                        &path,
                        diags,
                    );
                    if let Some(v) = extract::get(m, "max") {
                        if let Some(max) = extract::as_u32(v, &format!("{path}.max"), diags) {
                            spec.max = max;
                        }
                    }
                    spec.title_prefix = extract::get(m, "title-prefix")
                        .and_then(|v| extract::as_str(v, &format!("{path}.title-prefix"), diags));
                    spec.labels = extract::get(m, "labels")
                        .and_then(|v| extract::as_str_seq(v, &format!("{path}.labels"), diags))
                        .unwrap_or_default();
                    spec.target_repos = extract::get(m, "target-repo")
                        .and_then(|v| extract::as_str_or_seq(v, &format!("{path}.target-repo"), diags))
                        .unwrap_or_default();
                    spec.project_url = extract::get(m, "project")
                        .and_then(|v| extract::as_str(v, &format!("{path}.project"), diags));
                    if spec.project_url.is_some() && !kind.is_project_kind() {
                        diags.push(
                            Diagnostic::error(
                                Category::User,
                                format!("'{name}' does not take a project binding"),
                            )
                            .at(format!("{path}.project")),
                        );
                    }
                }
                other => {
                    extract::type_error(&path, "a mapping or nothing", other, diags);
                    continue;
                }
            }
            outputs.declare(spec);
        }
        outputs
    }
}
