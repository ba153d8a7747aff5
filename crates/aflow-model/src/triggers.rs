//! Trigger set: which events activate the workflow, with per-kind filters.

use aflow_core::{Category, Diagnostic, Diagnostics};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::extract;

/// Event names the activation job understands.
pub const RECOGNIZED_EVENTS: [&str; 12] = [
    "issues",
    "issue_comment",
    "pull_request",
    "pull_request_review_comment",
    "pull_request_target",
    "push",
    "schedule",
    "workflow_dispatch",
    "workflow_run",
    "discussion",
    "discussion_comment",
    "release",
];

/// One event kind plus its raw filter mapping (types, branches, cron, ...).
/// Filters pass through to the emitted trigger block untouched, except
/// `forks`, which the activation job consumes as its fork allowlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub event: String,
    pub filters: Mapping,
}

/// The full `on:` declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerSet {
    pub triggers: Vec<Trigger>,
    /// Repos (owner/name, `*` suffix allowed) whose forks may activate a
    /// pull-request trigger. Empty means deny all forks.
    pub fork_allowlist: Vec<String>,
}

impl TriggerSet {
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.triggers.iter().any(|t| t.event == event)
    }

    /// Parse the `on:` value. Accepted shapes: a single event name, a
    /// sequence of event names, or a mapping of event name → filters.
    pub fn from_value(value: &Value, diags: &mut Diagnostics) -> Self {
        let mut set = TriggerSet::default();
        match value {
            Value::String(event) => {
                set.push_event(event, Mapping::new(), diags);
            }
            Value::Sequence(events) => {
                for (i, item) in events.iter().enumerate() {
                    if let Some(event) = extract::as_str(item, &format!("on[{i}]"), diags) {
                        set.push_event(&event, Mapping::new(), diags);
                    }
                }
            }
            Value::Mapping(m) => {
                for (key, filters) in m {
                    let Some(event) = key.as_str() else {
                        extract::type_error("on", "string event names", key, diags);
                        continue;
                    };
                    let path = format!("on.{event}");
                    let filters = match filters {
                        Value::Null => Mapping::new(),
                        Value::Mapping(fm) => fm.clone(),
                        other => {
                            extract::type_error(&path, "a mapping of filters", other, diags);
                            continue;
                        }
                    };
                    set.push_event(event, filters, diags);
                }
            }
            other => {
                extract::type_error("on", "an event name, sequence, or mapping", other, diags);
            }
        }

        if set.is_empty() && !diags.has_errors() {
            diags.push(
                Diagnostic::error(Category::User, "'on' must declare at least one trigger")
                    .at("on")
                    .with_hint("e.g. `on: workflow_dispatch` for manual runs"),
            );
        }
        set
    }

    fn push_event(&mut self, event: &str, mut filters: Mapping, diags: &mut Diagnostics) {
        if !RECOGNIZED_EVENTS.contains(&event) {
            diags.push(
                Diagnostic::error(
                    Category::User,
                    format!("unrecognized trigger event '{event}'"),
                )
                .at(format!("on.{event}"))
                .with_hint(format!("recognized events: {}", RECOGNIZED_EVENTS.join(", "))),
            );
            return;
        }

        // `forks:` is compiler input, not runner syntax.
        if let Some(forks) = filters.remove(Value::String("forks".into())) {
            if let Some(list) =
                extract::as_str_or_seq(&forks, &format!("on.{event}.forks"), diags)
            {
                for repo in list {
                    if !self.fork_allowlist.contains(&repo) {
                        self.fork_allowlist.push(repo);
                    }
                }
            }
        }

        if self.has_event(event) {
            diags.push(
                Diagnostic::error(Category::User, format!("trigger '{event}' declared twice"))
                    .at(format!("on.{event}")),
            );
            return;
        }

        self.triggers.push(Trigger {
            event: event.to_string(),
            filters,
        });
    }
}
