use aflow_model::{Access, Scope, Workflow};

use super::*;
use crate::graph::JobRole;

fn workflow(yaml: &str) -> Workflow {
    let mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml).unwrap();
    let (wf, diags) = Workflow::from_merged("t", &mapping, "");
    wf.unwrap_or_else(|| panic!("{diags}"))
}

fn jobs(yaml: &str) -> Vec<Job> {
    build_jobs(&workflow(yaml), PinRegistry::global().unwrap()).unwrap()
}

#[test]
fn test_one_job_per_declared_kind() {
    let jobs = jobs(
        "on: issues\nengine: copilot\nsafe-outputs:\n  create-issue:\n    max: 3\n  add-comment:\n",
    );
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, "safe_output_create_issue");
    assert_eq!(jobs[1].id, "safe_output_add_comment");
}

#[test]
fn test_job_needs_agent_with_success_guard() {
    let jobs = jobs("on: issues\nengine: copilot\nsafe-outputs:\n  create-issue:\n");
    let job = &jobs[0];
    assert_eq!(job.needs, ["agent"]);
    let cond = job.cond.as_deref().unwrap();
    assert!(cond.contains("needs.agent.result == 'success'"), "got: {cond}");
    assert!(cond.contains("'create-issue'"), "got: {cond}");
}

#[test]
fn test_minimum_write_scope_only() {
    let jobs = jobs("on: issues\nengine: copilot\nsafe-outputs:\n  create-issue:\n");
    let perms = &jobs[0].permissions;
    assert_eq!(perms.get(Scope::Issues), Some(Access::Write));
    assert_eq!(perms.iter().count(), 1);
}

#[test]
fn test_create_pull_request_gets_two_scopes() {
    let jobs = jobs("on: issues\nengine: copilot\nsafe-outputs:\n  create-pull-request:\n");
    let perms = &jobs[0].permissions;
    assert_eq!(perms.get(Scope::Contents), Some(Access::Write));
    assert_eq!(perms.get(Scope::PullRequests), Some(Access::Write));
}

#[test]
fn test_noop_declares_no_permissions() {
    let jobs = jobs("on: issues\nengine: copilot\nsafe-outputs:\n  noop:\n");
    assert!(jobs[0].permissions.is_empty());
}

#[test]
fn test_cap_threaded_into_handler_env() {
    let jobs = jobs("on: issues\nengine: copilot\nsafe-outputs:\n  create-issue:\n    max: 3");
    let handler = jobs[0]
        .steps
        .iter()
        .find_map(|s| match s {
            Step::Uses { name, env, .. } if name.starts_with("Apply") => Some(env.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(handler.get("AFLOW_MAX").unwrap(), "3");
    assert_eq!(handler.get("AFLOW_KIND").unwrap(), "create-issue");
}

#[test]
fn test_detection_job_gates_every_kind() {
    let jobs = jobs(
        "on: issues\nengine: copilot\nsafe-outputs:\n  threat-detection: true\n  create-issue:\n  add-comment:\n",
    );
    assert_eq!(jobs.len(), 3);
    assert!(matches!(jobs[0].role, JobRole::Detection));
    for job in &jobs[1..] {
        assert!(job.needs.contains(&"detection".to_string()));
        assert!(
            job.cond
                .as_deref()
                .unwrap()
                .contains("needs.detection.outputs.verdict == 'clean'")
        );
    }
}

#[test]
fn test_staged_mode_threaded() {
    let jobs = jobs(
        "on: issues\nengine: copilot\nsafe-outputs:\n  staged: true\n  create-issue:\n",
    );
    let handler = jobs[0]
        .steps
        .iter()
        .find_map(|s| match s {
            Step::Uses { name, env, .. } if name.starts_with("Apply") => Some(env.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(handler.get("AFLOW_STAGED").unwrap(), "true");
}

#[test]
fn test_project_kind_binds_url_and_token() {
    let jobs = jobs(
        "on: issues\nengine: copilot\nproject: https://github.com/orgs/acme/projects/7\nsafe-outputs:\n  update-project:\n",
    );
    let handler = jobs[0]
        .steps
        .iter()
        .find_map(|s| match s {
            Step::Uses { name, env, .. } if name.starts_with("Apply") => Some(env.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        handler.get("AFLOW_PROJECT_URL").unwrap(),
        "https://github.com/orgs/acme/projects/7"
    );
    assert!(handler.contains_key("AFLOW_PROJECT_TOKEN"));
}

#[test]
fn test_safe_output_jobs_do_not_need_each_other() {
    let jobs = jobs(
        "on: issues\nengine: copilot\nsafe-outputs:\n  create-issue:\n  add-comment:\n  add-labels:\n",
    );
    for job in &jobs {
        for need in &job.needs {
            assert!(!need.starts_with("safe_output_"), "{} needs {need}", job.id);
        }
    }
}

#[test]
fn test_post_job_fans_in_and_always_runs() {
    let wf = workflow("on: issues\nengine: copilot");
    let job = post_job(
        &wf,
        &["activation".to_string(), "agent".to_string()],
    );
    assert_eq!(job.needs, ["activation", "agent"]);
    assert_eq!(job.cond.as_deref(), Some("always()"));
    match &job.steps[0] {
        Step::Run { run, .. } => {
            assert!(run.contains("GITHUB_STEP_SUMMARY"));
            assert!(run.contains("needs.agent.result"));
        }
        other => panic!("expected Run, got {other:?}"),
    }
}
