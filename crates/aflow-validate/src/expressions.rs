//! Expression-size validation.
//!
//! The hosted runner rejects any single `${{ ... }}` expression over
//! 20 KB at run time; catching the overflow here turns a runtime failure
//! into a compile error. The emitter re-checks the final serialized form.

use aflow_core::{Category, Diagnostic, Diagnostics};
use aflow_model::{EngineSpec, Workflow};

/// Runner hard cap on a single expression, in bytes.
pub const EXPRESSION_LIMIT: usize = 20 * 1024;

pub fn validate_expression_budget(workflow: &Workflow, diags: &mut Diagnostics) {
    check_text(&workflow.prompt, "prompt body", diags);
    for (key, value) in &workflow.env {
        check_text(value, &format!("env.{key}"), diags);
    }
    if let EngineSpec::Custom { steps } = &workflow.engine {
        for (i, step) in steps.iter().enumerate() {
            for value in step.raw.values() {
                if let Some(s) = value.as_str() {
                    check_text(s, &format!("engine.steps[{i}]"), diags);
                }
            }
        }
    }
}

fn check_text(text: &str, where_: &str, diags: &mut Diagnostics) {
    for span in expression_spans(text) {
        if span.len() > EXPRESSION_LIMIT {
            diags.push(
                Diagnostic::error(
                    Category::Config,
                    format!(
                        "expression in {where_} is {} bytes; the runner's limit is {EXPRESSION_LIMIT}",
                        span.len()
                    ),
                )
                .at(where_.to_string())
                .with_hint("move large content into a file or an artifact"),
            );
        }
    }
}

/// `${{ ... }}` spans, inclusive of delimiters. Unterminated expressions
/// run to end of text and are measured as-is.
pub fn expression_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut rest = text;
    let mut base = 0usize;
    while let Some(start) = rest.find("${{") {
        let abs_start = base + start;
        let after = &text[abs_start..];
        let end = after.find("}}").map(|i| i + 2).unwrap_or(after.len());
        spans.push(&after[..end]);
        base = abs_start + end;
        if base >= text.len() {
            break;
        }
        rest = &text[base..];
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow_from_yaml;

    #[test]
    fn test_spans_extracted() {
        let spans = expression_spans("a ${{ github.actor }} b ${{ env.X }}");
        assert_eq!(spans, ["${{ github.actor }}", "${{ env.X }}"]);
    }

    #[test]
    fn test_unterminated_span_runs_to_end() {
        let spans = expression_spans("x ${{ broken");
        assert_eq!(spans, ["${{ broken"]);
    }

    #[test]
    fn test_small_expressions_pass() {
        let wf = workflow_from_yaml("on: issues\nengine: copilot", "use ${{ github.run_id }}");
        let mut diags = Diagnostics::new();
        validate_expression_budget(&wf, &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_oversized_expression_rejected() {
        let big = format!("${{{{ {} }}}}", "x".repeat(EXPRESSION_LIMIT + 1));
        let wf = workflow_from_yaml("on: issues\nengine: copilot", &big);
        let mut diags = Diagnostics::new();
        validate_expression_budget(&wf, &mut diags);
        assert!(diags.has_errors());
        assert!(diags.to_string().contains("20480"));
    }
}
