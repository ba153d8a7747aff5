//! The compile pipeline driven by the CLI: parse → model → validate →
//! compile → emit. Data flows strictly forward; errors surface at the
//! earliest phase that can detect them.

use std::path::{Path, PathBuf};

use aflow_core::{CompilerError, Diagnostics};
use aflow_model::Workflow;

/// How a CLI operation failed.
#[derive(Debug)]
pub enum Failure {
    /// Accumulated validator findings (exit code 2).
    Validation(Diagnostics),
    /// A hard error from parsing, I/O, or the compiler itself (exit 1).
    Hard(CompilerError),
}

impl From<CompilerError> for Failure {
    fn from(err: CompilerError) -> Self {
        Failure::Hard(err)
    }
}

#[derive(Debug)]
pub struct CompileOutcome {
    /// Where the lock file landed; `None` under `--no-emit`.
    pub lock_path: Option<PathBuf>,
    pub warnings: Diagnostics,
}

/// Parse, validate, compile, and (unless suppressed) atomically write the
/// lock file next to the source.
pub fn compile_file(
    input: &Path,
    output: Option<&Path>,
    force_strict: bool,
    no_emit: bool,
) -> Result<CompileOutcome, Failure> {
    let (workflow, warnings) = load_and_validate(input, force_strict)?;

    let graph = aflow_compiler::compile(&workflow)?;

    if no_emit {
        // Still render so the expression budget is enforced.
        aflow_emitter::emit(&graph)?;
        return Ok(CompileOutcome {
            lock_path: None,
            warnings,
        });
    }

    let lock_path = match output {
        Some(path) => path.to_path_buf(),
        None => input.with_file_name(aflow_emitter::lockfile_name(&workflow.id)),
    };
    aflow_emitter::emit_to_file(&graph, &lock_path)?;

    Ok(CompileOutcome {
        lock_path: Some(lock_path),
        warnings,
    })
}

/// Run the full validation stack and return the accumulated warnings.
pub fn validate_file(input: &Path, force_strict: bool) -> Result<Diagnostics, Failure> {
    let (_, warnings) = load_and_validate(input, force_strict)?;
    Ok(warnings)
}

/// Resolve imports and render the merged front-matter plus prompt body.
pub fn resolve_imports_file(input: &Path) -> Result<String, Failure> {
    let resolved = aflow_parser::resolve_source(input)?;
    let frontmatter = serde_yaml::to_string(&serde_yaml::Value::Mapping(resolved.frontmatter))
        .map_err(|e| {
            Failure::Hard(CompilerError::Yaml {
                path: input.to_path_buf(),
                detail: e.to_string(),
            })
        })?;
    Ok(format!("---\n{frontmatter}---\n\n{}", resolved.body))
}

fn load_and_validate(
    input: &Path,
    force_strict: bool,
) -> Result<(Workflow, Diagnostics), Failure> {
    let resolved = aflow_parser::resolve_source(input)?;

    let id = Workflow::id_from_path(input);
    let (workflow, mut diags) = Workflow::from_merged(&id, &resolved.frontmatter, &resolved.body);
    let mut warnings = resolved.warnings;

    let Some(mut workflow) = workflow else {
        return Err(Failure::Validation(diags));
    };
    if force_strict {
        workflow.strict = true;
    }

    diags.extend(aflow_validate::validate_offline(&workflow));
    if diags.has_errors() {
        return Err(Failure::Validation(diags));
    }

    for diagnostic in diags {
        warnings.push(diagnostic);
    }
    Ok((workflow, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_compile_writes_lock_next_to_source() {
        let dir = tempdir().unwrap();
        let input = write(
            dir.path(),
            "triage.md",
            "---\non: issues\nengine: copilot\nsafe-outputs:\n  add-comment:\n---\nRespond to the issue.\n",
        );
        let outcome = compile_file(&input, None, false, false).unwrap();
        let lock = outcome.lock_path.unwrap();
        assert_eq!(lock.file_name().unwrap(), "triage.lock.yml");
        assert!(lock.exists());
    }

    #[test]
    fn test_validation_failure_produces_no_lock() {
        let dir = tempdir().unwrap();
        let input = write(
            dir.path(),
            "bad.md",
            "---\non: teleport\nengine: copilot\n---\nbody\n",
        );
        let err = compile_file(&input, None, false, false).unwrap_err();
        assert!(matches!(err, Failure::Validation(_)));
        assert!(!dir.path().join("bad.lock.yml").exists());
    }

    #[test]
    fn test_force_strict_flag_applies_policy() {
        let dir = tempdir().unwrap();
        let input = write(
            dir.path(),
            "wf.md",
            "---\non: issues\nengine: copilot\npermissions:\n  contents: write\n---\nbody\n",
        );
        // Without strict: compiles (with a warning).
        assert!(compile_file(&input, None, false, true).is_ok());
        // With strict: refused.
        let err = compile_file(&input, None, true, true).unwrap_err();
        let Failure::Validation(diags) = err else {
            panic!("expected validation failure");
        };
        assert!(diags.to_string().contains("strict mode"));
    }

    #[test]
    fn test_no_emit_skips_writing() {
        let dir = tempdir().unwrap();
        let input = write(
            dir.path(),
            "wf.md",
            "---\non: issues\nengine: copilot\n---\nbody\n",
        );
        let outcome = compile_file(&input, None, false, true).unwrap();
        assert!(outcome.lock_path.is_none());
        assert!(!dir.path().join("wf.lock.yml").exists());
    }

    #[test]
    fn test_resolve_imports_renders_merged_document() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "shared.md",
            "---\ntools:\n  github:\n    allowed: [issue_read]\n---\nShared guidance.\n",
        );
        let input = write(
            dir.path(),
            "wf.md",
            "---\nimports: [shared.md]\non: issues\nengine: copilot\n---\nMain prompt.\n",
        );
        let rendered = resolve_imports_file(&input).unwrap();
        assert!(rendered.contains("issue_read"));
        assert!(rendered.contains("Shared guidance."));
        assert!(rendered.contains("Main prompt."));
        let shared = rendered.find("Shared guidance.").unwrap();
        let main = rendered.find("Main prompt.").unwrap();
        assert!(shared < main);
    }

    #[test]
    fn test_missing_file_is_hard_error() {
        let err = compile_file(Path::new("/nope/missing.md"), None, false, false).unwrap_err();
        assert!(matches!(err, Failure::Hard(CompilerError::Unreadable { .. })));
    }
}
