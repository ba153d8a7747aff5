//! Transitive import resolution.
//!
//! `imports:` lists shared front-matter fragments. Each path resolves
//! relative to the importing file's directory, imports are transitive, and
//! the import graph must be a DAG: a path that reappears in the active
//! resolution stack is a hard error naming both ends of the cycle.
//!
//! Merge order is deepest-first, importer last, so the importer is the
//! final writer for scalar keys. Prompt bodies concatenate in resolution
//! order with the importer's body last; a file imported via two routes
//! contributes its body only once.

use std::path::{Path, PathBuf};

use aflow_core::{Category, CompilerError, Diagnostics};
use serde_yaml::{Mapping, Value};

use crate::frontmatter::{RawDocument, parse_document};
use crate::merge::merge_mappings;

/// Separator inserted between concatenated prompt bodies.
const BODY_SEPARATOR: &str = "\n\n---\n\n";

/// The fully merged result of parsing a source file and its imports.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    /// Path of the root source file.
    pub path: PathBuf,
    /// Merged front-matter mapping (imports first, importer last).
    pub frontmatter: Mapping,
    /// Concatenated prompt body, importer's body last.
    pub body: String,
    /// Every file that contributed, in resolution order.
    pub files: Vec<PathBuf>,
    /// Non-fatal findings (e.g. an import overriding another's engine model).
    pub warnings: Diagnostics,
}

/// Parse `path` and resolve its imports into a single merged source.
pub fn resolve_source(path: &Path) -> Result<ResolvedSource, CompilerError> {
    let mut resolver = Resolver::default();
    let root = resolver.load(path)?;
    let (frontmatter, body) = resolver.resolve(&root)?;
    Ok(ResolvedSource {
        path: path.to_path_buf(),
        frontmatter,
        body,
        files: resolver.order,
        warnings: resolver.warnings,
    })
}

#[derive(Default)]
struct Resolver {
    /// Active DFS stack for cycle detection.
    stack: Vec<PathBuf>,
    /// Files already merged (diamond imports contribute once).
    visited: Vec<PathBuf>,
    /// Body concatenation order.
    order: Vec<PathBuf>,
    warnings: Diagnostics,
}

impl Resolver {
    fn load(&self, path: &Path) -> Result<RawDocument, CompilerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CompilerError::Unreadable {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        parse_document(path, &content)
    }

    /// Resolve one document: recursively merge its imports, then the
    /// document itself. Returns the merged front-matter and body.
    fn resolve(&mut self, doc: &RawDocument) -> Result<(Mapping, String), CompilerError> {
        let key = normalize(&doc.path);
        if self.stack.contains(&key) {
            return Err(CompilerError::ImportCycle {
                from: self.stack.last().cloned().unwrap_or_else(|| key.clone()),
                to: doc.path.clone(),
            });
        }
        self.stack.push(key.clone());

        let mut merged = Mapping::new();
        let mut bodies: Vec<String> = Vec::new();

        for import in import_list(&doc.frontmatter) {
            let import_path = doc
                .path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&import);
            if !import_path.exists() {
                self.stack.pop();
                return Err(CompilerError::ImportNotFound {
                    importer: doc.path.clone(),
                    import,
                });
            }

            let import_key = normalize(&import_path);
            if self.stack.contains(&import_key) {
                self.stack.pop();
                return Err(CompilerError::ImportCycle {
                    from: doc.path.clone(),
                    to: import_path,
                });
            }
            if self.visited.contains(&import_key) {
                continue;
            }

            let imported = self.load(&import_path)?;
            let (imported_fm, imported_body) = self.resolve(&imported)?;
            self.visited.push(import_key);

            self.warn_on_engine_override(&merged, &imported_fm, &import_path);
            merged = merge_mappings(merged, imported_fm);
            if !imported_body.trim().is_empty() {
                bodies.push(imported_body);
            }
        }

        // The importer is the last writer.
        merged = merge_mappings(merged, doc.frontmatter.clone());
        if !doc.body.trim().is_empty() {
            bodies.push(doc.body.clone());
        }

        self.stack.pop();
        self.order.push(doc.path.clone());

        Ok((merged, bodies.join(BODY_SEPARATOR)))
    }

    /// Sibling imports merge in declaration order; a later import silently
    /// replacing an earlier one's engine model is the most surprising
    /// last-writer-wins outcome, so it gets a warning.
    fn warn_on_engine_override(&mut self, merged: &Mapping, incoming: &Mapping, import: &Path) {
        let Some(previous) = engine_model(merged) else {
            return;
        };
        let Some(next) = engine_model(incoming) else {
            return;
        };
        if previous != next {
            self.warnings.push(
                aflow_core::Diagnostic::warning(
                    Category::User,
                    format!(
                        "import '{}' overrides engine model '{previous}' with '{next}'",
                        import.display()
                    ),
                )
                .at("engine.model")
                .with_hint("declare the model in the importing file to make the choice explicit"),
            );
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Extract the `imports:` list, tolerating absence. Non-string entries are
/// ignored here; the model layer reports them with a full key path.
fn import_list(frontmatter: &Mapping) -> Vec<String> {
    match frontmatter.get(Value::String("imports".into())) {
        Some(Value::Sequence(seq)) => seq
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Engine model scalar, whether `engine` is shorthand or a mapping.
fn engine_model(frontmatter: &Mapping) -> Option<String> {
    match frontmatter.get(Value::String("engine".into()))? {
        Value::Mapping(m) => m
            .get(Value::String("model".into()))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
#[path = "imports_tests.rs"]
mod tests;
