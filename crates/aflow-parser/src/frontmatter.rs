//! Front-matter splitting and YAML parsing.
//!
//! The front-matter fence is a line consisting solely of `---`. Everything
//! between the opening and closing fence is YAML; everything after the
//! closing fence is the prompt body, carried through verbatim (including
//! `${{ ... }}` expressions, which the compiler never interprets).

use std::path::{Path, PathBuf};

use aflow_core::CompilerError;
use serde_yaml::{Mapping, Value};

/// A single parsed source file, before import resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub path: PathBuf,
    /// Top-level front-matter mapping, insertion order preserved.
    pub frontmatter: Mapping,
    /// Raw Markdown prompt body.
    pub body: String,
}

/// Split a source document into front-matter text and body.
///
/// The opening fence must be the first non-empty line.
pub fn split_document(path: &Path, content: &str) -> Result<(String, String), CompilerError> {
    let mut lines = content.lines();

    // Skip leading blank lines, then require the opening fence.
    let mut consumed = 0usize;
    let opening = loop {
        match lines.next() {
            Some(line) => {
                consumed += line.len() + 1;
                if line.trim().is_empty() {
                    continue;
                }
                break line;
            }
            None => {
                return Err(CompilerError::MissingFrontmatter {
                    path: path.to_path_buf(),
                });
            }
        }
    };
    if opening.trim_end() != "---" {
        return Err(CompilerError::MissingFrontmatter {
            path: path.to_path_buf(),
        });
    }

    let mut fm_lines: Vec<&str> = Vec::new();
    for line in lines {
        consumed += line.len() + 1;
        if line.trim_end() == "---" {
            let body_start = consumed.min(content.len());
            let body = content[body_start..].trim_start_matches('\n').to_string();
            return Ok((fm_lines.join("\n"), body));
        }
        fm_lines.push(line);
    }

    Err(CompilerError::UnclosedFrontmatter {
        path: path.to_path_buf(),
    })
}

/// Parse a complete source document into a [`RawDocument`].
pub fn parse_document(path: &Path, content: &str) -> Result<RawDocument, CompilerError> {
    let (fm_text, body) = split_document(path, content)?;

    check_duplicate_top_level_keys(path, &fm_text)?;

    let value: Value =
        serde_yaml::from_str(&fm_text).map_err(|e| CompilerError::Yaml {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let frontmatter = match value {
        Value::Mapping(m) => m,
        Value::Null => Mapping::new(),
        _ => {
            return Err(CompilerError::FrontmatterNotMapping {
                path: path.to_path_buf(),
            });
        }
    };

    Ok(RawDocument {
        path: path.to_path_buf(),
        frontmatter,
        body,
    })
}

/// Reject duplicate top-level keys before handing the text to the YAML
/// library, which silently keeps the last duplicate.
///
/// In a top-level block mapping, only keys and comments may start at
/// column 0 (block-scalar content is always indented), so a column-0 scan
/// is sufficient.
fn check_duplicate_top_level_keys(path: &Path, fm_text: &str) -> Result<(), CompilerError> {
    let mut seen: Vec<String> = Vec::new();
    for line in fm_text.lines() {
        let Some(first) = line.chars().next() else {
            continue;
        };
        if first.is_whitespace() || first == '#' || first == '-' {
            continue;
        }
        let Some(colon) = line.find(':') else {
            continue;
        };
        let key = line[..colon].trim();
        if key.is_empty() || key.contains(' ') {
            continue;
        }
        let key = key.trim_matches('"').trim_matches('\'').to_string();
        if seen.contains(&key) {
            return Err(CompilerError::DuplicateKey {
                path: path.to_path_buf(),
                key,
            });
        }
        seen.push(key);
    }
    Ok(())
}
