//! Source-document parsing for agentic workflow files.
//!
//! A workflow source is a Markdown document with YAML front-matter fenced
//! by `---` lines. This crate splits the document, parses the front-matter
//! into a dynamically-typed mapping with YAML 1.1 key semantics (`on` stays
//! the string `"on"`), resolves `imports:` transitively, and merges the
//! fragments into a single mapping plus a concatenated prompt body.

pub mod frontmatter;
pub mod imports;
pub mod merge;

pub use frontmatter::{RawDocument, parse_document, split_document};
pub use imports::{ResolvedSource, resolve_source};
pub use merge::merge_values;
