//! Shared error taxonomy and diagnostics for the agentic workflow compiler.

pub mod diagnostics;
pub mod error;

pub use diagnostics::{Category, Diagnostic, Diagnostics, Severity};
pub use error::CompilerError;
