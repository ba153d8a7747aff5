use std::path::PathBuf;

use crate::diagnostics::Category;

/// Hard failures raised outside the accumulating validator passes.
///
/// Each variant maps to one of the four display categories; the CLI uses
/// [`CompilerError::category`] to pick message framing and exit code.
#[derive(thiserror::Error, Debug)]
pub enum CompilerError {
    #[error("'{path}' has no front-matter: the file must begin with a line containing only `---`")]
    MissingFrontmatter { path: PathBuf },

    #[error("'{path}' has unclosed front-matter: missing the closing `---` line")]
    UnclosedFrontmatter { path: PathBuf },

    #[error("'{path}': front-matter must be a YAML mapping at the top level")]
    FrontmatterNotMapping { path: PathBuf },

    #[error("'{path}': duplicate top-level front-matter key '{key}'")]
    DuplicateKey { path: PathBuf, key: String },

    #[error("'{path}': invalid front-matter YAML: {detail}")]
    Yaml { path: PathBuf, detail: String },

    #[error("import '{import}' (from '{importer}') not found")]
    ImportNotFound { importer: PathBuf, import: String },

    #[error("import cycle: '{from}' imports '{to}', which transitively imports '{from}' again")]
    ImportCycle { from: PathBuf, to: PathBuf },

    #[error("cannot read '{path}': {detail}")]
    Unreadable { path: PathBuf, detail: String },

    #[error(
        "expression in job '{job}' exceeds the runner's {limit} byte limit ({size} bytes)"
    )]
    ExpressionTooLarge {
        job: String,
        size: usize,
        limit: usize,
    },

    #[error(
        "action pin registry is inconsistent: {detail}. \
         This is a compiler bug; please report it at https://github.com/aflow/aflow/issues"
    )]
    PinRegistry { detail: String },

    #[error(
        "internal invariant violated: {detail}. \
         This is a compiler bug; please report it at https://github.com/aflow/aflow/issues"
    )]
    Invariant { detail: String },
}

impl CompilerError {
    /// Display/exit category for this failure.
    pub fn category(&self) -> Category {
        match self {
            Self::MissingFrontmatter { .. }
            | Self::UnclosedFrontmatter { .. }
            | Self::FrontmatterNotMapping { .. }
            | Self::DuplicateKey { .. }
            | Self::Yaml { .. } => Category::User,
            Self::ImportNotFound { .. } | Self::Unreadable { .. } => Category::System,
            Self::ImportCycle { .. } | Self::ExpressionTooLarge { .. } => Category::Config,
            Self::PinRegistry { .. } | Self::Invariant { .. } => Category::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_missing_frontmatter() {
        let err = CompilerError::MissingFrontmatter {
            path: PathBuf::from("wf.md"),
        };
        assert_eq!(
            err.to_string(),
            "'wf.md' has no front-matter: the file must begin with a line containing only `---`"
        );
    }

    #[test]
    fn test_display_import_cycle_names_both_ends() {
        let err = CompilerError::ImportCycle {
            from: PathBuf::from("a.md"),
            to: PathBuf::from("shared/b.md"),
        };
        let msg = err.to_string();
        assert!(msg.contains("a.md"), "got: {msg}");
        assert!(msg.contains("shared/b.md"), "got: {msg}");
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            CompilerError::DuplicateKey {
                path: PathBuf::from("x.md"),
                key: "on".into()
            }
            .category(),
            Category::User
        );
        assert_eq!(
            CompilerError::ImportNotFound {
                importer: PathBuf::from("x.md"),
                import: "y.md".into()
            }
            .category(),
            Category::System
        );
        assert_eq!(
            CompilerError::PinRegistry {
                detail: "missing sha".into()
            }
            .category(),
            Category::Internal
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompilerError>();
    }
}
