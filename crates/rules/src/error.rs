use std::path::PathBuf;

/// Failures loading rule documents. These are the only run-fatal errors of
/// a migration.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not have the rule set shape.
    #[error("{}:{line}:{column}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("rule set '{id}': {message}")]
    Invalid { id: String, message: String },

    #[error("rule sets '{first}' and '{second}' both target package '{package}'")]
    DuplicatePackage {
        package: String,
        first: String,
        second: String,
    },

    #[error("no rule set named '{0}'")]
    UnknownRuleSet(String),

    #[error("no rule documents found in {}", .0.display())]
    NoRuleSets(PathBuf),
}

impl RuleError {
    pub(crate) fn parse(path: PathBuf, e: serde_json::Error) -> Self {
        RuleError::Parse {
            path,
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }
    }
}
