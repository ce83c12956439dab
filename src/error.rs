use thiserror::Error;

/// Problems found while reading a pipeline mapping file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid pipeline mapping at line {line}: {reason}")]
    InvalidMapping { line: usize, reason: String },

    #[error("duplicate pipeline label '{label}' at line {line}")]
    DuplicateLabel { label: String, line: usize },

    #[error("pipeline label '{label}' is reserved (line {line})")]
    ReservedLabel { label: String, line: usize },
}
