/// Top-level calldiff error type.
///
/// All fallible operations in `calldiff-core` return [`Result<T, CalldiffError>`](Result).
/// Each variant wraps a domain-specific error enum so callers can match on
/// the error source.
#[derive(thiserror::Error, Debug)]
pub enum CalldiffError {
    /// Error from the syntax tree engine (tree-sitter parsing, lowering).
    #[error("Parse error: {0}")]
    Ast(#[from] calldiff_ast::AstError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A report sink could not be written.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Error loading a batch dataset.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Errors in calldiff configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Cannot parse config: {0}")]
    Parse(String),
}

/// Failures of a single report sink.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// The sink could not be opened (log file creation, permissions).
    #[error("Cannot open log sink {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A write or flush on an open sink failed.
    #[error("Write to {sink} sink failed: {source}")]
    Write {
        sink: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while loading a batch dataset.
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// The dataset file does not exist.
    #[error("Input not found: {0}")]
    NotFound(String),

    /// The dataset is not a JSON array of diff records.
    #[error("Malformed dataset {path}: {message}")]
    Malformed { path: String, message: String },

    /// Filesystem I/O error reading the dataset.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for `Result<T, CalldiffError>`.
pub type Result<T> = std::result::Result<T, CalldiffError>;
