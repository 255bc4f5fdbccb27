//! # Error Handling
//!
//! This module defines the centralized error type for the `ansible-universe`
//! library. It uses `thiserror` to describe every failure mode the lifecycle
//! can hit, from a manifest missing a field to an upload rejected by the
//! repository.
//!
//! ## Key Components
//!
//! - **`Error`**: one variant per failure class. Configuration problems
//!   (missing manifest attributes, unknown phases, no repository URL) carry
//!   enough context to be reported to the user as-is.
//! - **`Result<T>`**: alias for `std::result::Result<T, Error>`.
//!
//! Lint findings are not errors: they are collected as warnings by the
//! linter and only become [`Error::LintFailed`] in strict mode.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for ansible-universe operations
#[derive(Error, Debug)]
pub enum Error {
    /// The role has no manifest yet.
    #[error("Manifest not found: {}\n  hint: run the 'init' phase first", path.display())]
    ManifestNotFound { path: PathBuf },

    /// The manifest could not be parsed into the expected schema.
    #[error("Manifest parsing error in {}: {message}", path.display())]
    ManifestParse { path: PathBuf, message: String },

    /// `init` was requested on a role that already has a manifest.
    #[error("Manifest already exists: {}. Use --force to overwrite", path.display())]
    ManifestExists { path: PathBuf },

    /// A required manifest attribute is absent.
    #[error("missing {attribute} attribute")]
    MissingAttribute { attribute: String },

    /// A variable is declared both in `defaults/` and `vars/`.
    #[error("variable '{name}' set twice (in both defaults and vars)")]
    VariableSetTwice { name: String },

    /// An auxiliary role file (defaults, vars, tasks) is malformed.
    #[error("Invalid role file {}: {message}", path.display())]
    RoleFile { path: PathBuf, message: String },

    /// A phase name given on the command line is not known.
    #[error("{name}: no such target (expected one of: {expected})")]
    UnknownPhase { name: String, expected: String },

    /// `publish` was requested without a repository URL.
    #[error("no repository\n  hint: pass --repository URL or set ANSIBLE_UNIVERSE_REPOSITORY")]
    NoRepository,

    /// A target depends on a source file that does not exist and cannot be built.
    #[error("missing source: {target}")]
    MissingSource { target: String },

    /// The build graph contains a cycle.
    #[error("dependency cycle: {cycle}")]
    CycleDetected { cycle: String },

    /// A target was referenced but never declared in the graph.
    #[error("unknown target: {target}")]
    UnknownTarget { target: String },

    /// Strict mode turned a lint warning into a failure.
    #[error("check failed: {warning}")]
    LintFailed { warning: String },

    /// An external command could not be run or exited unsuccessfully.
    #[error("Command failed: {command} - {message}")]
    ExternalCommand { command: String, message: String },

    /// An error occurred during template rendering.
    #[error("Template rendering error: {message}")]
    Template { message: String },

    /// An error occurred while building the role archive.
    #[error("Packaging error for {}: {message}", path.display())]
    Package { path: PathBuf, message: String },

    /// An error occurred while uploading to the repository.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// An error occurred with a filesystem operation.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML error, wrapped from `serde_yaml::Error`.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl From<minijinja::Error> for Error {
    fn from(err: minijinja::Error) -> Self {
        Error::Template {
            message: err.to_string(),
        }
    }
}
