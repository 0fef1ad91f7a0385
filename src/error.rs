//! Error types for wsgipack
//!
//! Library errors use `thiserror`; the binary wraps them in `anyhow` at the
//! CLI boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for wsgipack operations
pub type WsgiResult<T> = Result<T, WsgiError>;

/// Main error type for wsgipack operations
#[derive(Error, Debug)]
pub enum WsgiError {
    /// No WSGI application configured where one is required (serve)
    #[error(
        "Missing WSGI app, please specify custom.wsgi.app. For instance, if you have \
         a Flask application \"app\" in \"api.py\", set custom.wsgi.app to: api.app"
    )]
    MissingApp,

    /// No function in the service declares the WSGI handler entry point
    #[error("No functions were found with handler: {handler}")]
    NoHandlerFunction { handler: String },

    /// An explicitly named function does not exist in the service
    #[error("Function not found: {name}")]
    FunctionNotFound { name: String },

    /// command/exec called without an input source
    #[error("Please provide either a command (-c) or a file (-f)")]
    MissingInvokeInput,

    /// The configured Python executable could not be spawned
    #[error(
        "Unable to run Python executable: {binary}. Use the \"pythonBin\" option to \
         set your Python executable explicitly."
    )]
    InterpreterNotFound { binary: String },

    /// The requirements installer exited with a non-zero status
    #[error("{stderr}")]
    InstallerFailed { stderr: String },

    /// The invoked function reported a non-zero exit code
    #[error("{message}")]
    InvokeFailed { message: String },

    /// A service-root entry collides with a staged package name
    #[error(
        "Unable to link dependency '{name}' because a file by the same name exists \
         in this service"
    )]
    LinkConflict { name: String },

    /// Service descriptor missing from the service root
    #[error("No serverless.yml found in {path}")]
    ServiceNotFound { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error (service descriptor)
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error (metadata file, invocation payload)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
