//! wsgipack - packaging and local development for serverless Python WSGI apps
//!
//! wsgipack copies a handler shim next to a WSGI application, installs its
//! requirements into a staging tree through an external Python interpreter,
//! links the staged packages into the deployment package, and proxies
//! shell/exec/manage invocations to the deployed or locally emulated
//! function.

pub mod assets;
pub mod config;
pub mod error;
pub mod hooks;
pub mod interpreter;
pub mod invoke;
pub mod packaging;
pub mod serve;
pub mod service;

// Re-exports for convenience
pub use config::EffectiveConfig;
pub use error::{WsgiError, WsgiResult};
pub use invoke::{CommandKind, InvokeMode, InvokePipeline, LogSink};
pub use serve::ServeOptions;
pub use service::{PackageManifest, ServiceDescriptor, WSGI_HANDLER};
