//! Local Server Launcher
//!
//! Spawns the external interpreter running the bundled development server
//! with the parent's stdio attached. Environment variables travel as an
//! explicit overlay map handed to the spawn call; the parent process
//! environment is never mutated.

use crate::assets;
use crate::config::EffectiveConfig;
use crate::error::{WsgiError, WsgiResult};
use crate::interpreter;
use crate::service::{scalar_env, ServiceDescriptor, WSGI_HANDLER};

/// CLI options for the `serve` sub-command
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub port: u16,
    pub host: String,
    pub disable_threading: bool,
    pub num_processes: Option<u32>,
    pub ssl: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "localhost".to_string(),
            disable_threading: false,
            num_processes: None,
            ssl: false,
        }
    }
}

/// Environment overlay for the server process: provider-level variables
/// first, then variables of every function running the WSGI handler.
/// Scalars only; intrinsic-reference objects never propagate.
pub fn build_env_overlay(service: &ServiceDescriptor) -> Vec<(String, String)> {
    let mut overlay = scalar_env(&service.provider.environment);

    for func in service.functions.values() {
        if func.handler == WSGI_HANDLER {
            overlay.extend(scalar_env(&func.environment));
        }
    }

    overlay
}

/// Build the server argv (everything after the interpreter binary)
fn server_args(
    serve_script: &std::path::Path,
    config: &EffectiveConfig,
    app: &str,
    options: &ServeOptions,
) -> Vec<std::ffi::OsString> {
    let mut args: Vec<std::ffi::OsString> = vec![
        serve_script.as_os_str().to_os_string(),
        config.service_root.as_os_str().to_os_string(),
        app.into(),
        options.port.to_string().into(),
        options.host.clone().into(),
    ];

    if options.disable_threading {
        args.push("--disable-threading".into());
    }
    if let Some(processes) = options.num_processes {
        args.push("--num-processes".into());
        args.push(processes.to_string().into());
    }
    if options.ssl {
        args.push("--ssl".into());
    }

    args
}

/// Run the local development server until it exits.
///
/// Fails fast when no app is configured; the error names the expected
/// configuration key with a usage example.
pub fn serve(
    config: &EffectiveConfig,
    service: &ServiceDescriptor,
    options: &ServeOptions,
) -> WsgiResult<()> {
    let Some(app) = config.app.as_deref() else {
        return Err(WsgiError::MissingApp);
    };

    let scratch = tempfile::tempdir()?;
    let serve_script = assets::write_asset(scratch.path(), "serve.py", assets::SERVER_SOURCE)?;

    let overlay = build_env_overlay(service);
    let args = server_args(&serve_script, config, app, options);

    interpreter::run_interactive(&config.python_bin, args, &overlay)?;
    Ok(())
}
