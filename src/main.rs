//! wsgipack CLI - deploy tooling for serverless Python WSGI applications
//!
//! Usage: wsgipack <COMMAND>
//!
//! Commands:
//!   serve    Serve the WSGI application locally
//!   install  Install WSGI handler and requirements for local use
//!   clean    Remove cached requirements and staged handler files
//!   command  Execute shell commands through the deployed function
//!   exec     Evaluate Python code through the deployed function
//!   manage   Run management commands through the deployed function

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use wsgipack::invoke::{self, CommandKind, FrameworkCli, InvokeMode, StdoutSink};
use wsgipack::serve::ServeOptions;
use wsgipack::{hooks, serve, EffectiveConfig, ServiceDescriptor};

/// wsgipack - deploy Python WSGI applications to serverless platforms
#[derive(Parser, Debug)]
#[command(name = "wsgipack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Service root directory (location of serverless.yml)
    #[arg(long, global = true, default_value = ".")]
    service_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the WSGI application locally
    Serve {
        /// Local server port
        #[arg(short, long, default_value_t = 5000)]
        port: u16,

        /// Host/ip to bind the server to
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Disable multi-threaded request handling
        #[arg(long)]
        disable_threading: bool,

        /// Number of worker processes
        #[arg(long)]
        num_processes: Option<u32>,

        /// Serve over HTTPS with an ad-hoc certificate
        #[arg(long)]
        ssl: bool,
    },

    /// Install WSGI handler and requirements for local use
    Install,

    /// Remove cached requirements and staged handler files
    Clean,

    /// Execute shell commands or scripts through the function
    Command {
        /// Command to execute
        #[arg(short, long)]
        command: Option<String>,

        /// Path to a shell script to execute
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Function to invoke instead of the detected WSGI handler
        #[arg(long)]
        function: Option<String>,

        /// Invoke the locally emulated function instead of the deployed one
        #[arg(long)]
        local: bool,
    },

    /// Evaluate Python code through the function
    Exec {
        /// Python code to execute
        #[arg(short, long)]
        command: Option<String>,

        /// Path to a Python script to execute
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Function to invoke instead of the detected WSGI handler
        #[arg(long)]
        function: Option<String>,

        /// Invoke the locally emulated function instead of the deployed one
        #[arg(long)]
        local: bool,
    },

    /// Run management commands (e.g. Django) through the function
    Manage {
        /// Management command
        #[arg(short, long)]
        command: String,

        /// Function to invoke instead of the detected WSGI handler
        #[arg(long)]
        function: Option<String>,

        /// Invoke the locally emulated function instead of the deployed one
        #[arg(long)]
        local: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (service, config) = load_service(&cli.service_root)?;

    match cli.command {
        Commands::Serve {
            port,
            host,
            disable_threading,
            num_processes,
            ssl,
        } => {
            let options = ServeOptions {
                port,
                host,
                disable_threading,
                num_processes,
                ssl,
            };
            serve::serve(&config, &service, &options)?;
        }

        Commands::Install => {
            let mut service = service;
            let target_dir = config.service_root.clone();
            hooks::deploy_before(&config, &mut service.package, &target_dir, true)?;
        }

        Commands::Clean => {
            hooks::clean(&config, &config.service_root)?;
        }

        Commands::Command {
            command,
            file,
            function,
            local,
        } => {
            cmd_invoke(&service, CommandKind::Command, command, file, function, local)?;
        }

        Commands::Exec {
            command,
            file,
            function,
            local,
        } => {
            cmd_invoke(&service, CommandKind::Exec, command, file, function, local)?;
        }

        Commands::Manage {
            command,
            function,
            local,
        } => {
            cmd_invoke(&service, CommandKind::Manage, Some(command), None, function, local)?;
        }
    }

    Ok(())
}

/// Load the descriptor, warn about deprecated handler identifiers and
/// resolve the effective configuration.
fn load_service(service_root: &PathBuf) -> Result<(ServiceDescriptor, EffectiveConfig)> {
    let mut service = ServiceDescriptor::load(service_root)?;

    if service.fix_legacy_handlers() {
        eprintln!(
            "Warning: Please change \"wsgi.handler\" to \"wsgi_handler.handler\" in serverless.yml"
        );
        eprintln!(
            "Warning: Using \"wsgi.handler\" still works but has been deprecated and will be removed"
        );
    }

    let config = EffectiveConfig::resolve(&service, service_root);
    Ok((service, config))
}

fn cmd_invoke(
    service: &ServiceDescriptor,
    kind: CommandKind,
    command: Option<String>,
    file: Option<PathBuf>,
    function: Option<String>,
    local: bool,
) -> Result<()> {
    let data = invoke::resolve_data(command.as_deref(), file.as_deref())?;
    let mode = if local {
        InvokeMode::Local
    } else {
        InvokeMode::Remote
    };

    let mut pipeline = FrameworkCli::default();
    let mut logger = StdoutSink;
    invoke::invoke_handler(
        service,
        &mut pipeline,
        kind,
        data,
        mode,
        function.as_deref(),
        &mut logger,
    )?;
    Ok(())
}
