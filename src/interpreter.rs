//! Child-process helpers for the external Python interpreter
//!
//! All invocations are blocking: packaging steps have strict ordering
//! dependencies, so the calling command waits for full completion. A
//! missing executable is a configuration error pointing at the
//! `pythonBin` override; anything else propagates as-is.

use std::ffi::OsStr;
use std::io;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{WsgiError, WsgiResult};

fn map_spawn_error(binary: &str, err: io::Error) -> WsgiError {
    if err.kind() == io::ErrorKind::NotFound {
        WsgiError::InterpreterNotFound {
            binary: binary.to_string(),
        }
    } else {
        WsgiError::Io(err)
    }
}

/// Run the interpreter to completion with captured output.
///
/// A non-zero exit status becomes an error carrying the child's stderr,
/// mirroring what the installer script prints on failure.
pub fn run_captured<I, S>(binary: &str, args: I) -> WsgiResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| map_spawn_error(binary, e))?;

    if !output.status.success() {
        return Err(WsgiError::InstallerFailed {
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }

    Ok(())
}

/// Run the interpreter attached to the parent's stdio.
///
/// Used for the local development server: the child owns the terminal
/// (interactive passthrough) and interrupt signals reach it directly. The
/// exit status is returned rather than judged; stopping a dev server with
/// Ctrl+C is not a failure.
pub fn run_interactive<I, S>(
    binary: &str,
    args: I,
    env_overlay: &[(String, String)],
) -> WsgiResult<ExitStatus>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(binary)
        .args(args)
        .envs(env_overlay.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| map_spawn_error(binary, e))
}
