//! Packaging Coordinator
//!
//! Stages the handler shim and metadata file, invokes the external
//! requirements installer, reconciles the staging tree into the deployment
//! package as symlinks and reverses all of it after packaging.
//!
//! The staging tree is never cached: every operation re-reads directory
//! state fresh, because external processes mutate it between plugin
//! invocations. Per packaging cycle the steps run as
//! `stage -> install -> link -> [deploy] -> unlink -> clean`; every step
//! downstream of staging silently no-ops when requirements are disabled,
//! and artifact cleanup always runs.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::assets;
use crate::config::{EffectiveConfig, STAGING_DIR};
use crate::error::{WsgiError, WsgiResult};
use crate::interpreter;
use crate::service::PackageManifest;

/// Contents of the `.wsgipack` metadata file
#[derive(Debug, Serialize)]
struct HandlerMetadata<'a> {
    app: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_mime_types: Option<&'a [String]>,
}

/// Register the helper files and staging exclude with the package manifest.
///
/// Runs for every packaging cycle, including cycles that skip handler
/// staging, so requirements-only deployments still exclude the staging
/// tree from the package.
pub fn configure_packaging(config: &EffectiveConfig, manifest: &mut PackageManifest) {
    manifest.add_include(assets::HANDLER_FILE);
    manifest.add_include(assets::ADAPTER_FILE);
    manifest.add_include(assets::METADATA_FILE);

    if config.requirements_enabled {
        manifest.add_exclude(&format!("{STAGING_DIR}/**"));
    }
}

/// Write the handler shim, WSGI adapter and metadata file into `target_dir`
/// (the service root, or a module directory when packaging individually).
///
/// Without a configured app this warns and does nothing.
pub fn stage_handler(
    config: &EffectiveConfig,
    target_dir: &Path,
    verbose: bool,
) -> WsgiResult<()> {
    let Some(app) = config.app.as_deref() else {
        eprintln!("Warning: No WSGI app specified, omitting WSGI handler from package");
        return Ok(());
    };

    if verbose {
        println!("Packaging Python WSGI handler...");
    }

    assets::write_asset(target_dir, assets::HANDLER_FILE, assets::HANDLER_SOURCE)?;
    assets::write_asset(target_dir, assets::ADAPTER_FILE, assets::ADAPTER_SOURCE)?;

    let metadata = HandlerMetadata {
        app,
        text_mime_types: config.text_mime_types.as_deref(),
    };
    let path = target_dir.join(assets::METADATA_FILE);
    fs::write(&path, serde_json::to_string(&metadata)?)?;

    Ok(())
}

/// Install requirements into the staging directory via the bundled
/// installer script.
///
/// No-op when requirements are disabled, and when neither a user
/// requirements file exists nor an app is configured (nothing to install).
pub fn install_requirements(config: &EffectiveConfig) -> WsgiResult<()> {
    let Some(staging_path) = config.staging_path.as_deref() else {
        return Ok(());
    };

    let user_requirements = config.requirements_dir().join("requirements.txt");
    if !user_requirements.exists() && config.app.is_none() {
        return Ok(());
    }

    // The installer and the shim's own requirements ship inside the binary;
    // the interpreter needs them on disk for the duration of the run.
    let scratch = tempfile::tempdir()?;
    let installer = assets::write_asset(scratch.path(), "requirements.py", assets::INSTALLER_SOURCE)?;

    let mut args = vec![installer.as_os_str().to_os_string()];
    if let Some(pip_args) = config.pip_args.as_deref() {
        args.push("--pip-args".into());
        args.push(pip_args.into());
    }
    if config.app.is_some() {
        // Runtime dependencies of the handler shim itself
        let shim_requirements =
            assets::write_asset(scratch.path(), "requirements.txt", assets::SHIM_REQUIREMENTS)?;
        args.push(shim_requirements.into_os_string());
    }
    if user_requirements.exists() {
        args.push(user_requirements.into_os_string());
    }
    args.push(staging_path.as_os_str().to_os_string());

    println!("Packaging required Python packages...");
    interpreter::run_captured(&config.python_bin, args)
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    if original.is_dir() {
        std::os::windows::fs::symlink_dir(original, link)
    } else {
        std::os::windows::fs::symlink_file(original, link)
    }
}

/// Immediate children of the staging tree, sorted for reproducible
/// manifest order.
fn staged_entries(staging_path: &Path) -> WsgiResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(staging_path)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Symlink every top-level staged package into the service root and record
/// it in the include patterns.
///
/// Linking is idempotent: an existing symlink that already points at the
/// staged entry is success. Any other pre-existing entry of the same name
/// is a conflict error naming the entry.
pub fn link_requirements(
    config: &EffectiveConfig,
    manifest: &mut PackageManifest,
) -> WsgiResult<()> {
    let Some(staging_path) = config.staging_path.as_deref() else {
        return Ok(());
    };
    if !staging_path.exists() {
        return Ok(());
    }

    println!("Linking required Python packages...");

    for name in staged_entries(staging_path)? {
        manifest.add_include(&name);
        manifest.add_include(&format!("{name}/**"));

        let target = staging_path.join(&name);
        let link = config.service_root.join(&name);

        if let Err(err) = symlink(&target, &link) {
            if err.kind() != std::io::ErrorKind::AlreadyExists {
                return Err(WsgiError::Io(err));
            }
            match fs::read_link(&link) {
                Ok(existing) if existing == target => {}
                _ => return Err(WsgiError::LinkConflict { name }),
            }
        }
    }

    Ok(())
}

/// Remove the service-root entry for every staged package name.
///
/// Must run before the staging tree itself is deleted so dangling links
/// are never left behind.
pub fn unlink_requirements(config: &EffectiveConfig) -> WsgiResult<()> {
    let Some(staging_path) = config.staging_path.as_deref() else {
        return Ok(());
    };
    if !staging_path.exists() {
        return Ok(());
    }

    println!("Unlinking required Python packages...");

    for name in staged_entries(staging_path)? {
        let link = config.service_root.join(&name);
        if link.symlink_metadata().is_ok() {
            fs::remove_file(&link)?;
        }
    }

    Ok(())
}

/// Recursively delete the staging tree
pub fn clean_staging(config: &EffectiveConfig) -> WsgiResult<()> {
    if let Some(staging_path) = config.staging_path.as_deref() {
        if staging_path.exists() {
            fs::remove_dir_all(staging_path)?;
        }
    }
    Ok(())
}

/// Remove the staged handler shim, adapter and metadata file from
/// `target_dir`. Runs regardless of the requirements toggle.
pub fn cleanup_artifacts(target_dir: &Path) -> WsgiResult<()> {
    for name in [assets::HANDLER_FILE, assets::ADAPTER_FILE, assets::METADATA_FILE] {
        let path = target_dir.join(name);
        if path.exists() {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Warn when the linked service root has no werkzeug entry; the handler
/// shim depends on it at runtime.
pub fn check_werkzeug(config: &EffectiveConfig) -> WsgiResult<()> {
    if config.app.is_none() {
        return Ok(());
    }

    let present = fs::read_dir(&config.service_root)?
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_name() == "werkzeug");

    if !present {
        eprintln!("WARNING: Could not find werkzeug, please add it to your requirements.txt");
    }

    Ok(())
}
