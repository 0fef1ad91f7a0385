//! Lifecycle hook chains
//!
//! The host framework fires before/after events around package creation,
//! per-function packaging, the offline emulator and local invocation.
//! Each chain runs its steps in order and the first error aborts the
//! rest. Cleanup is explicit chaining in the "after" hooks, not
//! finally-semantics: a failed "before" chain can leave artifacts behind
//! until the framework fires the matching "after" event.

use std::path::{Path, PathBuf};

use crate::config::EffectiveConfig;
use crate::error::WsgiResult;
use crate::packaging;
use crate::service::{FunctionConfig, PackageManifest, WSGI_HANDLER};

/// Directory the handler shim is staged into: the function's module
/// directory when packaging individually, otherwise the service root.
pub fn handler_target_dir(config: &EffectiveConfig, function: Option<&FunctionConfig>) -> PathBuf {
    match function.and_then(|f| f.module.as_deref()) {
        Some(module) => config.service_root.join(module),
        None => config.service_root.to_path_buf(),
    }
}

/// Before packaging: stage the handler, install and link requirements.
///
/// Bound to before package-creation, before per-function packaging of the
/// WSGI function, before offline-emulator start, and `install`.
pub fn deploy_before(
    config: &EffectiveConfig,
    manifest: &mut PackageManifest,
    target_dir: &Path,
    verbose: bool,
) -> WsgiResult<()> {
    packaging::configure_packaging(config, manifest);
    packaging::stage_handler(config, target_dir, verbose)?;
    packaging::install_requirements(config)?;
    packaging::link_requirements(config, manifest)?;
    packaging::check_werkzeug(config)
}

/// Packaging chain for individually packaged functions that do not run the
/// WSGI handler: requirements only, no handler staging.
pub fn deploy_before_without_handler(
    config: &EffectiveConfig,
    manifest: &mut PackageManifest,
) -> WsgiResult<()> {
    packaging::configure_packaging(config, manifest);
    packaging::install_requirements(config)?;
    packaging::link_requirements(config, manifest)
}

/// After packaging: unlink staged packages, then remove staged artifacts.
/// Unlinking precedes artifact removal so dangling links never survive.
pub fn deploy_after(config: &EffectiveConfig, target_dir: &Path) -> WsgiResult<()> {
    packaging::unlink_requirements(config)?;
    packaging::cleanup_artifacts(target_dir)
}

/// The `clean` chain: the after-deploy teardown plus staging removal
pub fn clean(config: &EffectiveConfig, target_dir: &Path) -> WsgiResult<()> {
    deploy_after(config, target_dir)?;
    packaging::clean_staging(config)
}

/// Before a local invoke of `function`: stage the handler quietly when the
/// target runs the WSGI shim, so the framework can import it.
pub fn before_local_invoke(
    config: &EffectiveConfig,
    function: Option<&FunctionConfig>,
) -> WsgiResult<()> {
    if let Some(func) = function {
        if func.handler == WSGI_HANDLER {
            let target_dir = handler_target_dir(config, Some(func));
            return packaging::stage_handler(config, &target_dir, false);
        }
    }
    Ok(())
}

/// After a local invoke: remove the quietly staged artifacts
pub fn after_local_invoke(
    config: &EffectiveConfig,
    function: Option<&FunctionConfig>,
) -> WsgiResult<()> {
    packaging::cleanup_artifacts(&handler_target_dir(config, function))
}
