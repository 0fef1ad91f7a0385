//! Config Resolver
//!
//! Collapses the layered configuration sources (explicit `custom.wsgi`
//! settings, provider runtime, hardcoded defaults) into one immutable
//! `EffectiveConfig` per command run. Resolution never fails: absent
//! optional fields degrade to defaults.

use std::path::{Path, PathBuf};

use crate::service::{ServiceDescriptor, REQUIREMENTS_PLUGIN};

/// Directory holding installed third-party packages before linking
pub const STAGING_DIR: &str = ".requirements";

/// Default interpreter when neither `pythonBin` nor a usable runtime is set
pub const DEFAULT_PYTHON: &str = "python";

/// Effective plugin settings for a single command run
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// Service root directory (location of serverless.yml)
    pub service_root: PathBuf,

    /// WSGI application target, e.g. "api.app"
    pub app: Option<String>,

    /// Directory containing the app target, service-root relative apps
    /// resolve to the service root itself
    pub app_dir: Option<PathBuf>,

    /// Interpreter binary used for all child processes
    pub python_bin: String,

    /// Whether this plugin owns dependency installation
    pub requirements_enabled: bool,

    /// Staging directory for installed packages (set when enabled)
    pub staging_path: Option<PathBuf>,

    /// Extra arguments forwarded to pip
    pub pip_args: Option<String>,

    /// Additional MIME types treated as text by the handler shim
    pub text_mime_types: Option<Vec<String>>,
}

impl EffectiveConfig {
    /// Resolve effective settings from the service descriptor.
    ///
    /// Precedence per field: explicit `custom.wsgi` setting, then values
    /// inferred from provider config, then hardcoded defaults.
    pub fn resolve(service: &ServiceDescriptor, service_root: &Path) -> Self {
        let wsgi = service.custom.wsgi.clone().unwrap_or_default();

        let app = wsgi.app.clone();
        let app_dir = app.as_deref().map(|app| {
            service_root
                .join(app)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| service_root.to_path_buf())
        });

        // The companion requirements plugin owns installation when declared
        let mut requirements_enabled = !service
            .plugins
            .iter()
            .any(|plugin| plugin == REQUIREMENTS_PLUGIN);
        if let Some(explicit) = wsgi.pack_requirements {
            requirements_enabled = explicit;
        }

        let staging_path = requirements_enabled.then(|| {
            app_dir
                .clone()
                .unwrap_or_else(|| service_root.to_path_buf())
                .join(STAGING_DIR)
        });

        let python_bin = resolve_python(&wsgi.python_bin, &service.provider.runtime);

        EffectiveConfig {
            service_root: service_root.to_path_buf(),
            app,
            app_dir,
            python_bin,
            requirements_enabled,
            staging_path,
            pip_args: wsgi.pip_args,
            text_mime_types: wsgi.text_mime_types,
        }
    }

    /// Directory the requirements file is looked up in
    pub fn requirements_dir(&self) -> &Path {
        self.app_dir.as_deref().unwrap_or(&self.service_root)
    }
}

/// Interpreter resolution order: explicit override, provider runtime when
/// present on PATH, fixed default.
fn resolve_python(explicit: &Option<String>, runtime: &Option<String>) -> String {
    if let Some(bin) = explicit {
        eprintln!("Using Python specified in \"pythonBin\": {bin}");
        return bin.clone();
    }

    if let Some(runtime) = runtime {
        if which::which(runtime).is_ok() {
            eprintln!("Using Python specified in \"runtime\": {runtime}");
            return runtime.clone();
        }
        eprintln!("Python executable not found for \"runtime\": {runtime}");
    }

    eprintln!("Using default Python executable: {DEFAULT_PYTHON}");
    DEFAULT_PYTHON.to_string()
}
