//! Service descriptor model
//!
//! The subset of `serverless.yml` the plugin reads: provider runtime and
//! environment, the function map, the plugin list, packaging patterns and
//! the `custom.wsgi` settings block. Parsing is permissive - unknown keys
//! are ignored and absent sections default to empty.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml_ng::Value;

use crate::error::{WsgiError, WsgiResult};

/// Entry point of the bundled handler shim
pub const WSGI_HANDLER: &str = "wsgi_handler.handler";

/// Deprecated entry point accepted for backwards compatibility
pub const LEGACY_WSGI_HANDLER: &str = "wsgi.handler";

/// Companion plugin that owns dependency installation when declared
pub const REQUIREMENTS_PLUGIN: &str = "serverless-python-requirements";

/// Parsed service descriptor (`serverless.yml`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(default)]
    pub service: Option<String>,

    #[serde(default)]
    pub provider: Provider,

    #[serde(default)]
    pub functions: BTreeMap<String, FunctionConfig>,

    #[serde(default)]
    pub plugins: Vec<String>,

    #[serde(default)]
    pub package: PackageManifest,

    #[serde(default)]
    pub custom: CustomConfig,
}

/// Provider block: runtime identifier and provider-level environment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub runtime: Option<String>,

    #[serde(default)]
    pub environment: BTreeMap<String, Value>,
}

/// A single function entry in the service's function map
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionConfig {
    #[serde(default)]
    pub handler: String,

    #[serde(default)]
    pub environment: BTreeMap<String, Value>,

    /// Subdirectory for individually packaged functions
    #[serde(default)]
    pub module: Option<String>,
}

/// Include/exclude pattern lists for the deployment package.
///
/// Insertion order is preserved for reproducibility and appends use union
/// semantics: a pattern is never added twice. The plugin only appends to
/// these lists, it never replaces them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub individually: bool,
}

impl PackageManifest {
    /// Append an include pattern unless already present
    pub fn add_include(&mut self, pattern: &str) {
        if !self.include.iter().any(|p| p == pattern) {
            self.include.push(pattern.to_string());
        }
    }

    /// Append an exclude pattern unless already present
    pub fn add_exclude(&mut self, pattern: &str) {
        if !self.exclude.iter().any(|p| p == pattern) {
            self.exclude.push(pattern.to_string());
        }
    }
}

/// The `custom` block; only `custom.wsgi` is read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomConfig {
    #[serde(default)]
    pub wsgi: Option<WsgiSettings>,
}

/// The `custom.wsgi` settings block
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WsgiSettings {
    #[serde(default)]
    pub app: Option<String>,

    #[serde(default, rename = "packRequirements")]
    pub pack_requirements: Option<bool>,

    #[serde(default, rename = "pipArgs")]
    pub pip_args: Option<String>,

    #[serde(default, rename = "pythonBin")]
    pub python_bin: Option<String>,

    #[serde(default, rename = "textMimeTypes")]
    pub text_mime_types: Option<Vec<String>>,
}

impl ServiceDescriptor {
    /// Load the descriptor from `serverless.yml` (or `.yaml`) in the
    /// service root.
    pub fn load(service_root: &Path) -> WsgiResult<Self> {
        for name in ["serverless.yml", "serverless.yaml"] {
            let path = service_root.join(name);
            if path.exists() {
                let content = fs::read_to_string(&path)?;
                return Ok(serde_yaml_ng::from_str(&content)?);
            }
        }
        Err(WsgiError::ServiceNotFound {
            path: service_root.to_path_buf(),
        })
    }

    /// Rewrite deprecated `wsgi.handler` entry points to the current shim
    /// identifier. Returns true if anything was rewritten so the caller can
    /// emit a deprecation warning.
    pub fn fix_legacy_handlers(&mut self) -> bool {
        let mut fixed = false;
        for func in self.functions.values_mut() {
            if func.handler == LEGACY_WSGI_HANDLER {
                func.handler = WSGI_HANDLER.to_string();
                fixed = true;
            }
        }
        fixed
    }

    /// Name of the single function whose handler is the WSGI shim
    pub fn find_wsgi_function(&self) -> Option<&str> {
        self.functions
            .iter()
            .find(|(_, func)| func.handler == WSGI_HANDLER)
            .map(|(name, _)| name.as_str())
    }
}

/// Flatten an environment map to scalar string pairs.
///
/// Mappings and sequences (intrinsic references such as `Ref`/`Fn::ImportValue`)
/// are skipped; only values a child process environment can carry survive.
pub fn scalar_env(env: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    env.iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            };
            rendered.map(|v| (key.clone(), v))
        })
        .collect()
}
