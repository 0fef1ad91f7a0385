//! Bundled helper files
//!
//! The Python-side pieces shipped inside the binary: the handler shim, the
//! WSGI adapter it imports, the requirements installer, the shim's own
//! requirements and the local development server. They are written into
//! the service tree on demand; there is no plugin directory on disk to
//! copy from.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::WsgiResult;

/// Handler shim copied next to the user's app
pub const HANDLER_FILE: &str = "wsgi_handler.py";

/// WSGI adapter imported by the handler shim
pub const ADAPTER_FILE: &str = "serverless_wsgi.py";

/// Metadata file recording the app target and MIME overrides
pub const METADATA_FILE: &str = ".wsgipack";

pub const HANDLER_SOURCE: &str = include_str!("../assets/wsgi_handler.py");
pub const ADAPTER_SOURCE: &str = include_str!("../assets/serverless_wsgi.py");
pub const INSTALLER_SOURCE: &str = include_str!("../assets/requirements.py");
pub const SHIM_REQUIREMENTS: &str = include_str!("../assets/requirements.txt");
pub const SERVER_SOURCE: &str = include_str!("../assets/serve.py");

/// Materialize an embedded asset into `dir`, returning the written path
pub fn write_asset(dir: &Path, name: &str, source: &str) -> WsgiResult<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, source)?;
    Ok(path)
}
