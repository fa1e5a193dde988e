//! Discovery of the AMD SMI executable.
//!
//! Well-known install locations are checked first (primary `rocm-smi`, then the
//! newer `amd-smi`), followed by a PATH lookup for each tool name in order.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Absolute install locations, checked in order.
pub const DEFAULT_SEARCH_PATHS: &[&str] = &[
    "/opt/rocm/bin/rocm-smi",
    "/usr/bin/rocm-smi",
    "/usr/local/bin/rocm-smi",
    "/opt/amdgpu-pro/bin/amd-smi",
    "/usr/bin/amd-smi",
];

/// Tool names resolved through PATH when no well-known location matches.
pub const TOOL_NAMES: &[&str] = &["rocm-smi", "amd-smi"];

/// Finds an executable diagnostic tool on the host.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    preferred: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    tool_names: Vec<String>,
    path_env: Option<OsString>,
}

impl Default for ToolLocator {
    fn default() -> Self {
        Self {
            preferred: None,
            search_paths: DEFAULT_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
            tool_names: TOOL_NAMES.iter().map(|s| s.to_string()).collect(),
            path_env: None,
        }
    }
}

impl ToolLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try an explicit path (usually from the config file) before anything else.
    pub fn with_preferred(mut self, path: Option<PathBuf>) -> Self {
        self.preferred = path;
        self
    }

    pub fn with_search_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Names looked up through PATH. An empty list disables the PATH fallback.
    pub fn with_tool_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tool_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve tool names against this PATH value instead of the process environment.
    pub fn with_path_env<S: Into<OsString>>(mut self, path_env: S) -> Self {
        self.path_env = Some(path_env.into());
        self
    }

    /// Human-readable search order, as used by `locate`.
    pub fn candidates(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(preferred) = &self.preferred {
            out.push(format!("{} (configured)", preferred.display()));
        }
        out.extend(self.search_paths.iter().map(|p| p.display().to_string()));
        out.extend(self.tool_names.iter().map(|name| format!("{} (PATH)", name)));
        out
    }

    /// Locate the tool.
    ///
    /// Returns `None` when nothing resolves; the caller decides whether that is
    /// fatal.
    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(preferred) = &self.preferred {
            if is_executable(preferred) {
                return Some(preferred.clone());
            }
            log::warn!(
                "Configured SMI tool {} is not an executable file, searching default locations",
                preferred.display()
            );
        }

        if let Some(found) = self.search_paths.iter().find(|p| is_executable(p)) {
            return Some(found.clone());
        }

        self.tool_names.iter().find_map(|name| self.lookup_in_path(name))
    }

    fn lookup_in_path(&self, name: &str) -> Option<PathBuf> {
        let resolved = match &self.path_env {
            Some(path_env) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
                which::which_in(name, Some(path_env), cwd)
            }
            None => which::which(name),
        };

        match resolved {
            Ok(path) => Some(path),
            Err(e) => {
                log::trace!("{} not found in PATH: {}", name, e);
                None
            }
        }
    }
}

/// Regular file with at least one execute bit set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}
