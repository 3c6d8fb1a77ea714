//! Config file discovery and the byte-buffer loader.
//!
//! Each [`SearchPath`] resolves to one directory. The list is ordered by
//! ascending priority (last = highest); discovery checks `{dir}/{file_name}`
//! from the highest-priority end and uses the first file it finds. The server
//! reads exactly one configuration file, so nothing is merged.
//!
//! Missing files are skipped. Any other I/O error (permissions, a directory
//! where a file was expected) is propagated.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Where to look for the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, `~/Library/Application Support`
    /// on macOS).
    Platform,
    /// A subdirectory of the user's home directory, e.g. `Home(".srvconf")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory such as `/etc/srvconf`.
    Path(PathBuf),
}

/// Resolve a [`SearchPath`] to a directory. `None` if it cannot be resolved
/// on this system (no home directory, unreadable CWD).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Read a whole file into memory.
pub fn read_source(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read the highest-priority `file_name` found along `search_paths`.
///
/// Returns `Ok(None)` when no directory holds the file.
pub fn read_first_match(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
) -> Result<Option<(PathBuf, Vec<u8>)>, ConfigError> {
    for sp in search_paths.iter().rev() {
        let Some(dir) = resolve_search_path(sp, app_name) else {
            continue;
        };
        let file_path = dir.join(file_name);
        match std::fs::read(&file_path) {
            Ok(content) => return Ok(Some((file_path, content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(ConfigError::IoError {
                    path: file_path,
                    source: e,
                });
            }
        }
    }
    Ok(None)
}
