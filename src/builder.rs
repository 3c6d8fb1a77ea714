use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::binder::Binder;
use crate::capabilities::Capabilities;
use crate::error::ConfigError;
use crate::file::{self, SearchPath};
use crate::ops::{self, ConfigAction, ConfigResult};
use crate::schema::{BoundRecord, ServerConfig};
use crate::tree::{self, Context};
use crate::validate;

/// Application name used for the platform config directory.
pub const APP_NAME: &str = "srvconf";

/// File name searched for when no explicit path is given.
pub const DEFAULT_FILE_NAME: &str = "srvconf.conf";

/// A block of the file together with its typed values.
#[derive(Debug, Clone)]
pub struct ConfigNode {
    pub context: Context,
    pub record: BoundRecord,
}

/// The loaded configuration: every block in file order with its bound
/// record, plus the server-wide settings.
///
/// Immutable after load; share it by reference or behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    pub(crate) nodes: Vec<ConfigNode>,
    pub(crate) server: ServerConfig,
    pub(crate) touched: BTreeSet<String>,
    pub(crate) deprecated_keys: Vec<String>,
    pub(crate) capabilities: Capabilities,
    pub(crate) source: Option<PathBuf>,
}

impl ConfigTree {
    /// Blocks in file order; index 0 is the global block.
    pub fn nodes(&self) -> &[ConfigNode] {
        &self.nodes
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.nodes.iter().map(|n| &n.context)
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Schema keys assigned in the global block.
    pub fn touched(&self) -> &BTreeSet<String> {
        &self.touched
    }

    /// Whether the file used any deprecated key.
    pub fn is_deprecated(&self) -> bool {
        !self.deprecated_keys.is_empty()
    }

    pub fn deprecated_keys(&self) -> &[String] {
        &self.deprecated_keys
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// File the tree was read from, if it came from disk.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Builder for locating, parsing and validating a configuration file.
///
/// Without an explicit [`path()`](Self::path), the file is discovered along
/// the search paths (see [`SearchPath`]); the default list is the platform
/// config directory, `/etc/srvconf`, then the working directory (highest
/// priority).
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    file_name: Option<String>,
    search_paths: Option<Vec<SearchPath>>,
    capabilities: Option<Capabilities>,
    strict: bool,
    known_keys: BTreeSet<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this file and skip discovery.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Override the file name searched for (default: `srvconf.conf`).
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    /// Replace the default search paths. Last entry has the highest priority.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path to the current (or default) list.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(default_search_paths)
            .push(path);
        self
    }

    /// Use this capability set instead of resolving one from the environment.
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Enable or disable strict mode (default: `false`).
    /// In strict mode, keys outside the schema and the known keys fail the load.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Register keys owned by server modules so strict mode accepts them.
    pub fn known_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    fn effective_file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(DEFAULT_FILE_NAME)
    }

    fn effective_search_paths(&self) -> Vec<SearchPath> {
        match &self.search_paths {
            Some(paths) => paths.clone(),
            None => default_search_paths(),
        }
    }

    fn effective_capabilities(&self) -> Result<Capabilities, ConfigError> {
        match &self.capabilities {
            Some(caps) => Ok(caps.clone()),
            None => Capabilities::load(None),
        }
    }

    fn read(&self) -> Result<(PathBuf, Vec<u8>), ConfigError> {
        if let Some(path) = &self.path {
            return Ok((path.clone(), file::read_source(path)?));
        }
        let file_name = self.effective_file_name();
        file::read_first_match(&self.effective_search_paths(), file_name, APP_NAME)?.ok_or_else(
            || ConfigError::NotFound {
                file_name: file_name.to_string(),
            },
        )
    }

    /// Locate, read and load the configuration file.
    pub fn load(self) -> Result<ConfigTree, ConfigError> {
        let (path, source) = self.read()?;
        tracing::debug!(path = %path.display(), "loading configuration");
        let mut tree = self.load_bytes(&source)?;
        tree.source = Some(path);
        Ok(tree)
    }

    /// Load from an in-memory buffer.
    pub fn load_bytes(self, source: &[u8]) -> Result<ConfigTree, ConfigError> {
        let capabilities = self.effective_capabilities()?;

        let mut contexts = tree::parse(source)?;
        validate::check_selectors(&mut contexts, &capabilities)?;
        validate::check_unknown_keys(&contexts, &self.known_keys, self.strict)?;

        let mut binder = Binder::new();
        let mut nodes = Vec::with_capacity(contexts.len());
        for (index, context) in contexts.into_iter().enumerate() {
            let record = if index == 0 {
                binder.bind_global(&context)?
            } else {
                binder.bind(&context)?
            };
            nodes.push(ConfigNode { context, record });
        }

        validate::check_tls(&nodes, &capabilities)?;
        let global = nodes.first().map(|n| &n.record).cloned().unwrap_or_default();
        let server = validate::server_config(&global, &capabilities)?;
        let (touched, deprecated_keys) = binder.into_parts();

        tracing::debug!(
            contexts = nodes.len(),
            port = server.port,
            event_handler = %server.event_handler,
            "configuration loaded"
        );

        Ok(ConfigTree {
            nodes,
            server,
            touched,
            deprecated_keys,
            capabilities,
            source: None,
        })
    }

    /// Load the file and run `action` on it.
    pub fn handle(self, action: &ConfigAction) -> Result<ConfigResult, ConfigError> {
        let tree = self.load()?;
        match action {
            ConfigAction::Check => Ok(ConfigResult::Checked {
                path: tree.source().map(Path::to_path_buf),
                deprecated: tree.deprecated_keys().to_vec(),
            }),
            ConfigAction::Print => Ok(ConfigResult::Dump(ops::dump(&tree))),
            ConfigAction::Resolve { request, json } => {
                let config = tree.resolve_all(request);
                if *json {
                    Ok(ConfigResult::Json(serde_json::to_string_pretty(&config)?))
                } else {
                    Ok(ConfigResult::Listing {
                        entries: ops::list_effective(&config)?,
                    })
                }
            }
        }
    }

    /// Handle `action` and print the result to stdout.
    pub fn handle_and_print(self, action: &ConfigAction) -> Result<(), ConfigError> {
        let result = self.handle(action)?;
        println!("{result}");
        Ok(())
    }
}

fn default_search_paths() -> Vec<SearchPath> {
    vec![
        SearchPath::Platform,
        SearchPath::Path(PathBuf::from("/etc/srvconf")),
        SearchPath::Cwd,
    ]
}

/// Load the configuration file at `path` with the capability set resolved
/// from the environment.
pub fn load(path: impl AsRef<Path>) -> Result<ConfigTree, ConfigError> {
    ConfigLoader::new().path(path.as_ref()).load()
}
