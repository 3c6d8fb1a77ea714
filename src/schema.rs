//! The fixed table of configuration keys and the typed records they bind
//! into.
//!
//! Every [`SchemaField`] pairs a key with a [`Setter`]. The setter is both the
//! field's kind and the way a validated value is stored in a
//! [`BoundRecord`], so the two can never disagree.

use indexmap::IndexMap;
use serde::Serialize;

use crate::capabilities::EventHandler;

/// Where a setting takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scope {
    /// Read once from the global block at startup.
    Server,
    /// Resolved per connection; may be overridden by conditional blocks.
    Connection,
}

/// Shape a value must have to bind into a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Array of strings, element keys discarded.
    StringList,
    /// Array of `"key" => "value"` strings.
    StringTable,
    UnsignedInt,
    EnableDisableBool,
    Deprecated,
    Ignored,
}

impl FieldKind {
    /// Human description used in type errors.
    pub fn expected(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::StringList => "array of strings",
            FieldKind::StringTable => "array of \"key\" => \"value\" strings",
            FieldKind::UnsignedInt => "short integer",
            FieldKind::EnableDisableBool => "boolean",
            FieldKind::Deprecated | FieldKind::Ignored => "nothing",
        }
    }

    pub fn example(self) -> &'static str {
        match self {
            FieldKind::String => "\"...\"",
            FieldKind::StringList => "( \"...\", \"...\" )",
            FieldKind::StringTable => "( \".html\" => \"text/html\" )",
            FieldKind::UnsignedInt => "0 ... 65535",
            FieldKind::EnableDisableBool => "\"(enable|disable)\"",
            FieldKind::Deprecated | FieldKind::Ignored => "",
        }
    }
}

/// Stores a validated value into its slot of a [`BoundRecord`].
#[derive(Clone, Copy)]
pub enum Setter {
    String(fn(&mut BoundRecord, String)),
    List(fn(&mut BoundRecord, Vec<String>)),
    Table(fn(&mut BoundRecord, IndexMap<String, String>)),
    UnsignedInt(fn(&mut BoundRecord, u16)),
    Bool(fn(&mut BoundRecord, bool)),
    /// Accepted but dropped; the message names the replacement.
    Deprecated(&'static str),
    Ignored,
}

impl Setter {
    pub fn kind(&self) -> FieldKind {
        match self {
            Setter::String(_) => FieldKind::String,
            Setter::List(_) => FieldKind::StringList,
            Setter::Table(_) => FieldKind::StringTable,
            Setter::UnsignedInt(_) => FieldKind::UnsignedInt,
            Setter::Bool(_) => FieldKind::EnableDisableBool,
            Setter::Deprecated(_) => FieldKind::Deprecated,
            Setter::Ignored => FieldKind::Ignored,
        }
    }
}

impl std::fmt::Debug for Setter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Setter::Deprecated(msg) => write!(f, "Deprecated({msg:?})"),
            other => write!(f, "{:?}", other.kind()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaField {
    pub key: &'static str,
    /// `None` for deprecated and ignored keys.
    pub scope: Option<Scope>,
    pub setter: Setter,
}

impl SchemaField {
    pub fn kind(&self) -> FieldKind {
        self.setter.kind()
    }
}

/// Typed values of one block. A field is `Some` exactly when the block
/// assigned it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundRecord {
    // server scope
    pub bind_host: Option<String>,
    pub error_logfile: Option<String>,
    pub errorfile_prefix: Option<String>,
    pub changeroot: Option<String>,
    pub username: Option<String>,
    pub groupname: Option<String>,
    pub port: Option<u16>,
    pub modules: Option<Vec<String>>,
    pub event_handler: Option<String>,
    pub pid_file: Option<String>,
    pub max_worker: Option<u16>,
    pub max_fds: Option<u16>,
    pub log_request_header_on_error: Option<bool>,
    pub log_state_handling: Option<bool>,

    // connection scope
    pub server_tag: Option<String>,
    pub use_ipv6: Option<bool>,
    pub max_request_size: Option<u16>,
    pub document_root: Option<String>,
    pub dir_listing: Option<bool>,
    pub indexfiles: Option<Vec<String>>,
    pub max_keep_alive_requests: Option<u16>,
    pub server_name: Option<String>,
    pub max_keep_alive_idle: Option<u16>,
    pub max_read_idle: Option<u16>,
    pub max_write_idle: Option<u16>,
    pub error_handler: Option<String>,
    pub follow_symlink: Option<bool>,
    pub global_kbytes_per_second: Option<u16>,
    pub kbytes_per_second: Option<u16>,
    pub use_xattr: Option<bool>,
    pub mimetypes: Option<IndexMap<String, String>>,
    pub ssl_pemfile: Option<String>,
    pub is_ssl: Option<bool>,
    pub log_file_not_found: Option<bool>,
    pub log_request_handling: Option<bool>,
    pub log_response_header: Option<bool>,
    pub log_request_header: Option<bool>,
    pub allow_http11: Option<bool>,
}

macro_rules! field {
    ($key:literal, $scope:ident, $setter:ident, $slot:ident) => {
        SchemaField {
            key: $key,
            scope: Some(Scope::$scope),
            setter: Setter::$setter(|r, v| r.$slot = Some(v)),
        }
    };
}

macro_rules! deprecated {
    ($key:literal, $message:literal) => {
        SchemaField {
            key: $key,
            scope: None,
            setter: Setter::Deprecated($message),
        }
    };
}

pub static SCHEMA: &[SchemaField] = &[
    field!("server.bind", Server, String, bind_host),
    field!("server.errorlog", Server, String, error_logfile),
    field!("server.errorfile-prefix", Server, String, errorfile_prefix),
    field!("server.chroot", Server, String, changeroot),
    field!("server.username", Server, String, username),
    field!("server.groupname", Server, String, groupname),
    field!("server.port", Server, UnsignedInt, port),
    field!("server.tag", Connection, String, server_tag),
    field!("server.use-ipv6", Connection, Bool, use_ipv6),
    field!("server.modules", Server, List, modules),
    field!("server.event-handler", Server, String, event_handler),
    field!("server.pid-file", Server, String, pid_file),
    field!("server.max-request-size", Connection, UnsignedInt, max_request_size),
    field!("server.max-worker", Server, UnsignedInt, max_worker),
    field!("server.document-root", Connection, String, document_root),
    field!("server.dir-listing", Connection, Bool, dir_listing),
    field!("server.indexfiles", Connection, List, indexfiles),
    field!("server.max-keep-alive-requests", Connection, UnsignedInt, max_keep_alive_requests),
    field!("server.name", Connection, String, server_name),
    field!("server.max-keep-alive-idle", Connection, UnsignedInt, max_keep_alive_idle),
    field!("server.max-read-idle", Connection, UnsignedInt, max_read_idle),
    field!("server.max-write-idle", Connection, UnsignedInt, max_write_idle),
    field!("server.error-handler-404", Connection, String, error_handler),
    field!("server.max-fds", Server, UnsignedInt, max_fds),
    field!("server.follow-symlink", Connection, Bool, follow_symlink),
    field!("server.kbytes-per-second", Connection, UnsignedInt, global_kbytes_per_second),
    field!("connection.kbytes-per-second", Connection, UnsignedInt, kbytes_per_second),
    field!("mimetype.use-xattr", Connection, Bool, use_xattr),
    field!("mimetype.assign", Connection, Table, mimetypes),
    field!("ssl.pemfile", Connection, String, ssl_pemfile),
    field!("ssl.engine", Connection, Bool, is_ssl),
    field!("debug.log-file-not-found", Connection, Bool, log_file_not_found),
    field!("debug.log-request-handling", Connection, Bool, log_request_handling),
    field!("debug.log-response-header", Connection, Bool, log_response_header),
    field!("debug.log-request-header", Connection, Bool, log_request_header),
    field!("server.protocol-http11", Connection, Bool, allow_http11),
    field!("debug.log-request-header-on-error", Server, Bool, log_request_header_on_error),
    field!("debug.log-state-handling", Server, Bool, log_state_handling),
    deprecated!("server.host", "use server.bind instead"),
    deprecated!("server.docroot", "use server.document-root instead"),
    deprecated!(
        "server.virtual-root",
        "load mod_simple_vhost and use simple-vhost.server-root instead"
    ),
    deprecated!(
        "server.virtual-default-host",
        "load mod_simple_vhost and use simple-vhost.default-host instead"
    ),
    deprecated!(
        "server.virtual-docroot",
        "load mod_simple_vhost and use simple-vhost.document-root instead"
    ),
    deprecated!("server.userid", "use server.username instead"),
    deprecated!("server.groupid", "use server.groupname instead"),
    deprecated!(
        "server.use-keep-alive",
        "use server.max-keep-alive-requests = 0 instead"
    ),
];

/// Look a key up in [`SCHEMA`].
pub fn field(key: &str) -> Option<&'static SchemaField> {
    SCHEMA.iter().find(|f| f.key == key)
}

/// Server-wide settings taken from the global block, with the listening port
/// and event handler already settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    #[serde(rename = "server.bind")]
    pub bind_host: String,
    #[serde(rename = "server.errorlog")]
    pub error_logfile: String,
    #[serde(rename = "server.errorfile-prefix")]
    pub errorfile_prefix: String,
    #[serde(rename = "server.chroot")]
    pub changeroot: String,
    #[serde(rename = "server.username")]
    pub username: String,
    #[serde(rename = "server.groupname")]
    pub groupname: String,
    #[serde(rename = "server.port")]
    pub port: u16,
    #[serde(rename = "server.modules")]
    pub modules: Vec<String>,
    #[serde(rename = "server.event-handler")]
    pub event_handler: EventHandler,
    #[serde(rename = "server.pid-file")]
    pub pid_file: String,
    #[serde(rename = "server.max-worker")]
    pub max_worker: u16,
    #[serde(rename = "server.max-fds")]
    pub max_fds: u16,
    #[serde(rename = "debug.log-request-header-on-error")]
    pub log_request_header_on_error: bool,
    #[serde(rename = "debug.log-state-handling")]
    pub log_state_handling: bool,
}

impl ServerConfig {
    pub fn new(global: &BoundRecord, port: u16, event_handler: EventHandler) -> Self {
        let string = |s: &Option<String>| s.clone().unwrap_or_default();
        Self {
            bind_host: string(&global.bind_host),
            error_logfile: string(&global.error_logfile),
            errorfile_prefix: string(&global.errorfile_prefix),
            changeroot: string(&global.changeroot),
            username: string(&global.username),
            groupname: string(&global.groupname),
            port,
            modules: global.modules.clone().unwrap_or_default(),
            event_handler,
            pid_file: string(&global.pid_file),
            max_worker: global.max_worker.unwrap_or(0),
            max_fds: global.max_fds.unwrap_or(0),
            log_request_header_on_error: global.log_request_header_on_error.unwrap_or(false),
            log_state_handling: global.log_state_handling.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_unique() {
        let mut seen = HashSet::new();
        for f in SCHEMA {
            assert!(seen.insert(f.key), "duplicate schema key {}", f.key);
        }
    }

    #[test]
    fn table_size() {
        let deprecated = SCHEMA
            .iter()
            .filter(|f| f.kind() == FieldKind::Deprecated)
            .count();
        assert_eq!(deprecated, 8);
        assert_eq!(SCHEMA.len(), 46);
    }

    #[test]
    fn deprecated_keys_have_no_scope() {
        for f in SCHEMA {
            assert_eq!(f.scope.is_none(), f.kind() == FieldKind::Deprecated, "{}", f.key);
        }
    }

    #[test]
    fn setters_write_their_slot() {
        let mut record = BoundRecord::default();
        let Setter::String(set) = field("server.document-root").unwrap().setter else {
            panic!("server.document-root should be a string");
        };
        set(&mut record, "/srv/www".into());
        assert_eq!(record.document_root.as_deref(), Some("/srv/www"));

        let Setter::UnsignedInt(set) = field("server.kbytes-per-second").unwrap().setter else {
            panic!("server.kbytes-per-second should be an integer");
        };
        set(&mut record, 64);
        assert_eq!(record.global_kbytes_per_second, Some(64));
        assert_eq!(record.kbytes_per_second, None);
    }

    #[test]
    fn lookup() {
        assert_eq!(field("mimetype.assign").unwrap().kind(), FieldKind::StringTable);
        assert_eq!(field("server.modules").unwrap().kind(), FieldKind::StringList);
        assert_eq!(field("ssl.engine").unwrap().kind(), FieldKind::EnableDisableBool);
        assert_eq!(field("server.port").unwrap().scope, Some(Scope::Server));
        assert!(field("server.unknown").is_none());
        let Setter::Deprecated(msg) = field("server.host").unwrap().setter else {
            panic!("server.host should be deprecated");
        };
        assert_eq!(msg, "use server.bind instead");
    }

    #[test]
    fn server_config_fills_unset_fields() {
        let record = BoundRecord {
            bind_host: Some("127.0.0.1".into()),
            modules: Some(vec!["mod_access".into()]),
            ..Default::default()
        };
        let server = ServerConfig::new(&record, 80, EventHandler::Poll);
        assert_eq!(server.bind_host, "127.0.0.1");
        assert_eq!(server.modules, vec!["mod_access"]);
        assert_eq!(server.username, "");
        assert_eq!(server.max_fds, 0);
        assert!(!server.log_state_handling);
    }
}
