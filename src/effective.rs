//! The per-connection configuration snapshot.

use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::BoundRecord;

/// Connection-scoped settings in effect for one connection.
///
/// Starts from [`EffectiveConfig::default`] (the built-in defaults) and is
/// updated through [`merge`](EffectiveConfig::merge) as blocks apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    #[serde(rename = "server.tag")]
    pub server_tag: String,
    #[serde(rename = "server.use-ipv6")]
    pub use_ipv6: bool,
    #[serde(rename = "server.max-request-size")]
    pub max_request_size: u16,
    #[serde(rename = "server.document-root")]
    pub document_root: String,
    #[serde(rename = "server.dir-listing")]
    pub dir_listing: bool,
    #[serde(rename = "server.indexfiles")]
    pub indexfiles: Vec<String>,
    #[serde(rename = "server.max-keep-alive-requests")]
    pub max_keep_alive_requests: u16,
    #[serde(rename = "server.name")]
    pub server_name: String,
    #[serde(rename = "server.max-keep-alive-idle")]
    pub max_keep_alive_idle: u16,
    #[serde(rename = "server.max-read-idle")]
    pub max_read_idle: u16,
    #[serde(rename = "server.max-write-idle")]
    pub max_write_idle: u16,
    #[serde(rename = "server.error-handler-404")]
    pub error_handler: String,
    #[serde(rename = "server.follow-symlink")]
    pub follow_symlink: bool,
    #[serde(rename = "server.kbytes-per-second")]
    pub global_kbytes_per_second: u16,
    #[serde(rename = "connection.kbytes-per-second")]
    pub kbytes_per_second: u16,
    #[serde(rename = "mimetype.use-xattr")]
    pub use_xattr: bool,
    #[serde(rename = "mimetype.assign")]
    pub mimetypes: IndexMap<String, String>,
    #[serde(rename = "ssl.pemfile")]
    pub ssl_pemfile: String,
    #[serde(rename = "ssl.engine")]
    pub is_ssl: bool,
    #[serde(rename = "debug.log-file-not-found")]
    pub log_file_not_found: bool,
    #[serde(rename = "debug.log-request-handling")]
    pub log_request_handling: bool,
    #[serde(rename = "debug.log-response-header")]
    pub log_response_header: bool,
    #[serde(rename = "debug.log-request-header")]
    pub log_request_header: bool,
    #[serde(rename = "server.protocol-http11")]
    pub allow_http11: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            server_tag: String::new(),
            use_ipv6: false,
            max_request_size: 0,
            document_root: String::new(),
            dir_listing: false,
            indexfiles: Vec::new(),
            max_keep_alive_requests: 128,
            server_name: String::new(),
            max_keep_alive_idle: 30,
            max_read_idle: 60,
            max_write_idle: 360,
            error_handler: String::new(),
            follow_symlink: true,
            global_kbytes_per_second: 0,
            kbytes_per_second: 0,
            use_xattr: false,
            mimetypes: IndexMap::new(),
            ssl_pemfile: String::new(),
            is_ssl: false,
            log_file_not_found: false,
            log_request_handling: false,
            log_response_header: false,
            log_request_header: false,
            allow_http11: true,
        }
    }
}

macro_rules! merge_present {
    ($dst:expr, $src:expr; $($field:ident),* $(,)?) => {
        $(
            if let Some(value) = &$src.$field {
                $dst.$field = value.clone();
            }
        )*
    };
}

impl EffectiveConfig {
    /// Copy every field `record` has a value for. Fields the record leaves
    /// unset keep their current value.
    pub fn merge(&mut self, record: &BoundRecord) {
        merge_present!(self, record;
            server_tag,
            use_ipv6,
            max_request_size,
            document_root,
            dir_listing,
            indexfiles,
            max_keep_alive_requests,
            server_name,
            max_keep_alive_idle,
            max_read_idle,
            max_write_idle,
            error_handler,
            follow_symlink,
            global_kbytes_per_second,
            kbytes_per_second,
            use_xattr,
            mimetypes,
            ssl_pemfile,
            is_ssl,
            log_file_not_found,
            log_request_handling,
            log_response_header,
            log_request_header,
            allow_http11,
        );
    }
}
