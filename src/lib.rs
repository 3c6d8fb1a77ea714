//! Configuration front-end for a small web server. Point it at a file, get
//! back a validated tree, and resolve the settings for each connection.
//!
//! ```ignore
//! let tree = srvconf::ConfigLoader::new().path("/etc/srvconf/srvconf.conf").load()?;
//! let request = srvconf::RequestInfo::new()
//!     .with_authority("www.example.org")
//!     .with_path("/index.html");
//! let config = tree.resolve_all(&request);
//! println!("{}", config.document_root);
//! ```
//!
//! # File format
//!
//! A file is a list of `key = value` assignments, optionally grouped into
//! conditional blocks:
//!
//! ```text
//! server.document-root = "/srv/www/default"
//! server.indexfiles    = ( "index.html", "index.htm" )
//! mimetype.assign      = ( ".html" => "text/html" )
//!
//! $HTTPhost == "www.example.org" {
//!   server.document-root = "/srv/www/example.org"
//!
//!   $HTTPurl =~ "^/cgi-bin/" {
//!     server.follow-symlink = "disable"
//!   }
//! }
//! ```
//!
//! Values are quoted strings, integers or parenthesised arrays whose items
//! may be keyed with `=>`. Booleans are written `"enable"` / `"disable"`.
//! Comments start with `#` and run to the end of the line.
//!
//! # Loading pipeline
//!
//! ```text
//! bytes ─▶ lexer ─▶ tree builder ─▶ selector checks ─▶ binder ─▶ TLS / server checks
//!          tokens    contexts        compiled patterns   typed records   ConfigTree
//! ```
//!
//! Every step reports the line it failed on through [`ConfigError`]. Nothing
//! after [`ConfigLoader::load`] can fail.
//!
//! # Capabilities
//!
//! Some features depend on what the hosting server was built with: pattern
//! conditions (`=~`, `!~`), TLS and the available event handlers. These come
//! from [`Capabilities`], read from the environment (`SRVCONF_*`) or a TOML
//! file, or passed to the loader directly. A file that needs a missing
//! capability fails to load.
//!
//! # Resolution
//!
//! The global block applies once per connection
//! ([`setup_connection`](ConfigTree::setup_connection)). Each conditional
//! block is tied to the [`Stage`] named by its variable and is merged by
//! [`patch_connection`](ConfigTree::patch_connection) when that stage runs,
//! if its condition and all enclosing conditions hold. A block only changes
//! the fields it assigns; later blocks win.
//!
//! # Clap adapter
//!
//! The `cli` module (behind the `clap` feature, on by default) provides the
//! `srvconf` binary's arguments. [`Cli::into_action`] turns them into a
//! [`ConfigAction`] handled by [`ConfigLoader::handle`], so the core has no
//! dependency on any CLI framework.

pub mod error;
pub mod ops;

mod binder;
mod builder;
mod capabilities;
#[cfg(feature = "clap")]
mod cli;
mod condition;
mod effective;
mod file;
mod lexer;
mod resolve;
mod schema;
mod token;
mod tree;
mod validate;
mod value;

#[cfg(test)]
mod fixtures;

pub use binder::Binder;
pub use builder::{APP_NAME, ConfigLoader, ConfigNode, ConfigTree, DEFAULT_FILE_NAME, load};
pub use capabilities::{Capabilities, EventHandler};
#[cfg(feature = "clap")]
pub use cli::{Cli, Command, RequestArgs};
pub use condition::{Connection, Operator, RequestInfo, Selector, Stage, Variable, evaluate};
pub use effective::EffectiveConfig;
pub use error::{Capability, ConfigError};
pub use file::SearchPath;
pub use lexer::{Lexer, tokenize};
pub use ops::{ConfigAction, ConfigResult};
pub use schema::{BoundRecord, FieldKind, SCHEMA, SchemaField, Scope, ServerConfig, Setter};
pub use token::{Token, TokenKind};
pub use tree::{Context, GLOBAL_CONTEXT, MAX_ARRAY_DEPTH, TreeBuilder, parse};
pub use value::{ArrayItem, Entry, Value};
