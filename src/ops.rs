//! Operations behind the CLI: dumping the parsed tree, listing resolved
//! settings, and the `ConfigResult` type callers display.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::builder::ConfigTree;
use crate::condition::RequestInfo;
use crate::error::ConfigError;
use crate::value::{ArrayItem, Value};

/// An operation on a configuration file, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    Check,
    Print,
    Resolve { request: RequestInfo, json: bool },
}

/// Result of a CLI operation, returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// The file loaded and passed validation.
    Checked {
        path: Option<PathBuf>,
        deprecated: Vec<String>,
    },
    /// The parsed tree in configuration syntax.
    Dump(String),
    /// Resolved settings as key/value pairs.
    Listing { entries: Vec<(String, String)> },
    /// Resolved settings as a JSON document.
    Json(String),
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Checked { path, deprecated } => {
                if let Some(path) = path {
                    writeln!(f, "{}", path.display())?;
                }
                for key in deprecated {
                    writeln!(f, "deprecated: {key}")?;
                }
                write!(f, "Syntax OK")
            }
            ConfigResult::Dump(text) => write!(f, "{}", text.trim_end()),
            ConfigResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
            ConfigResult::Json(json) => write!(f, "{json}"),
        }
    }
}

const INDENT: &str = "  ";

fn write_entries(out: &mut String, tree: &ConfigTree, index: usize, depth: usize) {
    for entry in &tree.nodes[index].context.entries {
        out.push_str(&format!("{}{} = {}\n", INDENT.repeat(depth), entry.key, entry.value));
    }
}

fn write_block(out: &mut String, tree: &ConfigTree, index: usize, depth: usize) {
    let context = &tree.nodes[index].context;
    let pad = INDENT.repeat(depth);
    let header = match &context.selector {
        Some(selector) => selector.to_string(),
        None => context.name.clone(),
    };
    out.push_str(&format!("{pad}{header} {{\n"));
    write_entries(out, tree, index, depth + 1);
    for child in children(tree, Some(index)) {
        write_block(out, tree, child, depth + 1);
    }
    out.push_str(&format!("{pad}}}\n"));
}

fn children(tree: &ConfigTree, parent: Option<usize>) -> Vec<usize> {
    tree.nodes
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, n)| n.context.parent == parent)
        .map(|(i, _)| i)
        .collect()
}

/// Render the tree back into configuration syntax. Nested blocks are written
/// after the assignments of their parent.
pub fn dump(tree: &ConfigTree) -> String {
    let mut out = String::new();
    if tree.nodes.is_empty() {
        return out;
    }
    write_entries(&mut out, tree, 0, 0);
    for index in children(tree, None) {
        if !out.is_empty() {
            out.push('\n');
        }
        write_block(&mut out, tree, index, 0);
    }
    out
}

/// Display a serialized setting the way it would be written in a file.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(true) => "enable".to_string(),
        serde_json::Value::Bool(false) => "disable".to_string(),
        serde_json::Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| ArrayItem::plain(Value::String(format_value(v))))
                .collect(),
        )
        .to_string(),
        serde_json::Value::Object(map) => Value::Array(
            map.iter()
                .map(|(k, v)| ArrayItem::keyed(k.clone(), Value::String(format_value(v))))
                .collect(),
        )
        .to_string(),
        other => other.to_string(),
    }
}

/// Flatten any of the resolved setting structs into `(key, value)` pairs,
/// sorted by key.
pub fn list_values<T: Serialize>(settings: &T) -> Result<Vec<(String, String)>, ConfigError> {
    let serde_json::Value::Object(map) = serde_json::to_value(settings)? else {
        return Ok(Vec::new());
    };
    let mut entries: Vec<(String, String)> = map
        .iter()
        .map(|(key, value)| (key.clone(), format_value(value)))
        .collect();
    entries.sort();
    Ok(entries)
}

/// List an effective configuration.
pub fn list_effective(
    config: &crate::effective::EffectiveConfig,
) -> Result<Vec<(String, String)>, ConfigError> {
    list_values(config)
}
