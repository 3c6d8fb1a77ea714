//! Load-time checks that run after the tree is built.
//!
//! - Capability checks on block headers: pattern selectors need pattern
//!   matching, and their patterns are compiled here.
//! - Unknown keys: rejected in strict mode, logged otherwise.
//! - Post-load validation: TLS blocks need a certificate, the event handler
//!   must be available, and an unset port falls back to 80 or 443.

use std::collections::BTreeSet;

use crate::builder::ConfigNode;
use crate::capabilities::{Capabilities, EventHandler};
use crate::error::{Capability, ConfigError};
use crate::schema::{self, BoundRecord, ServerConfig};
use crate::tree::Context;

/// Compile every pattern selector, failing if the host cannot match
/// patterns.
pub fn check_selectors(
    contexts: &mut [Context],
    capabilities: &Capabilities,
) -> Result<(), ConfigError> {
    for context in contexts.iter_mut() {
        let Some(selector) = context.selector.as_mut() else {
            continue;
        };
        if selector.variable.is_none() {
            tracing::warn!(
                variable = %selector.variable_name,
                line = context.line,
                "unknown condition variable, block will never apply"
            );
        }
        if !selector.operator.is_pattern() {
            continue;
        }
        if !capabilities.pattern_matching {
            return Err(ConfigError::CapabilityUnavailable {
                capability: Capability::PatternMatching,
                context: context.name.clone(),
            });
        }
        selector
            .compile()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: selector.pattern.clone(),
                line: context.line,
                source,
            })?;
    }
    Ok(())
}

/// Report keys that are neither in the schema nor registered as known.
///
/// In strict mode all of them are returned as one [`ConfigError::UnknownKeys`].
pub fn check_unknown_keys(
    contexts: &[Context],
    known_keys: &BTreeSet<String>,
    strict: bool,
) -> Result<(), ConfigError> {
    let mut errors = Vec::new();
    for context in contexts {
        for entry in &context.entries {
            if schema::field(&entry.key).is_some() || known_keys.contains(&entry.key) {
                continue;
            }
            if strict {
                errors.push(ConfigError::UnknownKey {
                    key: entry.key.clone(),
                    line: entry.line,
                });
            } else {
                tracing::debug!(
                    key = %entry.key,
                    line = entry.line,
                    context = %context.name,
                    "key not handled by the core schema"
                );
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::UnknownKeys(errors))
    }
}

/// Every block that enables TLS needs a certificate, either its own or the
/// global one, and the host must support TLS at all.
pub fn check_tls(nodes: &[ConfigNode], capabilities: &Capabilities) -> Result<(), ConfigError> {
    let global_pemfile = nodes
        .first()
        .and_then(|n| n.record.ssl_pemfile.as_deref())
        .unwrap_or("");
    for node in nodes {
        if node.record.is_ssl != Some(true) {
            continue;
        }
        if !capabilities.tls {
            return Err(ConfigError::CapabilityUnavailable {
                capability: Capability::Tls,
                context: node.context.name.clone(),
            });
        }
        let pemfile = node
            .record
            .ssl_pemfile
            .as_deref()
            .unwrap_or(global_pemfile);
        if pemfile.is_empty() {
            return Err(ConfigError::MissingPemFile {
                context: node.context.name.clone(),
            });
        }
    }
    Ok(())
}

/// Pick the event handler: the configured one if the host offers it,
/// otherwise the host's first choice.
pub fn select_event_handler(
    configured: Option<&str>,
    capabilities: &Capabilities,
) -> Result<EventHandler, ConfigError> {
    match configured {
        Some(name) => EventHandler::from_name(name)
            .filter(|h| capabilities.available_event_handlers().any(|a| a == *h))
            .ok_or_else(|| ConfigError::UnknownEventHandler(name.to_string())),
        None => capabilities
            .available_event_handlers()
            .next()
            .ok_or(ConfigError::NoEventHandler),
    }
}

/// Settle the server-wide settings from the global record.
pub fn server_config(
    global: &BoundRecord,
    capabilities: &Capabilities,
) -> Result<ServerConfig, ConfigError> {
    let event_handler = select_event_handler(global.event_handler.as_deref(), capabilities)?;
    let port = match global.port {
        Some(port) if port != 0 => port,
        _ if global.is_ssl == Some(true) => 443,
        _ => 80,
    };
    Ok(ServerConfig::new(global, port, event_handler))
}
