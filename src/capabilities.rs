//! Optional features of the host server, resolved once at startup.
//!
//! The set is a confique struct: compiled defaults, overridable through
//! `SRVCONF_*` environment variables and an optional TOML file. Validation
//! checks the configuration against it and fails the load with
//! [`ConfigError::CapabilityUnavailable`](crate::ConfigError::CapabilityUnavailable)
//! when a construct needs something the host cannot provide.

use std::fmt;
use std::path::Path;

use confique::Config;
use serde::Serialize;

use crate::error::ConfigError;

#[derive(Config, Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Regular-expression conditions (`=~`, `!~`) can be evaluated.
    #[config(env = "SRVCONF_PATTERN_MATCHING", default = true)]
    pub pattern_matching: bool,

    /// TLS listeners are supported.
    #[config(env = "SRVCONF_TLS", default = false)]
    pub tls: bool,

    /// Event handlers available on this system, preferred first.
    #[config(
        env = "SRVCONF_EVENT_HANDLERS",
        parse_env = confique::env::parse::list_by_comma,
        default = ["poll", "select"]
    )]
    pub event_handlers: Vec<String>,
}

impl Capabilities {
    /// Resolve the capability set from the environment and, when given, a
    /// TOML file. Environment variables take precedence over the file.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Self::builder().env();
        if let Some(path) = file {
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }

    /// Event handlers that are both listed and known, in preference order.
    pub fn available_event_handlers(&self) -> impl Iterator<Item = EventHandler> + '_ {
        self.event_handlers
            .iter()
            .filter_map(|name| EventHandler::from_name(name.trim()))
    }
}

/// I/O readiness mechanism the server loop runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventHandler {
    #[serde(rename = "poll")]
    Poll,
    #[serde(rename = "select")]
    Select,
    #[serde(rename = "linux-sysepoll")]
    LinuxSysepoll,
    #[serde(rename = "linux-rtsig")]
    LinuxRtsig,
    #[serde(rename = "solaris-devpoll")]
    SolarisDevpoll,
    #[serde(rename = "freebsd-kqueue")]
    FreebsdKqueue,
}

impl EventHandler {
    pub const ALL: [EventHandler; 6] = [
        EventHandler::Poll,
        EventHandler::Select,
        EventHandler::LinuxSysepoll,
        EventHandler::LinuxRtsig,
        EventHandler::SolarisDevpoll,
        EventHandler::FreebsdKqueue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventHandler::Poll => "poll",
            EventHandler::Select => "select",
            EventHandler::LinuxSysepoll => "linux-sysepoll",
            EventHandler::LinuxRtsig => "linux-rtsig",
            EventHandler::SolarisDevpoll => "solaris-devpoll",
            EventHandler::FreebsdKqueue => "freebsd-kqueue",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.name() == name)
    }
}

impl fmt::Display for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capabilities.toml");
        fs::write(
            &path,
            "tls = true\nevent_handlers = [\"linux-sysepoll\", \"poll\"]\n",
        )
        .unwrap();

        let caps = Capabilities::load(Some(&path)).unwrap();
        assert!(caps.tls);
        assert_eq!(
            caps.available_event_handlers().collect::<Vec<_>>(),
            vec![EventHandler::LinuxSysepoll, EventHandler::Poll]
        );
    }

    #[test]
    fn malformed_file_is_capabilities_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capabilities.toml");
        fs::write(&path, "tls = \"sometimes\"\n").unwrap();

        let err = Capabilities::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Capabilities(_)));
    }

    #[test]
    fn unknown_handlers_are_skipped() {
        let caps = Capabilities {
            pattern_matching: true,
            tls: false,
            event_handlers: vec!["epoll9".into(), " select ".into()],
        };
        assert_eq!(
            caps.available_event_handlers().collect::<Vec<_>>(),
            vec![EventHandler::Select]
        );
    }

    #[test]
    fn handler_names_round_trip() {
        for h in EventHandler::ALL {
            assert_eq!(EventHandler::from_name(h.name()), Some(h));
        }
        assert_eq!(EventHandler::from_name("kqueue"), None);
    }
}
