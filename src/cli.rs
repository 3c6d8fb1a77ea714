//! Clap adapter for the `srvconf` binary.
//!
//! Compiled only with the `clap` feature (on by default). The only bridge to
//! the core is [`Cli::into_action()`], which turns parsed arguments into a
//! framework-agnostic [`ConfigAction`]; everything after that goes through
//! [`ConfigLoader::handle()`](crate::ConfigLoader::handle).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::condition::RequestInfo;
use crate::ops::ConfigAction;

/// Check, print and resolve server configuration files.
#[derive(Debug, Parser)]
#[command(name = "srvconf", version)]
pub struct Cli {
    /// Configuration file. Searched for as `srvconf.conf` when omitted.
    #[arg(short = 'f', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Reject keys outside the core schema.
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load and validate the file.
    Check,
    /// Print the parsed blocks in configuration syntax.
    Print,
    /// Show the settings in effect for a request.
    Resolve(RequestArgs),
}

/// Attributes of the request to resolve for. Omitted attributes are empty.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Listening socket, e.g. ":443".
    #[arg(long)]
    pub socket: Option<String>,
    /// Host / authority.
    #[arg(long)]
    pub host: Option<String>,
    /// Request path.
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub referer: Option<String>,
    #[arg(long)]
    pub cookie: Option<String>,
    #[arg(long = "user-agent")]
    pub user_agent: Option<String>,
    /// Print JSON instead of `key = value` lines.
    #[arg(long)]
    pub json: bool,
}

impl RequestArgs {
    fn into_request(self) -> (RequestInfo, bool) {
        let mut request = RequestInfo::new()
            .with_server_socket(self.socket.unwrap_or_default())
            .with_authority(self.host.unwrap_or_default())
            .with_path(self.url.unwrap_or_default());
        for (name, value) in [
            ("Referer", self.referer),
            ("Cookie", self.cookie),
            ("User-Agent", self.user_agent),
        ] {
            if let Some(value) = value {
                request = request.with_header(name, value);
            }
        }
        (request, self.json)
    }
}

impl Cli {
    /// Convert parsed args into a `ConfigAction`. No subcommand means `check`.
    pub fn into_action(self) -> ConfigAction {
        match self.command {
            None | Some(Command::Check) => ConfigAction::Check,
            Some(Command::Print) => ConfigAction::Print,
            Some(Command::Resolve(args)) => {
                let (request, json) = args.into_request();
                ConfigAction::Resolve { request, json }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Connection;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn bare_invocation_is_check() {
        let cli = parse(&["srvconf"]);
        assert!(cli.config.is_none());
        assert_eq!(cli.into_action(), ConfigAction::Check);
    }

    #[test]
    fn config_flag_before_and_after_subcommand() {
        let cli = parse(&["srvconf", "-f", "/etc/web.conf", "print"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/web.conf")));
        assert_eq!(cli.into_action(), ConfigAction::Print);

        let cli = parse(&["srvconf", "check", "--config", "a.conf"]);
        assert_eq!(cli.config, Some(PathBuf::from("a.conf")));
    }

    #[test]
    fn resolve_builds_request() {
        let cli = parse(&[
            "srvconf",
            "resolve",
            "--host",
            "example.com",
            "--url",
            "/index.html",
            "--user-agent",
            "curl/8.0",
            "--json",
        ]);
        let ConfigAction::Resolve { request, json } = cli.into_action() else {
            panic!("expected resolve");
        };
        assert!(json);
        assert_eq!(Connection::authority(&request), "example.com");
        assert_eq!(Connection::path(&request), "/index.html");
        assert_eq!(Connection::header(&request, "user-agent"), Some("curl/8.0"));
        assert_eq!(Connection::header(&request, "Referer"), None);
        assert_eq!(Connection::server_socket(&request), "");
    }

    #[test]
    fn strict_flag() {
        assert!(parse(&["srvconf", "--strict", "check"]).strict);
        assert!(!parse(&["srvconf", "check"]).strict);
    }

    #[test]
    fn invalid_subcommand_errors() {
        assert!(Cli::try_parse_from(["srvconf", "nope"]).is_err());
    }
}
