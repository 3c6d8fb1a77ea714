use std::process::ExitCode;

use clap::Parser;
use srvconf::{Cli, ConfigError, ConfigLoader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "srvconf=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut loader = ConfigLoader::new().strict(cli.strict);
    if let Some(path) = &cli.config {
        loader = loader.path(path);
    }

    match loader.handle_and_print(&cli.into_action()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "rich-errors")]
fn report(err: ConfigError) {
    eprintln!("{:?}", miette::Report::new(err));
}

#[cfg(not(feature = "rich-errors"))]
fn report(err: ConfigError) {
    eprintln!("srvconf: {err}");
}
