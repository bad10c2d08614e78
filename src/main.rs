// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, parse arguments, hand over to `app`.
// - Credentials usually live in a `.env` file next to the media.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelpost::{app, cli::Cli};

fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    app::run(cli)
}

/// Logs go to stderr so they never mix with the summary on stdout.
/// `RUST_LOG` wins over the default level; `LOG_FORMAT=json` switches to
/// JSON lines.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "reelpost=debug" } else { "reelpost=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    }
}
