//! Rewind - terminal client for the Rewind media server
//!
//! # Usage
//!
//! ```bash
//! # Remember server and user
//! REWIND_PASSWORD=... rewind --server http://nas:4000 --user alice login
//!
//! # Browse and play
//! rewind libraries
//! rewind shows Movies
//! rewind play e01 --library movies --until-available --json
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rewind::cli::{Cli, Command, ExitCode, Output};
use rewind::commands::{self, Context};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    run_cli(cli).await.into()
}

/// Log to stderr so stdout stays parseable; RUST_LOG overrides the level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "rewind=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);
    let ctx = Context::from_cli(&cli);

    match cli.command {
        Command::Login(cmd) => commands::login_cmd(cmd, ctx, &output).await,
        Command::Libraries(cmd) => commands::libraries_cmd(cmd, ctx, &output).await,
        Command::Shows(cmd) => commands::shows_cmd(cmd, ctx, &output).await,
        Command::Seasons(cmd) => commands::seasons_cmd(cmd, ctx, &output).await,
        Command::Episodes(cmd) => commands::episodes_cmd(cmd, ctx, &output).await,
        Command::Progress(cmd) => commands::progress_cmd(cmd, ctx, &output).await,
        Command::Play(cmd) => commands::play_cmd(cmd, ctx, &output).await,
    }
}
