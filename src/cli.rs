//! CLI - Command Line Interface for Rewind
//!
//! Every command logs in first (the session cookie only lives as long as
//! the process), then drives the same view model a graphical client would.
//! All output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Browse the catalog
//! rewind --server http://nas:4000 --user alice libraries
//! rewind shows Movies
//! rewind seasons inception
//!
//! # Open a stream and keep it alive
//! rewind play e01 --library movies
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use reqwest::Url;
use std::fmt;
use std::io::IsTerminal;
use std::path::PathBuf;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network or server error
    NetworkError = 3,
    /// Login rejected
    LoginFailed = 4,
    /// Stream could not be created or was lost
    StreamUnavailable = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Rewind - terminal client for the Rewind media server
#[derive(Parser, Debug)]
#[command(
    name = "rewind",
    version,
    about = "Terminal client for the Rewind media server",
    long_about = "Browse a Rewind server's libraries, shows, seasons and episodes, \
                  and open HLS streams that resume where you left off.\n\n\
                  Credentials come from flags, REWIND_SERVER_URL / REWIND_USERNAME / \
                  REWIND_PASSWORD, or the config file.",
    after_help = "EXAMPLES:\n\
                  rewind -s http://nas:4000 -u alice login   Verify and remember login\n\
                  rewind libraries                           List libraries\n\
                  rewind shows Movies                        List shows of a library\n\
                  rewind play e01 --library movies           Stream an episode"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Rewind server URL
    #[arg(long, short = 's', global = true)]
    pub server: Option<String>,

    /// Username
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,

    /// Password (prefer REWIND_PASSWORD)
    #[arg(long, short = 'p', global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify credentials and remember server and user
    Login(LoginCmd),

    /// List libraries
    #[command(visible_alias = "libs")]
    Libraries(LibrariesCmd),

    /// List shows in a library
    Shows(ShowsCmd),

    /// List seasons of a show
    Seasons(SeasonsCmd),

    /// List episodes of a season
    #[command(visible_alias = "eps")]
    Episodes(EpisodesCmd),

    /// Show saved watch progress for an episode
    Progress(ProgressCmd),

    /// Open a stream for an episode and keep it alive
    Play(PlayCmd),
}

/// Verify credentials
#[derive(Args, Debug)]
pub struct LoginCmd {
    /// Do not write server and username to the config file
    #[arg(long)]
    pub no_save: bool,
}

/// List libraries
#[derive(Args, Debug)]
pub struct LibrariesCmd {
    /// Maximum number of results
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

/// List shows in a library
#[derive(Args, Debug)]
pub struct ShowsCmd {
    /// Library name
    #[arg(required = true)]
    pub library: String,

    /// Maximum number of results
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

/// List seasons of a show
#[derive(Args, Debug)]
pub struct SeasonsCmd {
    /// Show id
    #[arg(required = true)]
    pub show_id: String,
}

/// List episodes of a season
#[derive(Args, Debug)]
pub struct EpisodesCmd {
    /// Season id
    #[arg(required = true)]
    pub season_id: String,
}

/// Show saved progress
#[derive(Args, Debug)]
pub struct ProgressCmd {
    /// Episode id
    #[arg(required = true)]
    pub episode_id: String,
}

/// Open a stream for an episode
#[derive(Args, Debug)]
pub struct PlayCmd {
    /// Episode id
    #[arg(required = true)]
    pub episode_id: String,

    /// Library id the episode belongs to
    #[arg(long, short = 'L', required = true)]
    pub library: String,

    /// Episode title (display only)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Exit as soon as the stream is playable
    #[arg(long)]
    pub until_available: bool,

    /// Include the session Cookie header for an external player
    #[arg(long)]
    pub print_cookie: bool,
}

// =============================================================================
// Responses
// =============================================================================

/// Login success response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub status: String,
    pub server: String,
    pub username: String,
}

impl fmt::Display for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Logged in to {} as {}", self.server, self.username)
    }
}

/// Playable stream response
#[derive(Debug, Serialize, Deserialize)]
pub struct PlayResponse {
    pub status: String,
    pub episode_id: String,
    pub title: String,
    pub stream_id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

impl fmt::Display for PlayResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)?;
        if let Some(cookie) = &self.cookie {
            write!(f, "\nCookie: {}", cookie)?;
        }
        Ok(())
    }
}

/// Failure report written to stderr in JSON mode
#[derive(Debug, Serialize)]
pub struct ErrorReport<'a> {
    pub error: &'a str,
    pub exit_code: i32,
}

// =============================================================================
// Output
// =============================================================================

/// Results go to stdout, diagnostics to stderr
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print one record: a JSON line, or its Display form
    pub fn print<T: Serialize + fmt::Display>(&self, record: &T) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!("{}", record);
        }
        Ok(())
    }

    /// Print a catalog list: a JSON array, or one line per item
    pub fn print_list<T: Serialize + fmt::Display>(&self, items: &[T]) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(items)?);
            return Ok(());
        }
        for item in items {
            println!("{}", item);
        }
        Ok(())
    }

    /// Report a failure and hand back its exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let report = ErrorReport {
                error: &msg,
                exit_code: code.into(),
            };
            if let Ok(line) = serde_json::to_string(&report) {
                eprintln!("{}", line);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Progress message, plain mode only
    pub fn info(&self, msg: impl fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Server URL Validation
// =============================================================================

/// Validate server URL format (http or https scheme with a host)
pub fn validate_server_url(url: &str) -> Result<&str, &'static str> {
    let parsed = Url::parse(url).map_err(|_| "Invalid server URL")?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err("Invalid server URL (expected http:// or https://)");
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err("Invalid server URL (missing host)"),
    }
}

// =============================================================================
// Tests
// =============================================================================
