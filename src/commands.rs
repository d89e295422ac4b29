//! CLI Command Handlers
//!
//! Each handler logs in, drives the view model and prints the result.
//! Handlers take CLI args and Output, and return an ExitCode.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::api::{MediaApi, RewindClient};
use crate::app::{App, AppError, BrowserState, LoginState, Resource, ViewState};
use crate::cli::{
    validate_server_url, Cli, EpisodesCmd, ExitCode, LibrariesCmd, LoginCmd, LoginResponse,
    Output, PlayCmd, PlayResponse, ProgressCmd, SeasonsCmd, ShowsCmd,
};
use crate::config::Config;
use crate::models::{EpisodeInfo, Library, LoginRequest};
use crate::stream::StreamState;

// =============================================================================
// Connection
// =============================================================================

/// Settings resolved from flags, environment and config file
pub struct Context {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub server: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        let config = match &cli.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        };
        Self {
            config,
            config_path: cli.config.clone(),
            server: cli.server.clone(),
            user: cli.user.clone(),
            password: cli.password.clone(),
        }
    }

    fn save_config(&self) -> anyhow::Result<()> {
        match &self.config_path {
            Some(path) => self.config.save_to(path),
            None => self.config.save(),
        }
    }
}

/// A logged-in view model plus the identity it logged in with
struct Connection {
    app: App<RewindClient>,
    server: String,
    username: String,
}

/// Build a client and log in, mapping every failure to an exit code
async fn connect(ctx: &Context, output: &Output) -> Result<Connection, ExitCode> {
    let server = ctx.config.server_url(ctx.server.as_deref()).ok_or_else(|| {
        output.error(
            "No server URL (use --server, REWIND_SERVER_URL or the config file)",
            ExitCode::InvalidArgs,
        )
    })?;
    validate_server_url(&server).map_err(|e| output.error(e, ExitCode::InvalidArgs))?;

    let username = ctx.config.username(ctx.user.as_deref()).ok_or_else(|| {
        output.error(
            "No username (use --user, REWIND_USERNAME or the config file)",
            ExitCode::InvalidArgs,
        )
    })?;
    let password = Config::password(ctx.password.as_deref()).ok_or_else(|| {
        output.error(
            "No password (use --password or REWIND_PASSWORD)",
            ExitCode::InvalidArgs,
        )
    })?;

    let client = RewindClient::with_timeout(&server, ctx.config.request_timeout())
        .map_err(|e| output.error(e.to_string(), ExitCode::InvalidArgs))?;
    let app = App::with_policy(Arc::new(client), ctx.config.poll_policy());

    output.info(format!("Logging in to {} as {}...", server, username));
    join(app.login(LoginRequest::new(&username, password)), output).await?;

    match app.login_state() {
        LoginState::LoggedIn => Ok(Connection {
            app,
            server,
            username,
        }),
        _ => Err(output.error(
            format!("Login to {} failed", server),
            ExitCode::LoginFailed,
        )),
    }
}

async fn join(handle: JoinHandle<()>, output: &Output) -> Result<(), ExitCode> {
    handle
        .await
        .map_err(|e| output.error(format!("Background task failed: {}", e), ExitCode::Error))
}

/// Wait for a load and report it if it failed
async fn finish_load(
    app: &App<RewindClient>,
    handle: Option<JoinHandle<()>>,
    resource: Resource,
    output: &Output,
) -> Result<(), ExitCode> {
    if let Some(handle) = handle {
        join(handle, output).await?;
    }
    match app.last_error() {
        Some(AppError::LoadFailed {
            resource: failed,
            reason,
        }) if failed == resource => Err(output.error(
            format!("Failed to load {}: {}", failed, reason),
            ExitCode::NetworkError,
        )),
        _ => Ok(()),
    }
}

fn print_or_fail<T: serde::Serialize + std::fmt::Display>(items: &[T], output: &Output) -> ExitCode {
    match output.print_list(items) {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}

// =============================================================================
// Login Command
// =============================================================================

pub async fn login_cmd(cmd: LoginCmd, mut ctx: Context, output: &Output) -> ExitCode {
    let conn = match connect(&ctx, output).await {
        Ok(conn) => conn,
        Err(code) => return code,
    };

    if !cmd.no_save {
        ctx.config.remember_login(&conn.server, &conn.username);
        if let Err(e) = ctx.save_config() {
            return output.error(format!("Failed to save config: {}", e), ExitCode::Error);
        }
    }

    let response = LoginResponse {
        status: "ok".into(),
        server: conn.server,
        username: conn.username,
    };
    match output.print(&response) {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}

// =============================================================================
// Catalog Commands
// =============================================================================

pub async fn libraries_cmd(cmd: LibrariesCmd, ctx: Context, output: &Output) -> ExitCode {
    let conn = match connect(&ctx, output).await {
        Ok(conn) => conn,
        Err(code) => return code,
    };
    let app = &conn.app;

    // Login leaves the browser on Home with its list loaded
    if let Err(code) = finish_load(app, None, Resource::Libraries, output).await {
        return code;
    }

    let mut libraries = app.libraries();
    if let Some(limit) = cmd.limit {
        libraries.truncate(limit);
    }
    print_or_fail(&libraries, output)
}

pub async fn shows_cmd(cmd: ShowsCmd, ctx: Context, output: &Output) -> ExitCode {
    let conn = match connect(&ctx, output).await {
        Ok(conn) => conn,
        Err(code) => return code,
    };
    let app = &conn.app;

    let resource = Resource::Shows(cmd.library.clone());
    app.clear_error();
    let handle = app.set_browser_state(BrowserState::Library(Library::new(cmd.library)));
    if let Err(code) = finish_load(app, handle, resource, output).await {
        return code;
    }

    let mut shows = app.shows();
    if let Some(limit) = cmd.limit {
        shows.truncate(limit);
    }
    print_or_fail(&shows, output)
}

pub async fn seasons_cmd(cmd: SeasonsCmd, ctx: Context, output: &Output) -> ExitCode {
    let conn = match connect(&ctx, output).await {
        Ok(conn) => conn,
        Err(code) => return code,
    };
    let app = &conn.app;

    let resource = Resource::Seasons(cmd.show_id.clone());
    app.clear_error();
    let handle = app.load_seasons(cmd.show_id);
    if let Err(code) = finish_load(app, Some(handle), resource, output).await {
        return code;
    }
    print_or_fail(&app.seasons(), output)
}

pub async fn episodes_cmd(cmd: EpisodesCmd, ctx: Context, output: &Output) -> ExitCode {
    let conn = match connect(&ctx, output).await {
        Ok(conn) => conn,
        Err(code) => return code,
    };
    let app = &conn.app;

    let resource = Resource::Episodes(cmd.season_id.clone());
    app.clear_error();
    let handle = app.load_episodes(cmd.season_id);
    if let Err(code) = finish_load(app, Some(handle), resource, output).await {
        return code;
    }
    print_or_fail(&app.episodes(), output)
}

// =============================================================================
// Progress Command
// =============================================================================

pub async fn progress_cmd(cmd: ProgressCmd, ctx: Context, output: &Output) -> ExitCode {
    let conn = match connect(&ctx, output).await {
        Ok(conn) => conn,
        Err(code) => return code,
    };

    match conn.app.api().get_user_progress(&cmd.episode_id).await {
        Ok(progress) => match output.print(&progress) {
            Ok(()) => ExitCode::Success,
            Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
        },
        Err(e) => output.error(
            format!("Failed to get progress for {}: {}", cmd.episode_id, e),
            ExitCode::NetworkError,
        ),
    }
}

// =============================================================================
// Play Command
// =============================================================================

pub async fn play_cmd(cmd: PlayCmd, ctx: Context, output: &Output) -> ExitCode {
    let conn = match connect(&ctx, output).await {
        Ok(conn) => conn,
        Err(code) => return code,
    };
    let app = &conn.app;

    let title = cmd.title.clone().unwrap_or_else(|| cmd.episode_id.clone());
    let episode = EpisodeInfo::new(&cmd.episode_id, title, &cmd.library);

    let mut states = app.subscribe_stream_state();
    app.set_view_state(ViewState::EpisodePlayer(episode.clone()));
    output.info(format!("Opening stream for {}...", episode));

    let mut last: Option<StreamState> = None;
    let mut announced = false;
    loop {
        let state = states.borrow_and_update().clone();
        if last.as_ref() != Some(&state) {
            output.info(format!("Stream {}", state));
            last = Some(state.clone());
        }

        match state {
            StreamState::Available if !announced => {
                announced = true;
                if let Err(e) = announce(app, &episode, cmd.print_cookie, output) {
                    return output.error(format!("Failed to print stream: {}", e), ExitCode::Error);
                }
                if cmd.until_available {
                    return ExitCode::Success;
                }
                output.info("Keeping stream alive, press Ctrl-C to stop");
            }
            ended if ended.is_terminal() => return closed(&ended, announced, output),
            _ => {}
        }

        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    return ExitCode::Error;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                output.info("Interrupted, closing stream");
                app.logout();
                return ExitCode::Success;
            }
        }
    }
}

/// Exit code for a session that ended on its own
fn closed(state: &StreamState, announced: bool, output: &Output) -> ExitCode {
    match state {
        StreamState::Unavailable(reason) => output.error(
            format!("Stream unavailable: {}", reason),
            ExitCode::StreamUnavailable,
        ),
        _ if announced => {
            output.info("Stream closed by server");
            ExitCode::Success
        }
        _ => output.error(
            "Stream canceled before it became available",
            ExitCode::StreamUnavailable,
        ),
    }
}

/// Print the playable URL of the current stream
fn announce(
    app: &App<RewindClient>,
    episode: &EpisodeInfo,
    print_cookie: bool,
    output: &Output,
) -> anyhow::Result<()> {
    let props = app
        .stream_props()
        .ok_or_else(|| anyhow::anyhow!("stream is available but has no props"))?;
    let url = app.api().playable_url(&props)?;
    let cookie = if print_cookie {
        app.api().cookie_header(&url)
    } else {
        None
    };

    output.print(&PlayResponse {
        status: "available".into(),
        episode_id: episode.id.clone(),
        title: episode.title.clone(),
        stream_id: props.id,
        url: url.to_string(),
        cookie,
    })
}
