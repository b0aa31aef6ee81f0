mod render;

use clap::{Args, Parser, Subcommand};
use livechat::net::api::ApiClient;
use livechat::net::transport::{RunningSession, spawn_session};
use livechat::profile::{InterestsPanel, StatsPanel};
use livechat::{ClientConfig, ConfigError, SessionError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::render::{HELP, Input, parse_input, render_patch};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("stats client setup failed: {0}")]
    Api(#[from] livechat::net::api::ApiError),
    #[error("reading stdin failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Parser, Debug)]
#[command(name = "livechat", about = "Live chat session client")]
struct Cli {
    #[arg(long, env = "LIVECHAT_BASE_URL", default_value = livechat::config::DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "LIVECHAT_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "LIVECHAT_SESSION_COOKIE")]
    session_cookie: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join a room and chat from the terminal.
    Chat(ChatArgs),
    /// Show message and room statistics for a user.
    Stats(UserArgs),
    /// Show detected interests for a user.
    Interests(UserArgs),
}

#[derive(Args, Debug)]
struct ChatArgs {
    #[arg(long, env = "LIVECHAT_ROOM")]
    room: Option<String>,

    /// Navigation path to derive the room from, e.g. `/chat/lobby`. Applied after `--room`.
    #[arg(long)]
    path: Option<String>,
}

#[derive(Args, Debug)]
struct UserArgs {
    /// Defaults to the session username.
    username: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = client_config(&cli)?;

    match cli.command {
        Command::Chat(args) => run_chat(config, args).await,
        Command::Stats(args) => {
            let username = args.username.unwrap_or_else(|| config.username.clone());
            let client = ApiClient::new(&config)?;
            print!("{}", StatsPanel::from_result(client.fetch_user_stats(&username).await));
            Ok(())
        }
        Command::Interests(args) => {
            let username = args.username.unwrap_or_else(|| config.username.clone());
            let client = ApiClient::new(&config)?;
            print!("{}", InterestsPanel::from_result(client.fetch_user_stats(&username).await));
            Ok(())
        }
    }
}

/// Flags win over environment; remaining knobs come from `LIVECHAT_*`.
fn client_config(cli: &Cli) -> Result<ClientConfig, ConfigError> {
    ClientConfig::from_lookup(|key| match key {
        "LIVECHAT_BASE_URL" => Some(cli.base_url.clone()),
        "LIVECHAT_USERNAME" => cli.username.clone(),
        "LIVECHAT_SESSION_COOKIE" => cli.session_cookie.clone(),
        _ => std::env::var(key).ok(),
    })
}

async fn run_chat(mut config: ClientConfig, args: ChatArgs) -> Result<(), CliError> {
    config.room = args.room.or(config.room);
    tracing::info!(base_url = %config.base_url, username = %config.username, room = ?config.room, "starting chat session");
    let RunningSession { handle, mut patches, task } = spawn_session(config)?;
    if let Some(path) = args.path {
        handle.navigate(path);
    }

    let printer = tokio::spawn(async move {
        while let Some(patch) = patches.recv().await {
            if let Some(line) = render_patch(&patch) {
                println!("{line}");
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Input::Message(text) => {
                match handle.send_message(text).await {
                    Ok(()) => {}
                    Err(SessionError::NotConnected) => eprintln!("not connected; message not sent"),
                    Err(SessionError::NoActiveRoom) => eprintln!("join a room first: /join <room>"),
                    Err(SessionError::EmptyMessage) => {}
                }
            }
            Input::Join(room) => {
                handle.join_room(room);
            }
            Input::Leave => {
                handle.leave_room();
            }
            Input::Go(path) => {
                handle.navigate(path);
            }
            Input::Quit => break,
            Input::Help => eprintln!("{HELP}"),
            Input::Unknown(line) => eprintln!("unknown command `{line}`; {HELP}"),
            Input::Empty => {}
        }
    }

    handle.shutdown();
    task.await?;
    printer.await?;
    Ok(())
}
