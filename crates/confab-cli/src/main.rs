//! # confab
//!
//! Terminal client for confab chat rooms.
//!
//! ## Usage
//!
//! ```bash
//! # Join a room with the configured handle
//! confab lobby
//!
//! # Join with an explicit handle
//! confab lobby ada
//!
//! # Run with custom config
//! confab --config /path/to/confab.toml lobby
//!
//! # Run with environment variables
//! CONFAB_ORIGIN=https://chat.example.com confab lobby
//! ```
//!
//! Lines typed at the prompt are sent as chat messages. Slash commands:
//! `/peers` requests a roster refresh, `/typing` signals that you are
//! typing, `/dispose` asks the server to dispose the room, `/quit` logs out.

mod config;
mod ui;

use anyhow::{bail, Context, Result};
use confab_core::{EndReason, Session, SessionHandle};
use confab_transport::{room_url, WebSocketConnector};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Args {
    room: String,
    handle: Option<String>,
    config_path: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut room = None;
    let mut handle = None;
    let mut config_path = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(args.next().context("--config requires a path")?);
            }
            "--help" | "-h" => {
                bail!("Usage: confab [--config <path>] <room> [handle]");
            }
            _ if room.is_none() => room = Some(arg),
            _ if handle.is_none() => handle = Some(arg),
            _ => bail!("Unexpected argument: {arg}"),
        }
    }

    Ok(Args {
        room: room.context("Usage: confab [--config <path>] <room> [handle]")?,
        handle,
        config_path,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confab=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;

    // Load configuration
    let config = match &args.config_path {
        Some(path) => config::Config::from_file(path)?,
        None => config::Config::load()?,
    };

    let handle = args.handle.or_else(|| config.handle.clone());
    let url = room_url(&config.origin, &args.room, handle.as_deref())
        .context("Failed to build room URL")?;

    tracing::info!(room = %args.room, origin = %config.origin, "Joining room");

    let connector = WebSocketConnector::default();
    let (mut session, commands) = Session::new(Box::new(connector), config.session_config());
    ui::attach(&mut session);

    let input = tokio::spawn(read_input(commands));
    let end = session.run(&url).await;
    input.abort();

    match end.reason {
        EndReason::LoggedOut => println!("* logged out"),
        EndReason::ConnectionClosed => println!("* connection closed"),
        EndReason::RoomDisposed => println!("* the room has been disposed"),
        EndReason::RoomFull => println!("* the room is full"),
        EndReason::RateLimited => println!("* disconnected for flooding"),
    }

    Ok(())
}

/// Read stdin line by line and translate lines into session commands.
///
/// Ends on `/quit` or stdin EOF, both of which log the session out.
async fn read_input(commands: SessionHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        let alive = match line {
            "" => continue,
            "/quit" => {
                commands.logout().await;
                return;
            }
            "/peers" => commands.request_peers().await,
            "/typing" => commands.typing().await,
            "/dispose" => commands.dispose_room().await,
            _ if line.starts_with('/') => {
                eprintln!("Unknown command: {line}");
                continue;
            }
            _ => commands.send_chat(line).await,
        };

        if !alive {
            return;
        }
    }

    commands.logout().await;
}
