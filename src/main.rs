//! chatroom - terminal client for a Socket.IO chat room
//!
//! Live message feed, online roster, and file/image attachments with a
//! preview step, in the terminal.

mod api;
mod config;
mod console;
mod models;
mod realtime;
mod tui;
mod view;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;

#[derive(Parser)]
#[command(name = "chatroom")]
#[command(about = "Terminal client for a Socket.IO chat room", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Chat server URL (overrides the config file)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Username to chat as (overrides the config file)
    #[arg(long, global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the terminal user interface (default)
    Tui,

    /// Print room events to stdout until Ctrl+C
    Listen,

    /// Send one message and exit
    Send {
        /// Message content
        text: String,
    },

    /// Upload a file to the room
    Upload {
        /// File to send
        path: PathBuf,
    },

    /// Show or change persisted settings (with --server/--user to set those)
    Config {
        /// Upload endpoint path, relative to the server URL
        #[arg(long)]
        upload_path: Option<String>,

        /// Session cookie header value for the server
        #[arg(long)]
        cookie: Option<String>,

        /// Where downloaded files are saved
        #[arg(long)]
        download_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    // The TUI owns the terminal: route logs into the in-app log pane.
    let logs = tui::LogBuffer::new();
    if matches!(command, Commands::Tui) {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(logs.clone()),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    if let Commands::Config {
        upload_path,
        cookie,
        download_dir,
    } = command
    {
        return update_config(cli.server, cli.user, upload_path, cookie, download_dir);
    }

    let config = Config::load()?.with_overrides(cli.server, cli.user);

    match command {
        Commands::Tui => {
            tui::run(&config, logs).await?;
        }
        Commands::Listen => {
            console::listen(&config).await?;
        }
        Commands::Send { text } => {
            if text.trim().is_empty() {
                anyhow::bail!("Refusing to send an empty message");
            }
            tracing::info!("Sending message...");
            realtime::send_once(&config.server_url, config.session_cookie.as_deref(), &text)
                .await
                .context("Failed to send message")?;
            println!("Sent.");
        }
        Commands::Upload { path } => {
            api::upload_file(&config, &path).await?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Persist the given settings, or print the current ones when none are given.
fn update_config(
    server: Option<String>,
    user: Option<String>,
    upload_path: Option<String>,
    cookie: Option<String>,
    download_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = Config::load()?;
    let changed = server.is_some()
        || user.is_some()
        || upload_path.is_some()
        || cookie.is_some()
        || download_dir.is_some();

    if !changed {
        println!("Config file: {}", Config::config_path()?.display());
        println!("  server_url:   {}", config.server_url);
        println!(
            "  username:     {}",
            config.username.as_deref().unwrap_or("(not set)")
        );
        println!("  upload_path:  {}", config.upload_path);
        println!(
            "  cookie:       {}",
            if config.session_cookie.is_some() { "(set)" } else { "(not set)" }
        );
        println!("  download_dir: {}", config.download_dir().display());
        return Ok(());
    }

    config = config.with_overrides(server, user);
    if let Some(path) = upload_path {
        config.upload_path = path;
    }
    if let Some(cookie) = cookie {
        config.session_cookie = Some(cookie).filter(|c| !c.is_empty());
    }
    if let Some(dir) = download_dir {
        config.download_dir = Some(dir);
    }
    config.save()?;

    println!("Saved {}", Config::config_path()?.display());
    Ok(())
}
