use std::path::PathBuf;

use axum::extract::FromRef;
use clap::{Parser, Subcommand};
use tracing::Level;

mod auth;
mod commands;
mod config;
mod controllers;
mod error;
mod id;
mod index;
mod render;
mod storage;
mod types;

pub(crate) use error::ApiResult;

use crate::auth::AccessGuard;
use crate::config::Config;
use crate::render::Renderer;
use crate::storage::FileStorage;

#[derive(Parser)]
#[command(version, about = "A single-operator pastebin")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server.
    Serve,
    /// Upload a file, or standard input, to the configured server.
    Upload { file: Option<PathBuf> },
    /// Print the CSS for highlighted pastes.
    Stylesheet {
        #[arg(short, long, default_value = "InspiredGitHub")]
        theme: String,
    },
}

/// State shared by every request handler.
#[derive(Clone, FromRef)]
pub struct App {
    config: Config,
    guard: AccessGuard,
    storage: FileStorage,
    renderer: Renderer,
}

impl App {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let storage = FileStorage::new(&config.storage.dir).await?;
        let guard = AccessGuard::from_config(&config);
        let renderer = Renderer::new(config.highlight.default_syntax.as_deref());

        Ok(App {
            config,
            guard,
            storage,
            renderer,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // try to load .env, ignoring any errors
    _ = dotenvy::dotenv();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    match cli.command {
        Command::Stylesheet { theme } => commands::stylesheet::run(&theme),
        Command::Serve => {
            let config = Config::load(&cli.config)?;
            let app = App::new(config).await?;
            commands::serve::run(app).await
        }
        Command::Upload { file } => {
            let config = Config::load(&cli.config)?;
            commands::upload::run(&config, file.as_deref()).await
        }
    }
}
