mod config;
mod folder_cmd;
mod status_cmd;
mod upload_cmd;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use richdoc_core::DocumentStore;
use richdoc_gateway::{start_server, GatewayState};
use richdoc_plugins::{ClientApiRegistry, ImageStorageClientApi};
use richdoc_storage::{open_store, IN_MEMORY_PATH};

use config::Config;

#[derive(Parser)]
#[command(name = "richdoc")]
#[command(about = "Image storage service for rich-text editor uploads")]
#[command(version)]
struct Cli {
    /// YAML config file (defaults to $RICHDOC_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Store a local image the way the editor would
    Upload {
        /// Image file to upload
        file: PathBuf,
        /// Destination folder id
        #[arg(short, long)]
        folder: i64,
    },
    /// Manage document folders
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },
    /// Show a running gateway's health
    Status,
}

#[derive(Subcommand)]
enum FolderCommands {
    /// Create a folder
    Create {
        name: String,
        /// Parent folder id
        #[arg(long)]
        parent: Option<i64>,
    },
    /// List folders
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    richdoc_logging::init_logger(config.log_dir.as_ref(), &config.log_level);

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Upload { file, folder } => {
            let store = open_configured_store(&config)?;
            upload_cmd::run(store, config.upload_options(), &file, folder).await?;
        }
        Commands::Folder { command } => {
            let store = open_configured_store(&config)?;
            match command {
                FolderCommands::Create { name, parent } => {
                    folder_cmd::create(store, &name, parent).await?
                }
                FolderCommands::List => folder_cmd::list(store).await?,
            }
        }
        Commands::Status => status_cmd::run(&config).await?,
    }

    Ok(())
}

fn open_configured_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    if config.db_path != IN_MEMORY_PATH {
        if let Some(dir) = Path::new(&config.db_path).parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }
    open_store(&config.db_path).with_context(|| format!("Failed to open document store {}", config.db_path))
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        db = %config.db_path,
        "Starting richdoc gateway"
    );

    let store = open_configured_store(&config)?;

    let mut registry = ClientApiRegistry::new();
    registry.register(Arc::new(ImageStorageClientApi::new(
        store.clone(),
        config.upload_options(),
    )))?;

    let state = GatewayState::new(registry, store);
    start_server(config.socket_addr()?, state, config.max_body_bytes).await
}
