#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::cast_precision_loss
)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use remote_fs::config::Config;
use remote_fs::connection::ConnectionManager;
use remote_fs::logging::init_logging;
use remote_fs::FileEntry;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Helper function to ensure config has password, prompting if needed
fn ensure_password(config: &mut Config) -> Result<()> {
    if config.password.is_none() && !config.username.is_empty() {
        let prompt = format!("Password for {}: ", config.username);
        config.password = Some(rpassword::prompt_password(prompt)?);
    }
    Ok(())
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Remote(RemoteCommand),

    /// Configure credentials and connection settings
    Config {
        /// Username (empty for anonymous access)
        #[arg(long)]
        username: Option<String>,

        /// Password (will prompt if not provided)
        #[arg(long)]
        password: Option<String>,

        /// Maximum concurrent connections per protocol
        #[arg(long)]
        connection_limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum RemoteCommand {
    /// List the files (or subdirectories) of a remote directory
    Ls {
        /// Directory address, e.g. ftp://host/pub/ or https://host/dav/
        address: String,

        /// List subdirectories instead of files
        #[arg(short, long)]
        dirs: bool,
    },

    /// Create a remote directory
    Mkdir { address: String },

    /// Remove a remote directory
    Rmdir { address: String },

    /// Delete a remote file
    Rm { address: String },

    /// Rename a remote file (RNTO path for FTP, Destination URL for WebDAV)
    Mv { source: String, dest: String },

    /// Download a remote file
    Get {
        address: String,

        /// Local file to write (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a local file
    Put { local: PathBuf, address: String },

    /// Check whether a remote file or directory exists
    Exists {
        address: String,

        /// Look for a directory instead of a file
        #[arg(short, long)]
        dir: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Config {
            username,
            password,
            connection_limit,
        } => {
            let mut config = Config::load()?;
            if let Some(username) = username {
                config.username = username;
            }
            if let Some(password) = password {
                config.password = Some(password);
            }
            if let Some(limit) = connection_limit {
                config.connection_limit = limit;
            }
            config.configured = true;
            config.save()?;
            println!("Configuration saved to {:?}", Config::config_path());
        }
        Commands::Remote(command) => {
            let mut config = Config::load()?;
            if !config.is_configured() {
                info!("no saved credentials, connecting anonymously");
            }
            ensure_password(&mut config)?;
            let mut conn_mgr = ConnectionManager::new(config);
            run(&mut conn_mgr, command).await?;
        }
    }

    Ok(())
}

async fn run(conn_mgr: &mut ConnectionManager, command: RemoteCommand) -> Result<()> {
    match command {
        RemoteCommand::Ls { address, dirs } => {
            let client = conn_mgr.client_for(&address)?;
            let entries = if dirs {
                client.list_directories(&address).await?
            } else {
                client.list_files(&address).await?
            };
            print_listing(&address, &entries);
        }
        RemoteCommand::Mkdir { address } => {
            conn_mgr.client_for(&address)?.create_directory(&address).await?;
            println!("Created {}", address);
        }
        RemoteCommand::Rmdir { address } => {
            conn_mgr.client_for(&address)?.delete_directory(&address).await?;
            println!("Removed {}", address);
        }
        RemoteCommand::Rm { address } => {
            conn_mgr.client_for(&address)?.delete_file(&address).await?;
            println!("Deleted {}", address);
        }
        RemoteCommand::Mv { source, dest } => {
            conn_mgr.client_for(&source)?.move_file(&source, &dest).await?;
            println!("Moved {} to {}", source, dest);
        }
        RemoteCommand::Get { address, output } => {
            let content = conn_mgr.client_for(&address)?.open_read(&address).await?;
            let data = content.into_inner();
            match output {
                Some(path) => {
                    std::fs::write(&path, &data)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Downloaded {} bytes to {:?}", data.len(), path);
                }
                None => std::io::stdout().write_all(&data)?,
            }
        }
        RemoteCommand::Put { local, address } => {
            let mut file = std::fs::File::open(&local)
                .with_context(|| format!("opening {}", local.display()))?;
            conn_mgr
                .client_for(&address)?
                .open_write(&address, &mut file)
                .await?;
            println!("Uploaded {:?} to {}", local, address);
        }
        RemoteCommand::Exists { address, dir } => {
            let client = conn_mgr.client_for(&address)?;
            let exists = if dir {
                client.directory_exists(&address).await?
            } else {
                client.file_exists(&address).await?
            };
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_listing(address: &str, entries: &[FileEntry]) {
    println!("Entries in {}:", address);
    println!("{:<50} {:>10} {:>20}", "Name", "Size", "Modified");
    println!("{}", "-".repeat(82));

    for entry in entries {
        let size_str = if entry.is_dir() {
            "DIR".to_string()
        } else {
            human_bytes::human_bytes(entry.size() as f64)
        };
        let modified = entry
            .modified()
            .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("{:<50} {:>10} {:>20}", entry.name(), size_str, modified);
    }
}
