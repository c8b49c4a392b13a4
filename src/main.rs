use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gorium::config::Paths;
use gorium::sync::SyncError;
use gorium::{App, Config};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gorium")]
#[command(
    author,
    version,
    about = "Keeps a Minecraft mods folder in sync with Modrinth"
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the newest compatible version of a project
    Add {
        /// Modrinth project id or slug
        id: String,
    },

    /// Replace outdated mods in the active profile's folder
    Upgrade,

    /// Search Modrinth and install selected results
    Search {
        query: String,
        /// Result numbers to install, e.g. "1 3" (prompted if omitted)
        #[arg(long)]
        select: Option<String>,
    },

    /// List recognised mods in the active profile's folder
    List,

    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// List profiles
    List,
    /// Create a profile and make it active
    Create {
        #[arg(long)]
        name: String,
        /// Mods folder to keep in sync
        #[arg(long)]
        folder: PathBuf,
        /// Game version, e.g. 1.20.1
        #[arg(long)]
        game_version: String,
        /// quilt, fabric, neoforge or forge
        #[arg(long)]
        loader: String,
    },
    /// Delete a profile
    Delete {
        name: String,
        /// Profile to activate if the deleted one was active
        #[arg(long)]
        switch_to: Option<String>,
    },
    /// Switch the active profile
    Switch { name: String },
}

fn setup_logging(verbosity: u8, log_file: &Path) -> Result<()> {
    let filter = match verbosity {
        0 => "gorium=warn",
        1 => "gorium=info",
        2 => "gorium=debug",
        _ => "trace",
    };

    if let Some(dir) = log_file.parent() {
        std::fs::create_dir_all(dir).ok();
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {:?}", log_file))?;

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::sync::Arc::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load().await?;
    let app = App::new(config).await?;

    match cli.command {
        Commands::Add { id } => app.cmd_add(&id).await?,
        Commands::Upgrade => app.cmd_upgrade().await?,
        Commands::Search { query, select } => app.cmd_search(&query, select.as_deref()).await?,
        Commands::List => app.cmd_list().await?,
        Commands::Profile { action } => match action {
            ProfileCommands::List => app.cmd_profile_list().await?,
            ProfileCommands::Create {
                name,
                folder,
                game_version,
                loader,
            } => {
                app.cmd_profile_create(&name, &folder, &game_version, &loader)
                    .await?
            }
            ProfileCommands::Delete { name, switch_to } => {
                app.cmd_profile_delete(&name, switch_to.as_deref()).await?
            }
            ProfileCommands::Switch { name } => app.cmd_profile_switch(&name).await?,
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, &Paths::new().log_file())?;

    match run(cli).await {
        Err(e) => match e.downcast_ref::<SyncError>() {
            // "no profile" and "no versions" are answers, not failures
            Some(sync) if sync.is_informational() => {
                println!("{}", sync);
                Ok(())
            }
            _ => Err(e),
        },
        ok => ok,
    }
}
