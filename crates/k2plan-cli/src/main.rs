use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "k2plan",
    about = "k2plan — place K2 cluster components and resolve their command lines",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the reference ten-host inventory
    Init {
        /// Inventory file to create
        #[arg(short, long, default_value = "inventory.toml")]
        inventory: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Place runnables from a request file, in order.
    ///
    /// Each successful bind prints the runnable's host and final command
    /// line. A rejected request is reported and the session moves on to
    /// the next one. The table is saved when all requests are processed.
    Add {
        #[command(flatten)]
        session: SessionArgs,
        /// TOML file with a [[runnables]] array
        #[arg(short, long)]
        requests: PathBuf,
    },
    /// Remove a bound runnable by name
    Remove {
        #[command(flatten)]
        session: SessionArgs,
        /// Name of the runnable to remove
        #[arg(short, long)]
        name: String,
    },
    /// Show the assignment table
    Show {
        #[command(flatten)]
        session: SessionArgs,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

/// Inputs every planning session needs.
#[derive(clap::Args)]
pub struct SessionArgs {
    /// Host inventory (TOML)
    #[arg(short, long, default_value = "inventory.toml")]
    inventory: PathBuf,
    /// Assignment snapshot, created on first save
    #[arg(short, long, default_value = "k2plan.redb")]
    state: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { inventory, force } => commands::init::init(&inventory, force),
        Commands::Add { session, requests } => commands::plan::add(&session, &requests),
        Commands::Remove { session, name } => commands::plan::remove(&session, &name),
        Commands::Show { session, format } => commands::show::show(&session, &format),
    }
}
