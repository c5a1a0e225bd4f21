//! Tessera: project and content-block registry CLI.
//!
//! # Usage
//!
//! ```text
//! tessera [--as <identity>] init [--owner <identity>]
//! tessera project register <name> --domain <domain> [--description <text>]
//! tessera project activate|deactivate <id>
//! tessera project show <id> [--json]
//! tessera project list [--creator <identity>] [--json]
//! tessera block add <project-id> <label> --uri <uri> --tag <tag>
//! tessera block activate|deactivate <id>
//! tessera block list [--project <id> | --creator <identity>] [--json]
//! tessera owner show|transfer <identity>
//! tessera journal list [--json] | verify
//! ```
//!
//! The caller identity comes from `--as` or `$TESSERA_IDENTITY`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    block::BlockCommand, init::InitArgs, journal::JournalCommand, owner::OwnerCommand,
    project::ProjectCommand,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tessera",
    version,
    about = "Register projects and attach tagged content blocks to them",
    long_about = None,
)]
struct Cli {
    /// Identity to act as. Required for every mutating command.
    #[arg(long = "as", global = true, env = "TESSERA_IDENTITY", value_name = "IDENTITY")]
    identity: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty registry owned by the caller (or --owner).
    Init(InitArgs),

    /// Register, toggle and list projects.
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Attach, toggle and list content blocks.
    Block {
        #[command(subcommand)]
        command: BlockCommand,
    },

    /// Inspect or transfer the registry owner role.
    Owner {
        #[command(subcommand)]
        command: OwnerCommand,
    },

    /// Inspect and verify the append-only notification journal.
    Journal {
        #[command(subcommand)]
        command: JournalCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let identity = cli.identity;
    match cli.command {
        Commands::Init(args) => args.run(identity),
        Commands::Project { command } => commands::project::run(command, identity),
        Commands::Block { command } => commands::block::run(command, identity),
        Commands::Owner { command } => commands::owner::run(command, identity),
        Commands::Journal { command } => commands::journal::run(command),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
