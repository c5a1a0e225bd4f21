//! `tessera owner show|transfer`

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use tessera_core::store;

use super::{parse_identity, require_caller};

#[derive(Subcommand, Debug)]
pub enum OwnerCommand {
    /// Print the current registry owner and record counts.
    Show,

    /// Hand the owner role to another identity. Owner-only.
    Transfer {
        /// The identity that becomes the new owner.
        new_owner: String,
    },
}

pub fn run(cmd: OwnerCommand, identity: Option<String>) -> Result<()> {
    match cmd {
        OwnerCommand::Show => show(),
        OwnerCommand::Transfer { new_owner } => transfer(new_owner, identity),
    }
}

fn show() -> Result<()> {
    let registry = store::load().context("failed to load registry; run `tessera init` first")?;
    println!("owner:    {}", registry.owner());
    println!("projects: {}", registry.total_projects());
    println!("blocks:   {}", registry.total_blocks());
    Ok(())
}

fn transfer(new_owner: String, identity: Option<String>) -> Result<()> {
    let caller = require_caller(identity)?;
    let new_owner = parse_identity(&new_owner)?;
    store::commit(|reg, now| reg.transfer_ownership(&caller, now, new_owner.clone()))
        .with_context(|| format!("failed to transfer ownership to '{new_owner}'"))?;

    println!("{} Ownership transferred from '{}' to '{}'", "✓".green(), caller, new_owner);
    Ok(())
}
