//! `tessera init [--owner <identity>]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tessera_core::store;

use super::{parse_identity, require_caller};

/// Create an empty registry in ~/.tessera/.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Registry owner. Defaults to the caller identity.
    #[arg(long, value_name = "IDENTITY")]
    pub owner: Option<String>,
}

impl InitArgs {
    pub fn run(self, identity: Option<String>) -> Result<()> {
        let owner = match self.owner {
            Some(owner) => parse_identity(&owner)?,
            None => require_caller(identity)?,
        };

        let registry = store::init(owner.clone())
            .with_context(|| format!("failed to initialize registry owned by '{owner}'"))?;

        println!("{} Initialized registry owned by '{}'", "✓".green(), registry.owner());
        println!("  Saved to: ~/.tessera/registry.yaml");
        Ok(())
    }
}

