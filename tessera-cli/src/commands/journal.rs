//! `tessera journal list|verify`

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tessera_core::{journal, JournalEntry, Notification};

use super::{print_json, status_label};

#[derive(Subcommand, Debug)]
pub enum JournalCommand {
    /// Print every recorded notification in commit order.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Recompute the journal hash chain and report the first broken entry.
    Verify,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "seq")]
    seq: u64,
    #[tabled(rename = "topic")]
    topic: &'static str,
    #[tabled(rename = "caller")]
    caller: String,
    #[tabled(rename = "at")]
    at: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "digest")]
    digest: String,
}

impl From<&JournalEntry> for EntryRow {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            seq: entry.seq,
            topic: entry.event.notification.topic(),
            caller: entry.event.caller.to_string(),
            at: entry.event.clock.to_string(),
            detail: detail(&entry.event.notification),
            digest: entry.digest.chars().take(12).collect(),
        }
    }
}

pub fn run(cmd: JournalCommand) -> Result<()> {
    match cmd {
        JournalCommand::List { json } => list(json),
        JournalCommand::Verify => verify(),
    }
}

fn list(json: bool) -> Result<()> {
    let entries = journal::read().context("failed to read journal")?;
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("Journal is empty.");
        return Ok(());
    }
    let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn verify() -> Result<()> {
    let count = journal::verify().context("journal verification failed")?;
    println!("{} Journal intact: {count} entries verified", "✓".green());
    Ok(())
}

fn detail(notification: &Notification) -> String {
    match notification {
        Notification::ProjectRegistered {
            project_id,
            name,
            domain,
            ..
        } => format!("project {project_id} '{name}' ({domain})"),
        Notification::ProjectStatusUpdated {
            project_id,
            is_active,
            ..
        } => format!("project {project_id} {}", status_label(*is_active)),
        Notification::BlockAdded {
            block_id,
            project_id,
            label,
            tag,
            ..
        } => format!("block {block_id} '{label}' [{tag}] -> project {project_id}"),
        Notification::BlockStatusUpdated {
            block_id,
            is_active,
            ..
        } => format!("block {block_id} {}", status_label(*is_active)),
        Notification::OwnershipTransferred {
            previous_owner,
            new_owner,
        } => format!("{previous_owner} -> {new_owner}"),
    }
}
