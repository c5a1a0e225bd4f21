//! `tessera block add|activate|deactivate|list`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tessera_core::{store, Block, BlockId, ProjectId};

use super::{parse_identity, print_json, require_caller, status_label};

#[derive(Subcommand, Debug)]
pub enum BlockCommand {
    /// Attach a block to an active project. Any identity may add to any project.
    Add(AddArgs),

    /// Mark one of the caller's blocks active.
    Activate {
        /// Block id.
        id: u64,
    },

    /// Mark one of the caller's blocks inactive.
    Deactivate {
        /// Block id.
        id: u64,
    },

    /// List blocks of a project or of a creator (defaults to the caller's blocks).
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Project to attach the block to.
    pub project_id: u64,

    /// Human-readable label (e.g. "Spec", "Audit").
    pub label: String,

    /// Pointer to the block content (e.g. an ipfs:// or https:// URI).
    #[arg(long = "uri", short = 'u', value_name = "URI")]
    pub content_uri: String,

    /// Free-text tag (e.g. "architecture").
    #[arg(long, short = 't')]
    pub tag: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// List blocks attached to this project.
    #[arg(long, conflicts_with = "creator", value_name = "ID")]
    pub project: Option<u64>,

    /// List blocks added by this identity.
    #[arg(long, value_name = "IDENTITY")]
    pub creator: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct BlockRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "project")]
    project: u64,
    #[tabled(rename = "label")]
    label: String,
    #[tabled(rename = "tag")]
    tag: String,
    #[tabled(rename = "creator")]
    creator: String,
    #[tabled(rename = "status")]
    status: &'static str,
    #[tabled(rename = "uri")]
    uri: String,
}

impl From<&Block> for BlockRow {
    fn from(block: &Block) -> Self {
        Self {
            id: block.id.0,
            project: block.project_id.0,
            label: block.label.clone(),
            tag: block.tag.clone(),
            creator: block.creator.to_string(),
            status: status_label(block.is_active),
            uri: block.content_uri.clone(),
        }
    }
}

pub fn run(cmd: BlockCommand, identity: Option<String>) -> Result<()> {
    match cmd {
        BlockCommand::Add(args) => add(args, identity),
        BlockCommand::Activate { id } => set_active(BlockId(id), true, identity),
        BlockCommand::Deactivate { id } => set_active(BlockId(id), false, identity),
        BlockCommand::List(args) => list(args, identity),
    }
}

fn add(args: AddArgs, identity: Option<String>) -> Result<()> {
    let caller = require_caller(identity)?;
    let project_id = ProjectId(args.project_id);
    let committed = store::commit(|reg, now| {
        reg.add_block(
            &caller,
            now,
            project_id,
            &args.label,
            &args.content_uri,
            &args.tag,
        )
    })
    .with_context(|| format!("failed to add block '{}' to project {project_id}", args.label))?;

    println!(
        "{} Added block {} '{}' to project {} [{}]",
        "✓".green(),
        committed.value,
        args.label,
        project_id,
        args.tag
    );
    Ok(())
}

fn set_active(id: BlockId, active: bool, identity: Option<String>) -> Result<()> {
    let caller = require_caller(identity)?;
    store::commit(|reg, now| reg.set_block_active(&caller, now, id, active))
        .with_context(|| format!("failed to mark block {id} {}", status_label(active)))?;

    println!("{} Block {id} is now {}", "✓".green(), status_label(active));
    Ok(())
}

fn list(args: ListArgs, identity: Option<String>) -> Result<()> {
    let registry = store::load().context("failed to load registry; run `tessera init` first")?;

    let (heading, ids) = match (args.project, args.creator) {
        (Some(project), _) => {
            let project = ProjectId(project);
            let ids = registry
                .get_blocks_of_project(project)
                .with_context(|| format!("cannot list blocks of project {project}"))?;
            (format!("project {project}"), ids)
        }
        (None, Some(creator)) => {
            let creator = parse_identity(&creator)?;
            let ids = registry.get_blocks_of(&creator);
            (creator.to_string(), ids)
        }
        (None, None) => {
            let creator = require_caller(identity)?;
            let ids = registry.get_blocks_of(&creator);
            (creator.to_string(), ids)
        }
    };
    let blocks: Vec<&Block> = ids.iter().filter_map(|id| registry.block(*id)).collect();

    if args.json {
        return print_json(&blocks);
    }

    if blocks.is_empty() {
        println!("No blocks for {heading}.");
        return Ok(());
    }

    println!("{} ({} blocks)", heading.bold(), blocks.len());
    let rows: Vec<BlockRow> = blocks.into_iter().map(BlockRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
