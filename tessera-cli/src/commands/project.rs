//! `tessera project register|activate|deactivate|show|list`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use serde::Serialize;
use tessera_core::{store, BlockId, Project, ProjectId, Registry};

use super::{parse_identity, print_json, require_caller, status_label};

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Register a new project owned by the caller.
    Register(RegisterArgs),

    /// Mark one of the caller's projects active.
    Activate {
        /// Project id.
        id: u64,
    },

    /// Mark one of the caller's projects inactive. Existing blocks are untouched.
    Deactivate {
        /// Project id.
        id: u64,
    },

    /// Show a single project and the ids of its blocks.
    Show {
        /// Project id.
        id: u64,

        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// List projects registered by a creator (defaults to the caller).
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Project name. Duplicates are allowed.
    pub name: String,

    /// Domain the project belongs to (e.g. "defi").
    #[arg(long, short = 'd')]
    pub domain: String,

    /// Free-text description.
    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Creator whose projects to list.
    #[arg(long, value_name = "IDENTITY")]
    pub creator: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "domain")]
    domain: String,
    #[tabled(rename = "status")]
    status: &'static str,
    #[tabled(rename = "blocks")]
    blocks: usize,
    #[tabled(rename = "created")]
    created: String,
}

pub fn run(cmd: ProjectCommand, identity: Option<String>) -> Result<()> {
    match cmd {
        ProjectCommand::Register(args) => register(args, identity),
        ProjectCommand::Activate { id } => set_active(ProjectId(id), true, identity),
        ProjectCommand::Deactivate { id } => set_active(ProjectId(id), false, identity),
        ProjectCommand::Show { id, json } => show(ProjectId(id), json),
        ProjectCommand::List(args) => list(args, identity),
    }
}

fn register(args: RegisterArgs, identity: Option<String>) -> Result<()> {
    let caller = require_caller(identity)?;
    let committed = store::commit(|reg, now| {
        Ok(reg.register_project(
            &caller,
            now,
            &args.name,
            &args.description,
            &args.domain,
        ))
    })
    .with_context(|| format!("failed to register project '{}'", args.name))?;

    println!(
        "{} Registered project {} '{}' (domain: {})",
        "✓".green(),
        committed.value,
        args.name,
        args.domain
    );
    Ok(())
}

fn set_active(id: ProjectId, active: bool, identity: Option<String>) -> Result<()> {
    let caller = require_caller(identity)?;
    store::commit(|reg, now| reg.set_project_active(&caller, now, id, active))
        .with_context(|| format!("failed to mark project {id} {}", status_label(active)))?;

    println!("{} Project {id} is now {}", "✓".green(), status_label(active));
    Ok(())
}

fn show(id: ProjectId, json: bool) -> Result<()> {
    let registry = load()?;
    let project = registry
        .project(id)
        .with_context(|| format!("project {id} not found"))?;
    let blocks = registry.get_blocks_of_project(id)?;

    if json {
        return print_json(&ProjectDetail { project, blocks });
    }

    println!("{} {}", format!("#{}", project.id).bold(), project.name.bold());
    println!("  creator:     {}", project.creator);
    println!("  domain:      {}", project.domain);
    if !project.description.is_empty() {
        println!("  description: {}", project.description);
    }
    println!("  created:     {}", project.created_at);
    println!("  status:      {}", colored_status(project.is_active));
    println!("  blocks:      {}", block_list(blocks));
    Ok(())
}

#[derive(Serialize)]
struct ProjectDetail<'a> {
    #[serde(flatten)]
    project: &'a Project,
    blocks: &'a [BlockId],
}

fn block_list(blocks: &[BlockId]) -> String {
    if blocks.is_empty() {
        return "none".to_string();
    }
    let ids: Vec<String> = blocks.iter().map(ToString::to_string).collect();
    format!("{} ({})", blocks.len(), ids.join(", "))
}

fn list(args: ListArgs, identity: Option<String>) -> Result<()> {
    let creator = match args.creator {
        Some(creator) => parse_identity(&creator)?,
        None => require_caller(identity)?,
    };
    let registry = load()?;
    let projects: Vec<&Project> = registry
        .get_projects_of(&creator)
        .iter()
        .filter_map(|id| registry.project(*id))
        .collect();

    if args.json {
        return print_json(&projects);
    }

    if projects.is_empty() {
        println!("No projects registered by '{creator}'.");
        println!("Run: tessera --as {creator} project register <name> --domain <domain>");
        return Ok(());
    }

    println!("{} ({} projects)", creator.to_string().bold(), projects.len());
    let rows: Vec<ProjectRow> = projects
        .into_iter()
        .map(|p| project_row(&registry, p))
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn project_row(registry: &Registry, project: &Project) -> ProjectRow {
    ProjectRow {
        id: project.id.0,
        name: project.name.clone(),
        domain: project.domain.clone(),
        status: status_label(project.is_active),
        blocks: registry
            .get_blocks_of_project(project.id)
            .map(<[_]>::len)
            .unwrap_or(0),
        created: project.created_at.to_string(),
    }
}

fn colored_status(active: bool) -> String {
    if active {
        status_label(active).green().to_string()
    } else {
        status_label(active).yellow().to_string()
    }
}

fn load() -> Result<Registry> {
    store::load().context("failed to load registry; run `tessera init` first")
}
