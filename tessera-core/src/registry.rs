//! The registry aggregate: record tables, indexes, counters and the admin identity.
//!
//! # Mutation pattern
//!
//! Every mutating method takes the caller identity and logical clock as
//! explicit arguments and follows verify-then-write: all guards run before
//! the first field is touched, so an `Err` always leaves the registry exactly
//! as it was. A successful mutation returns a [`Receipt`] carrying the
//! emitted [`Event`](crate::event::Event).
//!
//! Indexes are append-only. An id is pushed exactly once, at creation time,
//! and deactivation never removes it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::event::{Notification, Receipt};
use crate::types::{Block, BlockId, Identity, Project, ProjectId, RecordKind, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    owner: Identity,
    total_projects: u64,
    total_blocks: u64,
    #[serde(default)]
    projects: BTreeMap<ProjectId, Project>,
    #[serde(default)]
    blocks: BTreeMap<BlockId, Block>,
    #[serde(default)]
    projects_of: BTreeMap<Identity, Vec<ProjectId>>,
    #[serde(default)]
    blocks_of: BTreeMap<Identity, Vec<BlockId>>,
    #[serde(default)]
    blocks_of_project: BTreeMap<ProjectId, Vec<BlockId>>,
}

impl Registry {
    /// Create an empty registry administered by `owner`.
    pub fn new(owner: Identity) -> Result<Self, RegistryError> {
        if owner.is_empty() {
            return Err(RegistryError::InvalidArgument { field: "owner" });
        }
        Ok(Self {
            owner,
            total_projects: 0,
            total_blocks: 0,
            projects: BTreeMap::new(),
            blocks: BTreeMap::new(),
            projects_of: BTreeMap::new(),
            blocks_of: BTreeMap::new(),
            blocks_of_project: BTreeMap::new(),
        })
    }

    // -----------------------------------------------------------------------
    // 1. Project operations
    // -----------------------------------------------------------------------

    /// Register a new project owned by `caller`. Never fails; duplicate names are allowed.
    pub fn register_project(
        &mut self,
        caller: &Identity,
        now: Timestamp,
        name: impl Into<String>,
        description: impl Into<String>,
        domain: impl Into<String>,
    ) -> Receipt<ProjectId> {
        let id = ProjectId(self.total_projects);
        let project = Project {
            id,
            creator: caller.clone(),
            name: name.into(),
            description: description.into(),
            domain: domain.into(),
            created_at: now,
            is_active: true,
        };
        let notification = Notification::ProjectRegistered {
            project_id: id,
            creator: caller.clone(),
            name: project.name.clone(),
            domain: project.domain.clone(),
            created_at: now,
        };

        self.projects.insert(id, project);
        self.projects_of.entry(caller.clone()).or_default().push(id);
        self.total_projects += 1;

        tracing::debug!(project_id = id.0, caller = %caller, "project registered");
        Receipt::new(id, caller, now, notification)
    }

    /// Set a project's active flag. Creator-only; emits even when the flag is unchanged.
    pub fn set_project_active(
        &mut self,
        caller: &Identity,
        now: Timestamp,
        project_id: ProjectId,
        active: bool,
    ) -> Result<Receipt<()>, RegistryError> {
        let project = self
            .projects
            .get_mut(&project_id)
            .filter(|p| p.is_present())
            .ok_or(RegistryError::NotFound {
                kind: RecordKind::Project,
                id: project_id.0,
            })?;
        if project.creator != *caller {
            return Err(RegistryError::Unauthorized {
                caller: caller.clone(),
                action: "change project status",
            });
        }

        project.is_active = active;

        tracing::debug!(project_id = project_id.0, active, "project status updated");
        Ok(Receipt::new(
            (),
            caller,
            now,
            Notification::ProjectStatusUpdated {
                project_id,
                is_active: active,
                timestamp: now,
            },
        ))
    }

    // -----------------------------------------------------------------------
    // 2. Block operations
    // -----------------------------------------------------------------------

    /// Attach a block to an active project. Any caller may attach to any project.
    pub fn add_block(
        &mut self,
        caller: &Identity,
        now: Timestamp,
        project_id: ProjectId,
        label: impl Into<String>,
        content_uri: impl Into<String>,
        tag: impl Into<String>,
    ) -> Result<Receipt<BlockId>, RegistryError> {
        let parent = self.project(project_id).ok_or(RegistryError::NotFound {
            kind: RecordKind::Project,
            id: project_id.0,
        })?;
        if !parent.is_active {
            return Err(RegistryError::InactiveParent { project_id });
        }

        let id = BlockId(self.total_blocks);
        let block = Block {
            id,
            project_id,
            creator: caller.clone(),
            label: label.into(),
            content_uri: content_uri.into(),
            tag: tag.into(),
            created_at: now,
            is_active: true,
        };
        let notification = Notification::BlockAdded {
            block_id: id,
            project_id,
            creator: caller.clone(),
            label: block.label.clone(),
            tag: block.tag.clone(),
            timestamp: now,
        };

        self.blocks.insert(id, block);
        self.blocks_of_project.entry(project_id).or_default().push(id);
        self.blocks_of.entry(caller.clone()).or_default().push(id);
        self.total_blocks += 1;

        tracing::debug!(
            block_id = id.0,
            project_id = project_id.0,
            caller = %caller,
            "block added"
        );
        Ok(Receipt::new(id, caller, now, notification))
    }

    /// Set a block's active flag. Only the block's own creator may do this.
    pub fn set_block_active(
        &mut self,
        caller: &Identity,
        now: Timestamp,
        block_id: BlockId,
        active: bool,
    ) -> Result<Receipt<()>, RegistryError> {
        let block = self
            .blocks
            .get_mut(&block_id)
            .filter(|b| b.is_present())
            .ok_or(RegistryError::NotFound {
                kind: RecordKind::Block,
                id: block_id.0,
            })?;
        if block.creator != *caller {
            return Err(RegistryError::Unauthorized {
                caller: caller.clone(),
                action: "change block status",
            });
        }

        block.is_active = active;

        tracing::debug!(block_id = block_id.0, active, "block status updated");
        Ok(Receipt::new(
            (),
            caller,
            now,
            Notification::BlockStatusUpdated {
                block_id,
                is_active: active,
                timestamp: now,
            },
        ))
    }

    // -----------------------------------------------------------------------
    // 3. Admin
    // -----------------------------------------------------------------------

    /// Hand the registry owner role to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        caller: &Identity,
        now: Timestamp,
        new_owner: Identity,
    ) -> Result<Receipt<()>, RegistryError> {
        if *caller != self.owner {
            return Err(RegistryError::Unauthorized {
                caller: caller.clone(),
                action: "transfer ownership",
            });
        }
        if new_owner.is_empty() {
            return Err(RegistryError::InvalidArgument { field: "new_owner" });
        }

        let previous_owner = std::mem::replace(&mut self.owner, new_owner.clone());

        tracing::debug!(previous = %previous_owner, new = %new_owner, "ownership transferred");
        Ok(Receipt::new(
            (),
            caller,
            now,
            Notification::OwnershipTransferred {
                previous_owner,
                new_owner,
            },
        ))
    }

    // -----------------------------------------------------------------------
    // 4. Reads
    // -----------------------------------------------------------------------

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn total_projects(&self) -> u64 {
        self.total_projects
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id).filter(|p| p.is_present())
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id).filter(|b| b.is_present())
    }

    /// Projects registered by `creator`, in creation order.
    pub fn get_projects_of(&self, creator: &Identity) -> &[ProjectId] {
        self.projects_of.get(creator).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Blocks added by `creator` across all projects, in creation order.
    pub fn get_blocks_of(&self, creator: &Identity) -> &[BlockId] {
        self.blocks_of.get(creator).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Blocks attached to `project_id`, in creation order.
    pub fn get_blocks_of_project(
        &self,
        project_id: ProjectId,
    ) -> Result<&[BlockId], RegistryError> {
        if self.project(project_id).is_none() {
            return Err(RegistryError::NotFound {
                kind: RecordKind::Project,
                id: project_id.0,
            });
        }
        Ok(self
            .blocks_of_project
            .get(&project_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    /// All present projects in id order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values().filter(|p| p.is_present())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::from("alice")
    }

    fn registry() -> Registry {
        Registry::new(Identity::from("deployer")).expect("registry")
    }

    #[test]
    fn new_rejects_empty_owner() {
        let err = Registry::new(Identity::empty()).unwrap_err();
        assert_eq!(err, RegistryError::InvalidArgument { field: "owner" });
    }

    #[test]
    fn register_populates_record_and_index() {
        let mut reg = registry();
        let receipt = reg.register_project(&alice(), Timestamp(10), "Alpha", "desc", "defi");
        assert_eq!(receipt.value, ProjectId(0));

        let project = reg.project(ProjectId(0)).expect("project");
        assert_eq!(project.creator, alice());
        assert_eq!(project.created_at, Timestamp(10));
        assert!(project.is_active);
        assert_eq!(reg.get_projects_of(&alice()), &[ProjectId(0)]);
        assert_eq!(reg.get_blocks_of_project(ProjectId(0)).expect("exists"), &[] as &[BlockId]);
    }

    #[test]
    fn project_registered_by_empty_identity_counts_as_absent() {
        let mut reg = registry();
        let id = reg
            .register_project(&Identity::empty(), Timestamp(1), "x", "", "y")
            .into_value();
        assert_eq!(reg.total_projects(), 1);
        assert!(reg.project(id).is_none());
        assert!(matches!(
            reg.add_block(&alice(), Timestamp(2), id, "l", "u", "t"),
            Err(RegistryError::NotFound { kind: RecordKind::Project, id: 0 })
        ));
    }

    #[test]
    fn failed_mutation_leaves_state_untouched() {
        let mut reg = registry();
        reg.register_project(&alice(), Timestamp(1), "Alpha", "", "defi");
        let before = reg.clone();

        let mallory = Identity::from("mallory");
        let _ = reg.set_project_active(&mallory, Timestamp(2), ProjectId(0), false);
        let _ = reg.set_block_active(&alice(), Timestamp(2), BlockId(9), false);
        let _ = reg.transfer_ownership(&alice(), Timestamp(2), Identity::from("x"));
        let _ = reg.add_block(&alice(), Timestamp(2), ProjectId(5), "l", "u", "t");

        assert_eq!(reg, before);
    }

    #[test]
    fn status_update_emits_even_when_unchanged() {
        let mut reg = registry();
        reg.register_project(&alice(), Timestamp(1), "Alpha", "", "defi");
        let receipt = reg
            .set_project_active(&alice(), Timestamp(3), ProjectId(0), true)
            .expect("creator may toggle");
        assert_eq!(
            receipt.event.notification,
            Notification::ProjectStatusUpdated {
                project_id: ProjectId(0),
                is_active: true,
                timestamp: Timestamp(3),
            }
        );
    }

    #[test]
    fn snapshot_yaml_roundtrip_preserves_indexes() {
        let mut reg = registry();
        reg.register_project(&alice(), Timestamp(1), "Alpha", "", "defi");
        let bob = Identity::from("bob");
        reg.add_block(&bob, Timestamp(2), ProjectId(0), "Audit", "ipfs://a", "audit")
            .expect("add");
        let yaml = serde_yaml::to_string(&reg).expect("serialize");
        let back: Registry = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, reg);
        assert_eq!(back.get_blocks_of(&Identity::from("bob")), &[BlockId(0)]);
    }
}
