//! Tessera core library: project/block registry, notifications, persistence.
//!
//! Public API surface:
//! - [`types`]: identifiers, identities and the two record types
//! - [`registry`]: the [`Registry`] aggregate and its operations
//! - [`event`]: [`Notification`]s returned by every mutation
//! - [`shared`]: [`SharedRegistry`], a single-writer handle for threaded hosts
//! - [`store`] / [`journal`]: YAML snapshot and hash-chained event journal
//! - [`error`]: [`RegistryError`] and [`StoreError`]

pub mod error;
pub mod event;
pub mod journal;
pub mod registry;
pub mod shared;
pub mod store;
pub mod types;

pub use error::{RegistryError, StoreError};
pub use event::{Event, Notification, Receipt};
pub use journal::JournalEntry;
pub use registry::Registry;
pub use shared::SharedRegistry;
pub use store::Committed;
pub use types::{Block, BlockId, Identity, Project, ProjectId, RecordKind, Timestamp};
