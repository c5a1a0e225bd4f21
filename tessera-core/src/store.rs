//! Snapshot persistence for the registry.
//!
//! # Storage layout
//!
//! ```text
//! ~/.tessera/              (mode 0700)
//!   registry.yaml          (full registry snapshot + journal head: mode 0600)
//!   journal.jsonl          (append-only event journal: see [`crate::journal`])
//!   .lock                  (held exclusively for the whole of every write)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{io_err, RegistryError, StoreError};
use crate::event::Receipt;
use crate::journal::{self, JournalEntry, JournalHead};
use crate::registry::Registry;
use crate::types::{Identity, Timestamp};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.tessera/`: pure, no I/O.
pub fn tessera_root(home: &Path) -> PathBuf {
    home.join(".tessera")
}

/// `<home>/.tessera/registry.yaml`: pure, no I/O.
pub fn snapshot_path_at(home: &Path) -> PathBuf {
    tessera_root(home).join("registry.yaml")
}

/// `<home>/.tessera/.lock`: pure, no I/O.
pub fn lock_path_at(home: &Path) -> PathBuf {
    tessera_root(home).join(".lock")
}

/// `<home>/.tessera/`, created with mode `0700` if it does not yet exist.
pub(crate) fn ensure_root_at(home: &Path) -> Result<PathBuf, StoreError> {
    let dir = tessera_root(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

// ---------------------------------------------------------------------------
// 2. Write lock
// ---------------------------------------------------------------------------

/// Exclusive OS-level lock on `<home>/.tessera/.lock`, released on drop.
///
/// Every writer in this module holds it from the first read to the last
/// write, so concurrent processes commit one after another.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

/// Block until the store lock for `home` is acquired.
pub fn lock_at(home: &Path) -> Result<StoreLock, StoreError> {
    ensure_root_at(home)?;
    let path = lock_path_at(home);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|e| io_err(&path, e))?;
    file.lock_exclusive().map_err(|e| io_err(&path, e))?;
    tracing::trace!(path = %path.display(), "store lock acquired");
    Ok(StoreLock { file, path })
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Load / save
// ---------------------------------------------------------------------------

/// On-disk shape of `registry.yaml`.
#[derive(Deserialize)]
struct Snapshot {
    #[serde(default)]
    journal_head: Option<JournalHead>,
    registry: Registry,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    journal_head: Option<&'a JournalHead>,
    registry: &'a Registry,
}

fn read_snapshot_at(home: &Path) -> Result<Snapshot, StoreError> {
    let path = snapshot_path_at(home);
    if !path.exists() {
        return Err(StoreError::RegistryNotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
}

/// Serialize → `registry.yaml.tmp` sibling → `chmod 0600` → `rename`.
fn write_snapshot_at(
    home: &Path,
    registry: &Registry,
    journal_head: Option<&JournalHead>,
) -> Result<(), StoreError> {
    ensure_root_at(home)?;
    let path = snapshot_path_at(home);
    let tmp_path = path.with_file_name("registry.yaml.tmp");

    let yaml = serde_yaml::to_string(&SnapshotRef {
        journal_head,
        registry,
    })?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    tracing::debug!(path = %path.display(), "registry snapshot saved");
    Ok(())
}

/// The journal head recorded in the snapshot.
pub(crate) fn recorded_head_at(home: &Path) -> Result<Option<JournalHead>, StoreError> {
    Ok(read_snapshot_at(home)?.journal_head)
}

/// Load the registry snapshot.
///
/// Returns `StoreError::RegistryNotFound` if absent,
/// `StoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Registry, StoreError> {
    Ok(read_snapshot_at(home)?.registry)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Registry, StoreError> {
    load_at(&home()?)
}

/// Atomically replace the registry state, keeping the recorded journal head.
pub fn save_at(home: &Path, registry: &Registry) -> Result<(), StoreError> {
    let _lock = lock_at(home)?;
    let head = match read_snapshot_at(home) {
        Ok(snapshot) => snapshot.journal_head,
        Err(StoreError::RegistryNotFound { .. }) => None,
        Err(err) => return Err(err),
    };
    write_snapshot_at(home, registry, head.as_ref())
}

/// `save_at` convenience wrapper.
pub fn save(registry: &Registry) -> Result<(), StoreError> {
    save_at(&home()?, registry)
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Create a fresh, empty registry administered by `owner`.
///
/// Fails with `StoreError::AlreadyInitialized` if a snapshot already exists,
/// so an existing catalog is never silently replaced.
pub fn init_at(home: &Path, owner: Identity) -> Result<Registry, StoreError> {
    let registry = Registry::new(owner)?;
    let _lock = lock_at(home)?;
    let path = snapshot_path_at(home);
    if path.exists() {
        return Err(StoreError::AlreadyInitialized { path });
    }
    let entries = journal::read_at(home)?;
    let head = entries.last().map(JournalEntry::head);
    write_snapshot_at(home, &registry, head.as_ref())?;
    tracing::info!(path = %path.display(), owner = %registry.owner(), "registry initialized");
    Ok(registry)
}

/// `init_at` convenience wrapper.
pub fn init(owner: Identity) -> Result<Registry, StoreError> {
    init_at(&home()?, owner)
}

// ---------------------------------------------------------------------------
// 5. Commit
// ---------------------------------------------------------------------------

/// The value of a persisted mutation and the journal entry recording it.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub entry: JournalEntry,
}

/// Apply one mutation under the store lock and persist it.
///
/// `op` receives the commit clock: the wall clock, raised to the clock of the
/// last journaled event if the wall clock went backwards. The snapshot is
/// written with the new journal head before the entry is appended; a crash in
/// between is reported by [`journal::verify_at`]. A rejected mutation writes
/// nothing and surfaces as `StoreError::Registry`.
pub fn commit_at<T>(
    home: &Path,
    op: impl FnOnce(&mut Registry, Timestamp) -> Result<Receipt<T>, RegistryError>,
) -> Result<Committed<T>, StoreError> {
    let _lock = lock_at(home)?;
    let Snapshot {
        journal_head,
        mut registry,
    } = read_snapshot_at(home)?;
    let entries = journal::read_at(home)?;
    journal::check_head(journal_head.as_ref(), &entries)?;

    let last = entries.last();
    let clock = commit_clock(Timestamp::now(), last.map(|e| e.event.clock));
    let receipt = match op(&mut registry, clock) {
        Ok(receipt) => receipt,
        Err(err) => {
            tracing::warn!(error = %err, "mutation rejected");
            return Err(err.into());
        }
    };

    let entry = journal::next_entry(last, &receipt.event)?;
    write_snapshot_at(home, &registry, Some(&entry.head()))?;
    journal::write_entry_at(home, &entry)?;
    Ok(Committed {
        value: receipt.value,
        entry,
    })
}

/// `commit_at` convenience wrapper.
pub fn commit<T>(
    op: impl FnOnce(&mut Registry, Timestamp) -> Result<Receipt<T>, RegistryError>,
) -> Result<Committed<T>, StoreError> {
    commit_at(&home()?, op)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn commit_clock(now: Timestamp, last: Option<Timestamp>) -> Timestamp {
    last.map_or(now, |last| now.max(last))
}

pub(crate) fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
pub(crate) fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
pub(crate) fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_home() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    #[test]
    fn snapshot_path_is_correct() {
        let home = make_home();
        assert!(snapshot_path_at(home.path()).ends_with(".tessera/registry.yaml"));
    }

    #[test]
    fn root_created_with_perms() {
        let home = make_home();
        let dir = ensure_root_at(home.path()).expect("ensure_root_at");
        assert!(dir.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700);
        }
    }

    #[test]
    fn commit_of_rejected_mutation_writes_nothing() {
        let home = make_home();
        init_at(home.path(), Identity::from("owner")).expect("init");
        let before = std::fs::read(snapshot_path_at(home.path())).expect("read");

        let err = commit_at(home.path(), |reg, now| {
            reg.transfer_ownership(&Identity::from("intruder"), now, Identity::from("x"))
        })
        .unwrap_err();

        assert!(matches!(err, StoreError::Registry(RegistryError::Unauthorized { .. })));
        assert_eq!(std::fs::read(snapshot_path_at(home.path())).expect("read"), before);
        assert!(!journal::journal_path_at(home.path()).exists());
    }

    #[test]
    fn commit_clock_never_goes_backwards() {
        assert_eq!(commit_clock(Timestamp(10), None), Timestamp(10));
        assert_eq!(commit_clock(Timestamp(10), Some(Timestamp(4))), Timestamp(10));
        assert_eq!(commit_clock(Timestamp(10), Some(Timestamp(25))), Timestamp(25));
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(StoreError::HomeNotFound.to_string().contains("home directory"));
    }
}
