//! Append-only event journal: one JSON line per committed mutation.
//!
//! Persists at `<home>/.tessera/journal.jsonl`. Entries form a SHA-256 hash
//! chain: each `digest` covers the previous entry's digest followed by the
//! canonical JSON of the entry's event, so any edit, reorder or deletion of
//! an earlier line is detected by [`verify_at`]. The snapshot records the
//! [`JournalHead`] of the last committed entry, which catches a truncated
//! tail or an entry the snapshot never saw.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{io_err, StoreError};
use crate::event::Event;
use crate::store::{self, ensure_root_at, home, set_file_permissions, tessera_root};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Dense, zero-based position in the journal.
    pub seq: u64,
    /// Hex SHA-256 chaining this entry to its predecessor.
    pub digest: String,
    pub event: Event,
}

impl JournalEntry {
    pub fn head(&self) -> JournalHead {
        JournalHead {
            seq: self.seq,
            digest: self.digest.clone(),
        }
    }
}

/// Position and digest of the newest entry, as recorded in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalHead {
    pub seq: u64,
    pub digest: String,
}

/// `<home>/.tessera/journal.jsonl`: pure, no I/O.
pub fn journal_path_at(home: &Path) -> PathBuf {
    tessera_root(home).join("journal.jsonl")
}

/// Read every entry in order. Returns an empty list if the journal does not exist yet.
pub fn read_at(home: &Path) -> Result<Vec<JournalEntry>, StoreError> {
    let path = journal_path_at(home);
    if !path.exists() {
        return Ok(vec![]);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| StoreError::JournalCorrupted {
                seq: index as u64,
                reason: format!("malformed entry: {e}"),
            })
        })
        .collect()
}

/// `read_at` convenience wrapper.
pub fn read() -> Result<Vec<JournalEntry>, StoreError> {
    read_at(&home()?)
}

/// Append `event` to the journal, chaining it to the current last entry.
pub fn append_at(home: &Path, event: &Event) -> Result<JournalEntry, StoreError> {
    let entries = read_at(home)?;
    let entry = next_entry(entries.last(), event)?;
    write_entry_at(home, &entry)?;
    Ok(entry)
}

/// Build the entry that would follow `last`, without writing it.
pub(crate) fn next_entry(
    last: Option<&JournalEntry>,
    event: &Event,
) -> Result<JournalEntry, StoreError> {
    let (seq, prev) = match last {
        Some(last) => (last.seq + 1, last.digest.as_str()),
        None => (0, ""),
    };
    Ok(JournalEntry {
        seq,
        digest: chain_digest(prev, event)?,
        event: event.clone(),
    })
}

pub(crate) fn write_entry_at(home: &Path, entry: &JournalEntry) -> Result<(), StoreError> {
    ensure_root_at(home)?;
    let path = journal_path_at(home);
    let created = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| io_err(&path, e))?;
    if created {
        set_file_permissions(&path)?;
    }
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');
    file.write_all(line.as_bytes()).map_err(|e| io_err(&path, e))?;
    file.flush().map_err(|e| io_err(&path, e))?;

    tracing::debug!(
        seq = entry.seq,
        topic = entry.event.notification.topic(),
        "journal entry appended"
    );
    Ok(())
}

/// Recompute the hash chain and, when a snapshot exists, check that its
/// recorded head is the journal's last entry. Returns the number of verified
/// entries.
pub fn verify_at(home: &Path) -> Result<usize, StoreError> {
    let _lock = store::lock_at(home)?;
    let entries = read_at(home)?;
    let mut prev = String::new();
    for (index, entry) in entries.iter().enumerate() {
        let expected_seq = index as u64;
        if entry.seq != expected_seq {
            return Err(StoreError::JournalCorrupted {
                seq: expected_seq,
                reason: format!("sequence gap: found seq {}", entry.seq),
            });
        }
        let expected = chain_digest(&prev, &entry.event)?;
        if entry.digest != expected {
            return Err(StoreError::JournalCorrupted {
                seq: entry.seq,
                reason: "digest mismatch".to_string(),
            });
        }
        prev = expected;
    }
    if store::snapshot_path_at(home).exists() {
        let recorded = store::recorded_head_at(home)?;
        check_head(recorded.as_ref(), &entries)?;
    }
    Ok(entries.len())
}

/// `verify_at` convenience wrapper.
pub fn verify() -> Result<usize, StoreError> {
    verify_at(&home()?)
}

/// Fail unless `recorded` names exactly the last of `entries`.
pub(crate) fn check_head(
    recorded: Option<&JournalHead>,
    entries: &[JournalEntry],
) -> Result<(), StoreError> {
    let tail = entries.last();
    match (recorded, tail) {
        (None, None) => Ok(()),
        (Some(head), Some(tail)) if head.seq == tail.seq => {
            if head.digest == tail.digest {
                Ok(())
            } else {
                Err(StoreError::JournalCorrupted {
                    seq: tail.seq,
                    reason: "digest does not match the snapshot head".to_string(),
                })
            }
        }
        (Some(head), tail) if tail.map_or(true, |t| t.seq < head.seq) => {
            Err(StoreError::JournalCorrupted {
                seq: entries.len() as u64,
                reason: format!("journal ends before the snapshot head at seq {}", head.seq),
            })
        }
        (head, _) => Err(StoreError::JournalCorrupted {
            seq: head.map_or(0, |h| h.seq + 1),
            reason: "entry is not reflected in the snapshot".to_string(),
        }),
    }
}

fn chain_digest(prev: &str, event: &Event) -> Result<String, StoreError> {
    let payload = serde_json::to_vec(event)?;
    let mut hasher = Sha256::new();
    hasher.update(prev.as_bytes());
    hasher.update(&payload);
    Ok(hex::encode(hasher.finalize()))
}
