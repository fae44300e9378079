use std::sync::RwLock;

use chrono::{DateTime, Utc};
use roster_types::{Address, Amount, CallContext, ListId, SeasonId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENTRY_DOMAIN: &[u8] = b"roster-journal-entry-v1:";

/// A successful roster mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RosterEvent {
    AuthorityGranted {
        holder: Address,
    },
    AuthorityRevoked {
        holder: Address,
    },
    CurrentSeasonSet {
        season: SeasonId,
    },
    CredentialsIssued {
        season: SeasonId,
        members: Vec<Address>,
    },
    CredentialRevoked {
        season: SeasonId,
        member: Address,
    },
    ListCreated {
        list: ListId,
        entries: Vec<Address>,
    },
    ListExtended {
        list: ListId,
        entries: Vec<Address>,
    },
    ListEntryRemoved {
        list: ListId,
        member: Address,
        cleared: usize,
    },
    FeeSet {
        list: ListId,
        fee: Amount,
    },
    MintingToggled {
        list: ListId,
        open: bool,
    },
    SelfEnrolled {
        list: ListId,
        season: SeasonId,
        member: Address,
        newly_issued: bool,
        paid: Amount,
    },
    Withdrawn {
        to: Address,
        amount: Amount,
    },
    ReferencesUpdated,
}

/// One journal record. `hash` covers every other field, `prev_hash` links to
/// the preceding entry (all zeroes for the first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub caller: Address,
    pub event: RosterEvent,
    #[serde(with = "hex::serde")]
    pub prev_hash: [u8; 32],
    #[serde(with = "hex::serde")]
    pub hash: [u8; 32],
}

/// Errors returned by the audit journal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JournalError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("journal integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("Lock error")]
    LockPoisoned,
}

/// Append-only, hash-chained record of successful mutations.
#[derive(Default)]
pub struct AuditJournal {
    entries: RwLock<Vec<JournalEntry>>,
}

impl AuditJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, ctx: &CallContext, event: RosterEvent) -> Result<JournalEntry, JournalError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| JournalError::LockPoisoned)?;

        let mut entry = JournalEntry {
            seq: entries.len() as u64 + 1,
            at: ctx.at,
            caller: ctx.caller,
            event,
            prev_hash: entries.last().map_or([0; 32], |last| last.hash),
            hash: [0; 32],
        };
        entry.hash = entry_hash(&entry)?;
        entries.push(entry.clone());
        Ok(entry)
    }

    pub fn entries(&self) -> Result<Vec<JournalEntry>, JournalError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| JournalError::LockPoisoned)?;
        Ok(entries.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hash of the latest entry.
    pub fn head(&self) -> Result<Option<[u8; 32]>, JournalError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| JournalError::LockPoisoned)?;
        Ok(entries.last().map(|entry| entry.hash))
    }

    /// Check sequence numbers, hash links and entry hashes.
    pub fn verify(&self) -> Result<(), JournalError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| JournalError::LockPoisoned)?;
        verify_entries(&entries)
    }

    pub fn to_json(&self) -> Result<String, JournalError> {
        let entries = self.entries()?;
        serde_json::to_string_pretty(&entries)
            .map_err(|e| JournalError::Serialization(e.to_string()))
    }
}

/// Validate an exported chain of entries.
pub fn verify_entries(entries: &[JournalEntry]) -> Result<(), JournalError> {
    let mut prev = [0u8; 32];
    for (index, entry) in entries.iter().enumerate() {
        let expected_seq = index as u64 + 1;
        if entry.seq != expected_seq {
            return Err(JournalError::IntegrityViolation {
                seq: entry.seq,
                reason: format!("expected seq {}, found {}", expected_seq, entry.seq),
            });
        }
        if entry.prev_hash != prev {
            return Err(JournalError::IntegrityViolation {
                seq: entry.seq,
                reason: "previous hash link mismatch".into(),
            });
        }
        if entry_hash(entry)? != entry.hash {
            return Err(JournalError::IntegrityViolation {
                seq: entry.seq,
                reason: "entry hash mismatch".into(),
            });
        }
        prev = entry.hash;
    }
    Ok(())
}

fn entry_hash(entry: &JournalEntry) -> Result<[u8; 32], JournalError> {
    let mut canonical = entry.clone();
    canonical.hash = [0; 32];

    let encoded =
        serde_json::to_vec(&canonical).map_err(|e| JournalError::Serialization(e.to_string()))?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(ENTRY_DOMAIN);
    hasher.update(&encoded);
    Ok(*hasher.finalize().as_bytes())
}
