//! Physical slot records.
//!
//! A logical meeting is stored as one independently-encrypted slot record
//! per participant. All slots of the same meeting share the same start, end
//! and version; the payload differs because each copy is sealed with its
//! owner's key. Recurring meetings add a series record (holding the RRULE)
//! and lazily-materialized instance records for edited occurrences.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Separator embedded in synthesized occurrence identifiers.
const INSTANCE_ID_SEPARATOR: &str = "_instance_";

/// Who owns (can decrypt) a slot record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOwner {
    /// A registered account, keyed by wallet address.
    Account(String),
    /// A guest, keyed by email. Guest payloads are sealed with the shared
    /// fallback key because guests have no key pair yet.
    Guest(String),
}

impl SlotOwner {
    pub fn account_address(&self) -> Option<&str> {
        match self {
            SlotOwner::Account(address) => Some(address),
            SlotOwner::Guest(_) => None,
        }
    }

    pub fn guest_email(&self) -> Option<&str> {
        match self {
            SlotOwner::Account(_) => None,
            SlotOwner::Guest(email) => Some(email),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Confirmed,
    Cancelled,
}

/// Opaque ciphertext envelope produced by the encryption collaborator.
/// The engine never inspects its structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedPayload(pub serde_json::Value);

/// A single, non-recurring physical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub owner: SlotOwner,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Monotonic version, bumped by one on every successful mutation.
    pub version: u64,
    pub payload: Option<EncryptedPayload>,
    /// Hex SHA-256 of the plaintext envelope, for change detection without
    /// re-decrypting.
    pub content_hash: Option<String>,
    pub status: SlotStatus,
}

/// The master record of a recurring meeting. Holds the recurrence rule and
/// the base ciphertext every non-materialized occurrence shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSeries {
    pub id: String,
    pub owner: SlotOwner,
    /// Start of the first occurrence; anchors the recurrence rule.
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub version: u64,
    pub payload: Option<EncryptedPayload>,
    pub content_hash: Option<String>,
    pub rrule: String,
}

/// One occurrence of a recurring meeting.
///
/// Materialized instances are persisted records created the first time an
/// occurrence is edited or cancelled. Ghost instances exist only as computed
/// projections on the read path and are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotInstance {
    /// For occurrences of a series this follows the
    /// `{series_id}_instance_{epoch_millis}` format.
    pub id: String,
    /// Identifier of the parent series; `None` when this view wraps a plain
    /// single slot.
    pub series_id: Option<String>,
    pub owner: SlotOwner,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub version: u64,
    pub payload: Option<EncryptedPayload>,
    pub content_hash: Option<String>,
    pub status: SlotStatus,
    /// True for synthesized occurrences with no physical record.
    #[serde(default)]
    pub ghost: bool,
}

impl From<Slot> for SlotInstance {
    fn from(slot: Slot) -> Self {
        SlotInstance {
            id: slot.id,
            series_id: None,
            owner: slot.owner,
            start: slot.start,
            end: slot.end,
            version: slot.version,
            payload: slot.payload,
            content_hash: slot.content_hash,
            status: slot.status,
            ghost: false,
        }
    }
}

/// Any physical record the store can return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum SlotRecord {
    Single(Slot),
    Series(SlotSeries),
    Instance(SlotInstance),
}

impl SlotRecord {
    pub fn id(&self) -> &str {
        match self {
            SlotRecord::Single(s) => &s.id,
            SlotRecord::Series(s) => &s.id,
            SlotRecord::Instance(s) => &s.id,
        }
    }

    pub fn owner(&self) -> &SlotOwner {
        match self {
            SlotRecord::Single(s) => &s.owner,
            SlotRecord::Series(s) => &s.owner,
            SlotRecord::Instance(s) => &s.owner,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            SlotRecord::Single(s) => s.version,
            SlotRecord::Series(s) => s.version,
            SlotRecord::Instance(s) => s.version,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        match self {
            SlotRecord::Single(s) => s.start,
            SlotRecord::Series(s) => s.start,
            SlotRecord::Instance(s) => s.start,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        match self {
            SlotRecord::Single(s) => s.end,
            SlotRecord::Series(s) => s.end,
            SlotRecord::Instance(s) => s.end,
        }
    }

    pub fn payload(&self) -> Option<&EncryptedPayload> {
        match self {
            SlotRecord::Single(s) => s.payload.as_ref(),
            SlotRecord::Series(s) => s.payload.as_ref(),
            SlotRecord::Instance(s) => s.payload.as_ref(),
        }
    }

    pub fn content_hash(&self) -> Option<&str> {
        match self {
            SlotRecord::Single(s) => s.content_hash.as_deref(),
            SlotRecord::Series(s) => s.content_hash.as_deref(),
            SlotRecord::Instance(s) => s.content_hash.as_deref(),
        }
    }
}

/// Identifier of a synthesized (or materialized-from-ghost) occurrence:
/// `{series_id}_instance_{occurrence_start_epoch_millis}`.
pub fn ghost_instance_id(series_id: &str, occurrence_start: DateTime<Utc>) -> String {
    format!(
        "{series_id}{INSTANCE_ID_SEPARATOR}{}",
        occurrence_start.timestamp_millis()
    )
}

/// Split an occurrence identifier back into its series id and occurrence
/// start. Returns `None` for plain slot ids.
pub fn parse_ghost_instance_id(id: &str) -> Option<(&str, DateTime<Utc>)> {
    let (series_id, millis) = id.rsplit_once(INSTANCE_ID_SEPARATOR)?;
    let millis: i64 = millis.parse().ok()?;
    let start = Utc.timestamp_millis_opt(millis).single()?;
    Some((series_id, start))
}
