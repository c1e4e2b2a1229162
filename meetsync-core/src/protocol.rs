//! Transport payload types.
//!
//! Defines the typed payloads exchanged with the slot store. The engine
//! performs validation, diffing and encryption before issuing a single
//! create/update/cancel call per mutation; atomicity across the affected
//! records is the store's responsibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::slot::{EncryptedPayload, SlotOwner};

/// A slot record to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSlot {
    pub id: String,
    pub owner: SlotOwner,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub version: u64,
    pub payload: EncryptedPayload,
    pub content_hash: String,
    /// Present when the slot is the master record of a recurring series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrule: Option<String>,
}

/// In-place replacement of one existing slot's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotPatch {
    pub slot_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub version: u64,
    pub payload: EncryptedPayload,
    pub content_hash: String,
}

/// The conference copy of a meeting, sealed with the server key so any
/// guest slot can resolve its siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConferenceRecord {
    pub meeting_id: String,
    pub payload: EncryptedPayload,
    pub content_hash: String,
}

/// One persistence call creating every record of a new meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMeeting {
    pub meeting_id: String,
    pub slots: Vec<NewSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference: Option<ConferenceRecord>,
}

/// One persistence call rewriting a meeting consistently: replaced
/// ciphertexts, deleted records, and (update-instance only) records to
/// materialize, all carrying the same new version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMeeting {
    pub meeting_id: String,
    /// The version every surviving record is written with.
    pub version: u64,
    pub patches: Vec<SlotPatch>,
    pub remove: Vec<String>,
    /// New per-occurrence records the store materializes without touching
    /// the parent series.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<NewSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference: Option<ConferenceRecord>,
}

/// Cancellation of a whole meeting, addressed through the actor's slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelMeeting {
    pub slot_id: String,
    pub version: u64,
}

/// Slot ids the store removed during a cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedSlots {
    pub ids: Vec<String>,
}
