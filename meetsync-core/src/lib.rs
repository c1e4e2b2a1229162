//! Core types for the meetsync ecosystem.
//!
//! This crate provides the shared vocabulary used by the engine and by slot
//! transport implementations:
//! - `participant`, `meeting`, `slot` for the data model
//! - `reconcile`, `diff`, `recurrence`, `set_ops` for the pure algorithms
//! - `protocol` for the transport payload types

pub mod diff;
pub mod error;
pub mod meeting;
pub mod participant;
pub mod protocol;
pub mod reconcile;
pub mod recurrence;
pub mod set_ops;
pub mod slot;
pub mod window;

pub use diff::{KeptSlot, SlotDiff, compute_slot_diff, ensure_guest_list_permission, map_kept_slots};
pub use error::{MeetSyncError, MeetSyncResult};
pub use meeting::{
    DecodedMeeting, ENVELOPE_SCHEMA_VERSION, MeetingDetails, MeetingEnvelope, MeetingPermission,
    MeetingProvider, MeetingReminder,
};
pub use participant::{Actor, Identity, ParticipantInfo, ParticipantKind, ParticipationStatus};
pub use reconcile::reconcile_participants;
pub use recurrence::{MeetingRepeat, expand_slots};
pub use slot::{
    EncryptedPayload, Slot, SlotInstance, SlotOwner, SlotRecord, SlotSeries, SlotStatus,
    ghost_instance_id, parse_ghost_instance_id,
};
pub use window::{DateWindow, DEFAULT_WINDOW_DAYS};
