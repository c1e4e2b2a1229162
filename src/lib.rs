//! meetsync — meeting scheduling & synchronization engine.
//!
//! A logical meeting is physically stored as one independently-encrypted
//! record per participant. This crate keeps those copies referentially
//! consistent through mutations: it reconciles rosters, enforces optimistic
//! versioning, diffs slot holders, seals per-participant envelopes and
//! expands recurring series into concrete occurrences. Persistence, account
//! lookup and the encryption primitive come in through the traits in
//! [`transport`].

pub mod availability;
pub mod context;
pub mod decrypt;
pub mod envelope;
pub mod scheduler;
pub mod siblings;
pub mod transport;
pub mod version;

#[cfg(test)]
mod testkit;

// Re-export the shared vocabulary so applications depend on one crate.
pub use meetsync_core as core;

pub use context::{EngineConfig, EngineContext};
pub use decrypt::{DecryptCache, decode_slot};
pub use scheduler::{
    CancelMeetingRequest, MeetingScheduler, MutationStage, ScheduleMeetingRequest,
    ScheduledMeeting, UpdateInstanceRequest, UpdateMeetingRequest,
};
pub use transport::{AccountDirectory, AccountProfile, EnvelopeCipher, SlotTransport};
