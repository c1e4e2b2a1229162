//! Collaborator seams.
//!
//! The engine never talks to the network, a key store, or an account
//! directory itself. Everything external comes in through these traits so
//! the application layer can wire real HTTP clients while tests run against
//! in-memory fakes. Transport implementations surface HTTP-status-coded
//! failures via [`MeetSyncError::from_transport_status`].

use async_trait::async_trait;
use meetsync_core::error::MeetSyncResult;
use meetsync_core::protocol::{CancelMeeting, CreateMeeting, RemovedSlots, UpdateMeeting};
use meetsync_core::slot::{EncryptedPayload, Slot, SlotOwner, SlotRecord};
use meetsync_core::window::DateWindow;

/// A resolved account directory entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountProfile {
    pub address: String,
    /// Absent for addresses that never registered a key.
    pub public_key: Option<String>,
    pub display_name: Option<String>,
}

/// Persistence of physical slot records.
///
/// Each mutation maps to exactly one call; consistency across the records
/// named in a request is the store's responsibility. Read calls should
/// honor whatever cancellation mechanism the underlying client supports;
/// once a write call is issued there is no rollback.
#[async_trait]
pub trait SlotTransport: Send + Sync {
    async fn create_meeting(&self, request: &CreateMeeting) -> MeetSyncResult<Vec<Slot>>;

    async fn update_meeting(&self, request: &UpdateMeeting) -> MeetSyncResult<Vec<Slot>>;

    async fn cancel_meeting(&self, request: &CancelMeeting) -> MeetSyncResult<RemovedSlots>;

    /// Fetch one record. `Ok(None)` when the id does not resolve — guest
    /// slots routinely cannot be looked up by id.
    async fn fetch_slot(&self, slot_id: &str) -> MeetSyncResult<Option<SlotRecord>>;

    /// Batch fetch; ids that do not resolve are simply absent from the
    /// result.
    async fn fetch_slots(&self, slot_ids: &[String]) -> MeetSyncResult<Vec<SlotRecord>>;

    /// Whether `owner`'s calendar is free for the window, ignoring the
    /// meeting being mutated.
    async fn is_available(
        &self,
        owner: &SlotOwner,
        window: &DateWindow,
        ignore_meeting: Option<&str>,
    ) -> MeetSyncResult<bool>;
}

/// Lookup of registered accounts (address → public key, display name).
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn resolve(&self, address: &str) -> MeetSyncResult<Option<AccountProfile>>;

    /// Batch variant; unknown addresses are absent from the result.
    async fn resolve_many(&self, addresses: &[String]) -> MeetSyncResult<Vec<AccountProfile>>;
}

/// Asymmetric encryption primitive. Opaque to the engine: payloads are
/// carried as-is and only the owning key material can open them.
#[async_trait]
pub trait EnvelopeCipher: Send + Sync {
    async fn encrypt(&self, public_key: &str, plaintext: &str) -> MeetSyncResult<EncryptedPayload>;

    async fn decrypt(
        &self,
        key_material: &str,
        payload: &EncryptedPayload,
    ) -> MeetSyncResult<String>;
}
