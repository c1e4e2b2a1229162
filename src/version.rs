//! Optimistic version control.
//!
//! Every mutation targets the exact version the client last observed. The
//! engine re-fetches the authoritative record, compares, and fails closed on
//! any mismatch; the caller re-fetches and retries. The version check is the
//! only serialization mechanism — no locks are taken anywhere.

use meetsync_core::error::{MeetSyncError, MeetSyncResult};
use meetsync_core::slot::SlotRecord;

use crate::context::EngineContext;

/// Compare the observed version against the authoritative one and return
/// the version the mutation must be written with.
pub fn next_version(observed: u64, authoritative: u64) -> MeetSyncResult<u64> {
    if observed != authoritative {
        return Err(MeetSyncError::MeetingChangeConflict(format!(
            "observed version {observed} but the record is at {authoritative}"
        )));
    }
    Ok(authoritative + 1)
}

/// Fetch the record a mutation targets. A record that cannot be located is
/// a conflict: the meeting was cancelled or rewritten under the caller.
pub async fn authoritative_record(
    ctx: &EngineContext,
    slot_id: &str,
) -> MeetSyncResult<SlotRecord> {
    ctx.transport
        .fetch_slot(slot_id)
        .await?
        .ok_or_else(|| {
            MeetSyncError::MeetingChangeConflict(format!("slot '{slot_id}' no longer exists"))
        })
}
