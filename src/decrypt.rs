//! Meeting decryption.
//!
//! Turns a physical record back into a structured meeting for the account
//! holding the key material. Decoded meetings are cached per (slot id,
//! version); a version bump invalidates the entry naturally, and the stored
//! content hash lets callers detect payload changes without another
//! decryption pass.

use std::collections::HashMap;
use std::sync::Mutex;

use meetsync_core::error::{MeetSyncError, MeetSyncResult};
use meetsync_core::meeting::{DecodedMeeting, MeetingEnvelope};
use meetsync_core::slot::SlotRecord;

use crate::context::EngineContext;

/// Cache of decoded meetings keyed by (slot id, version).
#[derive(Default)]
pub struct DecryptCache {
    inner: Mutex<HashMap<(String, u64), DecodedMeeting>>,
}

impl DecryptCache {
    pub fn get(&self, slot_id: &str, version: u64) -> Option<DecodedMeeting> {
        self.inner
            .lock()
            .expect("decrypt cache lock poisoned")
            .get(&(slot_id.to_string(), version))
            .cloned()
    }

    pub fn insert(&self, decoded: DecodedMeeting) {
        self.inner
            .lock()
            .expect("decrypt cache lock poisoned")
            .insert((decoded.slot_id.clone(), decoded.version), decoded);
    }
}

/// Decrypt one record with the caller's key material.
///
/// Any failure to open or parse the payload surfaces as
/// [`MeetSyncError::DecryptionFailed`]; the underlying cause is logged, not
/// propagated.
pub async fn decode_slot(
    ctx: &EngineContext,
    record: &SlotRecord,
    key_material: &str,
) -> MeetSyncResult<DecodedMeeting> {
    if let Some(decoded) = ctx.decrypt_cache.get(record.id(), record.version()) {
        return Ok(decoded);
    }

    let payload = record.payload().ok_or(MeetSyncError::DecryptionFailed)?;

    let plaintext = ctx
        .cipher
        .decrypt(key_material, payload)
        .await
        .map_err(|error| {
            tracing::debug!(slot_id = %record.id(), %error, "payload would not open");
            MeetSyncError::DecryptionFailed
        })?;

    let envelope = MeetingEnvelope::from_plaintext(&plaintext).map_err(|error| {
        tracing::debug!(slot_id = %record.id(), %error, "decrypted payload is not a meeting envelope");
        MeetSyncError::DecryptionFailed
    })?;

    let decoded = DecodedMeeting {
        slot_id: record.id().to_string(),
        start: record.start(),
        end: record.end(),
        version: record.version(),
        envelope,
    };

    ctx.decrypt_cache.insert(decoded.clone());
    Ok(decoded)
}
