//! Envelope sealing.
//!
//! Builds the per-participant encrypted copies of a meeting. Each recipient
//! gets the envelope sealed with their own public key (or the shared
//! fallback key when no key is registered), with `related_slot_ids` pointing
//! at every sibling record. When guests are present a conference copy sealed
//! with the server key is produced as well, listing the full slot roster.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use meetsync_core::error::MeetSyncResult;
use meetsync_core::meeting::{MeetingDetails, MeetingEnvelope};
use meetsync_core::participant::ParticipantInfo;
use meetsync_core::protocol::ConferenceRecord;
use meetsync_core::slot::{EncryptedPayload, SlotOwner};

use crate::context::EngineContext;

/// One participant's sealed copy, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedSlot {
    pub slot_id: String,
    pub owner: SlotOwner,
    pub payload: EncryptedPayload,
    pub content_hash: String,
}

/// All sealed copies of one meeting version.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedMeeting {
    pub slots: Vec<SealedSlot>,
    pub conference: Option<ConferenceRecord>,
}

/// Hex SHA-256 of the plaintext envelope. Stored alongside the ciphertext
/// so later code can detect whether a decrypted payload actually changed
/// without re-decrypting every sibling.
pub fn content_hash(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Seal one envelope per participant.
///
/// Participants carrying neither an address nor an email cannot own a
/// physical record and are skipped (they remain listed in every envelope's
/// roster).
pub async fn seal_meeting(
    ctx: &EngineContext,
    details: &MeetingDetails,
    participants: &[ParticipantInfo],
) -> MeetSyncResult<SealedMeeting> {
    let keys = resolve_public_keys(ctx, participants).await?;

    let mut slots = Vec::with_capacity(participants.len());
    let mut has_guest = false;

    for recipient in participants {
        let owner = match slot_owner(recipient) {
            Some(owner) => owner,
            None => {
                tracing::debug!(slot_id = %recipient.slot_id, "participant has no owner identity, skipping record");
                continue;
            }
        };
        if matches!(owner, SlotOwner::Guest(_)) {
            has_guest = true;
        }

        let public_key = match &owner {
            SlotOwner::Account(address) => keys
                .get(&address.to_lowercase())
                .cloned()
                .unwrap_or_else(|| ctx.config.fallback_public_key.clone()),
            SlotOwner::Guest(_) => ctx.config.fallback_public_key.clone(),
        };

        let related: Vec<String> = participants
            .iter()
            .filter(|p| p.slot_id != recipient.slot_id)
            .map(|p| p.slot_id.clone())
            .collect();

        let envelope = MeetingEnvelope::assemble(details, participants, related);
        let plaintext = envelope.to_plaintext()?;
        let payload = ctx.cipher.encrypt(&public_key, &plaintext).await?;

        slots.push(SealedSlot {
            slot_id: recipient.slot_id.clone(),
            owner,
            payload,
            content_hash: content_hash(&plaintext),
        });
    }

    let conference = if has_guest {
        Some(seal_conference(ctx, details, participants).await?)
    } else {
        None
    };

    Ok(SealedMeeting { slots, conference })
}

/// The conference copy lists every slot id, including each recipient's own,
/// so a guest slot can find all of its siblings.
async fn seal_conference(
    ctx: &EngineContext,
    details: &MeetingDetails,
    participants: &[ParticipantInfo],
) -> MeetSyncResult<ConferenceRecord> {
    let all_slot_ids: Vec<String> = participants.iter().map(|p| p.slot_id.clone()).collect();
    let envelope = MeetingEnvelope::assemble(details, participants, all_slot_ids);
    let plaintext = envelope.to_plaintext()?;
    let payload = ctx
        .cipher
        .encrypt(&ctx.config.server_public_key, &plaintext)
        .await?;

    Ok(ConferenceRecord {
        meeting_id: details.meeting_id.clone(),
        payload,
        content_hash: content_hash(&plaintext),
    })
}

async fn resolve_public_keys(
    ctx: &EngineContext,
    participants: &[ParticipantInfo],
) -> MeetSyncResult<HashMap<String, String>> {
    let addresses: Vec<String> = participants
        .iter()
        .filter_map(|p| p.account_address.clone())
        .filter(|a| !a.is_empty())
        .collect();

    if addresses.is_empty() {
        return Ok(HashMap::new());
    }

    let profiles = ctx.directory.resolve_many(&addresses).await?;
    Ok(profiles
        .into_iter()
        .filter_map(|profile| {
            profile
                .public_key
                .map(|key| (profile.address.to_lowercase(), key))
        })
        .collect())
}

fn slot_owner(participant: &ParticipantInfo) -> Option<SlotOwner> {
    if let Some(address) = participant.account_address.as_ref().filter(|a| !a.is_empty()) {
        return Some(SlotOwner::Account(address.clone()));
    }
    participant
        .guest_email
        .as_ref()
        .filter(|e| !e.is_empty())
        .map(|email| SlotOwner::Guest(email.clone()))
}
