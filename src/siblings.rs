//! Sibling slot resolution.
//!
//! A decrypted envelope carries the slot ids of every other participant.
//! Resolving them yields the roster that physically holds records for the
//! current meeting version. Individual ids may not resolve — guest slots in
//! particular — and are skipped rather than failing the whole lookup.

use meetsync_core::error::MeetSyncResult;
use meetsync_core::slot::{SlotOwner, SlotRecord};

use crate::context::EngineContext;

/// The roster of physical record holders, split by identity kind.
/// Each entry pairs the identifier with the slot id it currently holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeetingRoster {
    pub accounts: Vec<(String, String)>,
    pub guests: Vec<(String, String)>,
}

impl MeetingRoster {
    pub fn account_addresses(&self) -> Vec<String> {
        self.accounts.iter().map(|(address, _)| address.clone()).collect()
    }

    pub fn guest_emails(&self) -> Vec<String> {
        self.guests.iter().map(|(email, _)| email.clone()).collect()
    }

    pub fn slot_id_for_account(&self, address: &str) -> Option<&str> {
        self.accounts
            .iter()
            .find(|(a, _)| a.eq_ignore_ascii_case(address))
            .map(|(_, slot_id)| slot_id.as_str())
    }

    pub fn slot_id_for_guest(&self, email: &str) -> Option<&str> {
        self.guests
            .iter()
            .find(|(e, _)| e.eq_ignore_ascii_case(email))
            .map(|(_, slot_id)| slot_id.as_str())
    }
}

/// Resolve sibling records one id at a time. Ids that fail to resolve are
/// skipped; the remaining siblings still describe the rest of the meeting.
pub async fn map_related_slots(
    ctx: &EngineContext,
    slot_ids: &[String],
) -> MeetSyncResult<Vec<SlotRecord>> {
    let mut records = Vec::with_capacity(slot_ids.len());

    for slot_id in slot_ids {
        match ctx.transport.fetch_slot(slot_id).await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {
                tracing::warn!(%slot_id, "sibling slot did not resolve, skipping");
            }
            Err(error) => {
                tracing::warn!(%slot_id, %error, "sibling slot lookup failed, skipping");
            }
        }
    }

    Ok(records)
}

/// Build the holder roster from a set of physical records.
pub fn meeting_roster(records: &[SlotRecord]) -> MeetingRoster {
    let mut roster = MeetingRoster::default();

    for record in records {
        match record.owner() {
            SlotOwner::Account(address) => roster
                .accounts
                .push((address.clone(), record.id().to_string())),
            SlotOwner::Guest(email) => roster.guests.push((email.clone(), record.id().to_string())),
        }
    }

    roster
}
