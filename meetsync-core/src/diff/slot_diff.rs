//! Slot diff computation.
//!
//! Given the roster that physically holds slots for the existing meeting
//! version and the roster requested by the mutation, compute which physical
//! records must be deleted, replaced in place, or newly created. Guests are
//! tracked in parallel by email; their removals drive cancellation notices
//! at the application layer.

use serde::{Deserialize, Serialize};

use crate::error::{MeetSyncError, MeetSyncResult};
use crate::set_ops::{difference, intersection};

/// The physical consequences of a roster change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDiff {
    /// Account addresses whose slots must be deleted.
    pub to_remove: Vec<String>,
    /// Account addresses whose slot ciphertext is replaced in place.
    pub to_keep: Vec<String>,
    /// Account addresses needing a new slot (update-instance path only).
    pub to_add: Vec<String>,
    pub guests_to_remove: Vec<String>,
    pub guests_to_keep: Vec<String>,
    pub guests_to_add: Vec<String>,
}

impl SlotDiff {
    pub fn changes_participant_count(&self) -> bool {
        !self.to_remove.is_empty()
            || !self.to_add.is_empty()
            || !self.guests_to_remove.is_empty()
            || !self.guests_to_add.is_empty()
    }
}

/// A kept participant mapped back to their pre-existing physical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeptSlot {
    pub account_address: String,
    pub slot_id: String,
}

/// Compute the remove/keep/add partition of a roster change.
///
/// The acting account's slot is always kept (its ciphertext carries the new
/// envelope), never removed, even while the actor drops out of the requested
/// roster. All comparisons are case-insensitive on the identifier.
pub fn compute_slot_diff(
    existing_addresses: &[String],
    requested_addresses: &[String],
    actor_address: Option<&str>,
    existing_guests: &[String],
    requested_guests: &[String],
) -> SlotDiff {
    let existing = normalize(existing_addresses);
    let mut keep_targets = normalize(requested_addresses);
    if let Some(actor) = actor_address {
        keep_targets.insert(0, actor.to_lowercase());
    }

    let to_keep = intersection(&existing, &keep_targets);
    let to_remove = difference(&existing, &keep_targets);
    let to_add = difference(&normalize(requested_addresses), &existing);

    let existing_guests = normalize(existing_guests);
    let requested_guests = normalize(requested_guests);
    let guests_to_keep = intersection(&existing_guests, &requested_guests);
    let guests_to_remove = difference(&existing_guests, &requested_guests);
    let guests_to_add = difference(&requested_guests, &existing_guests);

    SlotDiff {
        to_remove,
        to_keep,
        to_add,
        guests_to_remove,
        guests_to_keep,
        guests_to_add,
    }
}

/// Map each kept address back to its physical record id.
/// `existing` pairs each address with the slot id it currently holds.
pub fn map_kept_slots(to_keep: &[String], existing: &[(String, String)]) -> Vec<KeptSlot> {
    to_keep
        .iter()
        .filter_map(|address| {
            existing
                .iter()
                .find(|(existing_address, _)| existing_address.eq_ignore_ascii_case(address))
                .map(|(_, slot_id)| KeptSlot {
                    account_address: address.clone(),
                    slot_id: slot_id.clone(),
                })
        })
        .collect()
}

/// A non-scheduler actor may not change the participant count unless granted
/// the invite-guests permission.
pub fn ensure_guest_list_permission(
    actor_is_scheduler: bool,
    can_invite_guests: bool,
    diff: &SlotDiff,
) -> MeetSyncResult<()> {
    if diff.changes_participant_count() && !actor_is_scheduler && !can_invite_guests {
        return Err(MeetSyncError::GuestListModificationDenied);
    }
    Ok(())
}

fn normalize(identifiers: &[String]) -> Vec<String> {
    identifiers.iter().map(|id| id.to_lowercase()).collect()
}
