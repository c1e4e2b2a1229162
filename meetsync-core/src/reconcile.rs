//! Participant reconciliation.
//!
//! Raw participant lists arrive from several call sites and routinely
//! contain the same person twice (once from the page state, once from the
//! invite form). Reconciliation collapses duplicates with a fixed tie-break,
//! assigns every survivor a slot id, and enforces the meeting-shape
//! invariants before anything is encrypted or persisted.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{MeetSyncError, MeetSyncResult};
use crate::participant::{Actor, Identity, ParticipantInfo};

/// Deduplicate and validate a participant list.
///
/// Duplicate identities collapse with tie-break: Scheduler beats non-Scheduler,
/// then a record with a name beats one without, then first-seen wins. First
/// appearance order is preserved. Every surviving participant gets a
/// non-empty `slot_id` (a fresh UUID if the winning record had none).
///
/// Validation, in order:
/// - a single remaining participant that is the actor → `MeetingWithYourself`
/// - fewer than two remaining participants → `MeetingCreation`
/// - not exactly one Scheduler → `MultipleSchedulers`
pub fn reconcile_participants(
    raw: &[ParticipantInfo],
    actor: &Actor,
) -> MeetSyncResult<Vec<ParticipantInfo>> {
    let mut order: Vec<Identity> = Vec::new();
    let mut by_identity: HashMap<Identity, ParticipantInfo> = HashMap::new();

    for candidate in raw {
        let Some(identity) = candidate.identity() else {
            tracing::debug!("dropping participant with no identity");
            continue;
        };

        match by_identity.get_mut(&identity) {
            None => {
                order.push(identity.clone());
                by_identity.insert(identity, candidate.clone());
            }
            Some(current) => {
                if prefer_candidate(current, candidate) {
                    // The incumbent may already carry the physical record id.
                    let mut replacement = candidate.clone();
                    if replacement.slot_id.is_empty() {
                        replacement.slot_id = current.slot_id.clone();
                    }
                    *current = replacement;
                }
            }
        }
    }

    let participants: Vec<ParticipantInfo> = order
        .into_iter()
        .map(|identity| {
            let mut p = by_identity.remove(&identity).expect("identity was inserted");
            if p.slot_id.is_empty() {
                p.slot_id = Uuid::new_v4().to_string();
            }
            p
        })
        .collect();

    validate(&participants, actor)?;
    Ok(participants)
}

/// Tie-break between the incumbent record and a newly seen duplicate.
/// Returns true when the candidate should replace the incumbent.
fn prefer_candidate(current: &ParticipantInfo, candidate: &ParticipantInfo) -> bool {
    if current.is_scheduler() {
        return false;
    }
    if candidate.is_scheduler() {
        return true;
    }
    current.name.is_none() && candidate.name.is_some()
}

fn validate(participants: &[ParticipantInfo], actor: &Actor) -> MeetSyncResult<()> {
    if participants.len() == 1 {
        let only = &participants[0];
        if only.identity().as_ref() == Some(&actor.identity()) {
            return Err(MeetSyncError::MeetingWithYourself);
        }
    }
    if participants.len() < 2 {
        return Err(MeetSyncError::MeetingCreation);
    }

    let schedulers = participants.iter().filter(|p| p.is_scheduler()).count();
    if schedulers != 1 {
        return Err(MeetSyncError::MultipleSchedulers(schedulers));
    }

    Ok(())
}
