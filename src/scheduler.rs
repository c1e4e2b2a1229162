//! Meeting mutation orchestration.
//!
//! Each mutation runs the same pipeline: reconcile the roster, check the
//! observed version against the authoritative record, diff the slot
//! holders, enforce the actor's permissions, check availability, seal the
//! new envelopes, and issue one persistence call. Nothing is written before
//! the final stage, so a failed mutation leaves zero side effects.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use meetsync_core::diff::{
    SlotDiff, compute_slot_diff, ensure_guest_list_permission,
};
use meetsync_core::error::{MeetSyncError, MeetSyncResult};
use meetsync_core::meeting::{DecodedMeeting, MeetingDetails, MeetingPermission};
use meetsync_core::participant::{Actor, ParticipantInfo, ParticipantKind};
use meetsync_core::protocol::{
    CancelMeeting, CreateMeeting, NewSlot, RemovedSlots, SlotPatch, UpdateMeeting,
};
use meetsync_core::reconcile::reconcile_participants;
use meetsync_core::recurrence::expand_slots;
use meetsync_core::slot::{
    Slot, SlotInstance, SlotRecord, ghost_instance_id, parse_ghost_instance_id,
};
use meetsync_core::window::DateWindow;

use crate::availability::ensure_all_available;
use crate::context::EngineContext;
use crate::decrypt::decode_slot;
use crate::envelope::{SealedMeeting, seal_meeting};
use crate::siblings::{MeetingRoster, map_related_slots, meeting_roster};
use crate::version::{authoritative_record, next_version};

/// Pipeline stages a mutation moves through. Observational only: a failure
/// at any stage aborts before the persistence call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStage {
    Requested,
    Reconciled,
    VersionChecked,
    Diffed,
    Encrypted,
    Persisted,
}

/// Create a brand-new meeting.
#[derive(Debug, Clone)]
pub struct ScheduleMeetingRequest {
    pub actor: Actor,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `meeting_id` may be left empty; a fresh one is generated.
    pub details: MeetingDetails,
    pub participants: Vec<ParticipantInfo>,
}

/// Rewrite an existing meeting (time, details and/or roster).
#[derive(Debug, Clone)]
pub struct UpdateMeetingRequest {
    pub actor: Actor,
    /// The caller's decrypted copy of the meeting, carrying the version
    /// they last observed and the sibling slot ids.
    pub existing: DecodedMeeting,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub details: MeetingDetails,
    pub participants: Vec<ParticipantInfo>,
}

/// Rewrite one occurrence of a recurring meeting. The caller's copy may be
/// a ghost instance; editing it materializes the occurrence for every
/// participant without touching the parent series.
#[derive(Debug, Clone)]
pub struct UpdateInstanceRequest {
    pub actor: Actor,
    pub existing: DecodedMeeting,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub details: MeetingDetails,
    pub participants: Vec<ParticipantInfo>,
}

#[derive(Debug, Clone)]
pub struct CancelMeetingRequest {
    pub actor: Actor,
    pub existing: DecodedMeeting,
}

/// Result of a successful schedule/update mutation.
#[derive(Debug, Clone)]
pub struct ScheduledMeeting {
    pub meeting_id: String,
    pub version: u64,
    /// The physical records as returned by the store.
    pub slots: Vec<Slot>,
    pub participants: Vec<ParticipantInfo>,
}

/// The engine's mutation entry point.
pub struct MeetingScheduler {
    ctx: EngineContext,
}

impl MeetingScheduler {
    pub fn new(ctx: EngineContext) -> Self {
        MeetingScheduler { ctx }
    }

    /// Schedule a new meeting: one physical record per participant, all at
    /// version 0, created in a single persistence call.
    pub async fn schedule(
        &self,
        request: ScheduleMeetingRequest,
    ) -> MeetSyncResult<ScheduledMeeting> {
        let ScheduleMeetingRequest {
            actor,
            start,
            end,
            mut details,
            participants,
        } = request;

        if details.meeting_id.is_empty() {
            details.meeting_id = Uuid::new_v4().to_string();
        }
        tracing::debug!(stage = ?MutationStage::Requested, meeting_id = %details.meeting_id, "scheduling meeting");

        let participants = reconcile_participants(&participants, &actor)?;
        tracing::debug!(stage = ?MutationStage::Reconciled, count = participants.len(), "roster reconciled");

        ensure_all_available(&self.ctx, &participants, &actor, start, end, None).await?;

        let sealed = seal_meeting(&self.ctx, &details, &participants).await?;
        tracing::debug!(stage = ?MutationStage::Encrypted, copies = sealed.slots.len(), "envelopes sealed");

        let rrule = details.recurrence.to_rrule(start);
        let slots = sealed
            .slots
            .iter()
            .map(|s| NewSlot {
                id: s.slot_id.clone(),
                owner: s.owner.clone(),
                start,
                end,
                version: 0,
                payload: s.payload.clone(),
                content_hash: s.content_hash.clone(),
                rrule: rrule.clone(),
            })
            .collect();

        let created = self
            .ctx
            .transport
            .create_meeting(&CreateMeeting {
                meeting_id: details.meeting_id.clone(),
                slots,
                conference: sealed.conference.clone(),
            })
            .await?;
        tracing::debug!(stage = ?MutationStage::Persisted, meeting_id = %details.meeting_id, "meeting created");

        Ok(ScheduledMeeting {
            meeting_id: details.meeting_id,
            version: 0,
            slots: created,
            participants,
        })
    }

    /// Update a meeting in place. Every surviving record is rewritten with
    /// the new envelope and `version + 1`; removed participants' records are
    /// deleted; participants new to the roster get fresh records.
    pub async fn update(&self, request: UpdateMeetingRequest) -> MeetSyncResult<ScheduledMeeting> {
        let UpdateMeetingRequest {
            actor,
            existing,
            start,
            end,
            mut details,
            participants,
        } = request;
        details.meeting_id = existing.envelope.meeting_id.clone();
        tracing::debug!(stage = ?MutationStage::Requested, meeting_id = %details.meeting_id, "updating meeting");

        let mut participants = reconcile_participants(&participants, &actor)?;
        tracing::debug!(stage = ?MutationStage::Reconciled, count = participants.len(), "roster reconciled");

        // A guest holds no key material of their own; rescheduling through a
        // guest slot is only unambiguous when it is the meeting's sole record.
        if actor.is_guest() && !existing.envelope.related_slot_ids.is_empty() {
            return Err(MeetSyncError::GuestRescheduleForbidden);
        }

        let authoritative = authoritative_record(&self.ctx, &existing.slot_id).await?;
        let new_version = next_version(existing.version, authoritative.version())?;
        tracing::debug!(stage = ?MutationStage::VersionChecked, new_version, "version check passed");

        let mut records = map_related_slots(&self.ctx, &existing.envelope.related_slot_ids).await?;
        records.push(authoritative);
        let roster = meeting_roster(&records);

        align_slot_ids(&mut participants, &roster);

        let diff = compute_slot_diff(
            &roster.account_addresses(),
            &requested_addresses(&participants),
            actor.account_address(),
            &roster.guest_emails(),
            &requested_guests(&participants),
        );
        tracing::debug!(
            stage = ?MutationStage::Diffed,
            keep = diff.to_keep.len(),
            remove = diff.to_remove.len(),
            add = diff.to_add.len(),
            "roster diff computed"
        );

        enforce_update_policy(&actor, &existing, &details, &diff)?;

        ensure_all_available(
            &self.ctx,
            &participants,
            &actor,
            start,
            end,
            Some(&details.meeting_id),
        )
        .await?;

        let sealed = seal_meeting(&self.ctx, &details, &participants).await?;
        tracing::debug!(stage = ?MutationStage::Encrypted, copies = sealed.slots.len(), "envelopes sealed");

        let rrule = details.recurrence.to_rrule(start);
        let (patches, add) = split_patches(&sealed, &roster, start, end, new_version, rrule);
        let remove = removed_slot_ids(&diff, &roster);

        let updated = self
            .ctx
            .transport
            .update_meeting(&UpdateMeeting {
                meeting_id: details.meeting_id.clone(),
                version: new_version,
                patches,
                remove,
                add,
                conference: sealed.conference.clone(),
            })
            .await?;
        tracing::debug!(stage = ?MutationStage::Persisted, meeting_id = %details.meeting_id, new_version, "meeting updated");

        Ok(ScheduledMeeting {
            meeting_id: details.meeting_id,
            version: new_version,
            slots: updated,
            participants,
        })
    }

    /// Update one occurrence of a recurring meeting.
    ///
    /// When the caller's copy is a ghost, the occurrence is materialized:
    /// every participant gets a per-occurrence record derived from their
    /// series record, and the parent series is left untouched. When the
    /// occurrence was materialized before, its records are patched like a
    /// plain update.
    pub async fn update_instance(
        &self,
        request: UpdateInstanceRequest,
    ) -> MeetSyncResult<ScheduledMeeting> {
        let UpdateInstanceRequest {
            actor,
            existing,
            start,
            end,
            mut details,
            participants,
        } = request;
        details.meeting_id = existing.envelope.meeting_id.clone();
        tracing::debug!(stage = ?MutationStage::Requested, meeting_id = %details.meeting_id, slot_id = %existing.slot_id, "updating occurrence");

        let mut participants = reconcile_participants(&participants, &actor)?;
        tracing::debug!(stage = ?MutationStage::Reconciled, count = participants.len(), "roster reconciled");

        if actor.is_guest() && !existing.envelope.related_slot_ids.is_empty() {
            return Err(MeetSyncError::GuestRescheduleForbidden);
        }

        // Materialized occurrences resolve directly; ghosts fall back to
        // their parent series record.
        let (authoritative, ghost_occurrence) =
            match self.ctx.transport.fetch_slot(&existing.slot_id).await? {
                Some(record) => (record, None),
                None => {
                    let (series_id, occurrence_start) =
                        parse_ghost_instance_id(&existing.slot_id).ok_or_else(|| {
                            MeetSyncError::MeetingChangeConflict(format!(
                                "slot '{}' no longer exists",
                                existing.slot_id
                            ))
                        })?;
                    let series = authoritative_record(&self.ctx, series_id).await?;
                    (series, Some(occurrence_start))
                }
            };

        let new_version = next_version(existing.version, authoritative.version())?;
        tracing::debug!(stage = ?MutationStage::VersionChecked, new_version, "version check passed");

        let mut records = map_related_slots(&self.ctx, &existing.envelope.related_slot_ids).await?;
        records.push(authoritative);
        let roster = meeting_roster(&records);

        align_slot_ids(&mut participants, &roster);

        let diff = compute_slot_diff(
            &roster.account_addresses(),
            &requested_addresses(&participants),
            actor.account_address(),
            &roster.guest_emails(),
            &requested_guests(&participants),
        );
        tracing::debug!(
            stage = ?MutationStage::Diffed,
            keep = diff.to_keep.len(),
            remove = diff.to_remove.len(),
            add = diff.to_add.len(),
            "occurrence diff computed"
        );

        enforce_update_policy(&actor, &existing, &details, &diff)?;

        ensure_all_available(
            &self.ctx,
            &participants,
            &actor,
            start,
            end,
            Some(&details.meeting_id),
        )
        .await?;

        // Materializing a ghost rewrites every kept participant's slot id to
        // the per-occurrence form before sealing, so the envelopes reference
        // the records that will exist after this call.
        if let Some(occurrence_start) = ghost_occurrence {
            let existing_ids: HashSet<String> = roster_slot_ids(&roster);
            for participant in &mut participants {
                if existing_ids.contains(&participant.slot_id) {
                    participant.slot_id =
                        ghost_instance_id(&participant.slot_id, occurrence_start);
                }
            }
        }

        let sealed = seal_meeting(&self.ctx, &details, &participants).await?;
        tracing::debug!(stage = ?MutationStage::Encrypted, copies = sealed.slots.len(), "envelopes sealed");

        // Per-occurrence records are never series masters.
        let (patches, add) = split_patches(&sealed, &roster, start, end, new_version, None);
        let remove = if ghost_occurrence.is_some() {
            // Nothing physical exists for this occurrence yet.
            Vec::new()
        } else {
            removed_slot_ids(&diff, &roster)
        };

        let updated = self
            .ctx
            .transport
            .update_meeting(&UpdateMeeting {
                meeting_id: details.meeting_id.clone(),
                version: new_version,
                patches,
                remove,
                add,
                conference: sealed.conference.clone(),
            })
            .await?;
        tracing::debug!(stage = ?MutationStage::Persisted, meeting_id = %details.meeting_id, new_version, "occurrence updated");

        Ok(ScheduledMeeting {
            meeting_id: details.meeting_id,
            version: new_version,
            slots: updated,
            participants,
        })
    }

    /// Cancel a whole meeting. Only its owner or scheduler may do so.
    pub async fn cancel(&self, request: CancelMeetingRequest) -> MeetSyncResult<RemovedSlots> {
        let CancelMeetingRequest { actor, existing } = request;

        let actor_kind = actor
            .find_in(&existing.envelope.participants)
            .map(|p| p.kind);
        if !matches!(
            actor_kind,
            Some(ParticipantKind::Owner) | Some(ParticipantKind::Scheduler)
        ) {
            return Err(MeetSyncError::MeetingCancelForbidden);
        }

        let authoritative = authoritative_record(&self.ctx, &existing.slot_id).await?;
        let version = next_version(existing.version, authoritative.version())?;
        tracing::debug!(stage = ?MutationStage::VersionChecked, version, "cancel version check passed");

        let removed = self
            .ctx
            .transport
            .cancel_meeting(&CancelMeeting {
                slot_id: existing.slot_id.clone(),
                version,
            })
            .await?;
        tracing::debug!(stage = ?MutationStage::Persisted, meeting_id = %existing.envelope.meeting_id, "meeting cancelled");

        Ok(removed)
    }

    /// Decrypt one record for the holder of `key_material`.
    pub async fn decode(
        &self,
        record: &SlotRecord,
        key_material: &str,
    ) -> MeetSyncResult<DecodedMeeting> {
        decode_slot(&self.ctx, record, key_material).await
    }

    /// Expand a fetched record set into the concrete occurrences inside
    /// `window`.
    pub fn expand(
        &self,
        records: Vec<SlotRecord>,
        window: &DateWindow,
    ) -> MeetSyncResult<Vec<SlotInstance>> {
        expand_slots(records, window, self.ctx.config.max_occurrences)
    }
}

fn requested_addresses(participants: &[ParticipantInfo]) -> Vec<String> {
    participants
        .iter()
        .filter_map(|p| p.account_address.clone())
        .filter(|a| !a.is_empty())
        .collect()
}

fn requested_guests(participants: &[ParticipantInfo]) -> Vec<String> {
    participants
        .iter()
        .filter(|p| p.is_guest())
        .filter_map(|p| p.guest_email.clone())
        .collect()
}

/// Point kept participants at the physical records they already hold, so
/// sealed envelopes reference real sibling ids. Participants new to the
/// meeting keep their freshly generated ids.
fn align_slot_ids(participants: &mut [ParticipantInfo], roster: &MeetingRoster) {
    for participant in participants {
        if let Some(address) = participant.account_address.as_deref().filter(|a| !a.is_empty()) {
            if let Some(slot_id) = roster.slot_id_for_account(address) {
                participant.slot_id = slot_id.to_string();
            }
        } else if let Some(email) = participant.guest_email.as_deref().filter(|e| !e.is_empty()) {
            if let Some(slot_id) = roster.slot_id_for_guest(email) {
                participant.slot_id = slot_id.to_string();
            }
        }
    }
}

fn roster_slot_ids(roster: &MeetingRoster) -> HashSet<String> {
    roster
        .accounts
        .iter()
        .map(|(_, slot_id)| slot_id.clone())
        .chain(roster.guests.iter().map(|(_, slot_id)| slot_id.clone()))
        .collect()
}

/// Sealed copies whose slot id already exists become in-place patches;
/// the rest become new records.
fn split_patches(
    sealed: &SealedMeeting,
    roster: &MeetingRoster,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    version: u64,
    rrule: Option<String>,
) -> (Vec<SlotPatch>, Vec<NewSlot>) {
    let existing_ids = roster_slot_ids(roster);
    let mut patches = Vec::new();
    let mut add = Vec::new();

    for slot in &sealed.slots {
        if existing_ids.contains(&slot.slot_id) {
            patches.push(SlotPatch {
                slot_id: slot.slot_id.clone(),
                start,
                end,
                version,
                payload: slot.payload.clone(),
                content_hash: slot.content_hash.clone(),
            });
        } else {
            add.push(NewSlot {
                id: slot.slot_id.clone(),
                owner: slot.owner.clone(),
                start,
                end,
                version,
                payload: slot.payload.clone(),
                content_hash: slot.content_hash.clone(),
                rrule: rrule.clone(),
            });
        }
    }

    (patches, add)
}

fn removed_slot_ids(diff: &SlotDiff, roster: &MeetingRoster) -> Vec<String> {
    diff.to_remove
        .iter()
        .filter_map(|address| roster.slot_id_for_account(address))
        .map(String::from)
        .chain(
            diff.guests_to_remove
                .iter()
                .filter_map(|email| roster.slot_id_for_guest(email))
                .map(String::from),
        )
        .collect()
}

fn enforce_update_policy(
    actor: &Actor,
    existing: &DecodedMeeting,
    details: &MeetingDetails,
    diff: &SlotDiff,
) -> MeetSyncResult<()> {
    let actor_kind = actor
        .find_in(&existing.envelope.participants)
        .map(|p| p.kind);
    let is_scheduler = actor_kind == Some(ParticipantKind::Scheduler);
    let is_owner = actor_kind == Some(ParticipantKind::Owner);

    let existing_details = existing.envelope.details();

    ensure_guest_list_permission(
        is_scheduler,
        existing_details.grants(MeetingPermission::InviteGuests),
        diff,
    )?;

    if details.differs_from(&existing_details)
        && !is_scheduler
        && !is_owner
        && !existing_details.grants(MeetingPermission::EditDetails)
    {
        return Err(MeetSyncError::MeetingDetailsModificationDenied);
    }

    Ok(())
}
