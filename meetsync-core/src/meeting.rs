//! Meeting envelope schema.
//!
//! The envelope is the plaintext payload sealed into every participant's
//! slot record. It carries an explicit schema version so stored ciphertexts
//! can evolve safely, and `related_slot_ids` so each party can resolve its
//! sibling records without a central index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MeetSyncError, MeetSyncResult};
use crate::participant::ParticipantInfo;
use crate::recurrence::MeetingRepeat;

/// Current envelope schema version.
pub const ENVELOPE_SCHEMA_VERSION: u16 = 1;

/// Where the meeting takes place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingProvider {
    Huddle,
    GoogleMeet,
    Zoom,
    Jitsi,
    /// Anything else; the URL in the envelope is the source of truth.
    Custom,
}

/// Grants the scheduler can extend to other participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingPermission {
    SeeGuestList,
    InviteGuests,
    EditDetails,
}

/// A reminder offset for the meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingReminder {
    /// Minutes before the meeting start.
    pub minutes_before: i64,
}

/// The describable part of a meeting, independent of who attends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingDetails {
    pub meeting_id: String,
    pub title: String,
    pub content: String,
    pub meeting_url: String,
    pub provider: MeetingProvider,
    pub recurrence: MeetingRepeat,
    /// `None` means no extra grants beyond the defaults.
    pub permissions: Option<Vec<MeetingPermission>>,
    pub reminders: Vec<MeetingReminder>,
}

impl MeetingDetails {
    pub fn grants(&self, permission: MeetingPermission) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|perms| perms.contains(&permission))
    }

    /// Whether two detail sets differ in any field a non-privileged actor
    /// is not allowed to change.
    pub fn differs_from(&self, other: &MeetingDetails) -> bool {
        self.title != other.title
            || self.content != other.content
            || self.meeting_url != other.meeting_url
            || self.provider != other.provider
            || self.recurrence != other.recurrence
            || self.permissions != other.permissions
            || self.reminders != other.reminders
    }
}

/// Plaintext payload sealed into a slot record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingEnvelope {
    pub schema_version: u16,
    pub meeting_id: String,
    pub title: String,
    pub content: String,
    pub meeting_url: String,
    pub provider: MeetingProvider,
    pub recurrence: MeetingRepeat,
    pub permissions: Option<Vec<MeetingPermission>>,
    pub reminders: Vec<MeetingReminder>,
    /// The full reconciled roster, identical in every copy.
    pub participants: Vec<ParticipantInfo>,
    /// Slot ids of every *other* participant's record, letting the recipient
    /// resolve siblings later. The conference copy lists all slot ids.
    pub related_slot_ids: Vec<String>,
}

impl MeetingEnvelope {
    /// Assemble the envelope addressed to one recipient.
    pub fn assemble(
        details: &MeetingDetails,
        participants: &[ParticipantInfo],
        related_slot_ids: Vec<String>,
    ) -> Self {
        MeetingEnvelope {
            schema_version: ENVELOPE_SCHEMA_VERSION,
            meeting_id: details.meeting_id.clone(),
            title: details.title.clone(),
            content: details.content.clone(),
            meeting_url: details.meeting_url.clone(),
            provider: details.provider.clone(),
            recurrence: details.recurrence,
            permissions: details.permissions.clone(),
            reminders: details.reminders.clone(),
            participants: participants.to_vec(),
            related_slot_ids,
        }
    }

    pub fn to_plaintext(&self) -> MeetSyncResult<String> {
        serde_json::to_string(self).map_err(|e| MeetSyncError::Serialization(e.to_string()))
    }

    pub fn from_plaintext(plaintext: &str) -> MeetSyncResult<Self> {
        serde_json::from_str(plaintext).map_err(|e| MeetSyncError::Serialization(e.to_string()))
    }

    /// The detail fields of this envelope, for comparing against a
    /// requested change.
    pub fn details(&self) -> MeetingDetails {
        MeetingDetails {
            meeting_id: self.meeting_id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            meeting_url: self.meeting_url.clone(),
            provider: self.provider.clone(),
            recurrence: self.recurrence,
            permissions: self.permissions.clone(),
            reminders: self.reminders.clone(),
        }
    }
}

/// A decrypted meeting as seen by one participant: the shared envelope plus
/// the coordinates of their own physical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMeeting {
    /// The slot record this envelope was decrypted from.
    pub slot_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub version: u64,
    pub envelope: MeetingEnvelope,
}
