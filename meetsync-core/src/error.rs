//! Error types for the meetsync ecosystem.

use thiserror::Error;

/// Errors that can occur in meetsync operations.
///
/// Business-rule failures are constructed locally and propagate unmodified;
/// transport failures arrive as [`MeetSyncError::Transport`] and are mapped
/// to the closest business error via [`MeetSyncError::from_transport_status`]
/// where a mapping exists.
#[derive(Error, Debug)]
pub enum MeetSyncError {
    #[error("Cannot schedule a meeting with yourself")]
    MeetingWithYourself,

    #[error("A meeting needs at least two distinct participants")]
    MeetingCreation,

    #[error("A meeting must have exactly one scheduler, found {0}")]
    MultipleSchedulers(usize),

    #[error("Meeting was changed concurrently: {0}")]
    MeetingChangeConflict(String),

    #[error("Changing the guest list requires the invite-guests permission")]
    GuestListModificationDenied,

    #[error("Changing the meeting details requires the edit-details permission")]
    MeetingDetailsModificationDenied,

    #[error("The requested time is not available for every participant")]
    TimeNotAvailable,

    #[error("Only the meeting owner or scheduler can cancel it")]
    MeetingCancelForbidden,

    #[error("Could not decrypt the meeting payload with the provided key")]
    DecryptionFailed,

    #[error("Guests cannot reschedule a meeting with more than one slot")]
    GuestRescheduleForbidden,

    #[error("Recurrence rule error: {0}")]
    Recurrence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transport error ({status}): {message}")]
    Transport { status: u16, message: String },
}

impl MeetSyncError {
    /// Translate an HTTP-status-coded transport failure into the closest
    /// business error. Statuses with no mapping stay as `Transport`.
    pub fn from_transport_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => MeetSyncError::MeetingChangeConflict(format!(
                "target record not found: {message}"
            )),
            409 => MeetSyncError::MeetingChangeConflict(message),
            403 => MeetSyncError::MeetingDetailsModificationDenied,
            _ => MeetSyncError::Transport { status, message },
        }
    }
}

/// Result type alias for meetsync operations.
pub type MeetSyncResult<T> = Result<T, MeetSyncError>;
