//! Participant types for meetings.
//!
//! Every meeting participant is represented the same way regardless of
//! whether they are a registered account (wallet address) or a guest known
//! only by email. Identity comparisons go through [`Identity`], which
//! normalizes addresses and emails to lowercase.

use serde::{Deserialize, Serialize};

/// Role of a participant within a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    /// The participant who created the meeting. Exactly one per meeting.
    Scheduler,
    /// The account whose calendar the meeting was booked on.
    Owner,
    /// Everyone else.
    Invitee,
}

/// RSVP state of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    Pending,
    Accepted,
    Rejected,
}

/// One attendee of a meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    /// Wallet address for registered accounts.
    pub account_address: Option<String>,
    /// Email for guests without an account.
    pub guest_email: Option<String>,
    /// Display name.
    pub name: Option<String>,
    pub kind: ParticipantKind,
    pub status: ParticipationStatus,
    /// Identifier of this participant's own physical slot record.
    /// Empty until assigned by reconciliation.
    #[serde(default)]
    pub slot_id: String,
}

impl ParticipantInfo {
    /// Normalized identity key: lowercased address, else lowercased email,
    /// else display name. `None` when the record carries no identity at all.
    pub fn identity(&self) -> Option<Identity> {
        if let Some(address) = non_empty(&self.account_address) {
            return Some(Identity(address.to_lowercase()));
        }
        if let Some(email) = non_empty(&self.guest_email) {
            return Some(Identity(email.to_lowercase()));
        }
        non_empty(&self.name).map(|name| Identity(name.to_string()))
    }

    /// A guest is a participant with an email but no account address.
    pub fn is_guest(&self) -> bool {
        non_empty(&self.account_address).is_none() && non_empty(&self.guest_email).is_some()
    }

    pub fn is_scheduler(&self) -> bool {
        self.kind == ParticipantKind::Scheduler
    }

    pub fn matches_account(&self, address: &str) -> bool {
        non_empty(&self.account_address)
            .is_some_and(|a| a.eq_ignore_ascii_case(address))
    }

    pub fn matches_guest(&self, email: &str) -> bool {
        non_empty(&self.guest_email)
            .is_some_and(|e| e.eq_ignore_ascii_case(email))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Normalized identity of a participant, usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity performing a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// A registered account acting under its wallet address.
    Account(String),
    /// A guest acting under the email their slot was issued to.
    Guest(String),
}

impl Actor {
    pub fn identity(&self) -> Identity {
        match self {
            Actor::Account(address) => Identity(address.to_lowercase()),
            Actor::Guest(email) => Identity(email.to_lowercase()),
        }
    }

    pub fn account_address(&self) -> Option<&str> {
        match self {
            Actor::Account(address) => Some(address),
            Actor::Guest(_) => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Actor::Guest(_))
    }

    /// Find this actor's participant record within a roster.
    pub fn find_in<'a>(&self, participants: &'a [ParticipantInfo]) -> Option<&'a ParticipantInfo> {
        participants
            .iter()
            .find(|p| p.identity().as_ref() == Some(&self.identity()))
    }
}
