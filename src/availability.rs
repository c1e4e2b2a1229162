//! Batched availability checks.
//!
//! Before any mutation books a time, every non-acting account participant's
//! calendar is checked for the requested interval. The checks run as one
//! batch of independent calls; any busy participant — or any failed check —
//! rejects the whole mutation. There is no partial booking.

use chrono::{DateTime, Utc};
use futures::future::join_all;

use meetsync_core::error::{MeetSyncError, MeetSyncResult};
use meetsync_core::participant::{Actor, ParticipantInfo};
use meetsync_core::slot::SlotOwner;
use meetsync_core::window::DateWindow;

use crate::context::EngineContext;

/// Ensure the interval is free for every non-acting participant with a
/// calendar. Guests have no calendar and are never checked.
pub async fn ensure_all_available(
    ctx: &EngineContext,
    participants: &[ParticipantInfo],
    actor: &Actor,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ignore_meeting: Option<&str>,
) -> MeetSyncResult<()> {
    let window = DateWindow::new(start, end);
    let actor_identity = actor.identity();

    let checks = participants
        .iter()
        .filter(|p| p.identity().as_ref() != Some(&actor_identity))
        .filter_map(|p| p.account_address.clone())
        .filter(|address| !address.is_empty())
        .map(|address| {
            let window = window.clone();
            async move {
                let owner = SlotOwner::Account(address);
                ctx.transport
                    .is_available(&owner, &window, ignore_meeting)
                    .await
            }
        });

    for result in join_all(checks).await {
        if !result? {
            return Err(MeetSyncError::TimeNotAvailable);
        }
    }

    Ok(())
}
