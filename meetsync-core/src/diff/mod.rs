//! Roster diff types for meeting mutations.

mod slot_diff;

pub use slot_diff::{
    KeptSlot, SlotDiff, compute_slot_diff, ensure_guest_list_permission, map_kept_slots,
};
