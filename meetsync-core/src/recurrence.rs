//! Recurring series expansion.
//!
//! A recurring meeting is stored as one series record holding the RRULE
//! plus lazily-materialized instance records for edited occurrences. The
//! expander enumerates the rule inside a window and synthesizes ghost
//! instances for every occurrence that has no materialized record yet.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};

use crate::error::{MeetSyncError, MeetSyncResult};
use crate::slot::{
    SlotInstance, SlotRecord, SlotSeries, SlotStatus, ghost_instance_id, parse_ghost_instance_id,
};
use crate::window::DateWindow;

/// How a meeting repeats. Rules carry INTERVAL=1; anything fancier is
/// expressed by the stored RRULE directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingRepeat {
    NoRepeat,
    Daily,
    Weekly,
    Monthly,
}

impl MeetingRepeat {
    /// Deterministic RRULE string for this repeat mode, anchored at the
    /// occurrence start: weekly rules pin the anchor's weekday, monthly
    /// rules pin the anchor's week-of-month plus weekday.
    pub fn to_rrule(self, anchor: DateTime<Utc>) -> Option<String> {
        match self {
            MeetingRepeat::NoRepeat => None,
            MeetingRepeat::Daily => Some("RRULE:FREQ=DAILY;INTERVAL=1".to_string()),
            MeetingRepeat::Weekly => Some(format!(
                "RRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY={}",
                byday(anchor.weekday())
            )),
            MeetingRepeat::Monthly => {
                let week_of_month = (anchor.day() - 1) / 7 + 1;
                Some(format!(
                    "RRULE:FREQ=MONTHLY;INTERVAL=1;BYSETPOS={week_of_month};BYDAY={}",
                    byday(anchor.weekday())
                ))
            }
        }
    }
}

fn byday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Build an iCalendar-format rule block for the rrule crate parser,
/// anchored at the series start.
fn build_rrule_input(series: &SlotSeries) -> String {
    let dtstart = format!("DTSTART:{}", series.start.format("%Y%m%dT%H%M%SZ"));
    let rule = if series.rrule.starts_with("RRULE:") {
        series.rrule.clone()
    } else {
        format!("RRULE:{}", series.rrule)
    };
    format!("{dtstart}\n{rule}")
}

/// Expand a mixed set of slot records into the concrete occurrences that
/// intersect `window`.
///
/// - Plain slots pass through unchanged.
/// - Each series is enumerated; occurrences with no matching materialized
///   instance become ghosts sharing the series ciphertext and duration.
/// - Materialized instances override ghosts for the same occurrence and are
///   emitted as-is.
/// - The final view drops records without a ciphertext and materialized
///   instances marked cancelled. Ghosts are never cancelled: cancelling an
///   occurrence always materializes it first.
pub fn expand_slots(
    records: Vec<SlotRecord>,
    window: &DateWindow,
    max_occurrences: u16,
) -> MeetSyncResult<Vec<SlotInstance>> {
    let mut singles = Vec::new();
    let mut series_records = Vec::new();
    let mut instances = Vec::new();

    for record in records {
        match record {
            SlotRecord::Single(slot) => singles.push(SlotInstance::from(slot)),
            SlotRecord::Series(series) => series_records.push(series),
            SlotRecord::Instance(instance) => instances.push(instance),
        }
    }

    // Occurrences that already have a physical record must not also appear
    // as ghosts.
    let materialized: HashSet<(String, i64)> = instances
        .iter()
        .filter_map(|instance| {
            let (series_id, occurrence) = parse_ghost_instance_id(&instance.id)?;
            Some((series_id.to_string(), occurrence.timestamp_millis()))
        })
        .collect();

    let mut expanded: Vec<SlotInstance> = Vec::new();

    for series in &series_records {
        let rule_input = build_rrule_input(series);
        let rule_set: RRuleSet = rule_input.parse().map_err(|e| {
            MeetSyncError::Recurrence(format!(
                "failed to parse rule for series '{}': {e}",
                series.id
            ))
        })?;

        // after/before are exclusive; widen by a second to keep the window
        // inclusive on both ends.
        let after = (window.start - Duration::seconds(1)).with_timezone(&rrule::Tz::UTC);
        let before = (window.end + Duration::seconds(1)).with_timezone(&rrule::Tz::UTC);
        let result = rule_set.after(after).before(before).all(max_occurrences);
        if result.limited {
            tracing::warn!(series = %series.id, "occurrence enumeration hit the expansion limit");
        }

        let duration = series.end - series.start;

        for occurrence in &result.dates {
            let start = occurrence.with_timezone(&Utc);
            if materialized.contains(&(series.id.clone(), start.timestamp_millis())) {
                continue;
            }
            expanded.push(SlotInstance {
                id: ghost_instance_id(&series.id, start),
                series_id: Some(series.id.clone()),
                owner: series.owner.clone(),
                start,
                end: start + duration,
                version: series.version,
                payload: series.payload.clone(),
                content_hash: series.content_hash.clone(),
                status: SlotStatus::Confirmed,
                ghost: true,
            });
        }
    }

    expanded.extend(
        instances
            .into_iter()
            .filter(|instance| instance.status != SlotStatus::Cancelled),
    );
    expanded.extend(singles);

    expanded.retain(|slot| slot.payload.is_some());
    expanded.sort_by_key(|slot| slot.start);

    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{EncryptedPayload, Slot, SlotOwner};
    use chrono::TimeZone;

    fn payload() -> Option<EncryptedPayload> {
        Some(EncryptedPayload(serde_json::json!({"ciphertext": "opaque"})))
    }

    fn weekly_series(start: DateTime<Utc>) -> SlotSeries {
        SlotSeries {
            id: "series-1".into(),
            owner: SlotOwner::Account("0xa".into()),
            start,
            end: start + Duration::minutes(30),
            version: 3,
            payload: payload(),
            content_hash: Some("hash".into()),
            rrule: MeetingRepeat::Weekly.to_rrule(start).unwrap(),
        }
    }

    fn three_week_window(start: DateTime<Utc>) -> DateWindow {
        DateWindow::new(start - Duration::hours(1), start + Duration::weeks(3) - Duration::hours(1))
    }

    #[test]
    fn test_weekly_rule_pins_anchor_weekday() {
        // 2026-04-06 is a Monday.
        let anchor = Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap();
        assert_eq!(
            MeetingRepeat::Weekly.to_rrule(anchor).unwrap(),
            "RRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY=MO"
        );
    }

    #[test]
    fn test_monthly_rule_pins_week_of_month() {
        // Second Monday of April 2026.
        let anchor = Utc.with_ymd_and_hms(2026, 4, 13, 10, 0, 0).unwrap();
        assert_eq!(
            MeetingRepeat::Monthly.to_rrule(anchor).unwrap(),
            "RRULE:FREQ=MONTHLY;INTERVAL=1;BYSETPOS=2;BYDAY=MO"
        );
    }

    #[test]
    fn test_no_repeat_has_no_rule() {
        let anchor = Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap();
        assert!(MeetingRepeat::NoRepeat.to_rrule(anchor).is_none());
    }

    #[test]
    fn test_weekly_series_expands_to_ghosts() {
        let start = Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap();
        let series = weekly_series(start);
        let records = vec![SlotRecord::Series(series.clone())];

        let out = expand_slots(records, &three_week_window(start), 365).unwrap();

        assert_eq!(out.len(), 3);
        for (i, occurrence) in out.iter().enumerate() {
            let expected_start = start + Duration::weeks(i as i64);
            assert!(occurrence.ghost);
            assert_eq!(occurrence.start, expected_start);
            assert_eq!(occurrence.end, expected_start + Duration::minutes(30));
            assert_eq!(occurrence.status, SlotStatus::Confirmed);
            assert_eq!(occurrence.version, series.version);
            assert_eq!(occurrence.payload, series.payload);
            assert_eq!(occurrence.id, ghost_instance_id(&series.id, expected_start));
        }
    }

    #[test]
    fn test_materialized_instance_suppresses_ghost() {
        let start = Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap();
        let series = weekly_series(start);
        let second_occurrence = start + Duration::weeks(1);
        // Second occurrence was rescheduled an hour later.
        let materialized = SlotInstance {
            id: ghost_instance_id(&series.id, second_occurrence),
            series_id: Some(series.id.clone()),
            owner: series.owner.clone(),
            start: second_occurrence + Duration::hours(1),
            end: second_occurrence + Duration::hours(1) + Duration::minutes(30),
            version: 4,
            payload: payload(),
            content_hash: Some("hash2".into()),
            status: SlotStatus::Confirmed,
            ghost: false,
        };

        let out = expand_slots(
            vec![
                SlotRecord::Series(series.clone()),
                SlotRecord::Instance(materialized.clone()),
            ],
            &three_week_window(start),
            365,
        )
        .unwrap();

        assert_eq!(out.len(), 3);
        let ghosts: Vec<_> = out.iter().filter(|s| s.ghost).collect();
        assert_eq!(ghosts.len(), 2);
        assert!(out.iter().any(|s| *s == materialized));
        // No ghost shares the materialized occurrence's identifier.
        assert_eq!(out.iter().filter(|s| s.id == materialized.id).count(), 1);
    }

    #[test]
    fn test_cancelled_materialized_instance_is_dropped() {
        let start = Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap();
        let series = weekly_series(start);
        let second_occurrence = start + Duration::weeks(1);
        let cancelled = SlotInstance {
            id: ghost_instance_id(&series.id, second_occurrence),
            series_id: Some(series.id.clone()),
            owner: series.owner.clone(),
            start: second_occurrence,
            end: second_occurrence + Duration::minutes(30),
            version: 4,
            payload: payload(),
            content_hash: None,
            status: SlotStatus::Cancelled,
            ghost: false,
        };

        let out = expand_slots(
            vec![SlotRecord::Series(series), SlotRecord::Instance(cancelled)],
            &three_week_window(start),
            365,
        )
        .unwrap();

        // The cancelled occurrence is neither emitted nor replaced by a ghost.
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|s| s.start != second_occurrence));
    }

    #[test]
    fn test_records_without_ciphertext_are_dropped() {
        let start = Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap();
        let bare = Slot {
            id: "slot-1".into(),
            owner: SlotOwner::Account("0xa".into()),
            start,
            end: start + Duration::minutes(30),
            version: 0,
            payload: None,
            content_hash: None,
            status: SlotStatus::Confirmed,
        };

        let out = expand_slots(
            vec![SlotRecord::Single(bare)],
            &three_week_window(start),
            365,
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_plain_slots_pass_through() {
        let start = Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap();
        let slot = Slot {
            id: "slot-1".into(),
            owner: SlotOwner::Guest("g@example.com".into()),
            start,
            end: start + Duration::minutes(30),
            version: 1,
            payload: payload(),
            content_hash: None,
            status: SlotStatus::Confirmed,
        };

        let out = expand_slots(
            vec![SlotRecord::Single(slot.clone())],
            &three_week_window(start),
            365,
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, slot.id);
        assert!(!out[0].ghost);
        assert!(out[0].series_id.is_none());
    }

    #[test]
    fn test_unparseable_rule_is_an_error() {
        let start = Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap();
        let mut series = weekly_series(start);
        series.rrule = "FREQ=SOMETIMES".into();

        assert!(matches!(
            expand_slots(
                vec![SlotRecord::Series(series)],
                &three_week_window(start),
                365
            ),
            Err(MeetSyncError::Recurrence(_))
        ));
    }

    #[test]
    fn test_output_is_sorted_by_start() {
        let start = Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap();
        let later = Slot {
            id: "slot-late".into(),
            owner: SlotOwner::Account("0xa".into()),
            start: start + Duration::days(10),
            end: start + Duration::days(10) + Duration::minutes(30),
            version: 0,
            payload: payload(),
            content_hash: None,
            status: SlotStatus::Confirmed,
        };

        let out = expand_slots(
            vec![
                SlotRecord::Single(later),
                SlotRecord::Series(weekly_series(start)),
            ],
            &three_week_window(start),
            365,
        )
        .unwrap();

        let starts: Vec<_> = out.iter().map(|s| s.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }
}
