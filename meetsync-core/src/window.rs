//! Date window for expanding and filtering slots.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default horizon when the caller gives no explicit window.
pub const DEFAULT_WINDOW_DAYS: i64 = 60;

/// A bounded time window. Expansion of recurring series always runs against
/// a closed interval, so both bounds are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Default for DateWindow {
    /// Default window: ±DEFAULT_WINDOW_DAYS from now.
    fn default() -> Self {
        let now = Utc::now();
        DateWindow {
            start: now - Duration::days(DEFAULT_WINDOW_DAYS),
            end: now + Duration::days(DEFAULT_WINDOW_DAYS),
        }
    }
}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateWindow { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Whether [start, end] intersects this window.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start <= self.end && end >= self.start
    }
}
