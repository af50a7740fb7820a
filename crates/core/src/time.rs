//! Time interval value type used for booking windows.
//!
//! A `TimeRange` is a half-open interval `[start, end)`, immutable and
//! compared by value. Overlap detection runs against an *existing* range
//! widened by a clearance buffer, so back-to-back bookings keep a gap for
//! setup and cleaning.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Half-open time interval `[start, end)`. Invariant: `end > start`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if end <= start {
            return Err(DomainError::validation("time range end must be after start"));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The range widened by `buffer` on both ends.
    ///
    /// Used only for overlap detection; the widened range is not itself a
    /// valid booking window.
    pub fn buffered(&self, buffer: Duration) -> Self {
        Self {
            start: self.start - buffer,
            end: self.end + buffer,
        }
    }

    /// Whether this (proposed) range collides with an existing range that
    /// has already been widened by the clearance buffer.
    ///
    /// Three cases, all boundary-inclusive: the proposed start falls inside
    /// the existing range, the proposed end falls inside it, or the proposed
    /// range fully contains it.
    pub fn collides_with_buffered(&self, existing: &TimeRange) -> bool {
        (existing.start <= self.start && existing.end >= self.start)
            || (existing.start <= self.end && existing.end >= self.end)
            || (existing.start >= self.start && existing.end <= self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, 0).unwrap()
    }

    fn range(sh: u32, sm: u32, eh: u32, em: u32) -> TimeRange {
        TimeRange::new(at(sh, sm), at(eh, em)).unwrap()
    }

    fn buffer() -> Duration {
        Duration::minutes(30)
    }

    #[test]
    fn rejects_inverted_and_empty_ranges() {
        assert!(TimeRange::new(at(10, 0), at(9, 0)).is_err());
        assert!(TimeRange::new(at(10, 0), at(10, 0)).is_err());
    }

    #[test]
    fn gap_shorter_than_buffer_collides() {
        // [09:00,10:00) then [10:20,11:00): 20 minute gap, inside the buffer.
        let existing = range(9, 0, 10, 0).buffered(buffer());
        let proposed = range(10, 20, 11, 0);
        assert!(proposed.collides_with_buffered(&existing));
    }

    #[test]
    fn gap_longer_than_buffer_is_clear() {
        // [09:00,10:00) then [10:31,11:00): 31 minute gap.
        let existing = range(9, 0, 10, 0).buffered(buffer());
        let proposed = range(10, 31, 11, 0);
        assert!(!proposed.collides_with_buffered(&existing));
    }

    #[test]
    fn direct_overlap_collides() {
        let existing = range(10, 0, 11, 0).buffered(buffer());
        let proposed = range(10, 30, 11, 30);
        assert!(proposed.collides_with_buffered(&existing));
    }

    #[test]
    fn containment_collides() {
        // Proposed range swallows a short existing booking entirely.
        let existing = range(12, 0, 12, 30).buffered(buffer());
        let proposed = range(10, 0, 15, 0);
        assert!(proposed.collides_with_buffered(&existing));
    }

    #[test]
    fn distant_ranges_are_clear() {
        let existing = range(9, 0, 10, 0).buffered(buffer());
        let proposed = range(13, 0, 14, 0);
        assert!(!proposed.collides_with_buffered(&existing));
    }

    #[test]
    fn buffered_widens_both_ends() {
        let r = range(10, 0, 11, 0).buffered(buffer());
        assert_eq!(r.start(), at(9, 30));
        assert_eq!(r.end(), at(11, 30));
    }
}
