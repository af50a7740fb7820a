//! Supporting-document checklist for the document-request workflow.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days before the event start by which requested documents are due.
pub const DOCUMENT_LEAD_TIME_DAYS: i64 = 14;

/// The documents an admin can chase for an event, as ticked flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentChecklist {
    #[serde(default)]
    pub coshh_sheets: bool,
    #[serde(default)]
    pub food_safety: bool,
    #[serde(default)]
    pub dbs_certificate: bool,
    #[serde(default)]
    pub public_liability: bool,
    #[serde(default)]
    pub risk_assessment: bool,
}

impl DocumentChecklist {
    /// Human-readable names for the ticked documents, in a fixed order.
    pub fn requested(&self) -> Vec<&'static str> {
        let mut documents = Vec::new();
        if self.coshh_sheets {
            documents.push("COSHH Safety Data Sheets");
        }
        if self.food_safety {
            documents.push("Food Hygiene Certificate");
        }
        if self.dbs_certificate {
            documents.push("DBS Certificate");
        }
        if self.public_liability {
            documents.push("Public Liability Insurance Certificate");
        }
        if self.risk_assessment {
            documents.push("Risk Assessment");
        }
        documents
    }

    pub fn is_empty(&self) -> bool {
        self.requested().is_empty()
    }
}

/// When requested documents are due: the event start minus the lead time,
/// clamped to `now` so a short-notice booking is asked for them immediately
/// rather than by a date already in the past.
pub fn document_deadline(event_start: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let deadline = event_start - Duration::days(DOCUMENT_LEAD_TIME_DAYS);
    deadline.max(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn checklist_lists_only_ticked_documents() {
        let checklist = DocumentChecklist {
            coshh_sheets: true,
            public_liability: true,
            ..DocumentChecklist::default()
        };

        assert_eq!(
            checklist.requested(),
            vec![
                "COSHH Safety Data Sheets",
                "Public Liability Insurance Certificate"
            ]
        );
    }

    #[test]
    fn empty_checklist_requests_nothing() {
        assert!(DocumentChecklist::default().is_empty());
    }

    #[test]
    fn deadline_is_fourteen_days_before_the_event() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();

        assert_eq!(
            document_deadline(start, now),
            Utc.with_ymd_and_hms(2026, 3, 18, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn deadline_never_lands_in_the_past() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        // Event is only five days out; fourteen days prior would be in the past.
        let start = Utc.with_ymd_and_hms(2026, 3, 6, 10, 0, 0).unwrap();

        assert_eq!(document_deadline(start, now), now);
    }
}
