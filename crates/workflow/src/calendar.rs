//! iCalendar (RFC 5545) export for booking feeds and approval invites.
//!
//! One `VCALENDAR` document, `METHOD:PUBLISH`, one `VEVENT` per event,
//! with stable product/organizer identifiers and fixed venue fields.

use chrono::{DateTime, Utc};

/// Product identifier stamped on every exported calendar.
pub const CALENDAR_PROD_ID: &str = "//Hallbook//Booking Service//EN";

/// Organizer address stamped on every exported event.
pub const CALENDAR_ORGANIZER: &str = "bookings@jubileehall.org.uk";

/// Fixed description attached to every event.
pub const VENUE_DESCRIPTION: &str = "Booking at the Jubilee Hall";

/// Fixed venue location string.
pub const VENUE_LOCATION: &str = "Jubilee Hall, Mill Lane, Hartfield, Kent";

/// MIME type for the serialized feed.
pub const CALENDAR_MIME_TYPE: &str = "text/calendar";

/// One event in a feed or invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub uid: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
}

/// A publishable calendar.
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    events: Vec<CalendarEvent>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(mut self, event: CalendarEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn add_event(&mut self, event: CalendarEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialize to an RFC 5545 document. `now` stamps DTSTAMP/CREATED on
    /// every event; start and end are copied verbatim from the bookings.
    pub fn serialize(&self, now: DateTime<Utc>) -> String {
        let mut lines: Vec<String> = vec![
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            format!("PRODID:{}", escape_text(CALENDAR_PROD_ID)),
            "METHOD:PUBLISH".to_string(),
        ];

        for event in &self.events {
            lines.push("BEGIN:VEVENT".to_string());
            lines.push(format!("UID:{}", escape_text(&event.uid)));
            lines.push(format!("DTSTAMP:{}", format_utc(now)));
            lines.push(format!("CREATED:{}", format_utc(now)));
            lines.push(format!("LAST-MODIFIED:{}", format_utc(now)));
            lines.push(format!("DTSTART:{}", format_utc(event.start)));
            lines.push(format!("DTEND:{}", format_utc(event.end)));
            lines.push(format!("SUMMARY:{}", escape_text(&event.summary)));
            lines.push(format!("DESCRIPTION:{}", escape_text(VENUE_DESCRIPTION)));
            lines.push(format!("LOCATION:{}", escape_text(VENUE_LOCATION)));
            lines.push(format!("ORGANIZER:mailto:{CALENDAR_ORGANIZER}"));
            lines.push("END:VEVENT".to_string());
        }

        lines.push("END:VCALENDAR".to_string());

        let mut out = String::new();
        for line in lines {
            out.push_str(&fold_line(&line));
            out.push_str("\r\n");
        }
        out
    }
}

/// UTC timestamp in the basic iCalendar form, e.g. `20260314T100000Z`.
fn format_utc(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Escape text per RFC 5545 §3.3.11: backslash, semicolon, comma, newline.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Fold content lines longer than 75 octets with CRLF + space
/// continuations, splitting on character boundaries.
fn fold_line(line: &str) -> String {
    const LIMIT: usize = 75;

    if line.len() <= LIMIT {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / LIMIT * 3);
    let mut width = 0;
    for c in line.chars() {
        let char_width = c.len_utf8();
        if width + char_width > LIMIT {
            out.push_str("\r\n ");
            // The leading space counts against the continuation line.
            width = 1;
        }
        out.push(c);
        width += char_width;
    }
    out
}
