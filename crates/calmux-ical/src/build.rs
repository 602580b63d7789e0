//! Merged envelope synthesis and event re-serialization.

use calmux_core::constants::{CALENDAR_PRODID, CALENDAR_TIMEZONE, ORIGIN_PROPERTY};

use crate::feed::EventBlock;
use crate::lines::{fold_line, is_property};

const CRLF: &str = "\r\n";

/// Escapes a TEXT property value (RFC 5545 §3.3.11).
#[must_use]
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Builds the envelope prolog: everything up to (not including) the first
/// event. Emitted as the first chunk of every merged document, before any
/// source fetch completes.
#[must_use]
pub fn envelope_prolog(display_name: &str, description: &str) -> Vec<u8> {
    let properties = [
        "BEGIN:VCALENDAR".to_string(),
        format!("PRODID:{CALENDAR_PRODID}"),
        "VERSION:2.0".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:{}", escape_text(display_name)),
        format!("X-WR-TIMEZONE:{CALENDAR_TIMEZONE}"),
        format!("X-WR-CALDESC:{}", escape_text(description)),
    ];

    let mut out = String::new();
    for line in &properties {
        out.push_str(&fold_line(line));
        out.push_str(CRLF);
    }
    out.into_bytes()
}

/// The envelope epilog, closing the document.
#[must_use]
pub fn envelope_epilog() -> &'static [u8] {
    b"END:VCALENDAR\r\n"
}

/// Serializes one event block with its origin property overwritten.
///
/// Any origin tag already present in the source is dropped; exactly one
/// `X-WR-ORIGIN` line is written before `END:VEVENT`. All other lines are
/// preserved in order and re-folded at 75 octets.
#[must_use]
pub fn serialize_event(block: &EventBlock, origin: &str) -> Vec<u8> {
    let mut out = String::new();
    let last = block.lines.len().saturating_sub(1);

    for (i, line) in block.lines.iter().enumerate() {
        if is_property(line, ORIGIN_PROPERTY) {
            continue;
        }
        if i == last {
            // The closing END:VEVENT; tag provenance just before it
            let origin_line = format!("{ORIGIN_PROPERTY}:{}", escape_text(origin));
            out.push_str(&fold_line(&origin_line));
            out.push_str(CRLF);
        }
        out.push_str(&fold_line(line));
        out.push_str(CRLF);
    }

    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_feed;

    fn block(lines: &[&str]) -> EventBlock {
        EventBlock {
            lines: lines.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn prolog_opens_a_publish_envelope() {
        let prolog = String::from_utf8(envelope_prolog("My feed", "desc")).expect("utf8");
        assert!(prolog.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(prolog.contains("VERSION:2.0\r\n"));
        assert!(prolog.contains("METHOD:PUBLISH\r\n"));
        assert!(prolog.contains("X-WR-CALNAME:My feed\r\n"));
        assert!(!prolog.contains("END:VCALENDAR"));
    }

    #[test]
    fn serialized_event_carries_exactly_one_origin() {
        let event = block(&[
            "BEGIN:VEVENT",
            "UID:e1",
            "X-WR-ORIGIN:stale",
            "SUMMARY:Standup",
            "END:VEVENT",
        ]);
        let out = String::from_utf8(serialize_event(&event, "Club A")).expect("utf8");

        assert_eq!(out.matches("X-WR-ORIGIN").count(), 1);
        assert!(out.contains("X-WR-ORIGIN:Club A\r\nEND:VEVENT\r\n"));
        assert!(!out.contains("stale"));
    }

    #[test]
    fn origin_value_is_escaped() {
        let event = block(&["BEGIN:VEVENT", "UID:e1", "END:VEVENT"]);
        let out = String::from_utf8(serialize_event(&event, "a;b,c")).expect("utf8");
        assert!(out.contains("X-WR-ORIGIN:a\\;b\\,c"));
    }

    #[test]
    fn long_lines_are_folded() {
        let summary = format!("SUMMARY:{}", "x".repeat(200));
        let event = block(&["BEGIN:VEVENT", &summary, "END:VEVENT"]);
        let out = String::from_utf8(serialize_event(&event, "o")).expect("utf8");
        for physical in out.split("\r\n") {
            assert!(physical.len() <= 76, "unfolded line: {physical}");
        }
    }

    #[test]
    fn prolog_events_epilog_form_a_balanced_document() {
        let event = block(&["BEGIN:VEVENT", "UID:rt", "END:VEVENT"]);

        let mut doc = envelope_prolog("Round trip", "desc");
        doc.extend_from_slice(&serialize_event(&event, "src"));
        doc.extend_from_slice(envelope_epilog());

        let feed = parse_feed(&doc).expect("merged output must stay parseable");
        assert_eq!(feed.display_name.as_deref(), Some("Round trip"));
        assert_eq!(feed.events.len(), 1);
        assert!(feed.events[0].lines.iter().any(|l| l == "X-WR-ORIGIN:src"));
    }

    #[test]
    fn escape_text_handles_specials() {
        assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    }
}
