//! Parsed feed types.
//!
//! A feed is the envelope metadata plus its event blocks, in document order.
//! Event payloads stay opaque: each block is the run of logical content
//! lines between `BEGIN:VEVENT` and `END:VEVENT` inclusive, exactly as the
//! source wrote them (after unfolding).

/// One event from a source calendar, kept as opaque content lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlock {
    /// Logical content lines, including the `BEGIN:VEVENT`/`END:VEVENT` pair.
    pub lines: Vec<String>,
}

/// A parsed source calendar: envelope display name plus ordered events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    /// `X-WR-CALNAME` of the envelope, when present.
    pub display_name: Option<String>,
    /// Event blocks in order of appearance, at any nesting depth.
    pub events: Vec<EventBlock>,
}

impl ParsedFeed {
    /// Display name to tag events with, falling back to a source label.
    #[must_use]
    pub fn origin_label<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.display_name.as_deref().unwrap_or(fallback)
    }
}
