//! iCalendar content handling for calmux (RFC 5545 §3.1).
//!
//! Calmux never interprets event payloads; it treats each `VEVENT` as an
//! opaque run of content lines. This crate therefore handles only the
//! line-level format: unfolding, folding, envelope walking, and the
//! origin-tag rewrite applied during merge.

pub mod build;
pub mod error;
pub mod feed;
pub mod lines;
pub mod parse;

pub use build::{envelope_epilog, envelope_prolog, serialize_event};
pub use error::{IcalError, IcalResult};
pub use feed::{EventBlock, ParsedFeed};
pub use parse::parse_feed;
