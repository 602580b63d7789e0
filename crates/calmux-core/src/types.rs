//! Identifier types shared across crates.

/// User identifier as issued by the identity directory.
pub type UserId = i64;

/// Event group identifier.
pub type GroupId = i64;

/// Participant identifier in the booking service.
pub type ParticipantId = i64;
