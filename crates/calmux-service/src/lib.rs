//! Calmux aggregation services: source resolution, bounded fetch, ordered
//! streaming merge, and shared-link access checks.

pub mod access;
pub mod booking;
pub mod collaborators;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod resolver;
pub mod source;

pub use access::AccessGate;
pub use booking::BookingClient;
pub use collaborators::{
    AuthVerifier, BookingLookup, GroupCatalog, GroupEntry, IdentityDirectory, IdentityProfile,
    LinkedCalendar,
};
pub use error::{ServiceError, ServiceResult};
pub use fetch::CalendarFetcher;
pub use merge::MergeStreamer;
pub use resolver::{RequestKind, SourceResolver};
pub use source::CalendarSource;
