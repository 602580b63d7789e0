//! Interfaces to the conventional data-access collaborators.
//!
//! The aggregation engine never owns user or group storage; it consumes
//! these traits. The app crate provides file-backed implementations, and
//! tests substitute in-memory fakes.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use calmux_core::types::{GroupId, ParticipantId, UserId};

use crate::error::ServiceResult;
use crate::source::CalendarSource;

/// A requester identity as known to the directory.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityProfile {
    pub id: UserId,
    /// Contact address used for the booking participant lookup.
    pub contact_address: String,
    #[serde(default)]
    pub favorite_groups: Vec<GroupId>,
    #[serde(default)]
    pub hidden_groups: Vec<GroupId>,
    #[serde(default)]
    pub predefined_groups: Vec<GroupId>,
    #[serde(default)]
    pub linked_calendars: HashMap<String, LinkedCalendar>,
}

/// A remote calendar a user linked under an alias.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedCalendar {
    pub url: String,
    /// Optional tightened payload bound for this feed.
    #[serde(default)]
    pub size_limit: Option<u64>,
}

/// An event group as known to the group catalog.
#[derive(Debug, Clone)]
pub struct GroupEntry {
    pub id: GroupId,
    pub label: String,
    /// Path of the stored static document, when one exists.
    pub static_path: Option<std::path::PathBuf>,
}

/// Directory of requester identities and their shared-link keys.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Resolves a user id to its profile, or `None` if unknown.
    async fn resolve(&self, user: UserId) -> ServiceResult<Option<IdentityProfile>>;

    /// Returns the stored access key for `(user, resource_path)`, if any.
    async fn schedule_key(
        &self,
        user: UserId,
        resource_path: &str,
    ) -> ServiceResult<Option<String>>;
}

/// Catalog of event groups and their stored documents.
#[async_trait]
pub trait GroupCatalog: Send + Sync {
    /// Resolves a group id, or `None` if unknown.
    async fn resolve(&self, group: GroupId) -> ServiceResult<Option<GroupEntry>>;

    /// Resolves a group by its public alias, or `None` if unknown.
    async fn resolve_alias(&self, alias: &str) -> ServiceResult<Option<GroupEntry>>;
}

/// The third-party booking service.
#[async_trait]
pub trait BookingLookup: Send + Sync {
    /// Looks up the participant registered under a contact address.
    async fn find_participant(
        &self,
        contact_address: &str,
    ) -> ServiceResult<Option<ParticipantId>>;

    /// The authenticated bookings feed of one participant.
    fn participant_feed(&self, participant: ParticipantId) -> CalendarSource;

    /// The public feed of all bookings.
    fn global_feed(&self) -> CalendarSource;
}

/// Token verification; token extraction itself happens at the HTTP layer.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    /// Verifies a bearer token, returning the user it identifies.
    async fn verify(&self, token: &str) -> ServiceResult<Option<UserId>>;
}
