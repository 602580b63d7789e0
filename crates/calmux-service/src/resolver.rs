//! Source resolution: request kind + identity -> ordered source list.

use std::collections::BTreeSet;
use std::sync::Arc;

use calmux_core::types::UserId;

use crate::collaborators::{BookingLookup, GroupCatalog, IdentityDirectory};
use crate::error::{ServiceError, ServiceResult};
use crate::source::CalendarSource;

/// What kind of feed a request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// Aggregate of the requester's non-hidden favorite and predefined groups.
    PersonalAggregate,
    /// One linked remote calendar, by alias.
    LinkedAlias(String),
    /// The requester's own bookings in the booking service.
    BookingPersonal,
    /// All bookings in the booking service.
    BookingGlobal,
}

/// Turns a requester identity and request kind into the ordered list of
/// sources to aggregate.
pub struct SourceResolver {
    directory: Arc<dyn IdentityDirectory>,
    catalog: Arc<dyn GroupCatalog>,
    booking: Option<Arc<dyn BookingLookup>>,
}

impl SourceResolver {
    #[must_use]
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        catalog: Arc<dyn GroupCatalog>,
        booking: Option<Arc<dyn BookingLookup>>,
    ) -> Self {
        Self {
            directory,
            catalog,
            booking,
        }
    }

    /// ## Summary
    /// Resolves the sources for one request, in the order they must appear
    /// in the merged output.
    ///
    /// ## Errors
    /// - `NotFound` when the user, alias, group, or booking participant is absent
    /// - `UnsupportedSource` when a group has no stored static document
    /// - `UpstreamUnavailable` when the booking lookup itself fails
    #[tracing::instrument(skip(self))]
    pub async fn resolve(
        &self,
        user: UserId,
        kind: &RequestKind,
    ) -> ServiceResult<Vec<CalendarSource>> {
        match kind {
            RequestKind::PersonalAggregate => self.resolve_personal(user).await,
            RequestKind::LinkedAlias(alias) => self.resolve_linked(user, alias).await,
            RequestKind::BookingPersonal => self.resolve_booking_personal(user).await,
            RequestKind::BookingGlobal => {
                let booking = self.booking_lookup()?;
                Ok(vec![booking.global_feed()])
            }
        }
    }

    /// (favorites ∪ predefined) − hidden, each group's static document.
    async fn resolve_personal(&self, user: UserId) -> ServiceResult<Vec<CalendarSource>> {
        let profile = self
            .directory
            .resolve(user)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {user}")))?;

        // BTreeSet keeps the effective group set deterministic, so merged
        // output order is stable across requests.
        let mut groups: BTreeSet<_> = profile.favorite_groups.iter().copied().collect();
        groups.extend(profile.predefined_groups.iter().copied());
        for hidden in &profile.hidden_groups {
            groups.remove(hidden);
        }

        let mut sources = Vec::with_capacity(groups.len());
        for group_id in groups {
            let entry = self
                .catalog
                .resolve(group_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("event group {group_id}")))?;

            let Some(path) = entry.static_path else {
                // On-the-fly generation from discrete events is not
                // implemented; never silently skip the group.
                return Err(ServiceError::UnsupportedSource(format!(
                    "event group {} has no static document",
                    entry.label
                )));
            };

            sources.push(CalendarSource::LocalFile {
                path,
                label: entry.label,
            });
        }

        Ok(sources)
    }

    async fn resolve_linked(
        &self,
        user: UserId,
        alias: &str,
    ) -> ServiceResult<Vec<CalendarSource>> {
        let profile = self
            .directory
            .resolve(user)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {user}")))?;

        let linked = profile
            .linked_calendars
            .get(alias)
            .ok_or_else(|| ServiceError::NotFound(format!("linked calendar {alias}")))?;

        Ok(vec![CalendarSource::RemoteFeed {
            url: linked.url.clone(),
            auth_header: None,
            size_limit: linked.size_limit,
            label: alias.to_string(),
        }])
    }

    async fn resolve_booking_personal(&self, user: UserId) -> ServiceResult<Vec<CalendarSource>> {
        let booking = self.booking_lookup()?;

        let profile = self
            .directory
            .resolve(user)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {user}")))?;

        let participant = booking
            .find_participant(&profile.contact_address)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "no booking participant for {}",
                    profile.contact_address
                ))
            })?;

        Ok(vec![booking.participant_feed(participant)])
    }

    fn booking_lookup(&self) -> ServiceResult<&Arc<dyn BookingLookup>> {
        self.booking
            .as_ref()
            .ok_or_else(|| ServiceError::NotFound("booking service is not configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use async_trait::async_trait;
    use calmux_core::types::{GroupId, ParticipantId};

    use super::*;
    use crate::collaborators::{GroupEntry, IdentityProfile, LinkedCalendar};

    struct FakeDirectory {
        users: HashMap<UserId, IdentityProfile>,
    }

    #[async_trait]
    impl IdentityDirectory for FakeDirectory {
        async fn resolve(&self, user: UserId) -> ServiceResult<Option<IdentityProfile>> {
            Ok(self.users.get(&user).cloned())
        }

        async fn schedule_key(
            &self,
            _user: UserId,
            _resource_path: &str,
        ) -> ServiceResult<Option<String>> {
            Ok(None)
        }
    }

    struct FakeCatalog {
        groups: HashMap<GroupId, GroupEntry>,
    }

    #[async_trait]
    impl GroupCatalog for FakeCatalog {
        async fn resolve(&self, group: GroupId) -> ServiceResult<Option<GroupEntry>> {
            Ok(self.groups.get(&group).cloned())
        }

        async fn resolve_alias(&self, alias: &str) -> ServiceResult<Option<GroupEntry>> {
            Ok(self.groups.values().find(|g| g.label == alias).cloned())
        }
    }

    struct FakeBooking {
        participants: HashMap<String, ParticipantId>,
    }

    #[async_trait]
    impl BookingLookup for FakeBooking {
        async fn find_participant(
            &self,
            contact_address: &str,
        ) -> ServiceResult<Option<ParticipantId>> {
            Ok(self.participants.get(contact_address).copied())
        }

        fn participant_feed(&self, participant: ParticipantId) -> CalendarSource {
            CalendarSource::RemoteFeed {
                url: format!("http://booking.test/participants/{participant}/bookings.ics"),
                auth_header: Some("Bearer secret".to_string()),
                size_limit: None,
                label: "bookings".to_string(),
            }
        }

        fn global_feed(&self) -> CalendarSource {
            CalendarSource::RemoteFeed {
                url: "http://booking.test/bookings.ics".to_string(),
                auth_header: None,
                size_limit: None,
                label: "bookings".to_string(),
            }
        }
    }

    fn profile(id: UserId) -> IdentityProfile {
        IdentityProfile {
            id,
            contact_address: format!("user{id}@example.com"),
            favorite_groups: vec![],
            hidden_groups: vec![],
            predefined_groups: vec![],
            linked_calendars: HashMap::new(),
        }
    }

    fn group(id: GroupId, label: &str, path: Option<&str>) -> GroupEntry {
        GroupEntry {
            id,
            label: label.to_string(),
            static_path: path.map(PathBuf::from),
        }
    }

    fn resolver(
        users: Vec<IdentityProfile>,
        groups: Vec<GroupEntry>,
        participants: Vec<(&str, ParticipantId)>,
        booking_configured: bool,
    ) -> SourceResolver {
        let directory = Arc::new(FakeDirectory {
            users: users.into_iter().map(|p| (p.id, p)).collect(),
        });
        let catalog = Arc::new(FakeCatalog {
            groups: groups.into_iter().map(|g| (g.id, g)).collect(),
        });
        let booking: Option<Arc<dyn BookingLookup>> = booking_configured.then(|| {
            Arc::new(FakeBooking {
                participants: participants
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            }) as Arc<dyn BookingLookup>
        });
        SourceResolver::new(directory, catalog, booking)
    }

    #[test_log::test(tokio::test)]
    async fn personal_aggregate_unions_favorites_and_predefined_minus_hidden() {
        let mut user = profile(1);
        user.favorite_groups = vec![3, 1];
        user.predefined_groups = vec![2, 3];
        user.hidden_groups = vec![2];

        let r = resolver(
            vec![user],
            vec![
                group(1, "one", Some("/ics/one.ics")),
                group(2, "two", Some("/ics/two.ics")),
                group(3, "three", Some("/ics/three.ics")),
            ],
            vec![],
            false,
        );

        let sources = r
            .resolve(1, &RequestKind::PersonalAggregate)
            .await
            .expect("resolve");

        let labels: Vec<_> = sources.iter().map(CalendarSource::label).collect();
        assert_eq!(labels, vec!["one", "three"]);
    }

    #[test_log::test(tokio::test)]
    async fn group_without_static_document_is_unsupported_not_notfound() {
        let mut user = profile(1);
        user.favorite_groups = vec![7];

        let r = resolver(vec![user], vec![group(7, "dynamic", None)], vec![], false);

        let err = r
            .resolve(1, &RequestKind::PersonalAggregate)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedSource(_)));
    }

    #[test_log::test(tokio::test)]
    async fn unknown_user_is_not_found() {
        let r = resolver(vec![], vec![], vec![], false);
        let err = r
            .resolve(9, &RequestKind::PersonalAggregate)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test_log::test(tokio::test)]
    async fn linked_alias_produces_one_remote_feed() {
        let mut user = profile(1);
        user.linked_calendars.insert(
            "uni".to_string(),
            LinkedCalendar {
                url: "https://cal.example.com/uni.ics".to_string(),
                size_limit: Some(1024),
            },
        );

        let r = resolver(vec![user], vec![], vec![], false);
        let sources = r
            .resolve(1, &RequestKind::LinkedAlias("uni".to_string()))
            .await
            .expect("resolve");

        assert_eq!(
            sources,
            vec![CalendarSource::RemoteFeed {
                url: "https://cal.example.com/uni.ics".to_string(),
                auth_header: None,
                size_limit: Some(1024),
                label: "uni".to_string(),
            }]
        );
    }

    #[test_log::test(tokio::test)]
    async fn missing_alias_is_not_found() {
        let r = resolver(vec![profile(1)], vec![], vec![], false);
        let err = r
            .resolve(1, &RequestKind::LinkedAlias("nope".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test_log::test(tokio::test)]
    async fn booking_personal_carries_bearer_credential() {
        let r = resolver(
            vec![profile(1)],
            vec![],
            vec![("user1@example.com", 42)],
            true,
        );

        let sources = r
            .resolve(1, &RequestKind::BookingPersonal)
            .await
            .expect("resolve");

        match &sources[0] {
            CalendarSource::RemoteFeed {
                url, auth_header, ..
            } => {
                assert!(url.contains("/participants/42/"));
                assert_eq!(auth_header.as_deref(), Some("Bearer secret"));
            }
            CalendarSource::LocalFile { .. } => panic!("expected remote feed"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn absent_participant_is_not_found_not_unavailable() {
        let r = resolver(vec![profile(1)], vec![], vec![], true);
        let err = r
            .resolve(1, &RequestKind::BookingPersonal)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test_log::test(tokio::test)]
    async fn unconfigured_booking_service_is_not_found() {
        let r = resolver(vec![profile(1)], vec![], vec![], false);
        for kind in [RequestKind::BookingPersonal, RequestKind::BookingGlobal] {
            let err = r.resolve(1, &kind).await.unwrap_err();
            assert!(matches!(err, ServiceError::NotFound(_)));
        }
    }

    #[test_log::test(tokio::test)]
    async fn booking_global_needs_no_lookup() {
        let r = resolver(vec![], vec![], vec![], true);
        let sources = r
            .resolve(0, &RequestKind::BookingGlobal)
            .await
            .expect("resolve");
        assert_eq!(sources.len(), 1);
    }
}
