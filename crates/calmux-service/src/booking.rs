//! HTTP client for the third-party booking service.

use async_trait::async_trait;

use calmux_core::config::BookingConfig;
use calmux_core::types::ParticipantId;

use crate::collaborators::BookingLookup;
use crate::error::{ServiceError, ServiceResult};
use crate::source::CalendarSource;

/// Booking-service client: participant lookup plus feed descriptors.
///
/// The base URL and credential are injected from configuration at
/// construction; nothing here is process-global.
pub struct BookingClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl BookingClient {
    /// ## Summary
    /// Builds a client for the configured booking service.
    ///
    /// ## Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &BookingConfig) -> ServiceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| {
                ServiceError::InvalidConfiguration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

#[async_trait]
impl BookingLookup for BookingClient {
    /// One upstream call keyed by contact address. `Ok(None)` when the
    /// service knows no such participant; `UpstreamUnavailable` when the
    /// call itself fails.
    #[tracing::instrument(skip(self))]
    async fn find_participant(
        &self,
        contact_address: &str,
    ) -> ServiceResult<Option<ParticipantId>> {
        let url = format!("{}/participants/participant_id", self.api_url);

        let response = self
            .http
            .get(&url)
            .query(&[("email", contact_address)])
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| ServiceError::UpstreamUnavailable {
                status: None,
                detail: format!("{url}: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                detail: body,
            });
        }

        response.json::<Option<ParticipantId>>().await.map_err(|e| {
            ServiceError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                detail: format!("invalid participant response: {e}"),
            }
        })
    }

    fn participant_feed(&self, participant: ParticipantId) -> CalendarSource {
        CalendarSource::RemoteFeed {
            url: format!("{}/participants/{participant}/bookings.ics", self.api_url),
            auth_header: Some(self.bearer()),
            size_limit: None,
            label: "bookings".to_string(),
        }
    }

    fn global_feed(&self) -> CalendarSource {
        CalendarSource::RemoteFeed {
            url: format!("{}/bookings.ics", self.api_url),
            auth_header: None,
            size_limit: None,
            label: "bookings".to_string(),
        }
    }
}
