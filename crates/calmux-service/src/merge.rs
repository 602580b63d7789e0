//! Ordered streaming merge of many sources into one calendar document.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use futures::{Stream, future};

use calmux_core::config::{CalendarConfig, FeedConfig};
use calmux_ical::{envelope_epilog, envelope_prolog, parse_feed, serialize_event};

use crate::error::ServiceResult;
use crate::fetch::CalendarFetcher;
use crate::source::CalendarSource;

/// Merges resolved sources into a lazy sequence of output chunks:
/// one header, one chunk per event in source-then-within-source order,
/// one footer.
///
/// Fetches run concurrently (bounded), but fan-in follows resolution order:
/// a still-pending earlier source blocks emission of a later, already-ready
/// source's events. On the first source failure the stream yields the error
/// and ends without the footer, leaving the output detectably truncated
/// (no `END:VCALENDAR`). Dropping the stream cancels in-flight fetches.
pub struct MergeStreamer {
    fetcher: Arc<CalendarFetcher>,
    max_concurrent: usize,
    description: String,
}

impl MergeStreamer {
    #[must_use]
    pub fn new(
        fetcher: Arc<CalendarFetcher>,
        feeds: &FeedConfig,
        calendar: &CalendarConfig,
    ) -> Self {
        Self {
            fetcher,
            max_concurrent: feeds.max_concurrent_fetches.max(1),
            description: calendar.description.clone(),
        }
    }

    /// Produces the merged output as a pull-based chunk stream. The header
    /// is the first item and is ready before any fetch completes, keeping
    /// time-to-first-byte independent of upstream latency.
    pub fn merge(
        &self,
        sources: Vec<CalendarSource>,
        display_name: &str,
    ) -> impl Stream<Item = ServiceResult<Vec<u8>>> + Send + use<> {
        let header = envelope_prolog(display_name, &self.description);
        let fetcher = Arc::clone(&self.fetcher);

        let events = stream::iter(sources)
            .map(move |source| {
                let fetcher = Arc::clone(&fetcher);
                async move { fetch_events(&fetcher, &source).await }
            })
            .buffered(self.max_concurrent)
            .map_ok(|chunks| stream::iter(chunks.into_iter().map(Ok)))
            .try_flatten();

        stream::once(future::ready(Ok(header)))
            .chain(events)
            .chain(stream::once(future::ready(Ok(
                envelope_epilog().to_vec()
            ))))
            // Fuse at the first error: the failure is the last item, and the
            // footer is suppressed so truncation stays detectable.
            .scan(false, |failed, item: ServiceResult<Vec<u8>>| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            })
    }
}

/// Fetch + parse one source and render its event chunks, origin tag applied.
/// The raw payload is dropped as soon as parsing finishes.
async fn fetch_events(
    fetcher: &CalendarFetcher,
    source: &CalendarSource,
) -> ServiceResult<Vec<Vec<u8>>> {
    let bytes = fetcher.fetch(source).await?;
    let feed = parse_feed(&bytes)?;
    drop(bytes);

    let origin = feed.origin_label(source.label()).to_string();
    tracing::debug!(
        source = %source.describe(),
        origin = %origin,
        events = feed.events.len(),
        "Source parsed"
    );

    Ok(feed
        .events
        .iter()
        .map(|event| serialize_event(event, &origin))
        .collect())
}
