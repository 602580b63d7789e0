//! Bounded, timed retrieval of raw calendar bytes.

use std::time::Duration;

use futures::{Stream, StreamExt};

use calmux_core::config::FeedConfig;

use crate::error::{ServiceError, ServiceResult};
use crate::source::CalendarSource;

/// Retrieves raw calendar bytes from one source, enforcing size and time
/// bounds. One attempt per source per request; no retries.
pub struct CalendarFetcher {
    http: reqwest::Client,
    max_bytes: u64,
}

impl CalendarFetcher {
    /// ## Summary
    /// Builds a fetcher with the configured per-source timeout and size bound.
    ///
    /// ## Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(feeds: &FeedConfig) -> ServiceResult<Self> {
        // The size gate needs Content-Length exactly as the upstream sent
        // it; transparent decompression would strip the header.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(feeds.fetch_timeout_secs))
            .no_gzip()
            .build()
            .map_err(|e| {
                ServiceError::InvalidConfiguration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            max_bytes: feeds.max_bytes,
        })
    }

    /// ## Summary
    /// Fetches the raw bytes of one source.
    ///
    /// Local files are read whole (static documents, assumed small). Remote
    /// feeds are rejected before any body byte when the declared length is
    /// absent or over the bound, and aborted mid-stream if the observed body
    /// crosses the bound regardless of what was declared.
    ///
    /// ## Errors
    /// - `UpstreamUnavailable` on I/O failure, timeout, or non-success status
    /// - `UpstreamTooLarge` when the declared or observed size exceeds the bound
    #[tracing::instrument(skip(self), fields(source = %source.describe()))]
    pub async fn fetch(&self, source: &CalendarSource) -> ServiceResult<Vec<u8>> {
        match source {
            CalendarSource::LocalFile { path, .. } => {
                tokio::fs::read(path).await.map_err(|e| {
                    ServiceError::UpstreamUnavailable {
                        status: None,
                        detail: format!("{}: {e}", path.display()),
                    }
                })
            }
            CalendarSource::RemoteFeed {
                url,
                auth_header,
                size_limit,
                ..
            } => {
                let limit = size_limit.map_or(self.max_bytes, |s| s.min(self.max_bytes));
                self.fetch_remote(url, auth_header.as_deref(), limit).await
            }
        }
    }

    async fn fetch_remote(
        &self,
        url: &str,
        auth_header: Option<&str>,
        limit: u64,
    ) -> ServiceResult<Vec<u8>> {
        let mut request = self.http.get(url);
        if let Some(value) = auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, value);
        }

        let response =
            request
                .send()
                .await
                .map_err(|e| ServiceError::UpstreamUnavailable {
                    status: None,
                    detail: format!("{url}: {e}"),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                detail: diagnostic_body(response).await,
            });
        }

        // Gate on the declared length before consuming any body byte.
        match response.content_length() {
            None => {
                return Err(ServiceError::UpstreamTooLarge {
                    limit,
                    detail: format!("{url}: Content-Length is not specified"),
                });
            }
            Some(declared) if declared > limit => {
                return Err(ServiceError::UpstreamTooLarge {
                    limit,
                    detail: format!("{url}: declared length {declared}"),
                });
            }
            Some(_) => {}
        }

        // The declared length may be understated; enforce while streaming.
        read_bounded(response.bytes_stream(), limit, url).await
    }
}

/// How much of an upstream error body to keep for diagnostics.
const DIAGNOSTIC_BODY_CAP: usize = 8 * 1024;

/// Reads the body of a failed upstream response for the error detail,
/// truncated so a misbehaving upstream cannot make the error path buffer
/// unbounded bytes.
async fn diagnostic_body(response: reqwest::Response) -> String {
    let stream = response.bytes_stream();
    futures::pin_mut!(stream);

    let mut body: Vec<u8> = Vec::new();
    while let Some(Ok(chunk)) = stream.next().await {
        body.extend_from_slice(&chunk);
        if body.len() >= DIAGNOSTIC_BODY_CAP {
            body.truncate(DIAGNOSTIC_BODY_CAP);
            break;
        }
    }

    String::from_utf8_lossy(&body).into_owned()
}

/// Accumulates a byte stream, aborting as soon as the cumulative size
/// crosses the limit.
async fn read_bounded<B, E, S>(stream: S, limit: u64, origin: &str) -> ServiceResult<Vec<u8>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    futures::pin_mut!(stream);

    let cap = usize::try_from(limit).unwrap_or(usize::MAX);
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ServiceError::UpstreamUnavailable {
            status: None,
            detail: format!("{origin}: {e}"),
        })?;
        let chunk = chunk.as_ref();

        if body.len() + chunk.len() > cap {
            return Err(ServiceError::UpstreamTooLarge {
                limit,
                detail: format!("{origin}: body exceeds limit"),
            });
        }
        body.extend_from_slice(chunk);
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::io::Write;

    use futures::stream;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn feeds(max_bytes: u64) -> FeedConfig {
        FeedConfig {
            max_bytes,
            fetch_timeout_secs: 5,
            max_concurrent_fetches: 4,
        }
    }

    fn remote(url: String) -> CalendarSource {
        CalendarSource::RemoteFeed {
            url,
            auth_header: None,
            size_limit: None,
            label: "test".to_string(),
        }
    }

    #[test_log::test(tokio::test)]
    async fn fetches_a_small_remote_feed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.ics"))
            .respond_with(ResponseTemplate::new(200).set_body_string("BEGIN:VCALENDAR"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = CalendarFetcher::new(&feeds(1024)).expect("fetcher");
        let body = fetcher
            .fetch(&remote(format!("{}/feed.ics", server.uri())))
            .await
            .expect("fetch");

        assert_eq!(body, b"BEGIN:VCALENDAR");
    }

    #[test_log::test(tokio::test)]
    async fn forwards_the_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer sekrit"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = CalendarFetcher::new(&feeds(1024)).expect("fetcher");
        let source = CalendarSource::RemoteFeed {
            url: server.uri(),
            auth_header: Some("Bearer sekrit".to_string()),
            size_limit: None,
            label: "test".to_string(),
        };

        fetcher.fetch(&source).await.expect("fetch");
    }

    /// An upstream that compresses whenever the client offers to accept it,
    /// dropping the Content-Length the size gate depends on.
    struct CompressWhenOffered;

    impl wiremock::Respond for CompressWhenOffered {
        fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
            let offered = request
                .headers
                .get("accept-encoding")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("gzip"));
            if offered {
                ResponseTemplate::new(500).set_body_string("compressed without length")
            } else {
                ResponseTemplate::new(200).set_body_string("BEGIN:VCALENDAR")
            }
        }
    }

    #[test_log::test(tokio::test)]
    async fn does_not_negotiate_compression_that_hides_the_declared_length() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(CompressWhenOffered)
            .mount(&server)
            .await;

        let fetcher = CalendarFetcher::new(&feeds(1024)).expect("fetcher");
        let body = fetcher.fetch(&remote(server.uri())).await.expect("fetch");

        assert_eq!(body, b"BEGIN:VCALENDAR");
    }

    #[test_log::test(tokio::test)]
    async fn error_body_diagnostics_are_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_bytes(vec![b'e'; 64 * 1024]))
            .mount(&server)
            .await;

        let fetcher = CalendarFetcher::new(&feeds(1024)).expect("fetcher");
        let err = fetcher.fetch(&remote(server.uri())).await.unwrap_err();

        match err {
            ServiceError::UpstreamUnavailable { status, detail } => {
                assert_eq!(status, Some(503));
                assert_eq!(detail.len(), DIAGNOSTIC_BODY_CAP);
            }
            other => panic!("expected UpstreamUnavailable, got {other:?}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn non_success_status_is_unavailable_with_diagnostics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let fetcher = CalendarFetcher::new(&feeds(1024)).expect("fetcher");
        let err = fetcher.fetch(&remote(server.uri())).await.unwrap_err();

        match err {
            ServiceError::UpstreamUnavailable { status, detail } => {
                assert_eq!(status, Some(503));
                assert_eq!(detail, "maintenance");
            }
            other => panic!("expected UpstreamUnavailable, got {other:?}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn declared_length_over_bound_fails_before_reading_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4096]))
            .mount(&server)
            .await;

        let fetcher = CalendarFetcher::new(&feeds(64)).expect("fetcher");
        let err = fetcher.fetch(&remote(server.uri())).await.unwrap_err();

        match err {
            ServiceError::UpstreamTooLarge { limit, detail } => {
                assert_eq!(limit, 64);
                assert!(detail.contains("declared length 4096"), "{detail}");
            }
            other => panic!("expected UpstreamTooLarge, got {other:?}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn per_source_limit_only_tightens_the_bound() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 256]))
            .mount(&server)
            .await;

        let fetcher = CalendarFetcher::new(&feeds(1024)).expect("fetcher");
        let source = CalendarSource::RemoteFeed {
            url: server.uri(),
            auth_header: None,
            size_limit: Some(128),
            label: "test".to_string(),
        };

        let err = fetcher.fetch(&source).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::UpstreamTooLarge { limit: 128, .. }
        ));
    }

    #[test_log::test(tokio::test)]
    async fn missing_local_file_is_unavailable_for_that_source_only() {
        let fetcher = CalendarFetcher::new(&feeds(1024)).expect("fetcher");
        let source = CalendarSource::LocalFile {
            path: "/definitely/not/here.ics".into(),
            label: "gone".to_string(),
        };

        let err = fetcher.fetch(&source).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::UpstreamUnavailable { status: None, .. }
        ));
    }

    #[test_log::test(tokio::test)]
    async fn reads_a_local_file_whole() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n")
            .expect("write");

        let fetcher = CalendarFetcher::new(&feeds(1024)).expect("fetcher");
        let source = CalendarSource::LocalFile {
            path: file.path().to_path_buf(),
            label: "local".to_string(),
        };

        let body = fetcher.fetch(&source).await.expect("fetch");
        assert_eq!(body, b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n");
    }

    #[test_log::test(tokio::test)]
    async fn understated_stream_aborts_at_the_boundary() {
        // An upstream that declares less than it sends: the bounded reader
        // must abort on the chunk that crosses the limit, not buffer it all.
        let chunks: Vec<Result<Vec<u8>, Infallible>> =
            vec![Ok(vec![b'a'; 600]), Ok(vec![b'b'; 600]), Ok(vec![b'c'; 600])];

        let err = read_bounded(stream::iter(chunks), 1000, "test")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::UpstreamTooLarge { limit: 1000, .. }
        ));
    }

    #[test_log::test(tokio::test)]
    async fn bounded_read_accepts_a_body_at_the_limit() {
        let chunks: Vec<Result<Vec<u8>, Infallible>> =
            vec![Ok(vec![b'a'; 500]), Ok(vec![b'b'; 500])];

        let body = read_bounded(stream::iter(chunks), 1000, "test")
            .await
            .expect("read");
        assert_eq!(body.len(), 1000);
    }
}
