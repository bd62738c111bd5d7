use crate::error::{Result, ScanError};
use crate::normalize::host_key;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const USER_AGENT: &str = concat!("Spindle/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const MAX_REDIRECTS: usize = 5;

/// A retrieved page and the address it was finally served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Differs from the requested address when a redirect was followed.
    pub url: String,
    pub body: String,
}

/// One retrieval of one address. The crawler only ever talks to this trait.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the page, or fails with `HttpStatus`, `UnsupportedContent`,
    /// `OffHostRedirect` or `Cancelled`. Implementations must not retry.
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<FetchedPage>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(same_host_redirects())
            .build()?;

        Ok(Self { client })
    }

    async fn retrieve(&self, url: &str) -> Result<FetchedPage> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;

        // only an off-host hop is left unfollowed by the redirect policy
        if response.status().is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Err(ScanError::OffHostRedirect {
                url: url.to_string(),
                location,
            });
        }

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(ScanError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if !is_markup(content_type.as_deref()) {
            return Err(ScanError::UnsupportedContent {
                url: url.to_string(),
                content_type,
            });
        }

        let final_url = response.url().to_string();
        if final_url != url {
            debug!("{} redirected to {}", url, final_url);
        }

        Ok(FetchedPage {
            url: final_url,
            body: response.text().await?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<FetchedPage> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled(url.to_string()));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScanError::Cancelled(url.to_string())),
            page = self.retrieve(url) => page,
        }
    }
}

/// Follows redirects only while they stay on the host of the first request.
/// An off-host hop is stopped and its 3xx response handed back.
fn same_host_redirects() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }

        let origin = attempt.previous().first().and_then(host_key);
        let target = host_key(attempt.url());
        if origin.is_some() && origin == target {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

/// `text/*` or XHTML. A missing header is not markup.
fn is_markup(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime.starts_with("text/") || mime == "application/xhtml+xml"
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    #[test]
    fn test_is_markup() {
        assert!(is_markup(Some("text/html")));
        assert!(is_markup(Some("text/html; charset=utf-8")));
        assert!(is_markup(Some("TEXT/HTML")));
        assert!(is_markup(Some("application/xhtml+xml")));
        assert!(!is_markup(Some("application/json")));
        assert!(!is_markup(Some("image/png")));
        assert!(!is_markup(None));
    }

    #[tokio::test]
    async fn test_fetch_html_with_user_agent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>Hello</body></html>", "text/html"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let page = fetcher
            .fetch(&mock_server.uri(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(page.body.contains("Hello"));
        assert_eq!(page.url, format!("{}/", mock_server.uri()));
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/missing", mock_server.uri());
        let err = fetcher
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_unsupported_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/data.json", mock_server.uri());
        let err = fetcher
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ScanError::UnsupportedContent { content_type, .. } => {
                assert_eq!(content_type.as_deref(), Some("application/json"));
            }
            other => panic!("expected UnsupportedContent, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_already_cancelled() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>x</p>", "text/html"))
            .expect(0)
            .mount(&mock_server)
            .await;

        let token = CancellationToken::new();
        token.cancel();

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(&mock_server.uri(), &token).await.unwrap_err();

        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_fetch_cancelled_in_flight() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<p>slow</p>", "text/html")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(&mock_server.uri(), &token).await.unwrap_err();

        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_fetch_follows_same_host_redirect() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/docs/"))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/docs/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>docs</p>", "text/html"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/old", mock_server.uri());
        let page = fetcher.fetch(&url, &CancellationToken::new()).await.unwrap();

        assert_eq!(page.url, format!("{}/docs/", mock_server.uri()));
        assert!(page.body.contains("docs"));
    }

    #[tokio::test]
    async fn test_fetch_stops_off_host_redirect() {
        let mock_server = MockServer::start().await;
        let other_server = MockServer::start().await;

        // same machine, but a different host name
        let location = format!("http://localhost:{}/secret", other_server.address().port());

        Mock::given(method("GET"))
            .and(path("/r"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", location.as_str()))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<h1>Other</h1>", "text/html"))
            .expect(0)
            .mount(&other_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/r", mock_server.uri());
        let err = fetcher
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ScanError::OffHostRedirect { url: from, location: to } => {
                assert_eq!(from, url);
                assert_eq!(to, location);
            }
            other => panic!("expected OffHostRedirect, got {:?}", other),
        }
        assert!(other_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_redirect_loop_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/loop", mock_server.uri());
        let err = fetcher
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::HttpError(_)));
    }
}
