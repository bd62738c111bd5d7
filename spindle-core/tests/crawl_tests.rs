// Tests for crawl orchestration

use spindle_core::crawl::{CrawlOptions, execute_crawl, extract_url_path, generate_crawl_summary};
use spindle_scanner::{CrawlOutcome, PageRecord, ScanError};
use tokio_util::sync::CancellationToken;

// ============================================================================
// URL Path Extraction Tests
// ============================================================================

#[test]
fn test_extract_url_path_root() {
    assert_eq!(extract_url_path("http://example.com/"), "/");
    assert_eq!(extract_url_path("http://example.com"), "/");
}

#[test]
fn test_extract_url_path_nested() {
    assert_eq!(extract_url_path("http://example.com/api/v1/users"), "/api/v1/users");
}

#[test]
fn test_extract_url_path_with_query_and_fragment() {
    assert_eq!(extract_url_path("http://example.com/api?key=value#top"), "/api");
}

#[test]
fn test_extract_url_path_invalid_url() {
    let url = "not a valid url";
    assert_eq!(extract_url_path(url), url);
}

// ============================================================================
// Summary Tests
// ============================================================================

#[test]
fn test_generate_crawl_summary() {
    let mut outcome = CrawlOutcome {
        seed: "https://example.com".to_string(),
        admitted: 2,
        failed: vec!["example.com/gone".to_string()],
        limit_reached: true,
        ..Default::default()
    };
    outcome.pages.insert(
        "example.com".to_string(),
        PageRecord {
            url: "https://example.com".to_string(),
            h1: "Home".to_string(),
            first_paragraph: String::new(),
            outgoing_links: vec![
                "https://example.com/gone".to_string(),
                "https://elsewhere.com/".to_string(),
            ],
            image_urls: vec!["https://example.com/a.png".to_string()],
        },
    );

    let summary = generate_crawl_summary(&outcome);

    assert!(summary.contains("Pages extracted: 1"));
    assert!(summary.contains("Pages admitted: 2"));
    assert!(summary.contains("Failed pages: 1"));
    assert!(summary.contains("Total links found: 2"));
    assert!(summary.contains("Total images found: 1"));
    assert!(summary.contains("Page limit reached"));
    assert!(summary.contains("example.com/gone"));
}

#[test]
fn test_generate_crawl_summary_empty() {
    let summary = generate_crawl_summary(&CrawlOutcome::default());
    assert!(summary.contains("Pages extracted: 0"));
    assert!(!summary.contains("Page limit reached"));
    assert!(!summary.contains("## Failed"));
}

// ============================================================================
// Execution Tests (no network)
// ============================================================================

#[tokio::test]
async fn test_execute_crawl_invalid_seed() {
    let options = CrawlOptions {
        seed: "definitely not a url".to_string(),
        max_concurrency: 2,
        max_pages: 5,
        show_progress_bars: false,
    };

    let result = execute_crawl(options, CancellationToken::new()).await;

    assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
}

#[tokio::test]
async fn test_execute_crawl_cancelled_returns_empty() {
    let token = CancellationToken::new();
    token.cancel();

    let options = CrawlOptions {
        seed: "http://127.0.0.1:9/".to_string(),
        max_concurrency: 2,
        max_pages: 5,
        show_progress_bars: false,
    };

    let outcome = execute_crawl(options, token).await.unwrap();

    assert!(outcome.is_empty());
    assert_eq!(outcome.admitted, 0);
}
