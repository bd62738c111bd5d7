use indicatif::{ProgressBar, ProgressStyle};
use spindle_scanner::{Crawler, CrawlOutcome, ProgressCallback, ScanError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub seed: String,
    pub max_concurrency: usize,
    pub max_pages: usize,
    pub show_progress_bars: bool,
}

/// Execute a crawl with the given options.
///
/// Cancelling `shutdown` aborts in-flight fetches; whatever was extracted
/// before that is still returned.
pub async fn execute_crawl(
    options: CrawlOptions,
    shutdown: CancellationToken,
) -> Result<CrawlOutcome, ScanError> {
    let CrawlOptions {
        seed,
        max_concurrency,
        max_pages,
        show_progress_bars,
    } = options;

    // Single spinner for overall crawl progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let mut crawler = Crawler::new()?
        .with_max_concurrency(max_concurrency)
        .with_max_pages(max_pages);

    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        let callback: ProgressCallback = Arc::new(move |admitted: usize, url: String| {
            pb_clone.set_message(format!(
                "Crawling [{}/{}] {}",
                admitted,
                max_pages.max(1),
                extract_url_path(&url)
            ));
        });
        crawler = crawler.with_progress_callback(callback);
    }

    let result = crawler.crawl_with_cancellation(&seed, shutdown).await;

    if let Some(ref pb) = progress_bar {
        match &result {
            Ok(outcome) => pb.finish_with_message(format!(
                "Crawl complete! {} pages extracted",
                outcome.pages.len()
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    debug!("execute_crawl finished for {}", seed);
    result
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Plain-text summary of a finished crawl
pub fn generate_crawl_summary(outcome: &CrawlOutcome) -> String {
    let mut summary = String::new();
    summary.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    summary.push_str("# Summary:\n");
    summary.push_str(&format!("  Seed: {}\n", outcome.seed));
    summary.push_str(&format!("  Pages extracted: {}\n", outcome.pages.len()));
    summary.push_str(&format!("  Pages admitted: {}\n", outcome.admitted));
    summary.push_str(&format!("  Failed pages: {}\n", outcome.failed.len()));

    let total_links: usize = outcome.records().map(|r| r.outgoing_links.len()).sum();
    summary.push_str(&format!("  Total links found: {}\n", total_links));

    let total_images: usize = outcome.records().map(|r| r.image_urls.len()).sum();
    summary.push_str(&format!("  Total images found: {}\n", total_images));

    if outcome.limit_reached {
        summary.push_str("  Page limit reached\n");
    }

    if !outcome.failed.is_empty() {
        summary.push_str("\n## Failed\n");
        for key in &outcome.failed {
            summary.push_str(&format!("  {}\n", key));
        }
    }

    summary
}
