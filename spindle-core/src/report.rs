// Report generation from crawl outcomes

use spindle_scanner::CrawlOutcome;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_REPORT_NAME: &str = "report.csv";
pub const DEFAULT_JSON_REPORT_NAME: &str = "report.json";

const CSV_HEADERS: [&str; 5] = [
    "page_url",
    "h1",
    "first_paragraph",
    "outgoing_link_urls",
    "image_urls",
];
const LIST_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ReportFormat::Csv),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            ReportFormat::Csv => DEFAULT_REPORT_NAME,
            ReportFormat::Json => DEFAULT_JSON_REPORT_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    Written(PathBuf),
    /// Nothing was extracted, so no file was created.
    Empty,
}

/// One header row plus one row per extracted page, `\n` terminated.
/// Fields are quoted only when they hold a delimiter, a quote or a line break.
pub fn render_csv_report(outcome: &CrawlOutcome) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;
    for page in outcome.records() {
        writer.write_record([
            page.url.as_str(),
            page.h1.as_str(),
            page.first_paragraph.as_str(),
            page.outgoing_links.join(LIST_SEPARATOR).as_str(),
            page.image_urls.join(LIST_SEPARATOR).as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
}

pub fn render_json_report(outcome: &CrawlOutcome) -> Result<String, serde_json::Error> {
    let total_links: usize = outcome.records().map(|r| r.outgoing_links.len()).sum();
    let total_images: usize = outcome.records().map(|r| r.image_urls.len()).sum();

    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Spindle",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "summary": {
                "seed": outcome.seed,
                "pages_extracted": outcome.pages.len(),
                "pages_admitted": outcome.admitted,
                "failed_pages": outcome.failed,
                "limit_reached": outcome.limit_reached,
                "total_links": total_links,
                "total_images": total_images
            },
            "pages": outcome.records().collect::<Vec<_>>()
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Renders and saves the report. An outcome without pages writes nothing.
pub fn write_report(
    outcome: &CrawlOutcome,
    path: &Path,
    format: ReportFormat,
) -> io::Result<ReportStatus> {
    if outcome.is_empty() {
        info!("No pages extracted, skipping report");
        return Ok(ReportStatus::Empty);
    }

    let content = match format {
        ReportFormat::Csv => render_csv_report(outcome)?,
        ReportFormat::Json => render_json_report(outcome)?,
    };
    save_report(&content, path)?;

    info!("Report written to {}", path.display());
    Ok(ReportStatus::Written(path.to_path_buf()))
}
