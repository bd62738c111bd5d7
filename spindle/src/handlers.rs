use clap::ArgMatches;
use colored::Colorize;
use spindle_core::crawl::{CrawlOptions, execute_crawl, generate_crawl_summary};
use spindle_core::report::{ReportFormat, ReportStatus, write_report};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Parsed `crawl` subcommand arguments.
#[derive(Debug, Clone)]
pub struct CrawlArgs {
    pub seed: Url,
    pub max_concurrency: usize,
    pub max_pages: usize,
    pub report_path: PathBuf,
    pub format: ReportFormat,
    pub quiet: bool,
}

/// Limits below 1 are clamped up to 1.
pub fn clamp_limit(value: i64) -> usize {
    usize::try_from(value.max(1)).unwrap_or(usize::MAX)
}

/// `--output` if given, otherwise the format's default name in the
/// working directory.
pub fn resolve_report_path(output: Option<&PathBuf>, format: ReportFormat) -> PathBuf {
    match output {
        Some(path) => path.clone(),
        None => PathBuf::from(format.default_file_name()),
    }
}

pub fn parse_crawl_args(sub_matches: &ArgMatches) -> Result<CrawlArgs, String> {
    let seed = sub_matches
        .get_one::<Url>("SEED")
        .cloned()
        .ok_or_else(|| "A seed URL is required".to_string())?;

    let max_concurrency = sub_matches
        .get_one::<i64>("MAX_CONCURRENCY")
        .copied()
        .map(clamp_limit)
        .unwrap_or(spindle_scanner::DEFAULT_MAX_CONCURRENCY);
    let max_pages = sub_matches
        .get_one::<i64>("MAX_PAGES")
        .copied()
        .map(clamp_limit)
        .unwrap_or(spindle_scanner::DEFAULT_MAX_PAGES);

    let format_name = sub_matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("csv");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| format!("Unknown report format '{}'", format_name))?;

    let report_path = resolve_report_path(sub_matches.get_one::<PathBuf>("output"), format);

    Ok(CrawlArgs {
        seed,
        max_concurrency,
        max_pages,
        report_path,
        format,
        quiet: sub_matches.get_flag("quiet"),
    })
}

/// Runs a crawl and writes its report. Returns the process exit code.
pub async fn handle_crawl(args: CrawlArgs, shutdown: CancellationToken) -> i32 {
    let CrawlArgs {
        seed,
        max_concurrency,
        max_pages,
        report_path,
        format,
        quiet,
    } = args;

    if !quiet {
        println!("\n{} {}", "Crawling".bright_cyan().bold(), seed.as_str().bright_white());
        println!("Max concurrency: {}", max_concurrency);
        println!("Max pages: {}\n", max_pages);
    }

    let options = CrawlOptions {
        seed: seed.as_str().to_string(),
        max_concurrency,
        max_pages,
        show_progress_bars: !quiet,
    };

    let outcome = match execute_crawl(options, shutdown).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} Crawl failed: {}", "✗".red().bold(), e);
            return 1;
        }
    };

    if !quiet {
        println!("\n{}", generate_crawl_summary(&outcome));
    }

    report_outcome(write_report(&outcome, &report_path, format), &report_path);
    0
}

/// Report I/O problems go to stderr; they never change the exit code.
fn report_outcome(result: std::io::Result<ReportStatus>, path: &Path) {
    match result {
        Ok(ReportStatus::Written(written)) => {
            println!("{} Report written to {}", "✓".green().bold(), written.display());
        }
        Ok(ReportStatus::Empty) => {
            println!("{} No pages extracted, no report written", "→".yellow().bold());
        }
        Err(e) => {
            debug!("report write failed: {:?}", e);
            eprintln!(
                "{} Failed to write report to {}: {}",
                "✗".red().bold(),
                path.display(),
                e
            );
        }
    }
}
