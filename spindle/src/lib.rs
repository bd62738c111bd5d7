pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{CrawlArgs, clamp_limit, handle_crawl, parse_crawl_args, resolve_report_path};

// Re-export crawl functionality from spindle-core
pub use spindle_core::crawl::{CrawlOptions, execute_crawl, generate_crawl_summary};
