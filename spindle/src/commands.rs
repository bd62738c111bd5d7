use clap::{arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("spindle")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("spindle")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress the progress spinner and non-essential output")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl every page reachable from a seed URL on the same host and write a \
                report of titles, lead paragraphs, links and images.",
                )
                .allow_negative_numbers(true)
                .arg(
                    arg!(<SEED> "The URL to start crawling from")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!([MAX_CONCURRENCY] "Maximum number of fetches in flight at once")
                        .value_parser(clap::value_parser!(i64))
                        .default_value("5"),
                )
                .arg(
                    arg!([MAX_PAGES] "Maximum number of distinct pages to visit")
                        .value_parser(clap::value_parser!(i64))
                        .default_value("20"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the report (default: report.csv in the working directory)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: csv, json")
                        .value_parser(["csv", "json"])
                        .default_value("csv"),
                ),
        )
}
