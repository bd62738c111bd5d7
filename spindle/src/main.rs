use anyhow::{Context, Result};
use clap::error::ErrorKind;
use spindle::commands::command_argument_builder;
use spindle::handlers::{handle_crawl, parse_crawl_args};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let chosen_command = match command_argument_builder().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    e.print().context("failed to print help")?;
                    Ok(0)
                }
                // usage errors, including a bare `spindle`, go to stderr
                _ => {
                    eprint!("{}", e.render());
                    Ok(1)
                }
            };
        }
    };

    init_tracing();

    match chosen_command.subcommand() {
        Some(("crawl", sub_matches)) => {
            let args = match parse_crawl_args(sub_matches) {
                Ok(args) => args,
                Err(message) => {
                    eprintln!("{}", message);
                    eprintln!("{}", command_argument_builder().render_usage());
                    return Ok(1);
                }
            };

            let shutdown = CancellationToken::new();
            let ctrl_c_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("\nInterrupted, stopping crawl...");
                    ctrl_c_token.cancel();
                }
            });

            Ok(handle_crawl(args, shutdown).await)
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
