//! tmplc - compile and render tmpl templates.

use clap::Parser;
use miette::Result;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;
mod config;
mod orchestrator;
mod output;

use cli::Args;
use orchestrator::Orchestrator;

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose);

    // Set up miette for nice error output
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    match run(args) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// Route library `tracing` events through `env_logger`; `RUST_LOG` wins.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    let root = args
        .templates
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    // Capture watch flag before moving args
    let watch = args.watch;

    let mut orchestrator = Orchestrator::new(root, args)?;

    if watch {
        orchestrator.run_watch_mode()?;
        Ok(ExitCode::SUCCESS)
    } else {
        let result = orchestrator.run_once()?;

        if result.error_count > 0 {
            Ok(ExitCode::from(1))
        } else {
            Ok(ExitCode::SUCCESS)
        }
    }
}
