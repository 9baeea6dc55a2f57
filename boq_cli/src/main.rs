//! # boq
//!
//! Command line front end for `boq_core`: create a quote file, add rows,
//! recompute against a price file and print the bill.
//!
//! Exit codes: 0 on success, 2 for argument errors, 1 for anything else.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::logging::init_logging;

mod cli;
mod commands;
mod logging;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = init_logging(&cli.global) {
        eprintln!("{e}");
        return ExitCode::from(1);
    }
    debug!(command = ?cli.command, "boq started");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(calc) = e.downcast_ref::<boq_core::CalcError>() {
                if let Ok(json) = serde_json::to_string_pretty(calc) {
                    eprintln!();
                    eprintln!("Error JSON:");
                    eprintln!("{json}");
                }
            }
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let global = &cli.global;
    match &cli.command {
        Commands::New(args) => commands::new(args, global),
        Commands::Add(args) => commands::add(args, global),
        Commands::Settings(args) => commands::settings(args, global),
        Commands::Recompute(args) => commands::recompute_quote(args, global),
        Commands::Bill(args) => commands::bill(args),
        Commands::Summary(args) => commands::summary(args),
    }
}
