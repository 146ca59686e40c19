//! # homelabctl binary entry point
//!
//! A thin wrapper around the library: parse arguments, execute the command,
//! and translate failures into the structured error report. Exit code is
//! `0` on complete success and `1` on any fatal error.

mod cli;
mod commands;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    let colors = cli.output_config();

    if let Err(err) = cli.execute() {
        // Structured errors carry their own context and suggestions; the
        // formatter is the only place color is applied.
        match err.downcast_ref::<homelabctl::error::Error>() {
            Some(structured) => eprint!("{}", structured.render(&colors)),
            None => eprintln!("Error: {err:#}"),
        }
        std::process::exit(1);
    }
}
