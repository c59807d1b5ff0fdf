//! `assetbook`: scheduling trigger and operator tool for the depreciation engine.

mod cli;
mod commands;
mod workspace;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();
    assetbook_observability::init(cli.log_format);
    commands::dispatch(cli)
}
