mod args;
mod commands;
mod render;
mod transport;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use todo_core::{CacheConfig, QueryCache, QueryClient, TodoClient};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::args::Cli;
use crate::transport::UreqTransport;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(api_url = %cli.api_url, "starting");

    let client = QueryClient::new(
        TodoClient::new(&cli.api_url),
        UreqTransport::new(),
        Arc::new(QueryCache::new(CacheConfig::default())),
    );

    let mut out = std::io::stdout().lock();
    match commands::run(&client, cli.command, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
