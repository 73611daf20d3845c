mod cli;
mod commands;
mod config;
mod formatter;

use std::process;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to build tokio runtime: {}", e);
            process::exit(1);
        }
    };

    rt.block_on(run_cli());
}

async fn run_cli() {
    let cli = Cli::parse();

    // Initialize tracing based on --debug flag
    let level = if cli.global.debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        cli::Commands::Project(args) => commands::project::execute(args, &cli.global).await,
        cli::Commands::Query(args) => commands::query::execute(args, &cli.global).await,
        cli::Commands::Backup(args) => commands::backup::execute(args, &cli.global).await,
        cli::Commands::Restore(args) => commands::restore::execute(args, &cli.global).await,
        cli::Commands::Status(args) => commands::status::execute(args, &cli.global).await,
        cli::Commands::Connection(args) => commands::connection::execute(args, &cli.global).await,
    };

    if let Err(error) = result {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
}
