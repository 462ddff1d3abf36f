//! packfs CLI Binary
//!
//! Command-line interface for packing, inspecting and serving bundles.

use anyhow::Context;
use clap::Parser;
use packfs::logging::init_logging;
use packfs::tooling::cli::{Cli, CliContext, Commands};
use std::io::Write;
use std::process;

fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let logging = cli.logging_config(context.config().logging.clone());
    if let Err(e) = init_logging(Some(&logging)) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&context, &cli.command) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(context: &CliContext, command: &Commands) -> anyhow::Result<()> {
    match command {
        // raw bytes, so binary files survive
        Commands::Cat { bundle, path } => {
            let content = context
                .read_file(bundle, path)
                .with_context(|| format!("cannot read {} from {}", path, bundle.display()))?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
        }
        command => {
            let output = context.execute(command)?;
            if !output.is_empty() {
                println!("{}", output);
            }
        }
    }
    Ok(())
}
