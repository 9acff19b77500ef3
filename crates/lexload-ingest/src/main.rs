#![warn(missing_docs)]

//! lexload: bulk-load a word list into an LMDB file, one bucket per word length

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use lexload_ingest::cli::Cli;
use lexload_ingest::report::{self, NoProgress, Progress, TerminalProgress};
use lexload_ingest::{ingest_file, verify_file};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.to_config()?;
    config.validate()?;

    let stdout = io::stdout();
    if !cli.quiet {
        report::write_header(&mut stdout.lock(), &config)?;
    }

    let mut progress: Box<dyn Progress> = if cli.quiet {
        Box::new(NoProgress)
    } else {
        Box::new(TerminalProgress::new(io::stdout()))
    };
    let (summary, store) = ingest_file(&config, progress.as_mut())
        .with_context(|| format!("loading {}", config.word_list.display()))?;
    // Close the store before verification reopens the file.
    drop(store);

    if !cli.quiet {
        report::write_summary(&mut stdout.lock(), &summary)?;
    }
    if let Some(batches) = &summary.batches {
        tracing::info!(
            "{} transactions committed, largest batch {} writes",
            batches.batches_committed,
            batches.largest_batch
        );
    }

    if cli.verify {
        let verified = verify_file(&config).context("verifying store")?;
        if !cli.quiet {
            report::write_verify_report(&mut stdout.lock(), &verified)?;
        }
        if !verified.is_complete() {
            anyhow::bail!(
                "verification failed: {} words missing, {} unexpected buckets",
                verified.missing.len(),
                verified.stray_buckets.len()
            );
        }
    }

    stdout.lock().flush()?;
    Ok(())
}
