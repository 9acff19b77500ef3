//! Human-readable run output: header, live progress, per-length summary.
//!
//! None of this is part of the stored result. Write errors on the progress
//! line are ignored.

use std::io::{self, Write};

use crate::config::IngestConfig;
use crate::pipeline::IngestSummary;
use crate::verify::VerifyReport;

const RULE: &str = "-------------------------------";

/// Receives the running count of accepted words.
pub trait Progress {
    /// Called after each accepted word is dispatched.
    fn on_accepted(&mut self, accepted: u64);

    /// Called once after all work has completed.
    fn finish(&mut self) {}
}

/// Discards progress updates.
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_accepted(&mut self, _accepted: u64) {}
}

/// Rewrites a `Words scanned: N` line in place.
pub struct TerminalProgress<W: Write> {
    out: W,
}

impl<W: Write> TerminalProgress<W> {
    /// Writes progress to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Progress for TerminalProgress<W> {
    fn on_accepted(&mut self, accepted: u64) {
        let _ = write!(self.out, "Words scanned: {}\r", accepted);
        let _ = self.out.flush();
    }

    fn finish(&mut self) {
        let _ = write!(self.out, "{:width$}\r", "", width = RULE.len());
        let _ = self.out.flush();
    }
}

/// Prints the run header.
pub fn write_header<W: Write>(out: &mut W, config: &IngestConfig) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Word list:   {}", config.word_list.display())?;
    writeln!(out, "LMDB file:   {}", config.db_path.display())?;
    writeln!(out, "Workers:     {}", config.workers)?;
    writeln!(out, "{}", RULE)
}

/// Prints one line per word length, then the total.
pub fn write_summary<W: Write>(out: &mut W, summary: &IngestSummary) -> io::Result<()> {
    for (len, count) in summary.counts.iter() {
        writeln!(out, "{} letter words:\t{}", len, count)?;
    }
    writeln!(out, "Total words:\t{}", summary.total_words())?;
    writeln!(out)
}

/// Prints the outcome of a verification pass.
pub fn write_verify_report<W: Write>(out: &mut W, report: &VerifyReport) -> io::Result<()> {
    writeln!(out, "Words checked:\t{}", report.checked)?;
    writeln!(out, "Words missing:\t{}", report.missing.len())?;
    for word in &report.missing {
        writeln!(out, "  missing: {}", word)?;
    }
    for key in &report.stray_buckets {
        writeln!(out, "  unexpected bucket for {}-byte words", key.word_len())?;
    }
    Ok(())
}
