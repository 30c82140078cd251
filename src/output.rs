use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RetrieveReport};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

/// Prints progress lines to stdout as they happen.
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_summary(report: &RetrieveReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(
            stdout,
            "{} issue(s) for {}: {} written, {} skipped",
            report.issues,
            report.kind,
            report.written.len(),
            report.skipped.len()
        )?;
        for skipped in &report.skipped {
            writeln!(
                stdout,
                "  skipped {} ({}): {}",
                skipped.issue_id, skipped.subject, skipped.reason
            )?;
        }
        Ok(())
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        println!("{}", event.message);
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RetrieveReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
