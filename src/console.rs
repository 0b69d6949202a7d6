//! User-facing progress lines on stdout.

use driveback_ops::{BackupEvent, BackupReport, ProgressSink, RunOutcome, RunPhase};

/// Prints one line per copied file as the run goes.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn on_event(&mut self, event: &BackupEvent) {
        match event {
            BackupEvent::PhaseChanged(RunPhase::Scanning) => println!("Scanning for files..."),
            BackupEvent::PhaseChanged(RunPhase::Archiving) => println!("Creating archive..."),
            BackupEvent::FileCopied { relative, bytes } => {
                println!("Copied: {relative} ({})", format_size(*bytes));
            }
            _ => {}
        }
    }
}

/// Print the closing summary line for a finished run.
pub fn print_summary(report: &BackupReport) {
    println!("{}", summary_line(report));
}

fn summary_line(report: &BackupReport) -> String {
    match &report.outcome {
        RunOutcome::NothingNew => "No new files to back up.".to_string(),
        RunOutcome::Archived(info) => {
            format!("Archive saved: {} ({} bytes)", info.name, info.size_bytes)
        }
        RunOutcome::Staged { dir } => format!(
            "{} new file(s) ({}) left in {}",
            report.copied,
            format_size(report.bytes_copied),
            dir.display()
        ),
    }
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
