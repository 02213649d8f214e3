use std::io::{self, Write};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::app::RunSummary;
use crate::progress::{FailureNotice, ProgressSink, ProgressState};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
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
    fn progress(&self, _state: ProgressState) {}
}

/// Progress bar on stderr. Failures are printed above the bar as they
/// arrive; when stderr is not a terminal the bar stays hidden and failures
/// go out as plain lines.
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    pub fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn progress(&self, state: ProgressState) {
        self.bar.set_length(state.total as u64);
        self.bar.set_position(state.completed as u64);
        if state.is_done() {
            self.bar.finish();
        }
    }

    fn warn(&self, notice: &FailureNotice<'_>) {
        let line = format!(
            "warning: could not fetch {} (row {}): {}",
            notice.name, notice.row_index, notice.reason
        );
        if self.bar.is_hidden() {
            eprintln!("{line}");
        } else {
            self.bar.println(line);
        }
    }
}

pub fn print_summary(summary: &RunSummary) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}imgpack summary{reset}");
    println!(
        "{green}downloaded {} of {} image(s){reset}",
        summary.success_count, summary.total
    );
    if summary.skipped > 0 {
        println!("{cyan}rows without URL: {}{reset}", summary.skipped);
    }
    if summary.archive_entries < summary.success_count {
        println!(
            "{yellow}{} image(s) shared a file name and were overwritten{reset}",
            summary.success_count - summary.archive_entries
        );
    }

    let Some(failures) = &summary.failures else {
        return;
    };
    println!("{yellow}failed: {}{reset}", summary.failure_count);
    let name_width = failures
        .display
        .iter()
        .map(|row| row.item.chars().count())
        .max()
        .unwrap_or(0)
        .max("Item".len());
    println!("{yellow}{:>5}  {:<name_width$}  URL{reset}", "Row", "Item");
    for row in &failures.display {
        println!(
            "{yellow}{:>5}  {:<name_width$}  {} ({}){reset}",
            row.row, row.item, row.url, row.reason
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use indicatif::ProgressDrawTarget;

    fn hidden() -> TerminalProgress {
        TerminalProgress::with_bar(ProgressBar::with_draw_target(
            Some(0),
            ProgressDrawTarget::hidden(),
        ))
    }

    #[test]
    fn bar_tracks_completed_and_total() {
        let progress = hidden();
        progress.progress(ProgressState {
            completed: 1,
            total: 2,
        });
        assert_eq!(progress.bar().position(), 1);
        assert_eq!(progress.bar().length(), Some(2));
        assert!(!progress.bar().is_finished());

        progress.progress(ProgressState {
            completed: 2,
            total: 2,
        });
        assert!(progress.bar().is_finished());
    }
}
