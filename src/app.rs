use std::io::{Seek, Write};
use std::sync::Arc;

use serde::Serialize;

use crate::archive::ArchiveWriter;
use crate::config::PipelineConfig;
use crate::domain::{FailureRecord, FetchOutcome, FetchTask};
use crate::error::PackError;
use crate::fetcher::ImageClient;
use crate::ledger::{DisplayRow, ExportRow, FailureLedger};
use crate::normalize::{ColumnLayout, normalize_rows};
use crate::pool::WorkerPool;
use crate::progress::{FailureNotice, ProgressSink, ProgressState, ProgressTracker};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Validating,
    Running,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub export: Vec<ExportRow>,
    pub display: Vec<DisplayRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub skipped: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub archive_entries: usize,
    pub started_at: String,
    pub finished_at: String,
    pub failures: Option<FailureReport>,
}

/// What a completed run hands back: the sealed archive sink and its summary.
#[derive(Debug)]
pub struct RunReport<W> {
    pub archive: W,
    pub summary: RunSummary,
}

/// Drives one run at a time: validate the table, fan the tasks out over the
/// worker pool, and route each outcome to the archive or the failure ledger.
///
/// The ledger and progress of the last run stay on the `App` until the next
/// [`App::run`] resets them.
pub struct App<C: ImageClient + 'static> {
    config: PipelineConfig,
    client: Arc<C>,
    pool: WorkerPool,
    state: RunState,
    ledger: FailureLedger,
    progress: ProgressTracker,
}

impl<C: ImageClient + 'static> App<C> {
    pub fn new(config: PipelineConfig, client: C) -> Self {
        let pool = WorkerPool::new(config.concurrency);
        Self {
            config,
            client: Arc::new(client),
            pool,
            state: RunState::Idle,
            ledger: FailureLedger::new(),
            progress: ProgressTracker::default(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    pub fn progress(&self) -> ProgressState {
        self.progress.state()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run<W: Write + Seek>(
        &mut self,
        table: &Table,
        archive_sink: W,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport<W>, PackError> {
        let started_at = iso_timestamp();
        self.state = RunState::Validating;
        let layout = match ColumnLayout::locate(table) {
            Ok(layout) => layout,
            Err(err) => {
                self.state = RunState::Idle;
                return Err(err);
            }
        };

        self.ledger.reset();
        let normalized = normalize_rows(table, layout);
        let total = normalized.tasks.len();
        self.progress.reset(total);
        tracing::info!(
            tasks = total,
            skipped = normalized.skipped,
            workers = self.pool.concurrency(),
            "starting image fetch run"
        );

        self.state = RunState::Running;
        match self.drain(normalized.tasks, archive_sink, sink) {
            Ok((archive, success_count, archive_entries)) => {
                self.state = RunState::Completed;
                let failures = (!self.ledger.is_empty()).then(|| FailureReport {
                    export: self.ledger.export_rows(),
                    display: self.ledger.display_rows(),
                });
                tracing::info!(
                    succeeded = success_count,
                    failed = self.ledger.len(),
                    "image fetch run completed"
                );
                Ok(RunReport {
                    archive,
                    summary: RunSummary {
                        total,
                        skipped: normalized.skipped,
                        success_count,
                        failure_count: self.ledger.len(),
                        archive_entries,
                        started_at,
                        finished_at: iso_timestamp(),
                        failures,
                    },
                })
            }
            Err(err) => {
                self.state = RunState::Idle;
                Err(err)
            }
        }
    }

    fn drain<W: Write + Seek>(
        &mut self,
        tasks: Vec<FetchTask>,
        archive_sink: W,
        sink: &dyn ProgressSink,
    ) -> Result<(W, usize, usize), PackError> {
        let mut writer = ArchiveWriter::new(archive_sink);
        let client: Arc<dyn ImageClient> = self.client.clone();
        let completions = self.pool.submit(tasks, client)?;

        let mut success_count = 0usize;
        for outcome in completions {
            match outcome {
                FetchOutcome::Success {
                    sanitized_name,
                    bytes,
                    ..
                } => {
                    writer.add(sanitized_name.with_extension(&self.config.extension), bytes);
                    success_count += 1;
                }
                FetchOutcome::Failure {
                    row_index,
                    sanitized_name,
                    source_url,
                    reason,
                } => {
                    tracing::warn!(
                        row = row_index,
                        item = %sanitized_name,
                        reason = %reason,
                        "image fetch failed"
                    );
                    sink.warn(&FailureNotice {
                        row_index,
                        name: sanitized_name.as_str(),
                        reason: &reason,
                    });
                    self.ledger.record(FailureRecord {
                        row_index,
                        display_name: sanitized_name.as_str().to_string(),
                        source_url,
                        reason,
                    });
                }
            }
            if let Some(state) = self.progress.advance() {
                sink.progress(state);
            }
        }

        let archive_entries = writer.len();
        let archive = writer.finish()?;
        Ok((archive, success_count, archive_entries))
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::domain::FailureReason;
    use crate::progress::NoProgress;

    struct Echo;

    impl ImageClient for Echo {
        fn get(&self, url: &str) -> Result<Vec<u8>, FailureReason> {
            if url.ends_with("missing") {
                return Err(FailureReason::Status(404));
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    fn table(rows: &[(&str, Option<&str>)]) -> Table {
        Table::new(
            vec!["Item".to_string(), "URL".to_string()],
            rows.iter()
                .map(|(item, url)| vec![Some(item.to_string()), url.map(str::to_string)])
                .collect(),
        )
    }

    #[test]
    fn missing_columns_returns_to_idle() {
        let mut app = App::new(PipelineConfig::default(), Echo);
        let table = Table::new(vec!["Item".to_string()], Vec::new());
        let err = app
            .run(&table, Cursor::new(Vec::new()), &NoProgress)
            .unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(app.state(), RunState::Idle);
    }

    #[test]
    fn ledger_is_reset_between_runs() {
        let mut app = App::new(PipelineConfig::default(), Echo);
        let first = table(&[("a", Some("http://x/missing"))]);
        app.run(&first, Cursor::new(Vec::new()), &NoProgress).unwrap();
        assert_eq!(app.ledger().len(), 1);
        assert_eq!(app.state(), RunState::Completed);

        let second = table(&[("b", Some("http://x/b"))]);
        let report = app.run(&second, Cursor::new(Vec::new()), &NoProgress).unwrap();
        assert!(app.ledger().is_empty());
        assert!(report.summary.failures.is_none());
        assert_eq!(app.progress(), ProgressState { completed: 1, total: 1 });
    }
}
