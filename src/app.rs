use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::DatasetKind;
use crate::error::RedmineError;
use crate::extract::parse_dataset;
use crate::query::get_issues;
use crate::redmine::{Issue, RedmineClient};
use crate::store::OutputStore;

#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    pub kind: DatasetKind,
    pub build: Option<u32>,
    pub project_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrieveReport {
    pub kind: DatasetKind,
    pub build: Option<u32>,
    pub output_dir: String,
    pub issues: usize,
    pub written: Vec<WrittenDataset>,
    pub skipped: Vec<SkippedIssue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenDataset {
    pub issue_id: u64,
    pub path: String,
    pub runs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedIssue {
    pub issue_id: u64,
    pub subject: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<C: RedmineClient> {
    client: C,
    store: OutputStore,
}

impl<C: RedmineClient> App<C> {
    pub fn new(client: C, store: OutputStore) -> Self {
        Self { client, store }
    }

    /// Queries the tracker and writes one file per well-formed dataset.
    ///
    /// Tracker and output-directory failures abort the run; anything that
    /// only concerns a single issue is recorded in `skipped`.
    pub fn retrieve(
        &self,
        options: &RetrieveOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RetrieveReport, RedmineError> {
        let issues = get_issues(&self.client, options.kind, options.build, options.project_id)?;
        let mut report = RetrieveReport {
            kind: options.kind,
            build: options.build,
            output_dir: self.store.root().to_string(),
            issues: issues.len(),
            written: Vec::new(),
            skipped: Vec::new(),
        };

        if issues.is_empty() {
            sink.event(ProgressEvent {
                message: "No files to create".to_string(),
            });
            return Ok(report);
        }

        self.store.ensure_root()?;

        for issue in &issues {
            sink.event(ProgressEvent {
                message: format!("Parsing issue {} ({})", issue.id, issue.subject),
            });
            match self.process_issue(issue, sink) {
                Ok((path, runs)) => {
                    sink.event(ProgressEvent {
                        message: path.to_string(),
                    });
                    report.written.push(WrittenDataset {
                        issue_id: issue.id,
                        path: path.to_string(),
                        runs,
                    });
                }
                Err(err) if err.is_per_issue() => {
                    tracing::debug!(issue = issue.id, error = %err, "skipping issue");
                    sink.event(ProgressEvent {
                        message: format!("Skipped issue {} ({}). {err}.", issue.id, issue.subject),
                    });
                    report.skipped.push(SkippedIssue {
                        issue_id: issue.id,
                        subject: issue.subject.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            "retrieval finished"
        );
        Ok(report)
    }

    fn process_issue(
        &self,
        issue: &Issue,
        sink: &dyn ProgressSink,
    ) -> Result<(Utf8PathBuf, usize), RedmineError> {
        let dataset = parse_dataset(issue, sink)?;
        let path = self.store.write_dataset(&dataset)?;
        Ok((path, dataset.runs.len()))
    }
}
