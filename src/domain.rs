use std::fmt;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RedmineError;

static RUN_ACCESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[SED]RR\d+$").expect("valid run accession regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Rnaseq,
    Dnaseq,
}

impl DatasetKind {
    /// Value of the dataset-type custom field in the tracker.
    pub fn tracker_label(&self) -> &'static str {
        match self {
            DatasetKind::Rnaseq => "RNA-seq",
            DatasetKind::Dnaseq => "DNA-seq",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Rnaseq => write!(f, "rnaseq"),
            DatasetKind::Dnaseq => write!(f, "dnaseq"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub accessions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub component: String,
    pub species: String,
    pub name: String,
    pub runs: Vec<Sample>,
}

impl Dataset {
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.species, self.name)
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.component.is_empty() {
            missing.push("component");
        }
        if self.species.is_empty() {
            missing.push("species");
        }
        if self.name.is_empty() {
            missing.push("name");
        }
        missing
    }
}

/// Parses the `Sample Names` text: one `name: acc1, acc2, ...` entry per line.
///
/// Blank lines are ignored, but a text with no entry at all is an error.
pub fn parse_samples(text: &str) -> Result<Vec<Sample>, RedmineError> {
    if text.trim().is_empty() {
        return Err(RedmineError::SampleLine(
            "sample line doesn't have 2 parts: ''".to_string(),
        ));
    }

    let mut samples = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts = line.split(':').collect::<Vec<_>>();
        match parts.as_slice() {
            [name, accessions] => {
                let accessions = accessions
                    .split(',')
                    .map(|acc| acc.trim().to_string())
                    .collect::<Vec<_>>();
                for acc in &accessions {
                    if !looks_like_run_accession(acc) {
                        tracing::warn!(sample = name.trim(), accession = %acc, "unusual run accession");
                    }
                }
                samples.push(Sample {
                    name: name.trim().to_string(),
                    accessions,
                });
            }
            [_] => {
                return Err(RedmineError::SampleLine(format!(
                    "sample line doesn't have 2 parts: '{line}'"
                )));
            }
            _ => {
                return Err(RedmineError::SampleLine(format!(
                    "more than two parts (sample name may have a ':' in it): '{line}'"
                )));
            }
        }
    }

    Ok(samples)
}

pub fn looks_like_run_accession(value: &str) -> bool {
    RUN_ACCESSION.is_match(value)
}
