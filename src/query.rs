use std::collections::BTreeMap;

use crate::domain::DatasetKind;
use crate::error::RedmineError;
use crate::redmine::{Issue, RedmineClient};

pub const STATUS_NAME: &str = "Data Processing (EBI)";
pub const PROCESSING_STAGE_FIELD: &str = "cf_17";
pub const DATASET_TYPE_FIELD: &str = "cf_94";
pub const FIXED_VERSION_FIELD: &str = "fixed_version_id";

/// Field name to value mapping sent to the tracker as query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    fields: BTreeMap<String, String>,
}

impl IssueFilter {
    /// Fixed base filter every query starts from.
    pub fn base() -> Self {
        let mut filter = Self::default();
        filter.set("status_name", STATUS_NAME);
        filter.set(PROCESSING_STAGE_FIELD, STATUS_NAME);
        filter
    }

    /// Later values replace earlier ones for the same field.
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

pub fn build_filter<C: RedmineClient>(
    client: &C,
    kind: DatasetKind,
    build: Option<u32>,
    project_id: u64,
) -> Result<IssueFilter, RedmineError> {
    let mut filter = IssueFilter::base();
    filter.set(DATASET_TYPE_FIELD, kind.tracker_label());

    if let Some(build) = build {
        let ids = resolve_build(client, build, project_id)?;
        let joined = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join("|");
        filter.set(FIXED_VERSION_FIELD, joined);
    }

    Ok(filter)
}

/// Ids of every version of the project named exactly `Build <n>`.
pub fn resolve_build<C: RedmineClient>(
    client: &C,
    build: u32,
    project_id: u64,
) -> Result<Vec<u64>, RedmineError> {
    let version_name = format!("Build {build}");
    let ids = client
        .list_versions(project_id)?
        .into_iter()
        .filter(|version| version.name == version_name)
        .map(|version| version.id)
        .collect::<Vec<_>>();

    if ids.is_empty() {
        return Err(RedmineError::UnknownBuild(build));
    }
    tracing::debug!(build, ?ids, "resolved build version");
    Ok(ids)
}

pub fn get_issues<C: RedmineClient>(
    client: &C,
    kind: DatasetKind,
    build: Option<u32>,
    project_id: u64,
) -> Result<Vec<Issue>, RedmineError> {
    let filter = build_filter(client, kind, build, project_id)?;
    tracing::info!(?filter, "querying Redmine issues");
    client.filter_issues(&filter)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::redmine::Version;

    struct VersionsOnly(Vec<Version>);

    impl RedmineClient for VersionsOnly {
        fn filter_issues(&self, _filter: &IssueFilter) -> Result<Vec<Issue>, RedmineError> {
            Ok(Vec::new())
        }

        fn list_versions(&self, _project_id: u64) -> Result<Vec<Version>, RedmineError> {
            Ok(self.0.clone())
        }
    }

    fn versions() -> VersionsOnly {
        VersionsOnly(vec![
            Version {
                id: 10,
                name: "Build 51".to_string(),
            },
            Version {
                id: 11,
                name: "Build 52".to_string(),
            },
            Version {
                id: 12,
                name: "Build 520".to_string(),
            },
        ])
    }

    #[test]
    fn base_filter_with_mode() {
        let filter = build_filter(&versions(), DatasetKind::Rnaseq, None, 1).unwrap();
        assert_eq!(filter.get("status_name"), Some(STATUS_NAME));
        assert_eq!(filter.get(PROCESSING_STAGE_FIELD), Some(STATUS_NAME));
        assert_eq!(filter.get(DATASET_TYPE_FIELD), Some("RNA-seq"));
        assert_eq!(filter.get(FIXED_VERSION_FIELD), None);
    }

    #[test]
    fn build_resolves_exact_name() {
        let filter = build_filter(&versions(), DatasetKind::Dnaseq, Some(52), 1).unwrap();
        assert_eq!(filter.get(FIXED_VERSION_FIELD), Some("11"));
        assert_eq!(filter.get(DATASET_TYPE_FIELD), Some("DNA-seq"));
    }

    #[test]
    fn unknown_build_is_an_error() {
        let err = build_filter(&versions(), DatasetKind::Rnaseq, Some(99), 1).unwrap_err();
        assert_matches!(err, RedmineError::UnknownBuild(99));
    }

    #[test]
    fn overlay_replaces_existing_field() {
        let mut filter = IssueFilter::base();
        filter.set("status_name", "Done");
        assert_eq!(filter.get("status_name"), Some("Done"));
        assert_eq!(filter.to_query().len(), 2);
    }
}
