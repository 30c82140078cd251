use std::time::Duration;

use crate::error::RedmineError;

pub const DEFAULT_REDMINE_URL: &str = "https://redmine.apidb.org";
/// Project whose versions carry the `Build <n>` names.
pub const VEUPATHDB_PROJECT_ID: u64 = 1976;
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Settings {
    pub url: String,
    pub api_key: String,
    pub project_id: u64,
    pub page_size: u32,
    pub timeout: Duration,
}

impl Settings {
    pub fn new(url: Option<&str>, api_key: &str) -> Result<Self, RedmineError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(RedmineError::InvalidArgument(
                "Redmine API key is empty".to_string(),
            ));
        }

        let url = url.unwrap_or(DEFAULT_REDMINE_URL).trim().trim_end_matches('/');
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(RedmineError::InvalidArgument(format!(
                "Redmine url must start with http:// or https://: {url}"
            )));
        }

        Ok(Self {
            url: url.to_string(),
            api_key: api_key.to_string(),
            project_id: VEUPATHDB_PROJECT_ID,
            page_size: DEFAULT_PAGE_SIZE,
            timeout: DEFAULT_TIMEOUT,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_applied() {
        let settings = Settings::new(None, " abc ").unwrap();
        assert_eq!(settings.url, DEFAULT_REDMINE_URL);
        assert_eq!(settings.api_key, "abc");
        assert_eq!(settings.project_id, VEUPATHDB_PROJECT_ID);
    }

    #[test]
    fn url_trailing_slash_trimmed() {
        let settings = Settings::new(Some("http://localhost:3000/"), "k").unwrap();
        assert_eq!(settings.url, "http://localhost:3000");
    }

    #[test]
    fn rejects_empty_key_and_bad_url() {
        assert_matches!(
            Settings::new(None, "  "),
            Err(RedmineError::InvalidArgument(_))
        );
        assert_matches!(
            Settings::new(Some("redmine.local"), "k"),
            Err(RedmineError::InvalidArgument(_))
        );
    }
}
