use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::RedmineError;
use crate::query::IssueFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub value: Option<CustomFieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomFieldValue {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: u64,
    pub name: String,
}

pub trait RedmineClient {
    fn filter_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, RedmineError>;
    fn list_versions(&self, project_id: u64) -> Result<Vec<Version>, RedmineError>;
}

impl<T: RedmineClient + ?Sized> RedmineClient for &T {
    fn filter_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, RedmineError> {
        (**self).filter_issues(filter)
    }

    fn list_versions(&self, project_id: u64) -> Result<Vec<Version>, RedmineError> {
        (**self).list_versions(project_id)
    }
}

#[derive(Debug, Deserialize)]
struct IssuesPage {
    issues: Vec<Issue>,
    #[serde(default)]
    total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VersionsPage {
    versions: Vec<Version>,
}

#[derive(Clone)]
pub struct RedmineHttpClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl RedmineHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, RedmineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("redmine-datasets/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| RedmineError::InvalidArgument(err.to_string()))?,
        );
        let mut key = HeaderValue::from_str(&settings.api_key)
            .map_err(|_| RedmineError::InvalidArgument("API key is not a valid header".to_string()))?;
        key.set_sensitive(true);
        headers.insert("X-Redmine-API-Key", key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| RedmineError::Http(err.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.url.clone(),
            page_size: settings.page_size.max(1),
        })
    }

    fn get_json<T>(&self, url: &str, query: &[(String, String)]) -> Result<T, RedmineError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.send_with_retries(url, || self.client.get(url).query(query))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "Redmine request failed".to_string());
            return Err(RedmineError::Status { status, message });
        }
        response
            .json::<T>()
            .map_err(|err| RedmineError::InvalidResponse(format!("{url}: {err}")))
    }

    /// Sends the request, retrying transient failures with a linear back-off.
    fn send_with_retries<F>(
        &self,
        url: &str,
        make_req: F,
    ) -> Result<reqwest::blocking::Response, RedmineError>
    where
        F: Fn() -> reqwest::blocking::RequestBuilder,
    {
        for attempt in 0..=MAX_RETRIES {
            let last = attempt == MAX_RETRIES;
            match make_req().send() {
                Ok(resp) if !last && is_retryable_status(resp.status().as_u16()) => {
                    tracing::warn!(%url, status = resp.status().as_u16(), attempt, "Redmine busy, retrying");
                }
                Ok(resp) => return Ok(resp),
                Err(err) if !last && is_retryable_error(&err) => {
                    tracing::warn!(%url, error = %err, attempt, "Redmine unreachable, retrying");
                }
                Err(err) => return Err(RedmineError::Http(format!("{url}: {err}"))),
            }
            thread::sleep(retry_delay(attempt));
        }
        Err(RedmineError::Http(format!("{url}: retries exhausted")))
    }
}

impl RedmineClient for RedmineHttpClient {
    fn filter_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, RedmineError> {
        let url = format!("{}/issues.json", self.base_url);
        let mut issues = Vec::new();
        let mut offset = 0u64;

        loop {
            let mut query = filter.to_query();
            query.push(("limit".to_string(), self.page_size.to_string()));
            query.push(("offset".to_string(), offset.to_string()));

            let page: IssuesPage = self.get_json(&url, &query)?;
            let received = page.issues.len() as u64;
            issues.extend(page.issues);
            offset += received;
            tracing::debug!(received, total = ?page.total_count, "fetched issue page");

            let done = match page.total_count {
                Some(total) => offset >= total,
                None => true,
            };
            if done || received == 0 {
                break;
            }
        }

        Ok(issues)
    }

    fn list_versions(&self, project_id: u64) -> Result<Vec<Version>, RedmineError> {
        let url = format!("{}/projects/{project_id}/versions.json", self.base_url);
        let page: VersionsPage = self.get_json(&url, &[])?;
        Ok(page.versions)
    }
}

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * (attempt + 1)
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
