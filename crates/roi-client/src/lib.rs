//! ROI Client - Rundeck HTTP implementation of [`JobApi`]
//!
//! Talks to the Rundeck REST API with token authentication:
//! - `GET /api/{v}/projects`
//! - `GET /api/{v}/project/{project}/jobs`
//! - `GET /api/{v}/job/{id}`
//! - `POST /api/{v}/project/{project}/jobs/import`
//!
//! Every failure is mapped into an [`ApiError`] so the reconciler can decide
//! whether to skip a job or a project.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Response, StatusCode, Url};
use roi_core::{ApiError, JobApi, JobDefinition, JobSummary, ProjectSummary};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// API version spoken by default
pub const DEFAULT_API_VERSION: u32 = 46;

/// Per-request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const AUTH_HEADER: &str = "X-Rundeck-Auth-Token";

/// Connection settings for [`RundeckClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `https://rundeck.example.com/`
    pub base_url: Url,
    /// API token sent with every request
    pub token: String,
    pub api_version: u32,
    pub timeout: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: Url, token: impl Into<String>) -> Self {
        Self {
            base_url,
            token: token.into(),
            api_version: DEFAULT_API_VERSION,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Rundeck REST client
#[derive(Debug, Clone)]
pub struct RundeckClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl RundeckClient {
    /// Build a client with the auth and accept headers preset
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] if the token is not a valid header
    /// value or the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let mut token = HeaderValue::from_str(&config.token)
            .map_err(|e| ApiError::Request(format!("invalid API token: {e}")))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTH_HEADER, token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(map_transport_error)?;

        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL of an API endpoint; each segment is percent-encoded
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.config.base_url.clone();
        let version = self.config.api_version.to_string();
        url.path_segments_mut()
            .map_err(|()| {
                ApiError::Request(format!("{} cannot be used as a base URL", self.config.base_url))
            })?
            .pop_if_empty()
            .push("api")
            .push(&version)
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value, ApiError> {
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let response = ensure_success(response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl JobApi for RundeckClient {
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        let body = self.get_json(self.endpoint(&["projects"])?).await?;
        parse_listing(body, "projects")
    }

    async fn list_jobs(&self, project: &str) -> Result<Vec<JobSummary>, ApiError> {
        let body = self
            .get_json(self.endpoint(&["project", project, "jobs"])?)
            .await?;
        parse_listing(body, "jobs")
    }

    async fn get_job_definition(&self, job_id: &str) -> Result<JobDefinition, ApiError> {
        let body = self.get_json(self.endpoint(&["job", job_id])?).await?;
        JobDefinition::from_value(body)
            .ok_or_else(|| ApiError::Decode(format!("job {job_id}: expected a job definition")))
    }

    async fn import_job(&self, project: &str, definition: &JobDefinition) -> Result<(), ApiError> {
        let url = self.endpoint(&["project", project, "jobs", "import"])?;
        tracing::debug!(%url, job = definition.name().unwrap_or_default(), "POST");

        let response = self
            .http
            .post(url)
            .query(&[("dupeOption", "update"), ("format", "json")])
            .json(&[definition])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !matches!(status, StatusCode::OK | StatusCode::NO_CONTENT) {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // A 200 can still carry per-job failures
        let body = response.text().await.unwrap_or_default();
        match import_failures(&body) {
            Some(reason) => Err(ApiError::ImportRejected(reason)),
            None => Ok(()),
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

fn map_transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(err.to_string())
    } else if err.is_connect() {
        ApiError::Connection(err.to_string())
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Request(err.to_string())
    }
}

/// Decode a JSON array, skipping entries that do not fit `T`
fn parse_listing<T: DeserializeOwned>(body: Value, what: &str) -> Result<Vec<T>, ApiError> {
    let Value::Array(items) = body else {
        return Err(ApiError::Decode(format!("expected a list of {what}")));
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(what, error = %e, "skipping malformed listing entry");
                None
            }
        })
        .collect())
}

/// Describe the `failed` entries of an import result, if any
fn import_failures(body: &str) -> Option<String> {
    let result: Value = serde_json::from_str(body).ok()?;
    let failed = result.get("failed")?.as_array()?;
    if failed.is_empty() {
        return None;
    }
    let reasons: Vec<String> = failed
        .iter()
        .map(|entry| match entry.get("error").and_then(Value::as_str) {
            Some(error) => error.to_string(),
            None => entry.to_string(),
        })
        .collect();
    Some(reasons.join("; "))
}
