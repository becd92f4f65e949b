//! Remote job API seam
//!
//! The reconciler only ever talks to the server through [`JobApi`], so the
//! HTTP client can be swapped for a fake in tests.

use crate::definition::JobDefinition;
use crate::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Entry of the project listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// Project name, used in every project-scoped call
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectSummary {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Entry of a project's job listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Job UUID
    pub id: String,
    /// Job name
    #[serde(default)]
    pub name: Option<String>,
    /// Job group path
    #[serde(default)]
    pub group: Option<String>,
}

impl JobSummary {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            group: None,
        }
    }

    /// Name for reports, `Unknown` when the listing omitted it
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Calls the reconciler needs from the job orchestration server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobApi: Send + Sync {
    /// List every project visible to the token
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ApiError>;

    /// List the jobs of one project
    async fn list_jobs(&self, project: &str) -> Result<Vec<JobSummary>, ApiError>;

    /// Fetch the full definition of a job
    async fn get_job_definition(&self, job_id: &str) -> Result<JobDefinition, ApiError>;

    /// Upsert a job definition into a project
    async fn import_job(&self, project: &str, definition: &JobDefinition) -> Result<(), ApiError>;
}
