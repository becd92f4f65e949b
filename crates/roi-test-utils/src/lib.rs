//! Testing utilities for the rundeck-roi workspace
//!
//! An in-memory [`FakeJobApi`] standing in for the server, plus fixtures
//! for the job definition shapes seen in the wild.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use roi_core::roi::USER_ROI_DATA;
use roi_core::{ApiError, JobApi, JobDefinition, JobSummary, ProjectSummary};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// In-memory job server.
///
/// Imports behave like `dupeOption=update`: a definition whose name matches
/// an existing job in the project replaces it, anything else becomes a new
/// job.
#[derive(Debug, Default)]
pub struct FakeJobApi {
    projects: Vec<ProjectSummary>,
    jobs: Mutex<BTreeMap<String, Vec<JobSummary>>>,
    definitions: Mutex<HashMap<String, JobDefinition>>,
    imports: Mutex<Vec<(String, JobDefinition)>>,
    unavailable: HashSet<String>,
    reject_imports: bool,
}

impl FakeJobApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty project
    #[must_use]
    pub fn with_project(mut self, project: &str) -> Self {
        if !self.projects.iter().any(|p| p.name == project) {
            self.projects.push(ProjectSummary::new(project));
            self.jobs.get_mut().entry(project.to_string()).or_default();
        }
        self
    }

    /// Add a job; its listing name is taken from the definition
    #[must_use]
    pub fn with_job(mut self, project: &str, id: &str, definition: JobDefinition) -> Self {
        self = self.with_project(project);
        let name = definition.name().unwrap_or("Unknown").to_string();
        self.jobs
            .get_mut()
            .entry(project.to_string())
            .or_default()
            .push(JobSummary::new(id, name));
        self.definitions.get_mut().insert(id.to_string(), definition);
        self
    }

    /// Make fetching this job's definition fail
    #[must_use]
    pub fn with_unavailable_definition(mut self, id: &str) -> Self {
        self.unavailable.insert(id.to_string());
        self
    }

    /// Make every import fail with a server error
    #[must_use]
    pub fn rejecting_imports(mut self) -> Self {
        self.reject_imports = true;
        self
    }

    /// Every import received so far, as `(project, payload)`
    #[must_use]
    pub fn imports(&self) -> Vec<(String, JobDefinition)> {
        self.imports.lock().clone()
    }

    #[must_use]
    pub fn import_count(&self) -> usize {
        self.imports.lock().len()
    }

    /// Current stored definition of a job
    #[must_use]
    pub fn definition(&self, id: &str) -> Option<JobDefinition> {
        self.definitions.lock().get(id).cloned()
    }
}

#[async_trait]
impl JobApi for FakeJobApi {
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        Ok(self.projects.clone())
    }

    async fn list_jobs(&self, project: &str) -> Result<Vec<JobSummary>, ApiError> {
        self.jobs
            .lock()
            .get(project)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                body: format!("project {project} not found"),
            })
    }

    async fn get_job_definition(&self, job_id: &str) -> Result<JobDefinition, ApiError> {
        if self.unavailable.contains(job_id) {
            return Err(ApiError::Timeout(format!("job {job_id}")));
        }
        self.definitions
            .lock()
            .get(job_id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                body: format!("job {job_id} not found"),
            })
    }

    async fn import_job(&self, project: &str, definition: &JobDefinition) -> Result<(), ApiError> {
        self.imports
            .lock()
            .push((project.to_string(), definition.clone()));

        if self.reject_imports {
            return Err(ApiError::Status {
                status: 500,
                body: "import disabled".to_string(),
            });
        }

        let name = definition.name().unwrap_or_default().to_string();
        let mut jobs = self.jobs.lock();
        let listing = jobs.entry(project.to_string()).or_default();
        let id = match listing.iter().find(|job| job.name.as_deref() == Some(name.as_str())) {
            Some(job) => job.id.clone(),
            None => {
                let id = format!("imported-{}", listing.len());
                listing.push(JobSummary::new(id.clone(), name));
                id
            }
        };

        let mut stored = definition.as_map().clone();
        stored.insert("id".to_string(), Value::String(id.clone()));
        stored.insert("project".to_string(), Value::String(project.to_string()));
        self.definitions.lock().insert(id, JobDefinition::new(stored));
        Ok(())
    }
}

/// Definition without any plugin configuration
#[must_use]
pub fn bare_job(id: &str, name: &str) -> JobDefinition {
    definition(json!({
        "id": id,
        "name": name,
        "group": "nightly",
        "project": "ops",
        "href": format!("http://rundeck.local/api/46/job/{id}"),
        "permalink": format!("http://rundeck.local/project/ops/job/show/{id}"),
        "averageDuration": 1200,
        "sequence": {"keepgoing": false, "commands": [{"exec": "echo hi"}]}
    }))
}

/// Definition with an ROI plugin entry holding `user_roi_data` verbatim
#[must_use]
pub fn job_with_roi(id: &str, name: &str, plugin: &str, user_roi_data: Value) -> JobDefinition {
    let mut def = bare_job(id, name);
    let mut config = serde_json::Map::new();
    config.insert(USER_ROI_DATA.to_string(), user_roi_data);
    def.execution_lifecycle_or_insert()
        .insert(plugin.to_string(), Value::Object(config));
    def
}

/// Definition whose ROI plugin already has an hours field
#[must_use]
pub fn job_with_hours(id: &str, name: &str, value: &str) -> JobDefinition {
    let data = json!([{"key": "hours", "label": "Hours", "desc": "", "value": value}]);
    job_with_roi(id, name, "roi-metrics-data", Value::String(data.to_string()))
}

/// Decoded `userRoiData` of a plugin entry, empty when absent
#[must_use]
pub fn roi_data_of(definition: &JobDefinition, plugin: &str) -> Vec<Value> {
    definition
        .execution_lifecycle()
        .and_then(|lifecycle| lifecycle.get(plugin))
        .and_then(|config| config.get(USER_ROI_DATA))
        .and_then(Value::as_str)
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default()
}

/// Count of hours descriptors in a plugin entry
#[must_use]
pub fn hours_entries(definition: &JobDefinition, plugin: &str) -> usize {
    roi_data_of(definition, plugin)
        .iter()
        .filter(|field| {
            field
                .get("key")
                .and_then(Value::as_str)
                .is_some_and(|key| key.to_lowercase().contains("hours"))
        })
        .count()
}

fn definition(value: Value) -> JobDefinition {
    match value {
        Value::Object(fields) => JobDefinition::new(fields),
        _ => JobDefinition::default(),
    }
}
