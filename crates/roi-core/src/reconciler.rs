//! Reconciler
//!
//! Walks every selected project and job once, in order:
//! 1. Fetch the job definition
//! 2. Look for an hours field in the ROI plugin
//! 3. If absent and not a dry run, add it and re-import the definition
//! 4. Record the outcome
//!
//! Failed calls are logged and the job (or project) is skipped.

use crate::api::{JobApi, JobSummary};
use crate::config::ReconcilerConfig;
use crate::definition::JobDefinition;
use crate::error::ReconcileError;
use crate::report::{JobOutcome, JobReport, RunReport};
use crate::roi::{detect_plugin_name, format_hours, HoursField, RoiPlugin, UNKNOWN_VALUE};

/// Single-pass ROI reconciler over a [`JobApi`]
#[derive(Debug)]
pub struct Reconciler<'a, A: JobApi + ?Sized> {
    api: &'a A,
    config: ReconcilerConfig,
}

impl<'a, A: JobApi + ?Sized> Reconciler<'a, A> {
    /// Create a reconciler
    #[inline]
    #[must_use]
    pub fn new(api: &'a A, config: ReconcilerConfig) -> Self {
        Self { api, config }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run over every selected project.
    ///
    /// Nothing here is an error: failed calls end up in the report, and an
    /// unresolvable plugin name yields [`RunReport::unresolved`].
    pub async fn run(&self) -> RunReport {
        let plugin_name = match self.resolve_plugin_name().await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "no ROI plugin name, nothing to reconcile");
                return RunReport::unresolved(self.config.dry_run);
            }
        };
        let plugin = RoiPlugin::new(plugin_name).with_hours(self.config.hours_saved);

        let mut report = RunReport {
            plugin_name: Some(plugin.name().to_string()),
            dry_run: self.config.dry_run,
            ..RunReport::default()
        };

        let projects = match self.api.list_projects().await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list projects");
                return report;
            }
        };

        for project in projects
            .iter()
            .filter(|p| self.config.project_filter.matches(&p.name))
        {
            report.summary.projects += 1;

            let jobs = match self.api.list_jobs(&project.name).await {
                Ok(jobs) => jobs,
                Err(e) => {
                    tracing::warn!(project = %project.name, error = %e, "failed to list jobs");
                    Vec::new()
                }
            };

            if jobs.is_empty() {
                tracing::info!(project = %project.name, "no jobs found");
                report.push_empty_project(&project.name);
                continue;
            }

            for job in &jobs {
                let outcome = self.reconcile_job(&project.name, job, &plugin).await;
                tracing::info!(
                    project = %project.name,
                    job = %job.display_name(),
                    "{}",
                    outcome
                );
                report.push(JobReport {
                    project: project.name.clone(),
                    job_id: job.id.clone(),
                    job_name: job.display_name().to_string(),
                    outcome,
                });
            }
        }

        tracing::info!(summary = %report.summary, dry_run = report.dry_run, "run complete");
        report
    }

    /// Plugin name for this run.
    ///
    /// A configured name wins. Otherwise the first few jobs of the first few
    /// projects are sampled until one carries a recognisable ROI plugin.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::Api`] if the project listing fails,
    /// [`ReconcileError::PluginNameUnresolved`] if no sampled job matches.
    pub async fn resolve_plugin_name(&self) -> Result<String, ReconcileError> {
        if let Some(name) = &self.config.plugin_name {
            return Ok(name.clone());
        }

        tracing::info!("auto-detecting ROI plugin name");

        let projects = self.api.list_projects().await?;

        for project in projects.iter().take(self.config.detection_projects) {
            let jobs = match self.api.list_jobs(&project.name).await {
                Ok(jobs) => jobs,
                Err(e) => {
                    tracing::debug!(project = %project.name, error = %e, "skipping project");
                    continue;
                }
            };

            for job in jobs.iter().take(self.config.detection_jobs) {
                let definition = match self.api.get_job_definition(&job.id).await {
                    Ok(definition) => definition,
                    Err(e) => {
                        tracing::debug!(job = %job.id, error = %e, "skipping job");
                        continue;
                    }
                };

                if let Some(name) = detect_plugin_name(&definition) {
                    tracing::info!(plugin = %name, "detected ROI plugin name");
                    return Ok(name.to_string());
                }
            }
        }

        Err(ReconcileError::PluginNameUnresolved)
    }

    /// Reconcile one job and report what happened
    pub async fn reconcile_job(
        &self,
        project: &str,
        job: &JobSummary,
        plugin: &RoiPlugin,
    ) -> JobOutcome {
        let mut definition = match self.api.get_job_definition(&job.id).await {
            Ok(definition) => definition,
            Err(e) => {
                tracing::warn!(project, job = %job.id, error = %e, "failed to fetch definition");
                return JobOutcome::DefinitionUnavailable {
                    reason: e.to_string(),
                };
            }
        };

        if let HoursField::Present { value } = plugin.has_hours_field(&definition) {
            return JobOutcome::AlreadyConfigured { value };
        }

        let hours = format_hours(plugin.hours());

        if self.config.dry_run {
            return JobOutcome::WouldAdd { hours };
        }

        if !plugin.ensure_field(&mut definition) {
            return JobOutcome::AlreadyConfigured {
                value: UNKNOWN_VALUE.to_string(),
            };
        }

        match self.apply_update(project, &job.id, definition).await {
            Ok(()) => JobOutcome::Added { hours },
            Err(e) => {
                tracing::warn!(project, job = %job.id, error = %e, "failed to update job");
                JobOutcome::UpdateFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Write a patched definition back through the import endpoint
    pub async fn apply_update(
        &self,
        project: &str,
        job_id: &str,
        definition: JobDefinition,
    ) -> Result<(), ReconcileError> {
        let payload = definition.prepare_for_import()?;
        tracing::debug!(project, job = job_id, "importing job definition");
        self.api.import_job(project, &payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockJobApi, ProjectSummary};
    use crate::config::ProjectFilter;
    use crate::error::ApiError;
    use crate::roi::USER_ROI_DATA;
    use serde_json::{json, Value};

    fn definition(value: Value) -> JobDefinition {
        JobDefinition::from_value(value).unwrap()
    }

    fn bare_job() -> JobDefinition {
        definition(json!({"id": "j1", "name": "backup", "project": "ops"}))
    }

    fn configured_job() -> JobDefinition {
        definition(json!({
            "id": "j2",
            "name": "cleanup",
            "plugins": {"ExecutionLifecycle": {"roi-metrics-data": {
                "userRoiData": "[{\"key\":\"hours\",\"value\":\"3\"}]"
            }}}
        }))
    }

    fn single_project(mock: &mut MockJobApi) {
        mock.expect_list_projects()
            .returning(|| Ok(vec![ProjectSummary::new("ops")]));
        mock.expect_list_jobs()
            .returning(|_| Ok(vec![JobSummary::new("j1", "backup")]));
    }

    #[tokio::test]
    async fn dry_run_never_imports() {
        let mut mock = MockJobApi::new();
        single_project(&mut mock);
        mock.expect_get_job_definition()
            .returning(|_| Ok(bare_job()));
        mock.expect_import_job().never();

        let config = ReconcilerConfig::new().with_plugin_name("roi-metrics-data");
        let report = Reconciler::new(&mock, config).run().await;

        assert_eq!(report.summary.updates, 1);
        assert_eq!(
            report.jobs().next().unwrap().outcome,
            JobOutcome::WouldAdd { hours: "2.0".into() }
        );
    }

    #[tokio::test]
    async fn apply_imports_patched_definition_once() {
        let mut mock = MockJobApi::new();
        single_project(&mut mock);
        mock.expect_get_job_definition()
            .returning(|_| Ok(bare_job()));
        mock.expect_import_job()
            .withf(|project, def| {
                let data = def.execution_lifecycle().and_then(|l| l.get("roi-metrics-data"));
                project == "ops"
                    && def.get("id").is_none()
                    && def.get("project").is_none()
                    && data.and_then(|d| d.get(USER_ROI_DATA)).is_some()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let config = ReconcilerConfig::new()
            .with_dry_run(false)
            .with_plugin_name("roi-metrics-data");
        let report = Reconciler::new(&mock, config).run().await;

        assert_eq!(
            report.jobs().next().unwrap().outcome,
            JobOutcome::Added { hours: "2.0".into() }
        );
    }

    #[tokio::test]
    async fn configured_job_is_left_alone() {
        let mut mock = MockJobApi::new();
        single_project(&mut mock);
        mock.expect_get_job_definition()
            .returning(|_| Ok(configured_job()));
        mock.expect_import_job().never();

        let config = ReconcilerConfig::new().with_dry_run(false);
        let report = Reconciler::new(&mock, config).run().await;

        assert_eq!(report.plugin_name.as_deref(), Some("roi-metrics-data"));
        assert_eq!(
            report.jobs().next().unwrap().outcome,
            JobOutcome::AlreadyConfigured { value: "3".into() }
        );
        assert_eq!(report.summary.updates, 0);
    }

    #[tokio::test]
    async fn unresolved_plugin_name_yields_empty_report() {
        let mut mock = MockJobApi::new();
        single_project(&mut mock);
        mock.expect_get_job_definition()
            .returning(|_| Ok(bare_job()));
        mock.expect_import_job().never();

        let report = Reconciler::new(&mock, ReconcilerConfig::new()).run().await;

        assert!(report.is_unresolved());
        assert!(report.lines.is_empty());
        assert_eq!(report.summary.jobs, 0);
    }

    #[tokio::test]
    async fn unreachable_server_during_detection_ends_run_quietly() {
        let mut mock = MockJobApi::new();
        mock.expect_list_projects()
            .times(1)
            .returning(|| Err(ApiError::Connection("refused".into())));
        mock.expect_list_jobs().never();
        mock.expect_import_job().never();

        let reconciler = Reconciler::new(&mock, ReconcilerConfig::new());
        let report = reconciler.run().await;

        assert!(report.is_unresolved());
        assert_eq!(report.summary.projects, 0);
    }

    #[tokio::test]
    async fn detection_reports_listing_failure_as_api_error() {
        let mut mock = MockJobApi::new();
        mock.expect_list_projects()
            .returning(|| Err(ApiError::Connection("refused".into())));

        let result = Reconciler::new(&mock, ReconcilerConfig::new())
            .resolve_plugin_name()
            .await;

        assert!(matches!(
            result,
            Err(ReconcileError::Api(ApiError::Connection(_)))
        ));
    }

    #[tokio::test]
    async fn detection_samples_limited_jobs() {
        let mut mock = MockJobApi::new();
        mock.expect_list_projects()
            .returning(|| Ok(vec![ProjectSummary::new("ops")]));
        mock.expect_list_jobs().returning(|_| {
            Ok((0..10)
                .map(|i| JobSummary::new(format!("j{i}"), "job"))
                .collect())
        });
        mock.expect_get_job_definition()
            .times(5)
            .returning(|_| Ok(bare_job()));

        let reconciler = Reconciler::new(&mock, ReconcilerConfig::new());
        let result = reconciler.resolve_plugin_name().await;

        assert!(matches!(result, Err(ReconcileError::PluginNameUnresolved)));
    }

    #[tokio::test]
    async fn fetch_failure_skips_job() {
        let mut mock = MockJobApi::new();
        single_project(&mut mock);
        mock.expect_get_job_definition()
            .returning(|_| Err(ApiError::Timeout("30s".into())));
        mock.expect_import_job().never();

        let config = ReconcilerConfig::new()
            .with_dry_run(false)
            .with_plugin_name("roi-metrics-data");
        let report = Reconciler::new(&mock, config).run().await;

        assert_eq!(report.summary.failures, 1);
        assert!(matches!(
            report.jobs().next().unwrap().outcome,
            JobOutcome::DefinitionUnavailable { .. }
        ));
    }

    #[tokio::test]
    async fn import_failure_is_reported() {
        let mut mock = MockJobApi::new();
        single_project(&mut mock);
        mock.expect_get_job_definition()
            .returning(|_| Ok(bare_job()));
        mock.expect_import_job().returning(|_, _| {
            Err(ApiError::Status {
                status: 500,
                body: "boom".into(),
            })
        });

        let config = ReconcilerConfig::new()
            .with_dry_run(false)
            .with_plugin_name("roi-metrics-data");
        let report = Reconciler::new(&mock, config).run().await;

        assert_eq!(report.summary.updates, 0);
        assert_eq!(report.summary.failures, 1);
        assert_eq!(
            report.jobs().next().unwrap().outcome,
            JobOutcome::UpdateFailed {
                reason: "api error: HTTP 500: boom".into()
            }
        );
    }

    #[tokio::test]
    async fn nameless_definition_is_not_imported() {
        let mut mock = MockJobApi::new();
        single_project(&mut mock);
        mock.expect_get_job_definition()
            .returning(|_| Ok(definition(json!({"id": "j1"}))));
        mock.expect_import_job().never();

        let config = ReconcilerConfig::new()
            .with_dry_run(false)
            .with_plugin_name("roi-metrics-data");
        let report = Reconciler::new(&mock, config).run().await;

        assert!(matches!(
            report.jobs().next().unwrap().outcome,
            JobOutcome::UpdateFailed { .. }
        ));
    }

    #[tokio::test]
    async fn project_filter_limits_listing() {
        let mut mock = MockJobApi::new();
        mock.expect_list_projects().returning(|| {
            Ok(vec![ProjectSummary::new("ops"), ProjectSummary::new("web")])
        });
        mock.expect_list_jobs()
            .withf(|project| project == "web")
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let config = ReconcilerConfig::new()
            .with_plugin_name("roi-metrics-data")
            .with_project_filter(ProjectFilter::Named("WEB".into()));
        let report = Reconciler::new(&mock, config).run().await;

        assert_eq!(report.summary.projects, 1);
        assert_eq!(report.empty_projects().collect::<Vec<_>>(), ["web"]);
    }

    #[tokio::test]
    async fn project_listing_failure_yields_empty_report() {
        let mut mock = MockJobApi::new();
        mock.expect_list_projects()
            .returning(|| Err(ApiError::Connection("refused".into())));

        let config = ReconcilerConfig::new().with_plugin_name("roi-metrics-data");
        let report = Reconciler::new(&mock, config).run().await;

        assert_eq!(report.plugin_name.as_deref(), Some("roi-metrics-data"));
        assert_eq!(report.summary.projects, 0);
        assert!(report.lines.is_empty());
    }
}
