//! Per-job outcomes and the run summary

use std::fmt;

/// What happened to a single job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Hours field already present; nothing to do
    AlreadyConfigured { value: String },
    /// Dry run: the field would be added with this value
    WouldAdd { hours: String },
    /// Field added and definition re-imported
    Added { hours: String },
    /// Definition could not be fetched; job skipped
    DefinitionUnavailable { reason: String },
    /// Patch built but the write-back failed
    UpdateFailed { reason: String },
}

impl JobOutcome {
    /// Counts towards the update total (applied or pending)
    #[inline]
    #[must_use]
    pub fn is_update(&self) -> bool {
        matches!(self, Self::WouldAdd { .. } | Self::Added { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::DefinitionUnavailable { .. } | Self::UpdateFailed { .. }
        )
    }

    /// Status marker for report lines
    #[must_use]
    pub fn marker(&self) -> &'static str {
        match self {
            Self::AlreadyConfigured { .. } => "✅",
            Self::WouldAdd { .. } | Self::Added { .. } => "🆕",
            Self::DefinitionUnavailable { .. } | Self::UpdateFailed { .. } => "❌",
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyConfigured { value } => write!(f, "Already has hours ({value})"),
            Self::WouldAdd { hours } => write!(f, "add hours [{hours}]"),
            Self::Added { hours } => write!(f, "Added hours field [{hours}]"),
            Self::DefinitionUnavailable { reason } => {
                write!(f, "Could not retrieve job definition: {reason}")
            }
            Self::UpdateFailed { reason } => write!(f, "Failed to add hours field: {reason}"),
        }
    }
}

/// Outcome of one job, with enough context to print a report line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub project: String,
    pub job_id: String,
    pub job_name: String,
    pub outcome: JobOutcome,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} - {}",
            self.outcome.marker(),
            self.project,
            self.job_name,
            self.outcome
        )
    }
}

/// Aggregate counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Projects selected by the filter
    pub projects: usize,
    /// Jobs visited
    pub jobs: usize,
    /// Jobs updated, or that would be in a dry run
    pub updates: usize,
    /// Jobs skipped because of a failed call
    pub failures: usize,
}

impl RunSummary {
    /// Fold one job outcome into the counts
    pub fn record(&mut self, outcome: &JobOutcome) {
        self.jobs += 1;
        if outcome.is_update() {
            self.updates += 1;
        }
        if outcome.is_failure() {
            self.failures += 1;
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Projects: {} | Jobs: {} | Updates: {} | Failures: {}",
            self.projects, self.jobs, self.updates, self.failures
        )
    }
}

/// One line of the run report, in visit order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    /// A visited job
    Job(JobReport),
    /// A selected project with no jobs, or whose listing failed
    NoJobs { project: String },
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job(job) => write!(f, "{job}"),
            Self::NoJobs { project } => write!(f, "[{project}] No jobs found"),
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Plugin name the run matched and created entries under; `None` when
    /// it could not be resolved and no project was visited
    pub plugin_name: Option<String>,
    /// Whether writes were suppressed
    pub dry_run: bool,
    pub lines: Vec<ReportLine>,
    pub summary: RunSummary,
}

impl RunReport {
    /// Report of a run that stopped because no plugin name was found
    #[must_use]
    pub fn unresolved(dry_run: bool) -> Self {
        Self {
            plugin_name: None,
            dry_run,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.plugin_name.is_none()
    }

    /// Visited jobs, in order
    pub fn jobs(&self) -> impl Iterator<Item = &JobReport> {
        self.lines.iter().filter_map(|line| match line {
            ReportLine::Job(job) => Some(job),
            ReportLine::NoJobs { .. } => None,
        })
    }

    /// Selected projects that had no jobs, in order
    pub fn empty_projects(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            ReportLine::NoJobs { project } => Some(project.as_str()),
            ReportLine::Job(_) => None,
        })
    }

    pub(crate) fn push(&mut self, report: JobReport) {
        self.summary.record(&report.outcome);
        self.lines.push(ReportLine::Job(report));
    }

    pub(crate) fn push_empty_project(&mut self, project: impl Into<String>) {
        self.lines.push(ReportLine::NoJobs {
            project: project.into(),
        });
    }
}
