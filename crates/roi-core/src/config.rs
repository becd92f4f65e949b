//! Reconciler configuration

use crate::roi::DEFAULT_HOURS_SAVED;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Which projects a run touches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectFilter {
    /// Every project
    #[default]
    All,
    /// Only the project with this name, compared case-insensitively
    Named(String),
}

impl ProjectFilter {
    /// Whether the project with `name` is selected
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(wanted) => wanted.to_lowercase() == name.to_lowercase(),
        }
    }
}

impl FromStr for ProjectFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            Ok(Self::Named(s.to_string()))
        }
    }
}

impl fmt::Display for ProjectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Report intended changes without writing them
    pub dry_run: bool,
    /// Projects to process
    pub project_filter: ProjectFilter,
    /// Hours-saved value written into new fields
    pub hours_saved: f64,
    /// Explicit plugin name; skips auto-detection when set
    pub plugin_name: Option<String>,
    /// Projects sampled during plugin-name detection
    pub detection_projects: usize,
    /// Jobs sampled per project during plugin-name detection
    pub detection_jobs: usize,
}

impl ReconcilerConfig {
    /// Create default configuration (dry run, all projects)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With dry-run mode
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// With project filter
    #[inline]
    #[must_use]
    pub fn with_project_filter(mut self, filter: ProjectFilter) -> Self {
        self.project_filter = filter;
        self
    }

    /// With hours-saved value
    #[inline]
    #[must_use]
    pub fn with_hours_saved(mut self, hours: f64) -> Self {
        self.hours_saved = hours;
        self
    }

    /// With explicit plugin name
    #[inline]
    #[must_use]
    pub fn with_plugin_name(mut self, name: impl Into<String>) -> Self {
        self.plugin_name = Some(name.into());
        self
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            project_filter: ProjectFilter::All,
            hours_saved: DEFAULT_HOURS_SAVED,
            plugin_name: None,
            detection_projects: 3,
            detection_jobs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parses_all_in_any_case() {
        assert_eq!("all".parse::<ProjectFilter>(), Ok(ProjectFilter::All));
        assert_eq!("ALL".parse::<ProjectFilter>(), Ok(ProjectFilter::All));
        assert_eq!(" ".parse::<ProjectFilter>(), Ok(ProjectFilter::All));
        assert_eq!(
            "Ops".parse::<ProjectFilter>(),
            Ok(ProjectFilter::Named("Ops".into()))
        );
    }

    #[test]
    fn named_filter_ignores_case() {
        let filter = ProjectFilter::Named("Ops".into());
        assert!(filter.matches("ops"));
        assert!(filter.matches("OPS"));
        assert!(!filter.matches("ops-staging"));
        assert!(ProjectFilter::All.matches("anything"));
    }

    #[test]
    fn defaults_to_dry_run() {
        let config = ReconcilerConfig::new();
        assert!(config.dry_run);
        assert_eq!(config.project_filter, ProjectFilter::All);
        assert!((config.hours_saved - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.plugin_name, None);
    }

    #[test]
    fn builder_sets_fields() {
        let config = ReconcilerConfig::new()
            .with_dry_run(false)
            .with_project_filter(ProjectFilter::Named("ops".into()))
            .with_hours_saved(0.5)
            .with_plugin_name("roi-metrics-data");
        assert!(!config.dry_run);
        assert_eq!(config.plugin_name.as_deref(), Some("roi-metrics-data"));
    }
}
