//! Command-line definition

use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use roi_core::roi::{DEFAULT_HOURS_SAVED, DEFAULT_PLUGIN_NAME};
use roi_core::{ProjectFilter, ReconcilerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Options {
    pub(crate) project: ProjectFilter,
    pub(crate) apply: bool,
    pub(crate) hours: f64,
    pub(crate) plugin_name: Option<String>,
    pub(crate) log_format: LogFormat,
}

pub(crate) fn command() -> Command {
    Command::new("rundeck-roi")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runbook Automation ROI Status - Manage ROI metrics for Rundeck jobs")
        .after_help(
            "Environment:\n  RUNDECK_URL           Rundeck server URL (required)\n  \
             RUNDECK_API_TOKEN     API token (required)\n  \
             RUNDECK_API_VERSION   API version (default 46)\n  \
             RUNDECK_TIMEOUT_SECS  Per-request timeout (default 30)\n  \
             RUST_LOG              Log filter (default info)",
        )
        .arg(
            Arg::new("project")
                .long("project")
                .default_value("all")
                .value_parser(value_parser!(ProjectFilter))
                .help("Project name to process (default: all)"),
        )
        .arg(
            Arg::new("dryrun")
                .long("dryrun")
                .action(ArgAction::SetTrue)
                .help("Show what would be changed without applying (default)"),
        )
        .arg(
            Arg::new("apply")
                .long("apply")
                .action(ArgAction::SetTrue)
                .help("Apply changes to jobs"),
        )
        .group(ArgGroup::new("mode").args(["dryrun", "apply"]).multiple(false))
        .arg(
            Arg::new("hours")
                .long("hours")
                .default_value("2.0")
                .value_parser(parse_hours)
                .help("Hours saved value written into new fields"),
        )
        .arg(
            Arg::new("plugin-name")
                .long("plugin-name")
                .help(format!(
                    "ROI plugin name; detected from existing jobs when omitted \
                     (e.g. {DEFAULT_PLUGIN_NAME})"
                )),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Log output format"),
        )
}

impl Options {
    pub(crate) fn from_matches(matches: &ArgMatches) -> Self {
        let log_format = match matches.get_one::<String>("log-format").map(String::as_str) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            project: matches
                .get_one::<ProjectFilter>("project")
                .cloned()
                .unwrap_or_default(),
            apply: matches.get_flag("apply"),
            hours: matches
                .get_one::<f64>("hours")
                .copied()
                .unwrap_or(DEFAULT_HOURS_SAVED),
            plugin_name: matches.get_one::<String>("plugin-name").cloned(),
            log_format,
        }
    }

    pub(crate) fn reconciler_config(&self) -> ReconcilerConfig {
        let config = ReconcilerConfig::new()
            .with_dry_run(!self.apply)
            .with_project_filter(self.project.clone())
            .with_hours_saved(self.hours);
        match &self.plugin_name {
            Some(name) => config.with_plugin_name(name.clone()),
            None => config,
        }
    }
}

/// Bounds keep the rendered value in plain decimal notation
const MIN_HOURS: f64 = 0.0001;
const MAX_HOURS: f64 = 1_000_000.0;

fn parse_hours(raw: &str) -> Result<f64, String> {
    let hours = raw.trim().parse::<f64>().map_err(|e| e.to_string())?;
    if !(0.0..=MAX_HOURS).contains(&hours) {
        return Err(format!("must be between 0 and {MAX_HOURS}"));
    }
    if hours > 0.0 && hours < MIN_HOURS {
        return Err(format!("must be 0 or at least {MIN_HOURS}"));
    }
    Ok(hours)
}
