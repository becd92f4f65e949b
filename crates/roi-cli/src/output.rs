//! Human-facing run output

use roi_core::roi::format_hours;
use roi_core::{ReconcilerConfig, RunReport};
use std::fmt::Write;

const RULE: &str = "------------------------------";

const UNRESOLVED: &str = "Error: Could not detect ROI plugin name. \
                          Make sure at least one job has ROI metrics configured.";

pub(crate) fn header(config: &ReconcilerConfig) -> String {
    let mode = if config.dry_run { "Dry run" } else { "Update" };
    format!(
        "Runbook Automation ROI Status\n{RULE}\n\
         Project: {}\n\
         Mode: {mode}\n\
         Hours saved value: {}\n{RULE}",
        config.project_filter,
        format_hours(config.hours_saved),
    )
}

pub(crate) fn report(report: &RunReport) -> String {
    let Some(plugin_name) = &report.plugin_name else {
        return UNRESOLVED.to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "ROI plugin: {plugin_name}");
    for line in &report.lines {
        let _ = writeln!(out, "{line}");
    }
    let _ = write!(out, "\nSummary:\n{}", report.summary);
    if report.dry_run {
        out.push_str("\n\n⚠️  Dry run complete - use --apply to apply changes");
    }
    out
}
