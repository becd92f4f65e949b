//! ROI Core - ROI metrics reconciliation for Rundeck jobs
//!
//! Makes sure every job carries an ROI metrics plugin with an hours-saved
//! field:
//! - Detects the plugin under the many shapes jobs store it in
//! - Decides whether a job needs a patch
//! - Applies a minimal patch and writes the whole definition back
//!
//! # Example
//!
//! ```rust,ignore
//! use roi_core::{Reconciler, ReconcilerConfig};
//!
//! # async fn example(api: &impl roi_core::JobApi) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReconcilerConfig::new().with_dry_run(false);
//! let report = Reconciler::new(api, config).run().await;
//!
//! for line in &report.lines {
//!     println!("{line}");
//! }
//! println!("{}", report.summary);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod api;
pub mod config;
pub mod definition;
pub mod error;
pub mod reconciler;
pub mod report;
pub mod roi;

pub use api::{JobApi, JobSummary, ProjectSummary};
pub use config::{ProjectFilter, ReconcilerConfig};
pub use definition::JobDefinition;
pub use error::{ApiError, DefinitionError, ReconcileError};
pub use reconciler::Reconciler;
pub use report::{JobOutcome, JobReport, ReportLine, RunReport, RunSummary};
pub use roi::{detect_plugin_name, is_roi_plugin_name, HoursField, RoiField, RoiPlugin};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with ROI Core
    pub use crate::{
        JobApi, JobDefinition, JobOutcome, ProjectFilter, Reconciler, ReconcilerConfig,
        RoiPlugin, RunReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
