//! The reconciliation engine: matching, diffing, auditing and remediation.

pub mod audit;
pub mod diff;
pub mod matcher;
pub mod pattern;
pub mod remediate;
pub mod task;

pub use audit::{audit_mappings, audit_settings, Audit, Finding, FindingKind};
pub use diff::{diff_analyzer, diff_dynamic_template, diff_field, Verdict};
pub use matcher::is_dynamically_explained;
pub use remediate::{run_mapping_tasks, run_settings_tasks, Remediation};
pub use task::{RemediationTask, TaskQueue};
