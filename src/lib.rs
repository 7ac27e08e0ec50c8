//! # indexsync
//!
//! Keeps the schema of a search index (field mappings, multi-fields, dynamic
//! templates and analyzers) in step with a live Elasticsearch-style cluster,
//! without ever doing anything destructive.
//!
//! Mapping engines of this kind cannot change the type or analyzer of a field
//! that already exists; that takes a full reindex. So reconciliation only adds
//! what is missing. Anything that changed, and anything still live that the
//! schema no longer declares, is reported rather than fixed.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use indexsync::{ClusterConfig, IndexDefinition, IndexSync};
//!
//! # async fn run() -> indexsync::Result<()> {
//! let config = ClusterConfig::from_env()?;
//! let definition = IndexDefinition::load("products.json")?;
//! let sync = IndexSync::connect(&config, definition)?;
//!
//! let outcome = sync.ensure().await?;
//! if !outcome.consistent {
//!     println!("products has drifted; see the warnings above");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Dry runs
//!
//! [`IndexSync::audit_mappings`] and [`IndexSync::audit_settings`] read the
//! live schema and return what `ensure` would do, without touching the index.
//!
//! ## Testing without a cluster
//!
//! [`transport::MemoryCluster`] implements the same [`transport::Transport`]
//! seam as the HTTP client and models the cluster rules reconciliation cares
//! about.

pub mod config;
pub mod error;
pub mod manager;
pub mod reconcile;
pub mod report;
pub mod schema;
pub mod transport;

pub use config::{ClusterConfig, IndexDefinition};
pub use error::{IndexSyncError, Result};
pub use manager::{EnsureOutcome, IndexSync};
pub use reconcile::{Audit, Finding, FindingKind, Remediation, RemediationTask, Verdict};
pub use report::{MemorySink, ReportSink, TracingSink};
pub use schema::{flatten, FieldDescriptor, IndexSchema};
