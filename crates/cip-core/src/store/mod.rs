//! Persistence seams for the job-run core
//!
//! The core never talks to a database directly; it works against these
//! traits. Write failures surface as [`CipError::Persistence`] values at the
//! call site, where the pipeline decides whether to skip the record or abort.
//!
//! [`CipError::Persistence`]: cip_common::CipError::Persistence

use async_trait::async_trait;
use cip_common::Result;
use uuid::Uuid;

use crate::types::{Item, JobDefinition, JobRun, TreeKind, TreeNode};

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::PgStore;

/// Load and persist job runs and their definitions
#[async_trait]
pub trait JobRunStore: Send + Sync {
    async fn find_run(&self, id: Uuid) -> Result<Option<JobRun>>;

    /// Insert or update a run keyed by its id
    async fn save_run(&self, run: &JobRun) -> Result<()>;

    async fn find_definition(&self, job_id: Uuid) -> Result<Option<JobDefinition>>;
}

/// Persist catalog items and answer the lookups the pipeline needs
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn insert(&self, item: &Item) -> Result<()>;

    /// First item of this run carrying the given main external id, used to
    /// reuse its correlation key for later variants
    async fn find_by_main_external_id(
        &self,
        job_run_id: Uuid,
        main_external_id: &str,
    ) -> Result<Option<Item>>;

    /// Number of items persisted for this run
    async fn count_for_run(&self, job_run_id: Uuid) -> Result<u64>;
}

/// Persist category/region nodes
#[async_trait]
pub trait TreeNodeStore: Send + Sync {
    /// Lookup scoped by `(external_id, source)` within the kind; this is the
    /// upsert key
    async fn find_by_external_id(
        &self,
        kind: TreeKind,
        external_id: &str,
        source: &str,
    ) -> Result<Option<TreeNode>>;

    /// Source-unscoped lookup by external id, used by item-mode category
    /// resolution (narrower than the upsert key; kept that way on purpose)
    async fn find_any_by_external_id(
        &self,
        kind: TreeKind,
        external_id: &str,
    ) -> Result<Option<TreeNode>>;

    /// Insert or update a node keyed by its id
    async fn save(&self, node: &TreeNode) -> Result<()>;
}
