//! Core types for catalog job runs
//!
//! Domain records persisted by the stores plus the raw, producer-emitted
//! record shapes. Raw records are a tagged union so malformed producer
//! output is caught at the boundary instead of deep inside the pipeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job run status
///
/// Only advances `Pending -> Processing -> {Error | Finished}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Processing,
    Error,
    Finished,
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Processing => "processing",
            RunStatus::Error => "error",
            RunStatus::Finished => "finished",
        }
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => RunStatus::Pending,
            "processing" => RunStatus::Processing,
            "error" => RunStatus::Error,
            "finished" => RunStatus::Finished,
            _ => RunStatus::Pending,
        }
    }
}

/// Which ingestion mode a run executes
///
/// Exactly one of the three; category wins over region when both flags are
/// set, matching the dispatch order of the settings flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Item,
    Category,
    Region,
}

/// Per-run settings
///
/// Recognized keys are typed; everything else is producer-specific
/// passthrough kept in `extra`. `max_items` defaults to 0, which means the
/// quota is already satisfied and every item record is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSettings {
    #[serde(default)]
    pub max_items: u64,
    #[serde(default)]
    pub parse_category: bool,
    #[serde(default)]
    pub parse_regions: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RunSettings {
    pub fn mode(&self) -> RunMode {
        if self.parse_category {
            RunMode::Category
        } else if self.parse_regions {
            RunMode::Region
        } else {
            RunMode::Item
        }
    }
}

/// One execution of a job against one external producer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub id: Uuid,
    pub job_id: Uuid,
    pub settings: RunSettings,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Last producer failure recorded for this run, if any
    pub last_error: Option<String>,
}

impl JobRun {
    /// A fresh pending run for a job
    pub fn pending(job_id: Uuid, settings: RunSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            settings,
            status: RunStatus::Pending,
            started_at: None,
            finished_at: None,
            last_error: None,
        }
    }
}

/// A configured ingestion job, referencing a producer kind by name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: Uuid,
    pub name: String,
    pub producer_kind: String,
}

/// A persisted catalog item
///
/// Created once per accepted record within a run; never updated afterwards.
/// `external_id` is the composite uniqueness key (raw id plus variant
/// suffix), `main_external_id` identifies the underlying product across its
/// variants, and `correlation_key` groups those variants within one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub external_id: String,
    pub main_external_id: String,
    pub correlation_key: Uuid,
    pub variant: Option<String>,
    pub name: String,
    pub price: Decimal,
    pub brand: Option<String>,
    pub url: String,
    pub images: Vec<String>,
    pub description: Option<String>,
    pub params: serde_json::Value,
    pub category_id: Option<Uuid>,
    pub source: String,
    pub job_run_id: Uuid,
}

/// Kind of tree-shaped reference data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    Category,
    Region,
}

impl TreeKind {
    pub fn as_str(&self) -> &str {
        match self {
            TreeKind::Category => "category",
            TreeKind::Region => "region",
        }
    }
}

/// A category or region node
///
/// Upserted by `(external_id, source)` within its kind. An unresolved parent
/// external id leaves `parent_id` as `None`; nodes are never created
/// implicitly for missing parents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: Uuid,
    pub kind: TreeKind,
    pub external_id: String,
    pub source: String,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

/// Payment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Held,
    Settled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Held => "held",
            PaymentStatus::Settled => "settled",
        }
    }
}

/// A hold placed against the account balance for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub job_run_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
}

/// A record emitted by an external producer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawRecord {
    Item(RawItem),
    Category(RawTreeNode),
    Region(RawTreeNode),
}

/// Raw item shape, with explicit optional-field defaulting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawItem {
    pub external_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    /// External id of the item's category, if the producer knows it
    #[serde(default)]
    pub category: Option<String>,
}

/// Raw category/region shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTreeNode {
    pub external_id: String,
    pub name: String,
    /// External id of the parent node, if any
    #[serde(default)]
    pub parent: Option<String>,
}
