//! Record ingestion pipeline
//!
//! The [`RecordSink`] a producer pushes into. Routes each record to the
//! writer matching the run's mode, enforces the item quota, and tracks
//! progress through the shared counter. Per-record persistence failures are
//! logged and the record rejected; the run keeps going.

use std::sync::Arc;

use async_trait::async_trait;
use cip_common::Result;
use uuid::Uuid;

use crate::correlate::CorrelationTracker;
use crate::producer::{ProgressCounter, RecordSink};
use crate::store::{ItemStore, TreeNodeStore};
use crate::tree::TreeUpsertWriter;
use crate::types::{Item, RawItem, RawRecord, RunMode, TreeKind};

/// Consumes one run's record stream
pub struct IngestionPipeline {
    mode: RunMode,
    job_run_id: Uuid,
    source: String,
    max_items: u64,
    counter: ProgressCounter,
    items: Arc<dyn ItemStore>,
    nodes: Arc<dyn TreeNodeStore>,
    correlator: CorrelationTracker,
    categories: TreeUpsertWriter,
    regions: TreeUpsertWriter,
}

impl IngestionPipeline {
    pub fn new(
        mode: RunMode,
        job_run_id: Uuid,
        source: impl Into<String>,
        max_items: u64,
        counter: ProgressCounter,
        items: Arc<dyn ItemStore>,
        nodes: Arc<dyn TreeNodeStore>,
    ) -> Self {
        let source = source.into();
        Self {
            mode,
            job_run_id,
            max_items,
            counter,
            correlator: CorrelationTracker::new(items.clone()),
            categories: TreeUpsertWriter::new(nodes.clone(), TreeKind::Category, source.clone()),
            regions: TreeUpsertWriter::new(nodes.clone(), TreeKind::Region, source.clone()),
            items,
            nodes,
            source,
        }
    }

    /// Items accepted so far
    pub fn processed(&self) -> u64 {
        self.counter.get()
    }

    async fn ingest_item(&self, raw: RawItem) -> bool {
        // The counter guard is the source of truth, independent of whether
        // the producer honors the stop signal.
        if self.counter.get() >= self.max_items {
            return false;
        }

        match self.persist_item(raw).await {
            Ok(()) => {
                self.counter.increment();
                true
            }
            Err(error) => {
                tracing::warn!(
                    job_run_id = %self.job_run_id,
                    error = %error,
                    "Can not save item"
                );
                false
            }
        }
    }

    async fn persist_item(&self, raw: RawItem) -> Result<()> {
        // Category resolution is unscoped by source, unlike the tree
        // writer's upsert key. Kept as-is; see DESIGN.md.
        let category_id = match &raw.category {
            Some(category_external_id) => self
                .nodes
                .find_any_by_external_id(TreeKind::Category, category_external_id)
                .await?
                .map(|node| node.id),
            None => None,
        };

        let correlation_key = self
            .correlator
            .correlate(self.job_run_id, &raw.external_id)
            .await?;

        let item = Item {
            id: Uuid::new_v4(),
            external_id: composite_external_id(&raw.external_id, raw.variant.as_deref()),
            main_external_id: raw.external_id.clone(),
            correlation_key,
            variant: raw.variant,
            name: normalize_whitespace(raw.name.as_deref().unwrap_or("")),
            price: raw.price.unwrap_or_default(),
            brand: raw.brand,
            url: raw.url.unwrap_or_else(|| raw.external_id.clone()),
            images: raw.images,
            description: raw.description,
            params: raw
                .params
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            category_id,
            source: self.source.clone(),
            job_run_id: self.job_run_id,
        };

        self.items.insert(&item).await
    }

    async fn ingest_tree(&self, writer: &TreeUpsertWriter, raw: &crate::types::RawTreeNode) -> bool {
        match writer.upsert(raw).await {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(
                    job_run_id = %self.job_run_id,
                    external_id = %raw.external_id,
                    error = %error,
                    "Can not save tree node"
                );
                false
            }
        }
    }
}

#[async_trait]
impl RecordSink for IngestionPipeline {
    async fn push(&mut self, record: RawRecord) -> bool {
        match (self.mode, record) {
            (RunMode::Item, RawRecord::Item(raw)) => self.ingest_item(raw).await,
            (RunMode::Category, RawRecord::Category(raw)) => {
                self.ingest_tree(&self.categories, &raw).await
            }
            (RunMode::Region, RawRecord::Region(raw)) => {
                self.ingest_tree(&self.regions, &raw).await
            }
            (mode, record) => {
                tracing::warn!(
                    job_run_id = %self.job_run_id,
                    ?mode,
                    ?record,
                    "Record shape does not match run mode, rejecting"
                );
                false
            }
        }
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends
fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uniqueness key for an item: the raw external id, suffixed with the
/// variant when one is present so variants of one product do not collide
fn composite_external_id(external_id: &str, variant: Option<&str>) -> String {
    match variant {
        Some(variant) => format!("{} | {}", external_id, variant),
        None => external_id.to_string(),
    }
}
