//! Variant correlation within a single run
//!
//! Repeated records carrying the same main external id are variants of one
//! product; they all get the correlation key of the first persisted variant.
//! Correlation never crosses run boundaries: a re-run of the same job starts
//! a fresh correlation group.

use std::sync::Arc;

use cip_common::Result;
use uuid::Uuid;

use crate::store::ItemStore;

/// Assigns stable correlation keys to product variants within one run
pub struct CorrelationTracker {
    items: Arc<dyn ItemStore>,
}

impl CorrelationTracker {
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self { items }
    }

    /// Key for a product, reused from an earlier variant in the same run
    /// when one exists, freshly generated otherwise
    ///
    /// Must be called before the new item is persisted.
    pub async fn correlate(&self, job_run_id: Uuid, main_external_id: &str) -> Result<Uuid> {
        match self
            .items
            .find_by_main_external_id(job_run_id, main_external_id)
            .await?
        {
            Some(existing) => Ok(existing.correlation_key),
            None => Ok(Uuid::new_v4()),
        }
    }
}
