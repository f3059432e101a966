//! In-memory store implementation
//!
//! Backs tests and embedders that do not need durable persistence. All
//! collections live behind one async mutex; no cross-run locking beyond
//! that, so concurrent runs upserting the same `(external_id, source)` node
//! can still lose updates, the same way the database-backed store can.

use std::collections::HashMap;

use async_trait::async_trait;
use cip_common::Result;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::types::{Item, JobDefinition, JobRun, TreeKind, TreeNode};

use super::{ItemStore, JobRunStore, TreeNodeStore};

#[derive(Default)]
struct MemoryState {
    runs: HashMap<Uuid, JobRun>,
    definitions: HashMap<Uuid, JobDefinition>,
    items: Vec<Item>,
    nodes: Vec<TreeNode>,
}

/// Shared in-memory store for runs, items, and tree nodes
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a job definition, e.g. from test fixtures
    pub async fn put_definition(&self, definition: JobDefinition) {
        let mut state = self.state.lock().await;
        state.definitions.insert(definition.id, definition);
    }

    /// Seed a job run directly
    pub async fn put_run(&self, run: JobRun) {
        let mut state = self.state.lock().await;
        state.runs.insert(run.id, run);
    }

    /// Snapshot of one run's persisted state
    pub async fn run_snapshot(&self, id: Uuid) -> Option<JobRun> {
        self.state.lock().await.runs.get(&id).cloned()
    }

    /// Snapshot of all persisted items
    pub async fn items(&self) -> Vec<Item> {
        self.state.lock().await.items.clone()
    }

    /// Snapshot of all persisted tree nodes
    pub async fn nodes(&self) -> Vec<TreeNode> {
        self.state.lock().await.nodes.clone()
    }
}

#[async_trait]
impl JobRunStore for MemoryStore {
    async fn find_run(&self, id: Uuid) -> Result<Option<JobRun>> {
        Ok(self.state.lock().await.runs.get(&id).cloned())
    }

    async fn save_run(&self, run: &JobRun) -> Result<()> {
        let mut state = self.state.lock().await;
        state.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn find_definition(&self, job_id: Uuid) -> Result<Option<JobDefinition>> {
        Ok(self.state.lock().await.definitions.get(&job_id).cloned())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn insert(&self, item: &Item) -> Result<()> {
        let mut state = self.state.lock().await;
        state.items.push(item.clone());
        Ok(())
    }

    async fn find_by_main_external_id(
        &self,
        job_run_id: Uuid,
        main_external_id: &str,
    ) -> Result<Option<Item>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .iter()
            .find(|item| {
                item.job_run_id == job_run_id && item.main_external_id == main_external_id
            })
            .cloned())
    }

    async fn count_for_run(&self, job_run_id: Uuid) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .iter()
            .filter(|item| item.job_run_id == job_run_id)
            .count() as u64)
    }
}

#[async_trait]
impl TreeNodeStore for MemoryStore {
    async fn find_by_external_id(
        &self,
        kind: TreeKind,
        external_id: &str,
        source: &str,
    ) -> Result<Option<TreeNode>> {
        let state = self.state.lock().await;
        Ok(state
            .nodes
            .iter()
            .find(|node| {
                node.kind == kind && node.external_id == external_id && node.source == source
            })
            .cloned())
    }

    async fn find_any_by_external_id(
        &self,
        kind: TreeKind,
        external_id: &str,
    ) -> Result<Option<TreeNode>> {
        let state = self.state.lock().await;
        Ok(state
            .nodes
            .iter()
            .find(|node| node.kind == kind && node.external_id == external_id)
            .cloned())
    }

    async fn save(&self, node: &TreeNode) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.nodes.iter_mut().find(|existing| existing.id == node.id) {
            Some(existing) => *existing = node.clone(),
            None => state.nodes.push(node.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunSettings;

    #[tokio::test]
    async fn save_run_overwrites_by_id() {
        let store = MemoryStore::new();
        let mut run = JobRun::pending(Uuid::new_v4(), RunSettings::default());
        store.save_run(&run).await.unwrap();

        run.last_error = Some("boom".to_string());
        store.save_run(&run).await.unwrap();

        let loaded = store.find_run(run.id).await.unwrap().unwrap();
        assert_eq!(loaded.last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn count_is_scoped_to_the_run() {
        let store = MemoryStore::new();
        let run_a = Uuid::new_v4();
        let run_b = Uuid::new_v4();
        for (run, id) in [(run_a, "1"), (run_a, "2"), (run_b, "3")] {
            let item = Item {
                id: Uuid::new_v4(),
                external_id: id.to_string(),
                main_external_id: id.to_string(),
                correlation_key: Uuid::new_v4(),
                variant: None,
                name: String::new(),
                price: Default::default(),
                brand: None,
                url: id.to_string(),
                images: Vec::new(),
                description: None,
                params: serde_json::Value::Object(Default::default()),
                category_id: None,
                source: "test".to_string(),
                job_run_id: run,
            };
            store.insert(&item).await.unwrap();
        }

        assert_eq!(store.count_for_run(run_a).await.unwrap(), 2);
        assert_eq!(store.count_for_run(run_b).await.unwrap(), 1);
    }
}
