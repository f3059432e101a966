//! Hierarchical upsert of category/region reference data
//!
//! Nodes are keyed by `(external_id, source)` within their kind. Parents are
//! resolved by a second lookup on the parent's external id; an unmatched
//! parent leaves the node an orphan rather than failing or creating the
//! parent implicitly.
//!
//! Two runs upserting the same key concurrently can lose an update; the core
//! takes no cross-run locks.

use std::sync::Arc;

use cip_common::Result;
use uuid::Uuid;

use crate::store::TreeNodeStore;
use crate::types::{RawTreeNode, TreeKind, TreeNode};

/// Upserts one kind of tree node for one source
pub struct TreeUpsertWriter {
    nodes: Arc<dyn TreeNodeStore>,
    kind: TreeKind,
    source: String,
}

impl TreeUpsertWriter {
    pub fn new(nodes: Arc<dyn TreeNodeStore>, kind: TreeKind, source: impl Into<String>) -> Self {
        Self {
            nodes,
            kind,
            source: source.into(),
        }
    }

    /// Update the node matched by `(external_id, source)` in place, or
    /// create it; returns the node id
    pub async fn upsert(&self, record: &RawTreeNode) -> Result<Uuid> {
        let existing = self
            .nodes
            .find_by_external_id(self.kind, &record.external_id, &self.source)
            .await?;

        let parent_id = match &record.parent {
            Some(parent_external_id) => self
                .nodes
                .find_by_external_id(self.kind, parent_external_id, &self.source)
                .await?
                .map(|parent| parent.id),
            None => None,
        };

        let node = match existing {
            Some(mut node) => {
                node.name = record.name.clone();
                node.parent_id = parent_id;
                node
            }
            None => TreeNode {
                id: Uuid::new_v4(),
                kind: self.kind,
                external_id: record.external_id.clone(),
                source: self.source.clone(),
                name: record.name.clone(),
                parent_id,
            },
        };

        self.nodes.save(&node).await?;

        Ok(node.id)
    }
}
