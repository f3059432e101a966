//! Postgres-backed store implementation
//!
//! Enabled with the `database` feature. Queries are bound at runtime so the
//! crate builds without a live database; the schema lives in
//! `migrations/0001_catalog_core.sql`.

use async_trait::async_trait;
use cip_common::{CipError, Result};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::types::{
    Item, JobDefinition, JobRun, RunSettings, RunStatus, TreeKind, TreeNode,
};

use super::{ItemStore, JobRunStore, TreeNodeStore};

/// Store implementation over a Postgres connection pool
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> CipError {
    CipError::Persistence(e.to_string())
}

fn run_from_row(row: &PgRow) -> Result<JobRun> {
    let Json(settings) = row
        .try_get::<Json<RunSettings>, _>("settings")
        .map_err(db_err)?;
    Ok(JobRun {
        id: row.try_get("id").map_err(db_err)?,
        job_id: row.try_get("job_id").map_err(db_err)?,
        settings,
        status: RunStatus::from(row.try_get::<String, _>("status").map_err(db_err)?),
        started_at: row.try_get("started_at").map_err(db_err)?,
        finished_at: row.try_get("finished_at").map_err(db_err)?,
        last_error: row.try_get("last_error").map_err(db_err)?,
    })
}

fn node_from_row(row: &PgRow) -> Result<TreeNode> {
    let kind: String = row.try_get("kind").map_err(db_err)?;
    Ok(TreeNode {
        id: row.try_get("id").map_err(db_err)?,
        kind: match kind.as_str() {
            "region" => TreeKind::Region,
            _ => TreeKind::Category,
        },
        external_id: row.try_get("external_id").map_err(db_err)?,
        source: row.try_get("source").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        parent_id: row.try_get("parent_id").map_err(db_err)?,
    })
}

fn item_from_row(row: &PgRow) -> Result<Item> {
    let Json(images) = row
        .try_get::<Json<Vec<String>>, _>("images")
        .map_err(db_err)?;
    Ok(Item {
        id: row.try_get("id").map_err(db_err)?,
        external_id: row.try_get("external_id").map_err(db_err)?,
        main_external_id: row.try_get("main_external_id").map_err(db_err)?,
        correlation_key: row.try_get("correlation_key").map_err(db_err)?,
        variant: row.try_get("variant").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        price: row.try_get("price").map_err(db_err)?,
        brand: row.try_get("brand").map_err(db_err)?,
        url: row.try_get("url").map_err(db_err)?,
        images,
        description: row.try_get("description").map_err(db_err)?,
        params: row.try_get("params").map_err(db_err)?,
        category_id: row.try_get("category_id").map_err(db_err)?,
        source: row.try_get("source").map_err(db_err)?,
        job_run_id: row.try_get("job_run_id").map_err(db_err)?,
    })
}

#[async_trait]
impl JobRunStore for PgStore {
    async fn find_run(&self, id: Uuid) -> Result<Option<JobRun>> {
        let row = sqlx::query(
            r#"
            SELECT id, job_id, settings, status, started_at, finished_at, last_error
            FROM job_runs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(run_from_row).transpose()
    }

    async fn save_run(&self, run: &JobRun) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_runs (id, job_id, settings, status, started_at, finished_at, last_error)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                settings = EXCLUDED.settings,
                status = EXCLUDED.status,
                started_at = EXCLUDED.started_at,
                finished_at = EXCLUDED.finished_at,
                last_error = EXCLUDED.last_error
            "#,
        )
        .bind(run.id)
        .bind(run.job_id)
        .bind(Json(&run.settings))
        .bind(run.status.as_str())
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(&run.last_error)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn find_definition(&self, job_id: Uuid) -> Result<Option<JobDefinition>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, producer_kind
            FROM job_definitions
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|row| {
            Ok(JobDefinition {
                id: row.try_get("id").map_err(db_err)?,
                name: row.try_get("name").map_err(db_err)?,
                producer_kind: row.try_get("producer_kind").map_err(db_err)?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn insert(&self, item: &Item) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (
                id, external_id, main_external_id, correlation_key, variant,
                name, price, brand, url, images, description, params,
                category_id, source, job_run_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(item.id)
        .bind(&item.external_id)
        .bind(&item.main_external_id)
        .bind(item.correlation_key)
        .bind(&item.variant)
        .bind(&item.name)
        .bind(item.price)
        .bind(&item.brand)
        .bind(&item.url)
        .bind(Json(&item.images))
        .bind(&item.description)
        .bind(&item.params)
        .bind(item.category_id)
        .bind(&item.source)
        .bind(item.job_run_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn find_by_main_external_id(
        &self,
        job_run_id: Uuid,
        main_external_id: &str,
    ) -> Result<Option<Item>> {
        let row = sqlx::query(
            r#"
            SELECT id, external_id, main_external_id, correlation_key, variant,
                   name, price, brand, url, images, description, params,
                   category_id, source, job_run_id
            FROM items
            WHERE job_run_id = $1 AND main_external_id = $2
            LIMIT 1
            "#,
        )
        .bind(job_run_id)
        .bind(main_external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn count_for_run(&self, job_run_id: Uuid) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE job_run_id = $1")
            .bind(job_run_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(count as u64)
    }
}

#[async_trait]
impl TreeNodeStore for PgStore {
    async fn find_by_external_id(
        &self,
        kind: TreeKind,
        external_id: &str,
        source: &str,
    ) -> Result<Option<TreeNode>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, external_id, source, name, parent_id
            FROM tree_nodes
            WHERE kind = $1 AND external_id = $2 AND source = $3
            "#,
        )
        .bind(kind.as_str())
        .bind(external_id)
        .bind(source)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(node_from_row).transpose()
    }

    async fn find_any_by_external_id(
        &self,
        kind: TreeKind,
        external_id: &str,
    ) -> Result<Option<TreeNode>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, external_id, source, name, parent_id
            FROM tree_nodes
            WHERE kind = $1 AND external_id = $2
            LIMIT 1
            "#,
        )
        .bind(kind.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(node_from_row).transpose()
    }

    async fn save(&self, node: &TreeNode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tree_nodes (id, kind, external_id, source, name, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                parent_id = EXCLUDED.parent_id
            "#,
        )
        .bind(node.id)
        .bind(node.kind.as_str())
        .bind(&node.external_id)
        .bind(&node.source)
        .bind(&node.name)
        .bind(node.parent_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
