//! CIP Core Library
//!
//! Job-run orchestration for catalog ingestion: pluggable external producers
//! push raw item/category/region records into a quota-capped pipeline, while
//! a prepaid billing gate holds and settles the run's cost against an account
//! balance.
//!
//! # Architecture
//!
//! One call to [`JobRunOrchestrator::execute`] drives a complete run:
//!
//! 1. Load the [`JobRun`](types::JobRun) and its job definition, resolve the
//!    producer factory from the [`ProducerRegistry`](producer::ProducerRegistry)
//! 2. For plain item runs, quote the configured quota and place a hold
//!    payment through the [`BillingGate`](billing::BillingGate)
//! 3. Drive the producer into an [`IngestionPipeline`](pipeline::IngestionPipeline),
//!    which correlates product variants, resolves categories, and upserts
//!    tree-shaped reference data
//! 4. Settle the hold from the actually-persisted item count and mark the
//!    run finished, emitting a completion notification
//!
//! Persistence, payments, and notification delivery are collaborator traits;
//! in-memory store implementations live in [`store::memory`] and a
//! Postgres-backed one behind the `database` feature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cip_core::{config::CoreConfig, orchestrator::JobRunOrchestrator};
//!
//! # async fn run(
//! #     store: Arc<cip_core::store::memory::MemoryStore>,
//! #     payments: Arc<dyn cip_core::billing::PaymentService>,
//! #     notifier: Arc<dyn cip_core::notify::Notifier>,
//! #     registry: Arc<cip_core::producer::ProducerRegistry>,
//! #     job_run_id: uuid::Uuid,
//! # ) -> anyhow::Result<()> {
//! let config = CoreConfig::load()?;
//! let orchestrator = JobRunOrchestrator::new(
//!     store.clone(),
//!     store.clone(),
//!     store,
//!     config.tariffs,
//!     payments,
//!     registry,
//!     notifier,
//! );
//! orchestrator.execute(job_run_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod billing;
pub mod config;
pub mod correlate;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod producer;
pub mod store;
pub mod tree;
pub mod types;

// Re-export commonly used types
pub use billing::{BillingGate, PaymentService, TariffCoefficients};
pub use correlate::CorrelationTracker;
pub use notify::{Attachment, Notification, Notifier};
pub use orchestrator::JobRunOrchestrator;
pub use pipeline::IngestionPipeline;
pub use producer::{
    NotificationRequest, Producer, ProducerFactory, ProducerOptions, ProducerRegistry,
    ProgressCounter, RecordSink, StopSignal,
};
pub use tree::TreeUpsertWriter;
pub use types::{
    Item, JobDefinition, JobRun, Payment, PaymentStatus, RawItem, RawRecord, RawTreeNode,
    RunMode, RunSettings, RunStatus, TreeKind, TreeNode,
};
