//! Producer protocol
//!
//! The contract between the orchestrator and pluggable external data
//! producers. A producer pushes [`RawRecord`]s into a [`RecordSink`] one at
//! a time; the sink's accept/reject return value is only a hint, and the
//! [`StopSignal`] tells a cooperative producer when the item quota is
//! reached. The quota itself is enforced by the pipeline either way.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cip_common::Result;
use serde::{Deserialize, Serialize};

use crate::billing::TariffCoefficients;
use crate::types::{RawRecord, RunSettings};

/// Shared processed-item counter
///
/// One clone lives in the pipeline (incremented per persisted item), another
/// inside the [`StopSignal`] handed to the producer. Single-threaded use per
/// run; the atomic only provides shared mutation across the clones.
#[derive(Clone, Debug, Default)]
pub struct ProgressCounter(Arc<AtomicU64>);

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cooperative cancellation handle
///
/// Flips to true once the processed-item counter reaches the quota. A
/// producer that keeps emitting afterwards only gets its records rejected.
#[derive(Clone, Debug)]
pub struct StopSignal {
    counter: ProgressCounter,
    max_items: u64,
}

impl StopSignal {
    pub fn new(counter: ProgressCounter, max_items: u64) -> Self {
        Self { counter, max_items }
    }

    pub fn should_stop(&self) -> bool {
        self.counter.get() >= self.max_items
    }
}

/// A notification a producer asks the orchestrator to deliver
///
/// Missing subject/message are templated from the job name and timestamp;
/// a file at `attachment_path` is read and attached as bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub subject: Option<String>,
    pub message: Option<String>,
    pub attachment_path: Option<PathBuf>,
}

/// Where producer-initiated notifications go
#[async_trait]
pub trait NotifySink: Send + Sync {
    async fn notify(&self, request: NotificationRequest) -> Result<()>;
}

/// Options injected into every producer at construction time
pub struct ProducerOptions {
    pub stop: StopSignal,
    pub max_items: u64,
    pub notify: Arc<dyn NotifySink>,
    /// Span covering the run; producers should instrument their work with it
    pub span: tracing::Span,
}

/// Consumes records pushed by a producer
///
/// Returns `true` when the record was accepted. Producers may treat `false`
/// as a hint to stop; the pipeline stays correct if they do not.
#[async_trait]
pub trait RecordSink: Send {
    async fn push(&mut self, record: RawRecord) -> bool;
}

/// A constructed external data producer
///
/// Each of the three produce operations synchronously pushes records into
/// the sink until the source is exhausted or the stop signal is honored.
/// Exactly one of them is invoked per job run.
#[async_trait]
pub trait Producer: Send {
    /// Stable name identifying this source instance; used as the `source`
    /// key on persisted records
    fn instance_name(&self) -> &str;

    /// The item quota this producer was configured with
    fn max_items(&self) -> u64;

    async fn produce_items(&mut self, sink: &mut dyn RecordSink) -> Result<()>;

    async fn produce_categories(&mut self, sink: &mut dyn RecordSink) -> Result<()>;

    async fn produce_regions(&mut self, sink: &mut dyn RecordSink) -> Result<()>;
}

/// Constructs producers of one kind and declares its tariff coefficients
pub trait ProducerFactory: Send + Sync {
    /// Kind name referenced by [`JobDefinition::producer_kind`]
    ///
    /// [`JobDefinition::producer_kind`]: crate::types::JobDefinition::producer_kind
    fn kind(&self) -> &str;

    fn tariffs(&self) -> TariffCoefficients;

    fn create(
        &self,
        settings: &RunSettings,
        options: ProducerOptions,
    ) -> Result<Box<dyn Producer>>;
}

/// Registry of producer factories keyed by kind name
#[derive(Default)]
pub struct ProducerRegistry {
    factories: HashMap<String, Arc<dyn ProducerFactory>>,
}

impl ProducerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: Arc<dyn ProducerFactory>) {
        self.factories.insert(factory.kind().to_string(), factory);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn ProducerFactory>> {
        self.factories.get(kind).cloned()
    }
}
