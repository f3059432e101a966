//! Shared fixtures for orchestrator integration tests
//!
//! Everything runs against the in-memory store plus recording doubles for
//! the payment and notification collaborators, with a scripted producer
//! standing in for a real external source.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use cip_common::{CipError, Result};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use cip_core::config::TariffRates;
use cip_core::store::{ItemStore, MemoryStore};
use cip_core::{
    Item, JobDefinition, JobRun, JobRunOrchestrator, Notification, NotificationRequest, Notifier,
    Payment, PaymentService, PaymentStatus, Producer, ProducerFactory, ProducerOptions,
    ProducerRegistry, RawRecord, RecordSink, RunSettings, StopSignal, TariffCoefficients,
};

pub const JOB_NAME: &str = "Acme Feed";
pub const PRODUCER_KIND: &str = "scripted";

/// Base rates chosen so quote(n) = 10 + n with unit coefficients
pub fn test_rates() -> TariffRates {
    TariffRates {
        base_run_price: Decimal::from(10),
        base_item_price: Decimal::from(1),
    }
}

// ============================================================================
// Payment service double
// ============================================================================

#[derive(Default)]
struct PaymentLog {
    holds: Vec<Payment>,
    settles: Vec<(Uuid, Decimal)>,
}

pub struct MemoryPayments {
    balance: Decimal,
    fail_balance: bool,
    fail_hold: bool,
    log: Mutex<PaymentLog>,
}

impl MemoryPayments {
    pub fn with_balance(balance: Decimal) -> Self {
        Self {
            balance,
            fail_balance: false,
            fail_hold: false,
            log: Mutex::default(),
        }
    }

    pub fn failing_balance() -> Self {
        Self {
            fail_balance: true,
            ..Self::with_balance(Decimal::ZERO)
        }
    }

    pub fn failing_hold(balance: Decimal) -> Self {
        Self {
            fail_hold: true,
            ..Self::with_balance(balance)
        }
    }

    pub async fn holds(&self) -> Vec<Payment> {
        self.log.lock().await.holds.clone()
    }

    pub async fn settles(&self) -> Vec<(Uuid, Decimal)> {
        self.log.lock().await.settles.clone()
    }
}

#[async_trait]
impl PaymentService for MemoryPayments {
    async fn balance(&self) -> Result<Decimal> {
        if self.fail_balance {
            return Err(CipError::BalanceCheck(
                "billing backend unavailable".to_string(),
            ));
        }
        Ok(self.balance)
    }

    async fn hold(&self, job_run: &JobRun, amount: Decimal) -> Result<Payment> {
        if self.fail_hold {
            return Err(CipError::PaymentCreation(
                "payment backend rejected the hold".to_string(),
            ));
        }
        let payment = Payment {
            id: Uuid::new_v4(),
            job_run_id: job_run.id,
            amount,
            status: PaymentStatus::Held,
        };
        self.log.lock().await.holds.push(payment.clone());
        Ok(payment)
    }

    async fn settle(&self, payment: &Payment, amount: Decimal) -> Result<()> {
        self.log.lock().await.settles.push((payment.id, amount));
        Ok(())
    }
}

// ============================================================================
// Notifier double
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

// ============================================================================
// Scripted producer
// ============================================================================

/// Factory emitting a fixed record script
///
/// `fail_after: Some(n)` makes the producer error out after pushing `n`
/// records; `respects_stop: false` simulates a producer that ignores the
/// cooperative stop signal.
pub struct ScriptedFactory {
    pub script: Vec<RawRecord>,
    pub tariffs: TariffCoefficients,
    pub respects_stop: bool,
    pub fail_after: Option<usize>,
    pub notify_request: Option<NotificationRequest>,
}

impl ScriptedFactory {
    pub fn new(script: Vec<RawRecord>) -> Self {
        Self {
            script,
            tariffs: TariffCoefficients {
                run_price: Decimal::from(1),
                item_price: Decimal::from(1),
            },
            respects_stop: true,
            fail_after: None,
            notify_request: None,
        }
    }
}

impl ProducerFactory for ScriptedFactory {
    fn kind(&self) -> &str {
        PRODUCER_KIND
    }

    fn tariffs(&self) -> TariffCoefficients {
        self.tariffs
    }

    fn create(
        &self,
        _settings: &RunSettings,
        options: ProducerOptions,
    ) -> Result<Box<dyn Producer>> {
        Ok(Box::new(ScriptedProducer {
            script: self.script.clone(),
            respects_stop: self.respects_stop,
            fail_after: self.fail_after,
            notify_request: self.notify_request.clone(),
            stop: options.stop,
            max_items: options.max_items,
            notify: options.notify,
        }))
    }
}

struct ScriptedProducer {
    script: Vec<RawRecord>,
    respects_stop: bool,
    fail_after: Option<usize>,
    notify_request: Option<NotificationRequest>,
    stop: StopSignal,
    max_items: u64,
    notify: Arc<dyn cip_core::producer::NotifySink>,
}

impl ScriptedProducer {
    async fn emit(&mut self, sink: &mut dyn RecordSink) -> Result<()> {
        if let Some(request) = self.notify_request.take() {
            self.notify.notify(request).await?;
        }

        for (index, record) in self.script.iter().enumerate() {
            if let Some(limit) = self.fail_after {
                if index >= limit {
                    return Err(CipError::Producer("feed connection dropped".to_string()));
                }
            }
            if self.respects_stop && self.stop.should_stop() {
                break;
            }
            let _ = sink.push(record.clone()).await;
        }

        Ok(())
    }
}

#[async_trait]
impl Producer for ScriptedProducer {
    fn instance_name(&self) -> &str {
        "scripted-source"
    }

    fn max_items(&self) -> u64 {
        self.max_items
    }

    async fn produce_items(&mut self, sink: &mut dyn RecordSink) -> Result<()> {
        self.emit(sink).await
    }

    async fn produce_categories(&mut self, sink: &mut dyn RecordSink) -> Result<()> {
        self.emit(sink).await
    }

    async fn produce_regions(&mut self, sink: &mut dyn RecordSink) -> Result<()> {
        self.emit(sink).await
    }
}

// ============================================================================
// Item store with a broken count query
// ============================================================================

/// Delegates inserts and lookups but fails every count query
struct FailingCountStore(Arc<MemoryStore>);

#[async_trait]
impl ItemStore for FailingCountStore {
    async fn insert(&self, item: &Item) -> Result<()> {
        self.0.insert(item).await
    }

    async fn find_by_main_external_id(
        &self,
        job_run_id: Uuid,
        main_external_id: &str,
    ) -> Result<Option<Item>> {
        self.0
            .find_by_main_external_id(job_run_id, main_external_id)
            .await
    }

    async fn count_for_run(&self, _job_run_id: Uuid) -> Result<u64> {
        Err(CipError::Persistence("count query failed".to_string()))
    }
}

// ============================================================================
// Environment
// ============================================================================

pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub payments: Arc<MemoryPayments>,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: JobRunOrchestrator,
}

impl TestEnv {
    pub fn new(factory: ScriptedFactory, payments: MemoryPayments) -> Self {
        Self::build(factory, payments, false)
    }

    /// Environment whose item count query fails; inserts still land
    pub fn with_failing_item_count(factory: ScriptedFactory, payments: MemoryPayments) -> Self {
        Self::build(factory, payments, true)
    }

    fn build(factory: ScriptedFactory, payments: MemoryPayments, fail_count: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        let payments = Arc::new(payments);
        let notifier = Arc::new(RecordingNotifier::default());

        let mut registry = ProducerRegistry::new();
        registry.register(Arc::new(factory));

        let items: Arc<dyn ItemStore> = if fail_count {
            Arc::new(FailingCountStore(store.clone()))
        } else {
            store.clone()
        };

        let orchestrator = JobRunOrchestrator::new(
            store.clone(),
            items,
            store.clone(),
            test_rates(),
            payments.clone(),
            Arc::new(registry),
            notifier.clone(),
        );

        Self {
            store,
            payments,
            notifier,
            orchestrator,
        }
    }

    /// Current persisted state of a run
    pub async fn run(&self, id: Uuid) -> JobRun {
        self.store
            .run_snapshot(id)
            .await
            .expect("run should be persisted")
    }

    /// Seed a definition plus a pending run and return the run id
    pub async fn seed_run(&self, settings: RunSettings) -> Uuid {
        self.seed_run_for_kind(settings, PRODUCER_KIND).await
    }

    pub async fn seed_run_for_kind(&self, settings: RunSettings, kind: &str) -> Uuid {
        let job_id = Uuid::new_v4();
        self.store
            .put_definition(JobDefinition {
                id: job_id,
                name: JOB_NAME.to_string(),
                producer_kind: kind.to_string(),
            })
            .await;

        let run = JobRun::pending(job_id, settings);
        let run_id = run.id;
        self.store.put_run(run).await;
        run_id
    }
}

// ============================================================================
// Record builders
// ============================================================================

pub fn item_record(external_id: &str) -> RawRecord {
    RawRecord::Item(cip_core::RawItem {
        external_id: external_id.to_string(),
        ..Default::default()
    })
}

pub fn variant_record(external_id: &str, variant: &str) -> RawRecord {
    RawRecord::Item(cip_core::RawItem {
        external_id: external_id.to_string(),
        variant: Some(variant.to_string()),
        ..Default::default()
    })
}

pub fn category_record(external_id: &str, name: &str, parent: Option<&str>) -> RawRecord {
    RawRecord::Category(cip_core::RawTreeNode {
        external_id: external_id.to_string(),
        name: name.to_string(),
        parent: parent.map(str::to_string),
    })
}

pub fn region_record(external_id: &str, name: &str, parent: Option<&str>) -> RawRecord {
    RawRecord::Region(cip_core::RawTreeNode {
        external_id: external_id.to_string(),
        name: name.to_string(),
        parent: parent.map(str::to_string),
    })
}

pub fn item_settings(max_items: u64) -> RunSettings {
    RunSettings {
        max_items,
        ..RunSettings::default()
    }
}

pub fn category_settings() -> RunSettings {
    RunSettings {
        parse_category: true,
        ..RunSettings::default()
    }
}

pub fn region_settings() -> RunSettings {
    RunSettings {
        parse_regions: true,
        ..RunSettings::default()
    }
}
