//! Job-run orchestration
//!
//! One `execute` call drives a complete run: load configuration, place the
//! hold payment, stream the producer into the pipeline, settle from the
//! actual item count, finalize status, notify.
//!
//! Failure policy: a failed balance check or hold creation aborts the run
//! and leaves it `Pending` (preserved from the original system; recovery is
//! the operator's call). An insufficient balance is an explicit `Error`
//! status. A producer failure ends only the ingestion phase; the run still
//! settles whatever was produced and finishes.

use std::sync::Arc;

use chrono::Utc;
use cip_common::{CipError, Result};
use uuid::Uuid;

use crate::billing::{BillingGate, PaymentService};
use crate::config::TariffRates;
use crate::notify::{Notification, NotificationForwarder, Notifier};
use crate::pipeline::IngestionPipeline;
use crate::producer::{ProducerOptions, ProducerRegistry, ProgressCounter, StopSignal};
use crate::store::{ItemStore, JobRunStore, TreeNodeStore};
use crate::types::{JobRun, RunMode, RunStatus};

/// Drives one job run end to end
pub struct JobRunOrchestrator {
    runs: Arc<dyn JobRunStore>,
    items: Arc<dyn ItemStore>,
    nodes: Arc<dyn TreeNodeStore>,
    billing: BillingGate,
    registry: Arc<ProducerRegistry>,
    notifier: Arc<dyn Notifier>,
}

impl JobRunOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runs: Arc<dyn JobRunStore>,
        items: Arc<dyn ItemStore>,
        nodes: Arc<dyn TreeNodeStore>,
        tariffs: TariffRates,
        payments: Arc<dyn PaymentService>,
        registry: Arc<ProducerRegistry>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            runs,
            items,
            nodes,
            billing: BillingGate::new(tariffs, payments),
            registry,
            notifier,
        }
    }

    /// Execute the run with the given id
    ///
    /// Returns an error only when the run cannot start at all (unknown run,
    /// job, or producer kind). Every in-run failure is terminal for the run,
    /// logged, and observable through persisted state; it never propagates
    /// to the queue worker.
    pub async fn execute(&self, job_run_id: Uuid) -> Result<()> {
        let mut run = self
            .runs
            .find_run(job_run_id)
            .await?
            .ok_or_else(|| CipError::NotFound(format!("job run {job_run_id}")))?;
        let definition = self
            .runs
            .find_definition(run.job_id)
            .await?
            .ok_or_else(|| CipError::NotFound(format!("job definition {}", run.job_id)))?;
        let factory = self.registry.get(&definition.producer_kind).ok_or_else(|| {
            CipError::Config(format!(
                "unknown producer kind '{}'",
                definition.producer_kind
            ))
        })?;

        let max_items = run.settings.max_items;
        let counter = ProgressCounter::new();
        let span = tracing::info_span!("job_run", id = %run.id, job = %definition.name);

        let options = ProducerOptions {
            stop: StopSignal::new(counter.clone(), max_items),
            max_items,
            notify: Arc::new(NotificationForwarder::new(
                self.notifier.clone(),
                definition.name.clone(),
            )),
            span,
        };
        let mut producer = factory.create(&run.settings, options)?;

        let mode = run.settings.mode();
        let tariffs = factory.tariffs();

        let mut payment = None;
        if mode == RunMode::Item {
            // Provisional quote from the configured quota; the settle below
            // recomputes from what was actually produced.
            let amount = self.billing.quote(tariffs, producer.max_items());

            let balance = match self.billing.balance().await {
                Ok(balance) => balance,
                Err(error) => {
                    tracing::error!(job_run_id = %run.id, error = %error, "Balance check failed, aborting run");
                    return Ok(());
                }
            };
            tracing::info!(job_run_id = %run.id, %balance, "Current balance");

            if balance < amount {
                let error = CipError::InsufficientFunds {
                    balance,
                    required: amount,
                };
                tracing::info!(job_run_id = %run.id, %error, "Not enough balance");
                run.status = RunStatus::Error;
                self.save_run(&run).await;
                return Ok(());
            }

            match self.billing.hold(&run, amount).await {
                Ok(held) => payment = Some(held),
                Err(error) => {
                    tracing::error!(job_run_id = %run.id, error = %error, "Failed to create hold payment, aborting run");
                    return Ok(());
                }
            }
        }

        run.started_at = Some(Utc::now());
        run.status = RunStatus::Processing;
        self.save_run(&run).await;

        let mut pipeline = IngestionPipeline::new(
            mode,
            run.id,
            producer.instance_name().to_string(),
            max_items,
            counter.clone(),
            self.items.clone(),
            self.nodes.clone(),
        );

        let outcome = match mode {
            RunMode::Category => producer.produce_categories(&mut pipeline).await,
            RunMode::Region => producer.produce_regions(&mut pipeline).await,
            RunMode::Item => producer.produce_items(&mut pipeline).await,
        };
        if let Err(error) = outcome {
            tracing::warn!(
                job_run_id = %run.id,
                error = %error,
                "Producer failed, keeping partial results"
            );
            run.last_error = Some(error.to_string());
        }

        if let Some(held) = payment {
            let produced = match self.items.count_for_run(run.id).await {
                Ok(count) => count,
                Err(error) => {
                    tracing::warn!(job_run_id = %run.id, error = %error, "Item count failed, settling from pipeline counter");
                    counter.get()
                }
            };
            // TODO: decide whether settle should charge item_price * produced
            // only; the run fee quoted at hold time is re-included here.
            let amount = self.billing.quote(tariffs, produced);
            if let Err(error) = self.billing.settle(&held, amount).await {
                tracing::error!(job_run_id = %run.id, error = %error, "Failed to settle hold payment");
            }
        }

        run.finished_at = Some(Utc::now());
        run.status = RunStatus::Finished;
        self.save_run(&run).await;

        let message = format!(
            "JobRun {} for job '{}' finished",
            run.id, definition.name
        );
        if let Err(error) = self
            .notifier
            .notify(Notification {
                subject: message.clone(),
                message,
                attachments: Vec::new(),
            })
            .await
        {
            tracing::warn!(job_run_id = %run.id, error = %error, "Completion notification failed");
        }

        Ok(())
    }

    /// Persist the run, logging instead of propagating save failures
    async fn save_run(&self, run: &JobRun) {
        if let Err(error) = self.runs.save_run(run).await {
            tracing::warn!(job_run_id = %run.id, error = %error, "Can not save job run");
        }
    }
}
