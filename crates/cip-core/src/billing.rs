//! Billing gate for prepaid job runs
//!
//! Quotes tariff amounts from producer coefficients and drives hold/settle
//! operations against the external payment collaborator. The gate never
//! checks the balance itself; the orchestrator owns that comparison.

use std::sync::Arc;

use async_trait::async_trait;
use cip_common::{CipError, Result};
use rust_decimal::Decimal;

use crate::config::TariffRates;
use crate::types::{JobRun, Payment};

/// Tariff coefficients declared by a producer kind
#[derive(Debug, Clone, Copy)]
pub struct TariffCoefficients {
    pub run_price: Decimal,
    pub item_price: Decimal,
}

/// External balance/payment collaborator
///
/// Idempotency and exact release semantics of `settle` belong to the
/// implementation; the core calls it exactly once per held payment.
#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn balance(&self) -> Result<Decimal>;

    async fn hold(&self, job_run: &JobRun, amount: Decimal) -> Result<Payment>;

    async fn settle(&self, payment: &Payment, amount: Decimal) -> Result<()>;
}

/// Computes amounts and forwards hold/settle to the payment collaborator
pub struct BillingGate {
    rates: TariffRates,
    payments: Arc<dyn PaymentService>,
}

impl BillingGate {
    pub fn new(rates: TariffRates, payments: Arc<dyn PaymentService>) -> Self {
        Self { rates, payments }
    }

    /// Amount for a run of `item_count` items under the given coefficients
    ///
    /// `run_price * base_run + item_count * item_price * base_item`; the run
    /// fee is charged regardless of how many items get produced.
    pub fn quote(&self, coefficients: TariffCoefficients, item_count: u64) -> Decimal {
        coefficients.run_price * self.rates.base_run_price
            + Decimal::from(item_count) * coefficients.item_price * self.rates.base_item_price
    }

    pub async fn balance(&self) -> Result<Decimal> {
        self.payments
            .balance()
            .await
            .map_err(|e| CipError::BalanceCheck(e.to_string()))
    }

    pub async fn hold(&self, job_run: &JobRun, amount: Decimal) -> Result<Payment> {
        self.payments
            .hold(job_run, amount)
            .await
            .map_err(|e| CipError::PaymentCreation(e.to_string()))
    }

    pub async fn settle(&self, payment: &Payment, amount: Decimal) -> Result<()> {
        self.payments.settle(payment, amount).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentStatus;
    use std::str::FromStr;
    use uuid::Uuid;

    struct NoopPayments;

    #[async_trait]
    impl PaymentService for NoopPayments {
        async fn balance(&self) -> Result<Decimal> {
            Ok(Decimal::ZERO)
        }

        async fn hold(&self, job_run: &JobRun, amount: Decimal) -> Result<Payment> {
            Ok(Payment {
                id: Uuid::new_v4(),
                job_run_id: job_run.id,
                amount,
                status: PaymentStatus::Held,
            })
        }

        async fn settle(&self, _payment: &Payment, _amount: Decimal) -> Result<()> {
            Ok(())
        }
    }

    fn gate() -> BillingGate {
        let rates = TariffRates {
            base_run_price: Decimal::from(10),
            base_item_price: Decimal::from_str("0.5").unwrap(),
        };
        BillingGate::new(rates, Arc::new(NoopPayments))
    }

    fn coefficients() -> TariffCoefficients {
        TariffCoefficients {
            run_price: Decimal::from(2),
            item_price: Decimal::from(3),
        }
    }

    #[test]
    fn quote_formula() {
        // 2 * 10 + 4 * 3 * 0.5 = 26
        assert_eq!(gate().quote(coefficients(), 4), Decimal::from(26));
    }

    #[test]
    fn quote_is_monotonic_in_item_count() {
        let gate = gate();
        let coefficients = coefficients();
        let mut previous = gate.quote(coefficients, 0);
        for count in 1..50 {
            let amount = gate.quote(coefficients, count);
            assert!(amount >= previous);
            previous = amount;
        }
    }

    #[test]
    fn zero_items_still_charge_the_run_fee() {
        assert_eq!(gate().quote(coefficients(), 0), Decimal::from(20));
    }
}
