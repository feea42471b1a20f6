use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
    },
};

use settlement_engine::{
    traits::{InitiatedPayment, PaymentInitiation, PaymentStatusReport},
    GatewayError,
    PaymentProcessor,
};

/// An in-memory mobile-money processor. Payments are `pending` until the test settles them.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessor {
    next_id: Arc<AtomicU64>,
    payments: Arc<Mutex<HashMap<String, (String, String)>>>,
    offline: Arc<Mutex<bool>>,
    initiated: Arc<AtomicU64>,
}

impl FakeProcessor {
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// Sets the status the processor reports for a transaction.
    pub fn settle(&self, transaction_id: &str, status: &str) {
        let mut payments = self.payments.lock().unwrap();
        let entry = payments.get_mut(transaction_id).expect("Unknown transaction");
        entry.1 = status.to_string();
    }

    pub fn initiated_count(&self) -> u64 {
        self.initiated.load(Ordering::SeqCst)
    }
}

impl PaymentProcessor for FakeProcessor {
    async fn initiate_payment(&self, request: PaymentInitiation) -> Result<InitiatedPayment, GatewayError> {
        if *self.offline.lock().unwrap() {
            return Err(GatewayError::Network("connection refused".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let transaction_id = format!("mm-tx-{id}");
        self.payments.lock().unwrap().insert(transaction_id.clone(), (request.reference, "pending".to_string()));
        self.initiated.fetch_add(1, Ordering::SeqCst);
        Ok(InitiatedPayment {
            payment_url: Some(format!("https://pay.test/{transaction_id}")),
            transaction_id,
        })
    }

    async fn check_payment_status(&self, transaction_id: &str) -> Result<PaymentStatusReport, GatewayError> {
        if *self.offline.lock().unwrap() {
            return Err(GatewayError::Network("connection refused".into()));
        }
        let payments = self.payments.lock().unwrap();
        let (reference, status) = payments
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| GatewayError::Upstream { status: 404, message: "unknown transaction".into() })?;
        Ok(PaymentStatusReport { transaction_id: transaction_id.to_string(), status, reference: Some(reference) })
    }
}
