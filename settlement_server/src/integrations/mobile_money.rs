//! Adapts the mobile-money REST client to the engine's [`PaymentProcessor`] contract.
use log::*;
use mobile_money_tools::{MobileMoneyApi, MobileMoneyApiError, MobileMoneyConfig, PaymentRequest};
use settlement_engine::traits::{
    GatewayError,
    InitiatedPayment,
    PaymentInitiation,
    PaymentProcessor,
    PaymentStatusReport,
};

#[derive(Debug, Clone)]
pub struct MobileMoneyProcessor {
    api: MobileMoneyApi,
}

impl MobileMoneyProcessor {
    pub fn new(config: MobileMoneyConfig) -> Result<Self, MobileMoneyApiError> {
        let api = MobileMoneyApi::new(config)?;
        Ok(Self { api })
    }
}

impl PaymentProcessor for MobileMoneyProcessor {
    async fn initiate_payment(&self, request: PaymentInitiation) -> Result<InitiatedPayment, GatewayError> {
        let PaymentInitiation { amount, phone, reference } = request;
        trace!("💸️ Requesting {amount} from {phone} for [{reference}]");
        let request = PaymentRequest::new(amount, phone, reference);
        let response = self.api.initiate_payment(request).await.map_err(gateway_error)?;
        Ok(InitiatedPayment { transaction_id: response.transaction_id, payment_url: response.payment_url })
    }

    async fn check_payment_status(&self, transaction_id: &str) -> Result<PaymentStatusReport, GatewayError> {
        let response = self.api.payment_status(transaction_id).await.map_err(gateway_error)?;
        Ok(PaymentStatusReport {
            transaction_id: response.transaction_id,
            status: response.status,
            reference: response.reference,
        })
    }
}

fn gateway_error(e: MobileMoneyApiError) -> GatewayError {
    match e {
        MobileMoneyApiError::Initialization(s) | MobileMoneyApiError::RequestError(s) => GatewayError::Network(s),
        MobileMoneyApiError::JsonError(s) => GatewayError::MalformedResponse(s),
        MobileMoneyApiError::QueryError { status, message } => GatewayError::Upstream { status, message },
        MobileMoneyApiError::Declined(s) => GatewayError::Rejected(s),
        MobileMoneyApiError::InvalidTransactionId(id) => {
            GatewayError::MalformedResponse(format!("{id:?} is not a valid transaction id"))
        },
    }
}
