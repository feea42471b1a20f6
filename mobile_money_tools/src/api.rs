use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::MobileMoneyConfig,
    data_objects::{PaymentRequest, PaymentResponse, PaymentStatusResponse},
    MobileMoneyApiError,
};

#[derive(Clone)]
pub struct MobileMoneyApi {
    config: MobileMoneyConfig,
    client: Arc<Client>,
}

impl std::fmt::Debug for MobileMoneyApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MobileMoneyApi ({})", self.config.api_url)
    }
}

impl MobileMoneyApi {
    pub fn new(config: MobileMoneyConfig) -> Result<Self, MobileMoneyApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.api_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| MobileMoneyApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MobileMoneyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, MobileMoneyApiError> {
        let url = self.url(path);
        trace!("💸️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| MobileMoneyApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💸️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| MobileMoneyApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| MobileMoneyApiError::RequestError(e.to_string()))?;
            Err(MobileMoneyApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    /// Asks the processor to collect a payment. The callback URL from the configuration is attached unless the
    /// request already carries one.
    pub async fn initiate_payment(&self, request: PaymentRequest) -> Result<PaymentResponse, MobileMoneyApiError> {
        let request = match request.callback_url {
            Some(_) => request,
            None => {
                let url = self.config.callback_url.clone();
                request.with_callback_url(url)
            },
        };
        debug!("💸️ Initiating payment of {} for [{}]", request.amount, request.reference);
        let response = self.rest_query::<PaymentResponse, _>(Method::POST, "/payments", Some(request)).await?;
        if response.transaction_id.trim().is_empty() {
            return Err(MobileMoneyApiError::JsonError("The response did not include a transaction id".into()));
        }
        if !is_valid_transaction_id(&response.transaction_id) {
            return Err(MobileMoneyApiError::InvalidTransactionId(response.transaction_id));
        }
        if let Some(status) = response.status.as_deref() {
            if matches!(status.trim().to_ascii_lowercase().as_str(), "failed" | "rejected" | "declined") {
                return Err(MobileMoneyApiError::Declined(format!("{} is {status}", response.transaction_id)));
            }
        }
        info!("💸️ Payment initiated. Transaction id {}", response.transaction_id);
        Ok(response)
    }

    pub async fn payment_status(&self, transaction_id: &str) -> Result<PaymentStatusResponse, MobileMoneyApiError> {
        let path = status_path(transaction_id)?;
        debug!("💸️ Fetching status of transaction {transaction_id}");
        let result = self.rest_query::<PaymentStatusResponse, ()>(Method::GET, &path, None).await?;
        trace!("💸️ Transaction {transaction_id} is '{}'", result.status);
        Ok(result)
    }
}

/// Transaction ids end up in request paths, so only URL-safe ids are accepted.
pub fn is_valid_transaction_id(transaction_id: &str) -> bool {
    !transaction_id.is_empty() && transaction_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn status_path(transaction_id: &str) -> Result<String, MobileMoneyApiError> {
    if is_valid_transaction_id(transaction_id) {
        Ok(format!("/payments/{transaction_id}"))
    } else {
        Err(MobileMoneyApiError::InvalidTransactionId(transaction_id.to_string()))
    }
}
