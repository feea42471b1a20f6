use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MobileMoneyApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the payment service: {0}")]
    RequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The payment service declined the request: {0}")]
    Declined(String),
    #[error("Invalid transaction id: {0:?}")]
    InvalidTransactionId(String),
}
