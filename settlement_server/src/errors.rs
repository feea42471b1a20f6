use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use settlement_engine::SettlementError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("The payment could not be started. The orders for {payment_ref} were kept, so it can be retried. {message}")]
    PaymentInitiationFailed { payment_ref: String, message: String },
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingIdentity => StatusCode::UNAUTHORIZED,
                AuthError::InvalidRole(_) => StatusCode::BAD_REQUEST,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentInitiationFailed { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No user identity was supplied with the request.")]
    MissingIdentity,
    #[error("{0} is not a valid role.")]
    InvalidRole(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl From<SettlementError> for ServerError {
    fn from(e: SettlementError) -> Self {
        match e {
            _ if e.is_validation_error() => Self::InvalidRequestBody(e.to_string()),
            SettlementError::ProfileNotFound(_) |
            SettlementError::OrderNotFound(_) |
            SettlementError::PayoutRequestNotFound(_) |
            SettlementError::PaymentNotFound(_) => Self::NoRecordFound(e.to_string()),
            SettlementError::OrderModificationForbidden(_) => Self::InsufficientPermissions(e.to_string()),
            SettlementError::OrderModificationNoOp(_) | SettlementError::PayoutRequestAlreadyResolved(..) => {
                Self::Conflict(e.to_string())
            },
            SettlementError::SellerNotResolved(_) | SettlementError::DatabaseError(_) => {
                error!("💻️ {e}");
                Self::BackendError(e.to_string())
            },
            _ => Self::BackendError(e.to_string()),
        }
    }
}
