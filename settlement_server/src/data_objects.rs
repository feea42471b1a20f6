use std::fmt::Display;

use serde::{Deserialize, Serialize};
use settlement_engine::{
    db_types::{Cfa, PaymentMethod},
    Reconciliation,
    WalletSummary,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body of `POST /api/wallet/recharge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeRequest {
    pub amount: Cfa,
    pub phone_number: String,
}

/// Body of `POST /api/payouts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequestBody {
    pub amount: Cfa,
    pub method: PaymentMethod,
    pub phone_number: String,
}

/// Response of `GET /api/wallet/{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletOverview {
    #[serde(flatten)]
    pub summary: WalletSummary,
    pub reconciliation: Reconciliation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowTotal {
    pub seller_id: String,
    pub escrow_total: Cfa,
}
