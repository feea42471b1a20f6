use crate::{
    db_types::{NewPayoutRequest, PayoutRequest, PayoutRequestStatus, UserId},
    traits::{LedgerUpdate, PayoutResolution, SettlementError},
};

/// Seller withdrawals. The wallet is debited when the request is made. An admin later approves it (no money
/// moves) or rejects it (the amount is refunded).
#[allow(async_fn_in_trait)]
pub trait PayoutManagement {
    /// Creates a pending request, debits the seller and records a pending `PAYOUT_REQUEST` ledger row, in one
    /// transaction. Fails with [`SettlementError::InsufficientFunds`] if the balance cannot cover the amount.
    async fn create_payout_request(
        &self,
        request: NewPayoutRequest,
    ) -> Result<(PayoutRequest, LedgerUpdate), SettlementError>;

    /// Marks a pending request as completed and its ledger row as completed.
    async fn approve_payout_request(&self, id: i64, admin: &UserId) -> Result<PayoutResolution, SettlementError>;

    /// Marks a pending request as rejected and credits the amount back with a `PAYOUT_REFUND` row.
    async fn reject_payout_request(&self, id: i64, admin: &UserId) -> Result<PayoutResolution, SettlementError>;

    async fn fetch_payout_request(&self, id: i64) -> Result<Option<PayoutRequest>, SettlementError>;

    /// All requests, or only those with the given status, oldest first.
    async fn fetch_payout_requests(
        &self,
        status: Option<PayoutRequestStatus>,
    ) -> Result<Vec<PayoutRequest>, SettlementError>;

    async fn fetch_payout_requests_for_seller(&self, seller: &UserId) -> Result<Vec<PayoutRequest>, SettlementError>;
}
