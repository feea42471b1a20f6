use crate::{
    db_types::{Cfa, NewProfile, NewWalletTransaction, Profile, UserId, WalletTransaction},
    traits::{LedgerUpdate, SettlementError},
};

/// Profiles, wallet balances and the settlement ledger.
///
/// The cached `wallet_balance` on a profile is only ever changed with atomic increments at the storage layer, never by
/// reading a balance and writing back a new one.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, SettlementError>;

    /// Creates the profile, or updates the role and commission override of an existing one. The wallet balance is
    /// never touched.
    async fn upsert_profile(&self, profile: NewProfile) -> Result<Profile, SettlementError>;

    /// Appends a row to the ledger without touching any balance. Used for credits that are still awaiting external
    /// confirmation (e.g. a pending recharge).
    async fn record_transaction(&self, tx: NewWalletTransaction) -> Result<WalletTransaction, SettlementError>;

    /// Atomically adds `delta` to the user's cached balance and returns the new balance.
    ///
    /// Fails with [`SettlementError::ProfileNotFound`] if the profile does not exist.
    async fn apply_balance_delta(&self, user: &UserId, delta: Cfa) -> Result<Cfa, SettlementError>;

    /// Records the ledger row and applies its amount to the balance in a single database transaction.
    ///
    /// Negative amounts are guarded: if the balance cannot cover the debit, nothing is written and
    /// [`SettlementError::InsufficientFunds`] is returned.
    async fn apply_ledger_entry(&self, tx: NewWalletTransaction) -> Result<LedgerUpdate, SettlementError>;

    /// The user's ledger, oldest first.
    async fn fetch_transactions_for_user(&self, user: &UserId) -> Result<Vec<WalletTransaction>, SettlementError>;

    async fn fetch_transactions_by_reference(&self, reference: &str)
        -> Result<Vec<WalletTransaction>, SettlementError>;

    /// The balance implied by the ledger: completed rows, plus debits that are still pending.
    async fn ledger_balance(&self, user: &UserId) -> Result<Cfa, SettlementError>;
}
