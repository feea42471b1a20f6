use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Cfa, NewWalletTransaction, Profile, UserId, WalletTransaction},
    traits::{LedgerManagement, LedgerUpdate, SettlementError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub user: UserId,
    pub balance: Cfa,
    pub transactions: Vec<WalletTransaction>,
}

/// The cached balance of a wallet compared with the balance implied by its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub user: UserId,
    pub cached_balance: Cfa,
    pub ledger_balance: Cfa,
    pub is_consistent: bool,
}

#[derive(Clone)]
pub struct WalletApi<B> {
    db: B,
}

impl<B: Debug> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({:?})", self.db)
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> WalletApi<B>
where B: LedgerManagement
{
    /// Appends a row to the settlement ledger. No balance changes.
    pub async fn record_transaction(&self, tx: NewWalletTransaction) -> Result<WalletTransaction, SettlementError> {
        self.db.record_transaction(tx).await
    }

    /// Atomically adjusts the user's balance. Debits that would overdraw the wallet are refused.
    ///
    /// Prefer [`Self::apply_ledger_entry`], which keeps the ledger in step with the balance.
    pub async fn apply_balance_delta(&self, user: &UserId, delta: Cfa) -> Result<Cfa, SettlementError> {
        self.db.apply_balance_delta(user, delta).await
    }

    /// Records a ledger row and applies it to the balance in one transaction.
    pub async fn apply_ledger_entry(&self, tx: NewWalletTransaction) -> Result<LedgerUpdate, SettlementError> {
        if tx.amount == Cfa::default() {
            return Err(SettlementError::InvalidAmount(tx.amount));
        }
        self.db.apply_ledger_entry(tx).await
    }

    pub async fn wallet_summary(&self, user: &UserId) -> Result<WalletSummary, SettlementError> {
        let profile = self.fetch_profile(user).await?;
        let transactions = self.db.fetch_transactions_for_user(user).await?;
        Ok(WalletSummary { user: user.clone(), balance: profile.wallet_balance, transactions })
    }

    /// Recomputes the balance from the ledger and compares it with the cached one.
    pub async fn reconcile(&self, user: &UserId) -> Result<Reconciliation, SettlementError> {
        let profile = self.fetch_profile(user).await?;
        let ledger_balance = self.db.ledger_balance(user).await?;
        let cached_balance = profile.wallet_balance;
        let is_consistent = cached_balance == ledger_balance;
        if !is_consistent {
            warn!(
                "🏦️ Wallet of {user} is out of step with its ledger. Cached: {cached_balance}. Ledger: {ledger_balance}"
            );
        }
        Ok(Reconciliation { user: user.clone(), cached_balance, ledger_balance, is_consistent })
    }

    async fn fetch_profile(&self, user: &UserId) -> Result<Profile, SettlementError> {
        self.db.fetch_profile(user).await?.ok_or_else(|| SettlementError::ProfileNotFound(user.clone()))
    }
}
