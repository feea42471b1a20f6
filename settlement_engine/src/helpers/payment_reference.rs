use std::{
    fmt::Display,
    str::FromStr,
    sync::atomic::{AtomicI64, Ordering},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::UserId;

const PURCHASE_PREFIX: &str = "PAY";
const RECHARGE_PREFIX: &str = "TOPUP";

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// The current time in milliseconds, bumped past the last stamp handed out so that no two references created by this
/// process share a timestamp.
fn next_stamp() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid payment reference: {0}")]
pub struct PaymentReferenceError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// A checkout. All the seller orders of the cart share the reference.
    Purchase,
    /// A wallet top-up.
    Recharge,
}

impl ReferenceKind {
    fn prefix(&self) -> &'static str {
        match self {
            ReferenceKind::Purchase => PURCHASE_PREFIX,
            ReferenceKind::Recharge => RECHARGE_PREFIX,
        }
    }
}

/// The correlation key between a mobile-money payment and what it pays for.
///
/// On the wire it is `PAY-{buyer_id}-{epoch_millis}` or `TOPUP-{user_id}-{epoch_millis}`. The payment processor
/// echoes it back in callbacks, so the format cannot change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentReference {
    pub kind: ReferenceKind,
    pub owner: UserId,
    pub timestamp_ms: i64,
}

impl PaymentReference {
    pub fn new(kind: ReferenceKind, owner: UserId, timestamp_ms: i64) -> Self {
        Self { kind, owner, timestamp_ms }
    }

    /// A new checkout reference for `buyer`, stamped with the current time.
    pub fn purchase(buyer: &UserId) -> Self {
        Self::new(ReferenceKind::Purchase, buyer.clone(), next_stamp())
    }

    /// A new top-up reference for `user`, stamped with the current time.
    pub fn recharge(user: &UserId) -> Self {
        Self::new(ReferenceKind::Recharge, user.clone(), next_stamp())
    }

    pub fn is_recharge(&self) -> bool {
        self.kind == ReferenceKind::Recharge
    }
}

impl Display for PaymentReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.kind.prefix(), self.owner, self.timestamp_ms)
    }
}

impl FromStr for PaymentReference {
    type Err = PaymentReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PaymentReferenceError(s.to_string());
        let (prefix, rest) = s.split_once('-').ok_or_else(err)?;
        let kind = match prefix {
            PURCHASE_PREFIX => ReferenceKind::Purchase,
            RECHARGE_PREFIX => ReferenceKind::Recharge,
            _ => return Err(err()),
        };
        // User ids may contain hyphens themselves, so the timestamp is whatever follows the last one
        let (owner, timestamp) = rest.rsplit_once('-').ok_or_else(err)?;
        if owner.is_empty() || timestamp.is_empty() || !timestamp.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let timestamp_ms = timestamp.parse::<i64>().map_err(|_| err())?;
        Ok(Self { kind, owner: UserId::from(owner), timestamp_ms })
    }
}

impl TryFrom<String> for PaymentReference {
    type Error = PaymentReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentReference> for String {
    fn from(value: PaymentReference) -> Self {
        value.to_string()
    }
}
