//! Commission rates and the commission split of an order total.
//!
//! Rates are held in parts per billion, which keeps fractional overrides such as `0.123449` exact. The commission
//! is computed in 128-bit integers and rounded half-up to the nearest franc only once, on the product. The seller
//! receives the remainder.
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::db_types::{Cfa, Profile, Role};

const PPB_SCALE: i64 = 1_000_000_000;
const PPB_PER_BPS: i64 = PPB_SCALE / 10_000;

/// Commission charged to regular sellers (and to items whose seller is unknown).
pub const DEFAULT_COMMISSION_RATE: CommissionRate = CommissionRate(120_000_000);
/// Commission charged to wholesale partners.
pub const PARTNER_COMMISSION_RATE: CommissionRate = CommissionRate(80_000_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct CommissionRate(i64);

impl CommissionRate {
    /// Converts a fractional rate, returning `None` unless it is finite and within [0, 1].
    pub fn from_fraction(rate: f64) -> Option<Self> {
        if rate.is_finite() && (0.0..=1.0).contains(&rate) {
            #[allow(clippy::cast_possible_truncation)]
            Some(Self((rate * PPB_SCALE as f64).round() as i64))
        } else {
            None
        }
    }

    pub fn from_bps(bps: i64) -> Option<Self> {
        (0..=10_000).contains(&bps).then_some(Self(bps * PPB_PER_BPS))
    }

    pub fn from_ppb(ppb: i64) -> Option<Self> {
        (0..=PPB_SCALE).contains(&ppb).then_some(Self(ppb))
    }

    /// The rate in whole basis points, truncated.
    pub fn bps(&self) -> i64 {
        self.0 / PPB_PER_BPS
    }

    pub fn ppb(&self) -> i64 {
        self.0
    }

    pub fn as_fraction(&self) -> f64 {
        self.0 as f64 / PPB_SCALE as f64
    }

    /// The default rate for a seller role: 8% for partners, 12% for everyone else.
    pub fn default_for_role(role: Role) -> Self {
        match role {
            Role::Partner => PARTNER_COMMISSION_RATE,
            _ => DEFAULT_COMMISSION_RATE,
        }
    }

    /// Resolves the rate for a seller profile. An override that is not a valid rate silently falls back to the role
    /// default. A missing profile gets the standard default.
    pub fn for_profile(profile: Option<&Profile>) -> Self {
        match profile {
            Some(p) => p
                .commission_rate
                .and_then(Self::from_fraction)
                .unwrap_or_else(|| Self::default_for_role(p.role)),
            None => DEFAULT_COMMISSION_RATE,
        }
    }

    /// The commission on `total`, rounded half-up to the nearest franc.
    pub fn commission_on(&self, total: Cfa) -> Cfa {
        let scale = i128::from(PPB_SCALE);
        let scaled = i128::from(total.value()) * i128::from(self.0);
        let half = scale / 2;
        let commission = if scaled >= 0 { (scaled + half) / scale } else { -((-scaled + half) / scale) };
        // A rate never exceeds 1, so the commission is no larger than the total
        #[allow(clippy::cast_possible_truncation)]
        Cfa::from(commission as i64)
    }

    /// Splits `total` into `(commission, seller_amount)`. The seller amount never goes below zero.
    pub fn split(&self, total: Cfa) -> (Cfa, Cfa) {
        let commission = self.commission_on(total);
        let seller_amount = (total - commission).floor_zero();
        (commission, seller_amount)
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        DEFAULT_COMMISSION_RATE
    }
}

impl Display for CommissionRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.0 as f64 / (PPB_SCALE / 100) as f64)
    }
}
