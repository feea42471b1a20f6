use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "FCFA";

//--------------------------------------        Cfa         ---------------------------------------------------------
/// An amount of CFA francs. The franc has no subdivision in circulation, so every amount in the marketplace is a
/// whole number of francs and all arithmetic on it is exact.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cfa(i64);

op!(binary Cfa, Add, add);
op!(binary Cfa, Sub, sub);
op!(inplace Cfa, AddAssign, add_assign);
op!(inplace Cfa, SubAssign, sub_assign);
op!(unary Cfa, Neg, neg);

impl Sum for Cfa {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in CFA francs: {0}")]
pub struct CfaConversionError(String);

impl From<i64> for Cfa {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Cfa {
    type Error = CfaConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CfaConversionError(format!("Value {value} is too large to convert to Cfa")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl FromStr for Cfa {
    type Err = CfaConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix(CURRENCY_CODE).unwrap_or(trimmed).trim();
        digits.parse::<i64>().map(Self).map_err(|e| CfaConversionError(format!("{s}: {e}")))
    }
}

impl Display for Cfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {CURRENCY_CODE}", self.0)
    }
}

impl Cfa {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative amounts to zero.
    pub fn floor_zero(self) -> Self {
        Self(self.0.max(0))
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// `self × quantity`, or `None` if the result does not fit.
    pub fn checked_mul(self, quantity: i64) -> Option<Self> {
        self.0.checked_mul(quantity).map(Self)
    }

    /// Sums the amounts, or returns `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts.into_iter().try_fold(Self::default(), Self::checked_add)
    }
}
