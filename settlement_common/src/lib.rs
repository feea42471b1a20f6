mod cfa;

pub mod helpers;
pub mod op;
mod secret;

pub use cfa::{Cfa, CfaConversionError, CURRENCY_CODE};
pub use secret::Secret;
