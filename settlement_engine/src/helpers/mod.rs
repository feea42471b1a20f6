mod gateway_status;
mod payment_reference;
mod phone;

pub use gateway_status::is_confirmed_status;
pub use payment_reference::{PaymentReference, PaymentReferenceError, ReferenceKind};
pub use phone::{normalize_phone, PhoneNumberError, DEFAULT_COUNTRY_CODE};
