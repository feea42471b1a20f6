use thiserror::Error;

/// Côte d'Ivoire.
pub const DEFAULT_COUNTRY_CODE: &str = "225";

const MIN_NATIONAL_DIGITS: usize = 8;
const MAX_NATIONAL_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid phone number: {0}")]
pub struct PhoneNumberError(pub String);

/// Normalizes a mobile-money phone number to its national form, as the upstream processor expects it.
///
/// Whitespace and the usual separators (`-`, `.`, parentheses) are removed. An international prefix (`+{cc}` or
/// `00{cc}`) is stripped. A bare `{cc}` prefix is only stripped when the remaining number would otherwise be too long
/// to be a national number. The result must be 8 to 10 digits.
pub fn normalize_phone(raw: &str, country_code: &str) -> Result<String, PhoneNumberError> {
    let cleaned =
        raw.chars().filter(|c| !c.is_whitespace() && !matches!(c, '-' | '.' | '(' | ')')).collect::<String>();
    let international = cleaned.strip_prefix('+').or_else(|| cleaned.strip_prefix("00"));
    let national = match international {
        Some(number) => number.strip_prefix(country_code).unwrap_or(number),
        None if cleaned.len() > MAX_NATIONAL_DIGITS => cleaned.strip_prefix(country_code).unwrap_or(&cleaned),
        None => cleaned.as_str(),
    };
    let valid_length = (MIN_NATIONAL_DIGITS..=MAX_NATIONAL_DIGITS).contains(&national.len());
    if valid_length && national.chars().all(|c| c.is_ascii_digit()) {
        Ok(national.to_string())
    } else {
        Err(PhoneNumberError(raw.to_string()))
    }
}
