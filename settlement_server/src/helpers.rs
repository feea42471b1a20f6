use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The base64-encoded HMAC-SHA256 of `data`, keyed with `secret`.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::default(),
    };
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

/// Checks a base64-encoded HMAC-SHA256 `signature` of `data` in constant time.
pub fn signature_matches(secret: &str, data: &[u8], signature: &str) -> bool {
    let Ok(expected) = base64::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}
