/// Processor statuses that mean the money has been received.
const CONFIRMED_STATUSES: [&str; 3] = ["paid", "success", "completed"];

/// Returns true if the status reported by the payment processor (via a callback or a verify call) confirms the
/// payment. Matching ignores case and surrounding whitespace. Every other status, including an empty one, leaves the
/// payment unconfirmed.
pub fn is_confirmed_status(status: &str) -> bool {
    let status = status.trim().to_ascii_lowercase();
    CONFIRMED_STATUSES.contains(&status.as_str())
}
