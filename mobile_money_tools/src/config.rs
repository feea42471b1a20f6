use std::time::Duration;

use log::*;
use settlement_common::Secret;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct MobileMoneyConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    /// Where the processor pushes payment confirmations. When unset, the processor's dashboard setting applies.
    pub callback_url: Option<String>,
    pub timeout: Duration,
}

impl Default for MobileMoneyConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.mobile-money.example/v1".to_string(),
            api_key: Secret::default(),
            callback_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl MobileMoneyConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let api_url = std::env::var("SE_MOBILE_MONEY_API_URL").unwrap_or_else(|_| {
            warn!("🪛️ SE_MOBILE_MONEY_API_URL not set, using (probably useless) default");
            defaults.api_url
        });
        let api_key = Secret::new(std::env::var("SE_MOBILE_MONEY_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ SE_MOBILE_MONEY_API_KEY not set. Requests to the processor will be rejected.");
            String::default()
        }));
        let callback_url = std::env::var("SE_MOBILE_MONEY_CALLBACK_URL").ok().filter(|s| !s.trim().is_empty());
        let timeout = std::env::var("SE_MOBILE_MONEY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid SE_MOBILE_MONEY_TIMEOUT_SECS ({s}). {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        Self { api_url, api_key, callback_url, timeout }
    }
}
