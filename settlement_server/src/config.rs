use std::env;

use log::*;
use mobile_money_tools::MobileMoneyConfig;
use settlement_common::{helpers::parse_boolean_flag, Secret};
use settlement_engine::{db_url, helpers::DEFAULT_COUNTRY_CODE};

const DEFAULT_SE_HOST: &str = "127.0.0.1";
const DEFAULT_SE_PORT: u16 = 8460;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Dialling code used to normalise phone numbers given without an international prefix.
    pub country_code: String,
    /// Capacity of each event hook channel.
    pub event_buffer_size: usize,
    pub mobile_money: MobileMoneySettings,
}

#[derive(Clone, Debug)]
pub struct MobileMoneySettings {
    pub api: MobileMoneyConfig,
    /// The shared secret the processor uses to sign webhook calls.
    pub webhook_secret: Secret<String>,
    /// If false, webhook signatures are not checked. **DANGER**
    pub hmac_checks: bool,
}

impl Default for MobileMoneySettings {
    fn default() -> Self {
        Self { api: MobileMoneyConfig::default(), webhook_secret: Secret::default(), hmac_checks: true }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SE_HOST.to_string(),
            port: DEFAULT_SE_PORT,
            database_url: String::default(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            mobile_money: MobileMoneySettings::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SE_HOST").ok().unwrap_or_else(|| DEFAULT_SE_HOST.into());
        let port = env::var("SE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SE_PORT. {e} Using the default, {DEFAULT_SE_PORT}, instead.");
                    DEFAULT_SE_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SE_PORT);
        let database_url = db_url();
        let db_max_connections = parse_number("SE_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let country_code = env::var("SE_COUNTRY_CODE")
            .ok()
            .map(|s| s.trim().trim_start_matches('+').to_string())
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or_else(|| {
                info!("🪛️ SE_COUNTRY_CODE is not set or invalid. Using +{DEFAULT_COUNTRY_CODE}");
                DEFAULT_COUNTRY_CODE.to_string()
            });
        let event_buffer_size = parse_number("SE_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        let mobile_money = MobileMoneySettings::from_env_or_default();
        Self { host, port, database_url, db_max_connections, country_code, event_buffer_size, mobile_money }
    }
}

impl MobileMoneySettings {
    pub fn from_env_or_default() -> Self {
        let api = MobileMoneyConfig::new_from_env_or_default();
        let webhook_secret = Secret::new(env::var("SE_MOBILE_MONEY_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ SE_MOBILE_MONEY_WEBHOOK_SECRET is not set. Signed webhook calls will be rejected.");
            String::default()
        }));
        let hmac_checks = parse_boolean_flag(env::var("SE_MOBILE_MONEY_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!(
                "🪛️ Webhook signature checks are DISABLED. Anyone can confirm payments by calling the webhook. Do not \
                 run this configuration in production."
            );
        }
        Self { api, webhook_secret, hmac_checks }
    }
}

fn parse_number<T: std::str::FromStr + std::fmt::Display + Copy>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|_| {
            warn!("🪛️ {s} is not a valid value for {var}. Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}
