use std::time::Duration;

use rust_decimal::Decimal;

use crate::services::currency_service::MissingRatePolicy;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;
const DEFAULT_DATABASE: &str = "Quotes";
const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 2000;
const DEFAULT_AUTOSAVE_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RATE_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_RATES_API_URL: &str = "https://openexchangerates.org/api";
const DEFAULT_SHARE_LINK_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub mongo_uri: Option<String>,
    pub mongo_database: String,
    pub jwt_secret: String,
    pub autosave_delay: Duration,
    pub autosave_max_attempts: u32,
    pub rates_api_url: String,
    pub rates_app_id: Option<String>,
    pub rate_cache_ttl: Duration,
    pub currency_markup: Decimal,
    pub missing_rate_policy: MissingRatePolicy,
    pub image_discovery_url: Option<String>,
    pub share_link_ttl_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: HOST.to_string(),
            port: PORT,
            store_backend: StoreBackend::Mongo,
            mongo_uri: None,
            mongo_database: DEFAULT_DATABASE.to_string(),
            jwt_secret: "default_secret".to_string(),
            autosave_delay: Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS),
            autosave_max_attempts: DEFAULT_AUTOSAVE_MAX_ATTEMPTS,
            rates_api_url: DEFAULT_RATES_API_URL.to_string(),
            rates_app_id: None,
            rate_cache_ttl: Duration::from_secs(DEFAULT_RATE_CACHE_TTL_SECS),
            currency_markup: crate::services::currency_service::MARKUP,
            missing_rate_policy: MissingRatePolicy::AssumeParity,
            image_discovery_url: None,
            share_link_ttl_days: DEFAULT_SHARE_LINK_TTL_DAYS,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl AppConfig {
    /// Read configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let store_backend = match std::env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Mongo,
        };

        let missing_rate_policy = match std::env::var("MISSING_RATE_POLICY").as_deref() {
            Ok("reject") => MissingRatePolicy::Reject,
            _ => MissingRatePolicy::AssumeParity,
        };

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            store_backend,
            mongo_uri: std::env::var("MONGODB_URI").ok(),
            mongo_database: std::env::var("MONGODB_DATABASE").unwrap_or(defaults.mongo_database),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            autosave_delay: env_parse("AUTOSAVE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.autosave_delay),
            autosave_max_attempts: env_parse("AUTOSAVE_MAX_ATTEMPTS")
                .unwrap_or(defaults.autosave_max_attempts),
            rates_api_url: std::env::var("RATES_API_URL").unwrap_or(defaults.rates_api_url),
            rates_app_id: std::env::var("RATES_APP_ID").ok(),
            rate_cache_ttl: env_parse("RATE_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_cache_ttl),
            currency_markup: env_parse("CURRENCY_MARKUP").unwrap_or(defaults.currency_markup),
            missing_rate_policy,
            image_discovery_url: std::env::var("IMAGE_DISCOVERY_URL").ok(),
            share_link_ttl_days: env_parse("SHARE_LINK_TTL_DAYS")
                .unwrap_or(defaults.share_link_ttl_days),
        }
    }
}
