//! Currency conversion for quotes.
//!
//! Rates come from an Open Exchange Rates style API and are expressed against
//! USD. Tables are fetched per calendar date (`latest` for today or later,
//! `historical` for past dates) and cached per date for a bounded window, so
//! repeated conversions while editing a quote do not hit the upstream API.
//! The cache only saves calls; a miss always fetches a fresh table.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{
    error::ConversionError,
    models::quote::{Activity, ClientQuote, Flight, Property, Transportation},
};

/// Agency markup applied on every conversion (2%).
pub const MARKUP: Decimal = Decimal::from_parts(2, 0, 0, false, 2);

const LATEST_KEY: &str = "latest";

// code, symbol, name
const CURRENCIES: &[(&str, &str, &str)] = &[
    ("USD", "$", "US Dollar"),
    ("EUR", "€", "Euro"),
    ("GBP", "£", "British Pound"),
    ("NZD", "NZ$", "New Zealand Dollar"),
    ("AUD", "A$", "Australian Dollar"),
    ("CAD", "C$", "Canadian Dollar"),
    ("JPY", "¥", "Japanese Yen"),
    ("CNY", "¥", "Chinese Yuan"),
    ("CHF", "CHF", "Swiss Franc"),
    ("SGD", "S$", "Singapore Dollar"),
    ("HKD", "HK$", "Hong Kong Dollar"),
    ("FJD", "FJ$", "Fijian Dollar"),
    ("INR", "₹", "Indian Rupee"),
    ("ZAR", "R", "South African Rand"),
    ("MXN", "MX$", "Mexican Peso"),
    ("THB", "฿", "Thai Baht"),
];

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

pub fn known_currencies() -> Vec<CurrencyInfo> {
    CURRENCIES
        .iter()
        .map(|&(code, symbol, name)| CurrencyInfo { code, symbol, name })
        .collect()
}

/// Display symbol for a code, or the code itself when unknown.
pub fn symbol_of(code: &str) -> String {
    CURRENCIES
        .iter()
        .find(|(c, _, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, symbol, _)| symbol.to_string())
        .unwrap_or_else(|| code.to_string())
}

pub fn name_of(code: &str) -> String {
    CURRENCIES
        .iter()
        .find(|(c, _, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, _, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Round half away from zero to cents.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Units of each currency per one unit of the base currency.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct RateTable {
    #[serde(default)]
    pub base: String,
    pub rates: HashMap<String, Decimal>,
}

impl RateTable {
    pub fn new(base: &str, rates: &[(&str, Decimal)]) -> Self {
        Self {
            base: base.to_string(),
            rates: rates
                .iter()
                .map(|(code, rate)| (code.to_string(), *rate))
                .collect(),
        }
    }

    /// Usable rate for `code`; non-positive rates count as missing.
    pub fn rate(&self, code: &str) -> Option<Decimal> {
        self.rates
            .get(code)
            .copied()
            .filter(|rate| *rate > Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRatePolicy {
    /// Treat a missing rate as 1 and log a warning.
    AssumeParity,
    /// Fail the conversion.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionOptions {
    pub markup: Decimal,
    pub missing_rate: MissingRatePolicy,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            markup: MARKUP,
            missing_rate: MissingRatePolicy::AssumeParity,
        }
    }
}

fn resolve_rate(
    rates: &RateTable,
    code: &str,
    policy: MissingRatePolicy,
) -> Result<Decimal, ConversionError> {
    match (rates.rate(code), policy) {
        (Some(rate), _) => Ok(rate),
        (None, MissingRatePolicy::AssumeParity) => {
            log::warn!("No exchange rate for {code}, assuming parity with {}", rates.base);
            Ok(Decimal::ONE)
        }
        (None, MissingRatePolicy::Reject) => Err(ConversionError::MissingRate(code.to_string())),
    }
}

/// Convert with the standard markup, treating unknown currencies as parity.
pub fn convert(amount: Decimal, from: &str, to: &str, rates: &RateTable) -> Decimal {
    match convert_with(amount, from, to, rates, &ConversionOptions::default()) {
        Ok(converted) => converted,
        Err(_) => unreachable!("parity never rejects a rate"),
    }
}

pub fn convert_with(
    amount: Decimal,
    from: &str,
    to: &str,
    rates: &RateTable,
    options: &ConversionOptions,
) -> Result<Decimal, ConversionError> {
    if from == to {
        return Ok(amount);
    }
    let from_rate = resolve_rate(rates, from, options.missing_rate)?;
    let to_rate = resolve_rate(rates, to, options.missing_rate)?;
    Ok(apply(amount, from_rate, to_rate, options.markup))
}

fn apply(amount: Decimal, from_rate: Decimal, to_rate: Decimal, markup: Decimal) -> Decimal {
    let usd = amount / from_rate;
    let converted = usd * to_rate;
    round2(converted * (Decimal::ONE + markup))
}

/// An item carrying amounts in one currency.
pub trait Monetary {
    fn amounts_mut(&mut self) -> Vec<&mut Decimal>;
    fn currency_mut(&mut self) -> &mut String;

    /// Gap between a stored snapshot and the amount it was derived from.
    /// Items with such a snapshot rebuild it after conversion instead of
    /// rounding it on its own.
    fn snapshot_gap(&self) -> Option<Decimal> {
        None
    }

    fn rebuild_snapshot(&mut self, _gap: Decimal) {}
}

impl Monetary for Property {
    fn amounts_mut(&mut self) -> Vec<&mut Decimal> {
        vec![&mut self.price]
    }

    fn currency_mut(&mut self) -> &mut String {
        &mut self.currency
    }
}

impl Monetary for Transportation {
    fn amounts_mut(&mut self) -> Vec<&mut Decimal> {
        vec![&mut self.price]
    }

    fn currency_mut(&mut self) -> &mut String {
        &mut self.currency
    }
}

impl Monetary for Flight {
    fn amounts_mut(&mut self) -> Vec<&mut Decimal> {
        vec![&mut self.price_if_selected, &mut self.price_if_not_selected]
    }

    fn currency_mut(&mut self) -> &mut String {
        &mut self.currency
    }
}

impl Monetary for Activity {
    fn amounts_mut(&mut self) -> Vec<&mut Decimal> {
        vec![&mut self.cost_per_pax, &mut self.flat_price]
    }

    fn currency_mut(&mut self) -> &mut String {
        &mut self.currency
    }

    fn snapshot_gap(&self) -> Option<Decimal> {
        Some(self.base_price - self.current_price())
    }

    fn rebuild_snapshot(&mut self, gap: Decimal) {
        self.base_price = self.current_price() + gap;
    }
}

/// Convert every monetary field of `items` and relabel their currency.
pub fn convert_all<T: Monetary>(
    items: &mut [T],
    from: &str,
    to: &str,
    rates: &RateTable,
    options: &ConversionOptions,
) -> Result<(), ConversionError> {
    if from == to {
        return Ok(());
    }
    for item in items.iter_mut() {
        let gap = item.snapshot_gap();
        for amount in item.amounts_mut() {
            *amount = convert_with(*amount, from, to, rates, options)?;
        }
        if let Some(gap) = gap {
            item.rebuild_snapshot(convert_with(gap, from, to, rates, options)?);
        }
        *item.currency_mut() = to.to_string();
    }
    Ok(())
}

#[async_trait]
pub trait RateTableProvider: Send + Sync {
    /// Rates for `date`, or the latest rates when `date` is `None`.
    async fn fetch(&self, date: Option<NaiveDate>) -> Result<RateTable, ConversionError>;
}

/// Open Exchange Rates compatible HTTP provider.
pub struct HttpRateProvider {
    http_client: reqwest::Client,
    base_url: String,
    app_id: Option<String>,
}

impl HttpRateProvider {
    pub fn new(base_url: &str, app_id: Option<String>) -> Result<Self, ConversionError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConversionError::RateFetch(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id,
        })
    }
}

#[async_trait]
impl RateTableProvider for HttpRateProvider {
    async fn fetch(&self, date: Option<NaiveDate>) -> Result<RateTable, ConversionError> {
        let url = match date {
            Some(date) => format!("{}/historical/{}.json", self.base_url, date.format("%Y-%m-%d")),
            None => format!("{}/latest.json", self.base_url),
        };

        let mut request = self.http_client.get(&url);
        if let Some(app_id) = &self.app_id {
            request = request.query(&[("app_id", app_id)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConversionError::RateFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConversionError::RateFetch(format!(
                "rates API returned {}",
                response.status()
            )));
        }

        response
            .json::<RateTable>()
            .await
            .map_err(|e| ConversionError::RateFetch(format!("Failed to parse rates: {}", e)))
    }
}

/// Fixed rates, for local runs without an API key and for tests.
pub struct StaticRateProvider {
    table: RateTable,
}

impl StaticRateProvider {
    pub fn new(table: RateTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl RateTableProvider for StaticRateProvider {
    async fn fetch(&self, _date: Option<NaiveDate>) -> Result<RateTable, ConversionError> {
        Ok(self.table.clone())
    }
}

struct CachedRates {
    fetched_at: Instant,
    table: RateTable,
}

pub struct CurrencyConverter {
    provider: Arc<dyn RateTableProvider>,
    cache: Mutex<HashMap<String, CachedRates>>,
    ttl: Duration,
    options: ConversionOptions,
}

impl CurrencyConverter {
    pub fn new(provider: Arc<dyn RateTableProvider>, ttl: Duration, options: ConversionOptions) -> Self {
        Self {
            provider,
            cache: Mutex::new(HashMap::new()),
            ttl,
            options,
        }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Rate table for a calendar date, served from cache while fresh.
    pub async fn rates_for(&self, date: Option<NaiveDate>) -> Result<RateTable, ConversionError> {
        let today = Utc::now().date_naive();
        let historical = date.filter(|d| *d < today);
        let key = historical
            .map(|d| d.to_string())
            .unwrap_or_else(|| LATEST_KEY.to_string());

        if let Some(table) = self.cached(&key) {
            log::debug!("Using cached exchange rates for {key}");
            return Ok(table);
        }

        log::info!("Fetching exchange rates for {key}");
        let table = self.provider.fetch(historical).await?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.retain(|_, cached| cached.fetched_at.elapsed() < self.ttl);
            cache.insert(
                key,
                CachedRates {
                    fetched_at: Instant::now(),
                    table: table.clone(),
                },
            );
        }

        Ok(table)
    }

    fn cached(&self, key: &str) -> Option<RateTable> {
        let cache = self.cache.lock().ok()?;
        cache
            .get(key)
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.table.clone())
    }

    /// Convert a whole quote into `to`.
    ///
    /// Rates are fetched before anything is converted and the input is never
    /// modified, so a failed fetch leaves the quote in its original currency.
    pub async fn convert_document(
        &self,
        quote: &ClientQuote,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<ClientQuote, ConversionError> {
        let to = to.trim().to_ascii_uppercase();
        if to.len() != 3 || !to.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConversionError::InvalidCurrency(to));
        }

        let from = quote.currency.clone();
        if from == to {
            return Ok(quote.clone());
        }

        let rates = self.rates_for(date).await?;
        let options = &self.options;

        let mut converted = quote.clone();
        converted.base_quote = convert_with(quote.base_quote, &from, &to, &rates, options)?;
        convert_all(&mut converted.properties, &from, &to, &rates, options)?;
        convert_all(&mut converted.activities, &from, &to, &rates, options)?;
        convert_all(&mut converted.flights, &from, &to, &rates, options)?;
        convert_all(&mut converted.transportation, &from, &to, &rates, options)?;
        converted.currency = to;

        Ok(converted)
    }
}
