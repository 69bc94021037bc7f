//! Currency conversion backed by a shared exchange-rate cache.
//!
//! The cache is owned by [`CurrencyService`]. Readers take a cheap `Arc`
//! snapshot; a stale or missing cache triggers one fetch, and every query that
//! arrives while that fetch is pending awaits the same shared future.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    pub code: &'static str,
    pub symbol: &'static str,
    pub decimals: usize,
    aliases: &'static [&'static str],
}

const fn currency(
    code: &'static str,
    symbol: &'static str,
    decimals: usize,
    aliases: &'static [&'static str],
) -> Currency {
    Currency {
        code,
        symbol,
        decimals,
        aliases,
    }
}

static CURRENCIES: &[Currency] = &[
    currency("USD", "$", 2, &["dollar", "dollars", "usdollar"]),
    currency("EUR", "€", 2, &["euro", "euros"]),
    currency("GBP", "£", 2, &["pound sterling", "sterling", "quid"]),
    currency("JPY", "¥", 0, &["yen"]),
    currency("CNY", "CN¥", 2, &["yuan", "rmb", "renminbi"]),
    currency("INR", "₹", 2, &["rupee", "rupees"]),
    currency("KRW", "₩", 0, &["won"]),
    currency("RUB", "₽", 2, &["ruble", "rubles", "rouble", "roubles"]),
    currency("BRL", "R$", 2, &["real", "reais"]),
    currency("CAD", "CA$", 2, &[]),
    currency("AUD", "A$", 2, &[]),
    currency("NZD", "NZ$", 2, &[]),
    currency("CHF", "CHF ", 2, &["franc", "francs"]),
    currency("SEK", "SEK ", 2, &[]),
    currency("NOK", "NOK ", 2, &[]),
    currency("DKK", "DKK ", 2, &[]),
    currency("PLN", "zł", 2, &["zloty"]),
    currency("CZK", "Kč", 2, &["koruna"]),
    currency("HUF", "Ft", 0, &["forint"]),
    currency("TRY", "₺", 2, &["lira"]),
    currency("MXN", "MX$", 2, &["peso", "pesos"]),
    currency("HKD", "HK$", 2, &[]),
    currency("SGD", "S$", 2, &[]),
    currency("TWD", "NT$", 0, &[]),
    currency("THB", "฿", 2, &["baht"]),
    currency("ILS", "₪", 2, &["shekel", "shekels"]),
    currency("ZAR", "R", 2, &["rand"]),
    currency("AED", "AED ", 2, &["dirham", "dirhams"]),
    currency("SAR", "SAR ", 2, &["riyal", "riyals"]),
    currency("UAH", "₴", 2, &["hryvnia"]),
    currency("VND", "₫", 0, &["dong"]),
    currency("IDR", "Rp", 0, &["rupiah"]),
    currency("PHP", "₱", 2, &[]),
    currency("MYR", "RM", 2, &["ringgit"]),
];

pub fn lookup_currency(token: &str) -> Option<&'static Currency> {
    let normalized = token.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    CURRENCIES.iter().find(|currency| {
        currency.code.eq_ignore_ascii_case(&normalized) || currency.aliases.contains(&normalized.as_str())
    })
}

/// Formats with the currency's conventional symbol and thousands separators.
pub fn format_amount(amount: f64, code: &str) -> String {
    let (symbol, decimals) = match lookup_currency(code) {
        Some(currency) => (currency.symbol.to_string(), currency.decimals),
        None => (format!("{} ", code.to_ascii_uppercase()), 2),
    };

    let fixed = format!("{:.decimals$}", amount.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{sign}{symbol}{grouped}.{fraction}"),
        None => format!("{sign}{symbol}{grouped}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    #[error("rate request failed: {0}")]
    Network(String),
    #[error("rate response was invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyError {
    #[error("currency API key is not configured")]
    ConfigurationMissing,
    #[error("unknown currency '{0}'")]
    UnknownCurrency(String),
    #[error("no exchange rate for {0}")]
    MissingRate(String),
    #[error("exchange rates unavailable: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateCache {
    pub base_currency: String,
    pub rates: HashMap<String, f64>,
    pub fetched_at: Instant,
    pub ttl: Duration,
}

impl ExchangeRateCache {
    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) > self.ttl
    }

    /// Still usable as a fallback after a failed refresh.
    pub fn within_grace(&self, now: Instant, grace: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) <= self.ttl + grace
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        if code.eq_ignore_ascii_case(&self.base_currency) {
            return Some(1.0);
        }
        self.rates.get(&code.to_ascii_uppercase()).copied()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch(&self, base: &str) -> Result<HashMap<String, f64>, RateError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencySettings {
    pub api_key: String,
    pub base: String,
    pub ttl: Duration,
    pub grace: Duration,
}

impl CurrencySettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            api_key: cfg.currency_api_key.trim().to_string(),
            base: cfg.currency_base.trim().to_ascii_uppercase(),
            ttl: Duration::from_secs(cfg.rate_cache_ttl_secs),
            grace: Duration::from_secs(cfg.rate_grace_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyConversion {
    pub amount: f64,
    pub from: &'static Currency,
    pub to: &'static Currency,
    pub value: f64,
    pub rate: f64,
}

impl CurrencyConversion {
    pub fn formatted_value(&self) -> String {
        format_amount(self.value, self.to.code)
    }
}

type PendingFetch = Shared<BoxFuture<'static, Result<Arc<ExchangeRateCache>, RateError>>>;

struct InFlight {
    generation: u64,
    base: String,
    pending: PendingFetch,
}

#[derive(Default)]
struct RateState {
    cache: Option<Arc<ExchangeRateCache>>,
    inflight: Option<InFlight>,
    generation: u64,
}

pub struct CurrencyService {
    fetcher: Arc<dyn RateFetcher>,
    state: Mutex<RateState>,
}

impl CurrencyService {
    pub fn new(fetcher: Arc<dyn RateFetcher>) -> Self {
        Self {
            fetcher,
            state: Mutex::new(RateState::default()),
        }
    }

    pub fn cached(&self) -> Option<Arc<ExchangeRateCache>> {
        self.lock_state().cache.clone()
    }

    pub async fn convert(
        &self,
        amount: f64,
        from: &str,
        to: &str,
        settings: &CurrencySettings,
    ) -> Result<CurrencyConversion, CurrencyError> {
        let source =
            lookup_currency(from).ok_or_else(|| CurrencyError::UnknownCurrency(from.to_string()))?;
        let target =
            lookup_currency(to).ok_or_else(|| CurrencyError::UnknownCurrency(to.to_string()))?;

        let cache = self.rates(settings).await?;
        let source_rate = cache
            .rate(source.code)
            .ok_or_else(|| CurrencyError::MissingRate(source.code.to_string()))?;
        let target_rate = cache
            .rate(target.code)
            .ok_or_else(|| CurrencyError::MissingRate(target.code.to_string()))?;
        if source_rate == 0.0 {
            return Err(CurrencyError::MissingRate(source.code.to_string()));
        }

        let rate = target_rate / source_rate;
        Ok(CurrencyConversion {
            amount,
            from: source,
            to: target,
            value: rate * amount,
            rate,
        })
    }

    /// Returns a fresh snapshot, refreshing through at most one in-flight fetch.
    pub async fn rates(
        &self,
        settings: &CurrencySettings,
    ) -> Result<Arc<ExchangeRateCache>, CurrencyError> {
        if settings.api_key.is_empty() {
            return Err(CurrencyError::ConfigurationMissing);
        }

        let (generation, pending) = {
            let mut state = self.lock_state();
            if let Some(cache) = state.cache.as_ref() {
                if cache.base_currency == settings.base && !cache.is_stale(Instant::now()) {
                    return Ok(Arc::clone(cache));
                }
            }

            match state.inflight.as_ref() {
                Some(inflight) if inflight.base == settings.base => {
                    (inflight.generation, inflight.pending.clone())
                }
                _ => {
                    state.generation += 1;
                    let generation = state.generation;
                    let pending = self.start_fetch(settings);
                    state.inflight = Some(InFlight {
                        generation,
                        base: settings.base.clone(),
                        pending: pending.clone(),
                    });
                    (generation, pending)
                }
            }
        };

        let outcome = pending.await;

        let mut state = self.lock_state();
        let owns_completion = state
            .inflight
            .as_ref()
            .is_some_and(|inflight| inflight.generation == generation);
        if owns_completion {
            state.inflight = None;
        }

        match outcome {
            Ok(cache) => {
                if owns_completion {
                    debug!(base = %cache.base_currency, rates = cache.rates.len(), "exchange rates refreshed");
                    state.cache = Some(Arc::clone(&cache));
                }
                Ok(cache)
            }
            Err(error) => {
                let fallback = state
                    .cache
                    .as_ref()
                    .filter(|cache| cache.base_currency == settings.base)
                    .filter(|cache| cache.within_grace(Instant::now(), settings.grace))
                    .cloned();
                match fallback {
                    Some(cache) => {
                        warn!(%error, "exchange rate refresh failed; serving cached rates");
                        Ok(cache)
                    }
                    None => {
                        warn!(%error, "exchange rate refresh failed; will retry on next query");
                        Err(CurrencyError::Network(error.to_string()))
                    }
                }
            }
        }
    }

    fn start_fetch(&self, settings: &CurrencySettings) -> PendingFetch {
        let fetcher = Arc::clone(&self.fetcher);
        let base = settings.base.clone();
        let ttl = settings.ttl;
        async move {
            let rates = fetcher.fetch(&base).await?;
            let rates = rates
                .into_iter()
                .map(|(code, rate)| (code.to_ascii_uppercase(), rate))
                .collect();
            Ok(Arc::new(ExchangeRateCache {
                base_currency: base,
                rates,
                fetched_at: Instant::now(),
                ttl,
            }))
        }
        .boxed()
        .shared()
    }

    fn lock_state(&self) -> MutexGuard<'_, RateState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

const DEFAULT_RATES_ENDPOINT: &str = "https://v6.exchangerate-api.com/v6/{key}/latest/{base}";
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches rates over HTTP from an exchangerate-api compatible endpoint.
pub struct HttpRateFetcher {
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default, alias = "rates")]
    conversion_rates: HashMap<String, f64>,
}

impl HttpRateFetcher {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
            endpoint: DEFAULT_RATES_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    fn url_for(&self, base: &str) -> String {
        self.endpoint
            .replace("{key}", &self.api_key)
            .replace("{base}", base)
    }
}

#[async_trait]
impl RateFetcher for HttpRateFetcher {
    async fn fetch(&self, base: &str) -> Result<HashMap<String, f64>, RateError> {
        let url = self.url_for(base);
        let response = tokio::task::spawn_blocking(move || fetch_blocking(&url))
            .await
            .map_err(|error| RateError::Network(format!("rate fetch task failed: {error}")))??;

        if let Some(result) = response.result.as_deref() {
            if result != "success" {
                return Err(RateError::InvalidResponse(format!("result={result}")));
            }
        }
        if response.conversion_rates.is_empty() {
            return Err(RateError::InvalidResponse("no rates in response".to_string()));
        }
        Ok(response.conversion_rates)
    }
}

fn fetch_blocking(url: &str) -> Result<RatesResponse, RateError> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(HTTP_TIMEOUT))
        .build()
        .into();
    let mut response = agent
        .get(url)
        .call()
        .map_err(|error| RateError::Network(error.to_string()))?;
    response
        .body_mut()
        .read_json::<RatesResponse>()
        .map_err(|error| RateError::InvalidResponse(error.to_string()))
}
