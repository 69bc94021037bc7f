use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quickbar_core::currency::{
    CurrencyError, CurrencyService, CurrencySettings, RateError, RateFetcher,
};

struct CountingFetcher {
    calls: AtomicUsize,
    offline: AtomicBool,
    delay: Duration,
    bases: Mutex<Vec<String>>,
}

impl CountingFetcher {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            delay,
            bases: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateFetcher for CountingFetcher {
    async fn fetch(&self, base: &str) -> Result<HashMap<String, f64>, RateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bases.lock().unwrap().push(base.to_string());
        tokio::time::sleep(self.delay).await;
        if self.offline.load(Ordering::SeqCst) {
            return Err(RateError::Network("offline".into()));
        }
        Ok(HashMap::from([
            ("EUR".to_string(), 0.5),
            ("GBP".to_string(), 0.25),
        ]))
    }
}

fn settings(api_key: &str) -> CurrencySettings {
    CurrencySettings {
        api_key: api_key.to_string(),
        base: "USD".to_string(),
        ttl: Duration::from_secs(60),
        grace: Duration::from_secs(600),
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_stale_queries_share_one_fetch() {
    let fetcher = CountingFetcher::new(Duration::from_millis(200));
    let service = CurrencyService::new(fetcher.clone());
    let settings = settings("key");

    let (first, second) = futures::join!(
        service.convert(10.0, "USD", "EUR", &settings),
        service.convert(10.0, "USD", "GBP", &settings),
    );

    assert_eq!(first.unwrap().value, 5.0);
    assert_eq!(second.unwrap().value, 2.5);
    assert_eq!(fetcher.calls(), 1);

    service.convert(1.0, "EUR", "GBP", &settings).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_queries_for_different_bases_fetch_separately() {
    let fetcher = CountingFetcher::new(Duration::from_millis(200));
    let service = CurrencyService::new(fetcher.clone());
    let dollars = settings("key");
    let euros = CurrencySettings {
        base: "EUR".to_string(),
        ..settings("key")
    };

    let (first, second) = futures::join!(service.rates(&dollars), service.rates(&euros));

    assert_eq!(first.unwrap().base_currency, "USD");
    assert_eq!(second.unwrap().base_currency, "EUR");
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(*fetcher.bases.lock().unwrap(), vec!["USD", "EUR"]);
}

#[tokio::test(start_paused = true)]
async fn stale_rates_refresh_once_after_ttl() {
    let fetcher = CountingFetcher::new(Duration::from_millis(10));
    let service = CurrencyService::new(fetcher.clone());
    let settings = settings("key");

    service.convert(1.0, "USD", "EUR", &settings).await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    service.convert(1.0, "USD", "EUR", &settings).await.unwrap();
    service.convert(1.0, "USD", "EUR", &settings).await.unwrap();

    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_serves_cached_rates_within_grace() {
    let fetcher = CountingFetcher::new(Duration::from_millis(10));
    let service = CurrencyService::new(fetcher.clone());
    let settings = settings("key");

    service.convert(4.0, "USD", "EUR", &settings).await.unwrap();
    fetcher.offline.store(true, Ordering::SeqCst);

    tokio::time::advance(Duration::from_secs(120)).await;
    let converted = service.convert(4.0, "USD", "EUR", &settings).await.unwrap();
    assert_eq!(converted.value, 2.0);

    tokio::time::advance(Duration::from_secs(3600)).await;
    let error = service.convert(4.0, "USD", "EUR", &settings).await.unwrap_err();
    assert!(matches!(error, CurrencyError::Network(_)));
}

#[tokio::test]
async fn missing_api_key_never_fetches() {
    let fetcher = CountingFetcher::new(Duration::ZERO);
    let service = CurrencyService::new(fetcher.clone());

    let error = service
        .convert(1.0, "USD", "EUR", &settings(""))
        .await
        .unwrap_err();
    assert_eq!(error, CurrencyError::ConfigurationMissing);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn unknown_codes_are_rejected_before_fetching() {
    let fetcher = CountingFetcher::new(Duration::ZERO);
    let service = CurrencyService::new(fetcher.clone());

    let error = service
        .convert(1.0, "USD", "XYZ", &settings("key"))
        .await
        .unwrap_err();
    assert!(matches!(error, CurrencyError::UnknownCurrency(_)));
    assert_eq!(fetcher.calls(), 0);
}
