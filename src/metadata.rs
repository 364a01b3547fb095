use crate::error::WatchError;
use crate::models::TokenMetadata;
use async_trait::async_trait;
use moka::future::Cache;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const NAME_KEYS: &[&str] = &["tokenName", "name"];
const SYMBOL_KEYS: &[&str] = &["tokenSymbol", "symbol"];
const MARKET_CAP_KEYS: &[&str] = &["marketCapFD", "marketCap", "market_cap", "fdv"];
const PRICE_KEYS: &[&str] = &["priceUsdt", "priceUst", "priceUsd", "price"];

#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn token_metadata(&self, token_address: &str) -> Result<TokenMetadata, WatchError>;
}

/// Upper bound on cached tokens; expired entries are evicted on their own.
const CACHE_CAPACITY: u64 = 10_000;

/// Resolves token metadata without ever failing: lookups that error out
/// degrade to [`TokenMetadata::unavailable`]. Successful lookups are cached
/// for `cache_ttl`; a zero TTL disables the cache.
pub struct MetadataResolver {
    source: Arc<dyn MetadataSource>,
    cache: Option<Cache<String, TokenMetadata>>,
}

impl MetadataResolver {
    pub fn new(source: Arc<dyn MetadataSource>, cache_ttl: Duration) -> Self {
        let cache = (!cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .time_to_live(cache_ttl)
                .max_capacity(CACHE_CAPACITY)
                .build()
        });
        Self { source, cache }
    }

    pub async fn resolve(&self, token_address: &str) -> TokenMetadata {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(token_address).await {
                debug!("Metadata cache hit for {}", token_address);
                return cached;
            }
        }

        match self.source.token_metadata(token_address).await {
            Ok(metadata) => {
                if let Some(cache) = &self.cache {
                    cache
                        .insert(token_address.to_string(), metadata.clone())
                        .await;
                }
                metadata
            }
            Err(e) => {
                warn!("Metadata unavailable for {}: {}", token_address, e);
                TokenMetadata::unavailable()
            }
        }
    }
}

/// Normalizes the known metadata payload shapes: flat fields on the object
/// (optionally inside a `data` envelope) and a market list whose first entry
/// carries the fields under `base`. Flat fields win, the market entry fills
/// the gaps.
pub fn normalize_metadata(payload: &Value) -> TokenMetadata {
    let root = match payload.get("data") {
        Some(data) if data.is_object() => data,
        _ => payload,
    };

    let flat = read_fields(root);
    let nested = root
        .pointer("/markets/0/base")
        .map(read_fields)
        .unwrap_or_default();

    flat.or(nested)
}

fn read_fields(object: &Value) -> TokenMetadata {
    TokenMetadata {
        symbol: first_string(object, SYMBOL_KEYS),
        name: first_string(object, NAME_KEYS),
        market_cap_fd: first_decimal(object, MARKET_CAP_KEYS),
        price_usd: first_decimal(object, PRICE_KEYS),
    }
}

pub(crate) fn first_string(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_decimal(object: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(parse_decimal)
}

/// Accepts JSON numbers and numeric strings. Anything else, including values
/// that do not fit a decimal, is treated as absent.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn normalizes_flat_payload() {
        let payload = json!({
            "tokenName": "Bonk",
            "tokenSymbol": "BONK",
            "marketCapFD": 1523456789.123,
            "priceUst": "0.00002345"
        });
        let metadata = normalize_metadata(&payload);
        assert_eq!(metadata.name.as_deref(), Some("Bonk"));
        assert_eq!(metadata.symbol.as_deref(), Some("BONK"));
        assert_eq!(metadata.market_cap_fd, Some(dec("1523456789.123")));
        assert_eq!(metadata.price_usd, Some(dec("0.00002345")));
    }

    #[test]
    fn normalizes_nested_market_payload() {
        let payload = json!({
            "data": {
                "markets": [
                    { "base": { "name": "Jupiter", "symbol": "JUP", "marketCap": "1200000000", "price": 0.91 } },
                    { "base": { "name": "Other", "symbol": "OTHER" } }
                ]
            }
        });
        let metadata = normalize_metadata(&payload);
        assert_eq!(metadata.name.as_deref(), Some("Jupiter"));
        assert_eq!(metadata.symbol.as_deref(), Some("JUP"));
        assert_eq!(metadata.market_cap_fd, Some(dec("1200000000")));
        assert_eq!(metadata.price_usd, Some(dec("0.91")));
    }

    #[test]
    fn flat_fields_take_precedence_over_market_entry() {
        let payload = json!({
            "symbol": "WIF",
            "markets": [{ "base": { "symbol": "IGNORED", "name": "dogwifhat" } }]
        });
        let metadata = normalize_metadata(&payload);
        assert_eq!(metadata.symbol.as_deref(), Some("WIF"));
        assert_eq!(metadata.name.as_deref(), Some("dogwifhat"));
    }

    #[test]
    fn garbage_numbers_become_absent() {
        let payload = json!({
            "tokenSymbol": "  ",
            "marketCapFD": "n/a",
            "priceUst": null
        });
        let metadata = normalize_metadata(&payload);
        assert_eq!(metadata, TokenMetadata::unavailable());
    }

    #[test]
    fn parses_scientific_and_rejects_non_numeric() {
        assert_eq!(parse_decimal(&json!("1.5e3")), Some(dec("1500")));
        assert_eq!(parse_decimal(&json!(0)), Some(Decimal::ZERO));
        assert_eq!(parse_decimal(&json!(true)), None);
        assert_eq!(parse_decimal(&json!("")), None);
        assert_eq!(parse_decimal(&json!({"usd": 1})), None);
    }

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl MetadataSource for CountingSource {
        async fn token_metadata(&self, _token: &str) -> Result<TokenMetadata, WatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(WatchError::UpstreamStatus {
                    status: 500,
                    body: "internal".into(),
                })
            } else {
                Ok(TokenMetadata {
                    symbol: Some("JUP".into()),
                    ..TokenMetadata::default()
                })
            }
        }
    }

    #[tokio::test]
    async fn upstream_failure_degrades_to_unavailable() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let resolver = MetadataResolver::new(source.clone(), Duration::from_secs(60));

        assert_eq!(resolver.resolve("mint").await, TokenMetadata::unavailable());
        assert_eq!(resolver.resolve("mint").await, TokenMetadata::unavailable());
        // failures are never cached
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn caches_successful_lookups() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let resolver = MetadataResolver::new(source.clone(), Duration::from_secs(60));

        resolver.resolve("mint").await;
        let second = resolver.resolve("mint").await;
        assert_eq!(second.symbol.as_deref(), Some("JUP"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        resolver.resolve("other-mint").await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_ttl_disables_cache() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let resolver = MetadataResolver::new(source.clone(), Duration::ZERO);

        resolver.resolve("mint").await;
        resolver.resolve("mint").await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_evicted() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let resolver = MetadataResolver::new(source.clone(), Duration::from_millis(20));

        for i in 0..200 {
            resolver.resolve(&format!("mint-{i}")).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        let cache = resolver.cache.as_ref().unwrap();
        cache.run_pending_tasks().await;
        assert_eq!(cache.entry_count(), 0);

        resolver.resolve("mint-0").await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 201);
    }
}
