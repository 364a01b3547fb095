use crate::error::WatchError;
use regex::Regex;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

const DEFAULT_SOLSCAN_API_URL: &str = "https://pro-api.solscan.io/v1.0";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_EXPLORER_URL: &str = "https://solscan.io";
const DEFAULT_EXCLUDED_SYMBOLS: &str = "SOL,WSOL,USDC,USDT";
const MAX_PAGE_SIZE: usize = 50;

static BASE58_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("address pattern is valid")
});

#[derive(Debug, Clone)]
pub struct SolscanConfig {
    pub api_key: String,
    pub api_url: String,
    pub request_timeout: Duration,
    pub max_retries: usize,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub addresses: Vec<String>,
    pub poll_interval: Duration,
    pub page_size: usize,
    pub concurrency: usize,
    pub metadata_cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub excluded_symbols: Vec<String>,
    pub explorer_url: String,
    pub image_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub solscan: SolscanConfig,
    pub telegram: Option<TelegramConfig>,
    pub watch: WatchConfig,
    pub notify: NotifyConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, WatchError> {
        dotenv::dotenv().ok();
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup<F>(get: &F) -> Result<Self, WatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            solscan: SolscanConfig::from_lookup(get)?,
            telegram: TelegramConfig::from_lookup(get)?,
            watch: WatchConfig::from_lookup(get)?,
            notify: NotifyConfig::from_lookup(get)?,
        })
    }
}

impl SolscanConfig {
    pub fn from_lookup<F>(get: &F) -> Result<Self, WatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(get, "SOLSCAN_API_KEY")?;
        let api_url = get("SOLSCAN_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOLSCAN_API_URL.to_string());
        let timeout_secs: u64 = parsed(get, "REQUEST_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            return Err(WatchError::config("REQUEST_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(SolscanConfig {
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(timeout_secs),
            max_retries: parsed(get, "REQUEST_MAX_RETRIES", 2)?,
        })
    }
}

impl TelegramConfig {
    /// Telegram credentials come as a pair; neither set means no Telegram
    /// delivery is configured.
    pub fn from_lookup<F>(get: &F) -> Result<Option<Self>, WatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = get("TELEGRAM_BOT_TOKEN").filter(|v| !v.trim().is_empty());
        let chat_id = get("TELEGRAM_CHAT_ID").filter(|v| !v.trim().is_empty());

        match (bot_token, chat_id) {
            (None, None) => Ok(None),
            (Some(bot_token), Some(chat_id)) => Ok(Some(TelegramConfig {
                bot_token: bot_token.trim().to_string(),
                chat_id: chat_id.trim().to_string(),
                api_url: get("TELEGRAM_API_URL")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            })),
            (Some(_), None) => Err(WatchError::config(
                "TELEGRAM_CHAT_ID must be set when TELEGRAM_BOT_TOKEN is set",
            )),
            (None, Some(_)) => Err(WatchError::config(
                "TELEGRAM_BOT_TOKEN must be set when TELEGRAM_CHAT_ID is set",
            )),
        }
    }
}

impl WatchConfig {
    pub fn from_lookup<F>(get: &F) -> Result<Self, WatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = required(get, "WATCHED_ADDRESSES")?;
        let mut addresses: Vec<String> = Vec::new();
        for address in split_list(&raw) {
            validate_address(&address)?;
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }
        if addresses.is_empty() {
            return Err(WatchError::config(
                "WATCHED_ADDRESSES must list at least one address",
            ));
        }

        let poll_interval_secs: u64 = parsed(get, "POLL_INTERVAL_SECS", 60)?;
        if poll_interval_secs == 0 {
            return Err(WatchError::config("POLL_INTERVAL_SECS must be greater than 0"));
        }

        let page_size: usize = parsed(get, "PAGE_SIZE", 5)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(WatchError::config(format!(
                "PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let concurrency: usize = parsed(get, "WORKER_CONCURRENCY", 4)?;
        if concurrency == 0 {
            return Err(WatchError::config("WORKER_CONCURRENCY must be at least 1"));
        }

        Ok(WatchConfig {
            addresses,
            poll_interval: Duration::from_secs(poll_interval_secs),
            page_size,
            concurrency,
            metadata_cache_ttl: Duration::from_secs(parsed(get, "METADATA_CACHE_TTL_SECS", 300)?),
        })
    }
}

impl NotifyConfig {
    pub fn from_lookup<F>(get: &F) -> Result<Self, WatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let excluded = get("EXCLUDED_SYMBOLS").unwrap_or_else(|| DEFAULT_EXCLUDED_SYMBOLS.to_string());
        let explorer_url = get("EXPLORER_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string());

        Ok(NotifyConfig {
            excluded_symbols: split_list(&excluded),
            explorer_url: explorer_url.trim_end_matches('/').to_string(),
            image_dir: get("IMAGE_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

pub fn validate_address(address: &str) -> Result<(), WatchError> {
    if BASE58_ADDRESS.is_match(address) {
        Ok(())
    } else {
        Err(WatchError::config(format!("Invalid address format: {address}")))
    }
}

pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn required<F>(get: &F, key: &str) -> Result<String, WatchError>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| WatchError::config(format!("{key} must be set in .env")))
}

fn parsed<F, T>(get: &F, key: &str, default: T) -> Result<T, WatchError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| WatchError::config(format!("{key} has an invalid value: {raw}"))),
        _ => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const WALLET_A: &str = "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1";
    const WALLET_B: &str = "7YttLkHDoNj9wyDur5pM1ejNaAvT9X4eqaYcHQqtj2G5";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn loads_defaults() {
        let get = lookup(&[
            ("SOLSCAN_API_KEY", "key"),
            ("WATCHED_ADDRESSES", WALLET_A),
        ]);
        let config = Config::from_lookup(&get).unwrap();

        assert_eq!(config.solscan.api_url, DEFAULT_SOLSCAN_API_URL);
        assert_eq!(config.solscan.request_timeout, Duration::from_secs(10));
        assert!(config.telegram.is_none());
        assert_eq!(config.watch.addresses, vec![WALLET_A.to_string()]);
        assert_eq!(config.watch.poll_interval, Duration::from_secs(60));
        assert_eq!(config.watch.page_size, 5);
        assert_eq!(config.watch.concurrency, 4);
        assert_eq!(
            config.notify.excluded_symbols,
            vec!["SOL", "WSOL", "USDC", "USDT"]
        );
        assert_eq!(config.notify.explorer_url, DEFAULT_EXPLORER_URL);
        assert!(config.notify.image_dir.is_none());
    }

    #[test]
    fn parses_address_list_and_overrides() {
        let addresses = format!("{WALLET_A}, {WALLET_B}\n{WALLET_A}");
        let get = lookup(&[
            ("SOLSCAN_API_KEY", "key"),
            ("SOLSCAN_API_URL", "http://localhost:9000/"),
            ("WATCHED_ADDRESSES", addresses.as_str()),
            ("POLL_INTERVAL_SECS", "15"),
            ("PAGE_SIZE", "3"),
            ("EXCLUDED_SYMBOLS", "bonk, jup"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-10042"),
            ("IMAGE_DIR", "./images"),
        ]);
        let config = Config::from_lookup(&get).unwrap();

        assert_eq!(config.solscan.api_url, "http://localhost:9000");
        assert_eq!(config.watch.addresses, vec![WALLET_A, WALLET_B]);
        assert_eq!(config.watch.poll_interval, Duration::from_secs(15));
        assert_eq!(config.watch.page_size, 3);
        assert_eq!(config.notify.excluded_symbols, vec!["bonk", "jup"]);
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.chat_id, "-10042");
        assert_eq!(telegram.api_url, DEFAULT_TELEGRAM_API_URL);
        assert_eq!(config.notify.image_dir, Some(PathBuf::from("./images")));
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let get = lookup(&[("WATCHED_ADDRESSES", WALLET_A)]);
        let err = Config::from_lookup(&get).unwrap_err();
        assert!(matches!(err, WatchError::Configuration(msg) if msg.contains("SOLSCAN_API_KEY")));
    }

    #[test]
    fn empty_watch_list_is_fatal() {
        let get = lookup(&[("SOLSCAN_API_KEY", "key"), ("WATCHED_ADDRESSES", " , ")]);
        let err = Config::from_lookup(&get).unwrap_err();
        assert!(matches!(err, WatchError::Configuration(_)));
    }

    #[test]
    fn rejects_malformed_address() {
        let get = lookup(&[
            ("SOLSCAN_API_KEY", "key"),
            ("WATCHED_ADDRESSES", "0xdeadbeef"),
        ]);
        let err = Config::from_lookup(&get).unwrap_err();
        assert!(matches!(err, WatchError::Configuration(msg) if msg.contains("0xdeadbeef")));
    }

    #[test]
    fn rejects_half_configured_telegram() {
        let get = lookup(&[("TELEGRAM_BOT_TOKEN", "123:abc")]);
        assert!(TelegramConfig::from_lookup(&get).is_err());
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        for (key, value) in [
            ("PAGE_SIZE", "0"),
            ("PAGE_SIZE", "500"),
            ("POLL_INTERVAL_SECS", "0"),
            ("WORKER_CONCURRENCY", "0"),
            ("POLL_INTERVAL_SECS", "soon"),
        ] {
            let get = lookup(&[
                ("SOLSCAN_API_KEY", "key"),
                ("WATCHED_ADDRESSES", WALLET_A),
                (key, value),
            ]);
            assert!(Config::from_lookup(&get).is_err(), "{key}={value} accepted");
        }
    }
}
