use crate::config::SolscanConfig;
use crate::error::WatchError;
use crate::http::HttpClient;
use crate::metadata::{MetadataSource, first_string, normalize_metadata};
use crate::models::{TokenMetadata, TransferRecord};
use crate::poller::TransferSource;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

const TOKEN_KEYS: &[&str] = &["tokenAddress", "mint", "token_address"];
const OWNER_KEYS: &[&str] = &["owner", "ownerAddress", "owner_address"];
const SYMBOL_KEYS: &[&str] = &["symbol", "tokenSymbol"];

/// Solscan Pro API client serving both transfer history and token metadata.
#[derive(Debug, Clone)]
pub struct SolscanClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl SolscanClient {
    pub fn new(http: HttpClient, config: &SolscanConfig) -> Self {
        Self {
            http,
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, WatchError> {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .execute_json(path, || {
                self.http
                    .client()
                    .get(&url)
                    .header("accept", "application/json")
                    .header("token", &self.api_key)
                    .query(query)
            })
            .await
    }
}

#[async_trait]
impl TransferSource for SolscanClient {
    async fn recent_transfers(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, WatchError> {
        let payload = self
            .get(
                "/account/splTransfers",
                &[
                    ("account", address.to_string()),
                    ("limit", limit.to_string()),
                    ("offset", "0".to_string()),
                ],
            )
            .await?;
        parse_transfers(&payload, address)
    }
}

#[async_trait]
impl MetadataSource for SolscanClient {
    async fn token_metadata(&self, token_address: &str) -> Result<TokenMetadata, WatchError> {
        let payload = self
            .get("/token/meta", &[("tokenAddress", token_address.to_string())])
            .await?;
        if !payload.is_object() {
            return Err(WatchError::UpstreamFormat(
                "token metadata is not a JSON object".to_string(),
            ));
        }
        let metadata = normalize_metadata(&payload);
        debug!("Resolved metadata for {}: {:?}", token_address, metadata);
        Ok(metadata)
    }
}

/// Reads a transfer page, either bare or inside a `data` envelope. Entries
/// without a signature or token are skipped; a missing owner falls back to
/// the queried account.
pub fn parse_transfers(payload: &Value, account: &str) -> Result<Vec<TransferRecord>, WatchError> {
    let items = payload
        .get("data")
        .unwrap_or(payload)
        .as_array()
        .ok_or_else(|| WatchError::UpstreamFormat("transfer list is not an array".to_string()))?;

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Some(signature) = signature_of(item) else {
            warn!("Skipping transfer without signature for {}", account);
            continue;
        };
        let Some(token_address) = first_string(item, TOKEN_KEYS) else {
            warn!("Skipping transfer {} without token address", signature);
            continue;
        };

        records.push(TransferRecord {
            signature,
            token_address,
            owner_address: first_string(item, OWNER_KEYS).unwrap_or_else(|| account.to_string()),
            symbol_hint: first_string(item, SYMBOL_KEYS),
        });
    }
    Ok(records)
}

// Solscan v1 reports `signature` as a one-element array.
fn signature_of(item: &Value) -> Option<String> {
    let signature = match item.get("signature")? {
        Value::String(s) => s.as_str(),
        Value::Array(values) => values.first()?.as_str()?,
        _ => return None,
    };
    let signature = signature.trim();
    (!signature.is_empty()).then(|| signature.to_string())
}
