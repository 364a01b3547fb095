use crate::metadata::MetadataResolver;
use crate::models::{NotifiableEvent, TransferRecord};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Token symbols that never trigger a notification, compared
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    symbols: HashSet<String>,
}

impl ExclusionSet {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: symbols
                .into_iter()
                .map(|s| normalize_symbol(s.as_ref()))
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(&normalize_symbol(symbol))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

pub struct Enricher {
    resolver: Arc<MetadataResolver>,
    exclusions: ExclusionSet,
}

impl Enricher {
    pub fn new(resolver: Arc<MetadataResolver>, exclusions: ExclusionSet) -> Self {
        Self {
            resolver,
            exclusions,
        }
    }

    /// Pairs a transfer with its token metadata, or drops it when the token
    /// is excluded. The resolved symbol decides; the upstream hint is only
    /// consulted when no symbol resolved.
    pub async fn enrich(&self, transfer: TransferRecord) -> Option<NotifiableEvent> {
        let metadata = self.resolver.resolve(&transfer.token_address).await;

        let excluded = metadata
            .symbol
            .as_deref()
            .or(transfer.symbol_hint.as_deref())
            .filter(|symbol| self.exclusions.contains(symbol));
        if let Some(symbol) = excluded {
            debug!(
                "Dropping transfer {} of excluded token {}",
                transfer.signature, symbol
            );
            return None;
        }

        Some(NotifiableEvent { transfer, metadata })
    }
}
