use rust_decimal::Decimal;
use std::path::PathBuf;

/// One token transfer touching a watched address, as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub signature: String,
    pub token_address: String,
    pub owner_address: String,
    pub symbol_hint: Option<String>,
}

/// Descriptive and market fields for a token. Every field is optional since
/// upstream data is frequently incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub market_cap_fd: Option<Decimal>,
    pub price_usd: Option<Decimal>,
}

impl TokenMetadata {
    /// Result of a lookup that failed entirely.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Fill fields missing here from `other`.
    pub fn or(self, other: TokenMetadata) -> Self {
        TokenMetadata {
            symbol: self.symbol.or(other.symbol),
            name: self.name.or(other.name),
            market_cap_fd: self.market_cap_fd.or(other.market_cap_fd),
            price_usd: self.price_usd.or(other.price_usd),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifiableEvent {
    pub transfer: TransferRecord,
    pub metadata: TokenMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub attachment_path: Option<PathBuf>,
}
