use crate::cursor::CursorState;
use crate::error::WatchError;
use crate::models::TransferRecord;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Upstream transfer history for an address, most recent first.
#[async_trait]
pub trait TransferSource: Send + Sync {
    async fn recent_transfers(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, WatchError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Records newer than the cursor, most recent first.
    pub records: Vec<TransferRecord>,
    /// Newest signature seen in this poll, `None` if nothing was seen.
    pub newest_signature: Option<String>,
}

pub struct ActivityPoller {
    source: Arc<dyn TransferSource>,
    page_size: usize,
}

impl ActivityPoller {
    pub fn new(source: Arc<dyn TransferSource>, page_size: usize) -> Self {
        Self { source, page_size }
    }

    /// Fetches the latest page for `address` and keeps only what is newer than
    /// `cursor`. Upstream failures are logged and yield an empty outcome so
    /// the cursor stays put.
    pub async fn poll(&self, address: &str, cursor: &CursorState) -> PollOutcome {
        match self.source.recent_transfers(address, self.page_size).await {
            Ok(page) => {
                let outcome = select_new(page, cursor);
                debug!(
                    "Polled {}: {} new record(s), newest {:?}",
                    address,
                    outcome.records.len(),
                    outcome.newest_signature
                );
                outcome
            }
            Err(e) => {
                warn!("Failed to poll transfers for {}: {}", address, e);
                PollOutcome::default()
            }
        }
    }
}

/// Walks a most-recent-first page and stops at the cursor boundary. With no
/// cursor the page only establishes a baseline and nothing is returned.
/// One transaction can move several tokens, so rows sharing a signature are
/// all kept; only exact `(signature, token)` repeats are collapsed.
pub fn select_new(page: Vec<TransferRecord>, cursor: &CursorState) -> PollOutcome {
    let newest_signature = page.first().map(|r| r.signature.clone());

    let Some(boundary) = cursor.last_signature.as_deref() else {
        return PollOutcome {
            records: Vec::new(),
            newest_signature,
        };
    };

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for record in page {
        if record.signature == boundary {
            break;
        }
        if seen.insert((record.signature.clone(), record.token_address.clone())) {
            records.push(record);
        }
    }

    PollOutcome {
        records,
        newest_signature,
    }
}
