use tracing::debug;

/// Last confirmed transfer signature for one address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorState {
    pub last_signature: Option<String>,
}

impl CursorState {
    pub fn at(signature: impl Into<String>) -> Self {
        Self {
            last_signature: Some(signature.into()),
        }
    }

    /// Moves the cursor to `newest` if a signature was observed. `None` means
    /// the poll saw nothing (or failed) and the cursor keeps its position.
    /// Returns whether the stored signature changed.
    pub fn advance(&mut self, newest: Option<String>) -> bool {
        match newest {
            Some(signature) if self.last_signature.as_deref() != Some(signature.as_str()) => {
                self.last_signature = Some(signature);
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchedAddress {
    pub address: String,
    pub cursor: CursorState,
}

impl WatchedAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            cursor: CursorState::default(),
        }
    }
}

/// Per-address cursors, one slot per watched address. Slots are handed out as
/// disjoint `&mut` borrows so concurrent address tasks never share state.
#[derive(Debug, Default)]
pub struct CursorStore {
    entries: Vec<WatchedAddress>,
}

impl CursorStore {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<WatchedAddress> = Vec::new();
        for address in addresses {
            let address = address.into();
            if entries.iter().any(|e| e.address == address) {
                debug!("Ignoring duplicate watched address {}", address);
                continue;
            }
            entries.push(WatchedAddress::new(address));
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&CursorState> {
        self.entries
            .iter()
            .find(|e| e.address == address)
            .map(|e| &e.cursor)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WatchedAddress> {
        self.entries.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_replaces_only_on_new_signature() {
        let mut cursor = CursorState::default();
        assert_eq!(cursor.last_signature, None);

        assert!(cursor.advance(Some("s3".into())));
        assert_eq!(cursor, CursorState::at("s3"));

        assert!(!cursor.advance(Some("s3".into())));
        assert!(!cursor.advance(None));
        assert_eq!(cursor.last_signature.as_deref(), Some("s3"));

        assert!(cursor.advance(Some("s5".into())));
        assert_eq!(cursor.last_signature.as_deref(), Some("s5"));
    }

    #[test]
    fn store_collapses_duplicates_and_starts_uninitialized() {
        let store = CursorStore::new(["A", "B", "A"]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("A"), Some(&CursorState::default()));
        assert!(store.get("C").is_none());
    }

    #[test]
    fn slots_are_mutated_independently() {
        let mut store = CursorStore::new(["A", "B"]);
        for watched in store.iter_mut() {
            if watched.address == "B" {
                watched.cursor.advance(Some("b1".into()));
            }
        }
        assert_eq!(store.get("A").unwrap().last_signature, None);
        assert_eq!(store.get("B").unwrap().last_signature.as_deref(), Some("b1"));
    }
}
