//! Sticky base URL selection with cyclic failover.
//!
//! The chosen host is persisted so a restarted client goes back to the host
//! that last worked. After a failure the next connect moves on to the next
//! candidate.

use std::sync::Arc;

use crate::config::ConfigError;
use crate::ports::outbound::{storage_keys, StorageProvider};

pub struct BaseUrlSelector {
    candidates: Vec<String>,
    storage: Arc<dyn StorageProvider>,
    try_other: bool,
}

impl BaseUrlSelector {
    pub fn new(
        candidates: Vec<String>,
        storage: Arc<dyn StorageProvider>,
    ) -> Result<Self, ConfigError> {
        let candidates: Vec<String> = candidates
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if candidates.is_empty() {
            return Err(ConfigError::NoBaseUrls);
        }
        Ok(Self {
            candidates,
            storage,
            try_other: false,
        })
    }

    /// Move to the next candidate on the next [`select`](Self::select).
    pub fn request_other(&mut self) {
        self.try_other = true;
    }

    /// Pick the base URL for the next connection attempt and persist it.
    pub fn select(&mut self) -> &str {
        let stored = self
            .storage
            .load(storage_keys::BASE_URL)
            .and_then(|url| self.candidates.iter().position(|c| *c == url));

        let index = match stored {
            None => 0,
            Some(index) if self.try_other => (index + 1) % self.candidates.len(),
            Some(index) => index,
        };
        self.try_other = false;

        let url = &self.candidates[index];
        if stored != Some(index) {
            self.storage.save(storage_keys::BASE_URL, url);
        }
        url
    }
}
