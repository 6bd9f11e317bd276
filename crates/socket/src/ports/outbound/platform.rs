//! Platform abstraction ports
//!
//! These traits abstract platform-specific operations so that:
//! 1. The socket state machine stays free of runtime dependencies
//! 2. Platform-specific code is isolated in infrastructure
//! 3. Every transition can be tested against a virtual clock

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary, fixed origin. Never goes backwards.
    fn now_millis(&self) -> u64;
}

/// Random number generation abstraction
pub trait RandomProvider: Send + Sync {
    /// Generate random f64 in range [0.0, 1.0)
    fn random_f64(&self) -> f64;
}

/// Persistent storage abstraction (file-based on desktop)
#[cfg_attr(test, mockall::automock)]
pub trait StorageProvider: Send + Sync {
    /// Save a string value with the given key
    fn save(&self, key: &str, value: &str);

    /// Load a string value by key, returns None if not found
    fn load(&self, key: &str) -> Option<String>;

    /// Remove a value by key
    fn remove(&self, key: &str);
}

/// Storage key constants
pub mod storage_keys {
    /// Base URL the socket last settled on
    pub const BASE_URL: &str = "draughts_socket_base_url";
}
