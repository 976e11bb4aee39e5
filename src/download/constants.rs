//! Constants for the download module (timeouts, capacity).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes).
///
/// Applies to each read from the connection, not to the whole transfer.
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of simultaneous transfers.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;
