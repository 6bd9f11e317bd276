//! Timing constants shared by the core and its helpers.
//!
//! Connection timings that vary per page (ping delay, watchdog, reconnect
//! delay, idle thresholds) live in `SocketOptions` instead.

use std::time::Duration;

/// Ackable messages older than this are resent on every sweep.
pub const ACK_RESEND_AFTER_MS: u64 = 2_500;

/// Period of the ack resend sweep.
pub const ACK_SWEEP_INTERVAL: Duration = Duration::from_millis(1_000);

/// Delay before the single retry of a failed send.
pub const SEND_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Extra ping delay while idle.
pub const IDLE_PING_BONUS_MS: u64 = 1_000;

/// Reconnect delays while idle are drawn from `[MIN, MIN + SPREAD)`.
pub const IDLE_RECONNECT_MIN_MS: u64 = 10_000;
pub const IDLE_RECONNECT_SPREAD_MS: u64 = 10_000;

/// Authenticated sockets report their lag on pings where
/// `pong_count % LAG_REPORT_EVERY == LAG_REPORT_PHASE`.
pub const LAG_REPORT_EVERY: u32 = 8;
pub const LAG_REPORT_PHASE: u32 = 2;
