//! Platform-agnostic core of the socket client.
//!
//! This is deliberately free of any runtime dependencies (tokio, sockets,
//! wall clocks). The core is a plain state struct with one method per
//! transition; the runtime bridge owns the actual socket and timers and calls
//! into the core whenever something happens:
//!
//! - [`SocketCore::handle_transport_event`] for open/frame/error/close
//! - [`SocketCore::handle_timer`] for fired timers
//! - the public operations (`connect`, `send`, `disconnect`, ...) for the
//!   application
//!
//! Every method runs to completion before the next one is called, so no
//! locking is needed inside the core.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use draughts_socket_wire::{
    encode_millis, parse_frame, ping_frame, reserved, Envelope, InboundFrame, ServerEvent,
};

use super::ackable::AckTracker;
use super::base_url::BaseUrlSelector;
use super::handlers::SocketHandlers;
use super::lag::LagEstimate;
use super::shared::{
    ACK_SWEEP_INTERVAL, IDLE_PING_BONUS_MS, IDLE_RECONNECT_MIN_MS, IDLE_RECONNECT_SPREAD_MS,
    LAG_REPORT_EVERY, LAG_REPORT_PHASE, SEND_RETRY_DELAY,
};
use crate::config::{ConfigError, SocketSettings};
use crate::infrastructure::messaging::{
    topics, ConnectionState, EventBus, SocketObserver, SocketStatus, StatusCell,
};
use crate::ports::outbound::{
    Clock, LinkId, RandomProvider, Scheduler, StorageProvider, Timer, TimerHandle, Transport,
    TransportError, TransportEvent, TransportEventKind,
};

/// Callback run once on the next successful open.
pub type NextConnectFn = Box<dyn FnOnce() + Send + 'static>;

/// Adapters the core drives.
pub struct SocketPorts {
    pub transport: Box<dyn Transport>,
    pub scheduler: Box<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomProvider>,
    pub storage: Arc<dyn StorageProvider>,
}

/// Per-send options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SendOptions {
    /// Attach the rounded average lag as `d.l`
    pub with_lag: bool,
    /// Attach this many milliseconds, compactly encoded, as `d.s`
    pub millis: Option<f64>,
    /// Track until the server acks, resending meanwhile
    pub ackable: bool,
}

impl SendOptions {
    pub fn ackable() -> Self {
        Self {
            ackable: true,
            ..Self::default()
        }
    }

    pub fn with_lag(mut self) -> Self {
        self.with_lag = true;
        self
    }

    pub fn with_millis(mut self, millis: f64) -> Self {
        self.millis = Some(millis);
        self
    }
}

/// Why the core asked the application to resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    /// The server sent `resync`
    Requested,
    /// An event arrived more than one version ahead
    VersionGap,
    /// Activity resumed after the idle disconnect tore the socket down
    WakeAfterDestroy,
}

impl ResyncReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ResyncReason::Requested => "resync",
            ResyncReason::VersionGap => "version_gap",
            ResyncReason::WakeAfterDestroy => "wake_after_destroy",
        }
    }
}

#[derive(Default)]
struct Timers {
    ping: Option<TimerHandle>,
    connect: Option<TimerHandle>,
    ack_sweep: Option<TimerHandle>,
    idle_check: Option<TimerHandle>,
    idle_disconnect: Option<TimerHandle>,
    /// Serialized frames waiting for their single retry
    retries: HashMap<TimerHandle, String>,
}

/// Clear `slot` if it holds `handle`. False means the timer is stale.
fn take_timer(slot: &mut Option<TimerHandle>, handle: TimerHandle) -> bool {
    if *slot == Some(handle) {
        *slot = None;
        true
    } else {
        false
    }
}

pub struct SocketCore {
    settings: SocketSettings,
    version: Option<u64>,
    transport: Box<dyn Transport>,
    scheduler: Box<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomProvider>,
    base_urls: BaseUrlSelector,
    bus: EventBus,
    handlers: SocketHandlers,
    acks: AckTracker,
    lag: LagEstimate,
    timers: Timers,
    /// The one live link, if any
    link: Option<LinkId>,
    next_link: u64,
    state: ConnectionState,
    auto_reconnect: bool,
    destroyed: bool,
    connect_count: u32,
    idle: bool,
    debug: bool,
    last_ping_at: u64,
    last_activity_at: u64,
    on_next_connect: Option<NextConnectFn>,
    status: StatusCell,
}

impl SocketCore {
    pub fn new(
        settings: SocketSettings,
        handlers: SocketHandlers,
        bus: EventBus,
        ports: SocketPorts,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let base_urls = BaseUrlSelector::new(settings.options.base_urls.clone(), ports.storage)?;
        let now = ports.clock.now_millis();
        let core = Self {
            version: settings.version,
            idle: settings.options.idle,
            debug: settings.options.debug,
            settings,
            transport: ports.transport,
            scheduler: ports.scheduler,
            clock: ports.clock,
            random: ports.random,
            base_urls,
            bus,
            handlers,
            acks: AckTracker::new(),
            lag: LagEstimate::new(),
            timers: Timers::default(),
            link: None,
            next_link: 0,
            state: ConnectionState::Disconnected,
            auto_reconnect: true,
            destroyed: false,
            connect_count: 0,
            last_ping_at: now,
            last_activity_at: now,
            on_next_connect: None,
            status: StatusCell::default(),
        };
        core.sync_status();
        Ok(core)
    }

    pub fn observer(&self) -> SocketObserver {
        self.status.observer()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Ping delay + idle bonus + average lag, in milliseconds.
    pub fn ping_interval(&self) -> f64 {
        self.ping_delay().as_millis() as f64 + self.lag.average()
    }

    pub fn average_lag(&self) -> f64 {
        self.lag.average()
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connect_count(&self) -> u32 {
        self.connect_count
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn pending_acks(&self) -> usize {
        self.acks.len()
    }

    pub fn settings(&self) -> &SocketSettings {
        &self.settings
    }

    // =========================================================================
    // Application operations
    // =========================================================================

    /// Tear down any live link and start a new connection attempt.
    pub fn connect(&mut self) {
        self.teardown();
        self.destroyed = false;
        self.auto_reconnect = true;

        let base_url = self.base_urls.select().to_string();
        let url = match self.settings.socket_url(&base_url, self.version) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(socket = %self.settings.options.name, base_url = %base_url, error = %e, "Cannot build socket URL");
                self.state = ConnectionState::Connecting;
                self.on_error(&e.to_string());
                self.schedule_connect(self.settings.options.ping_max_lag());
                self.ensure_ack_sweep();
                self.sync_status();
                return;
            }
        };

        self.next_link += 1;
        let link = LinkId(self.next_link);
        self.link = Some(link);
        self.state = ConnectionState::Connecting;
        self.log_frame("connection attempt to", url.as_str());

        if let Err(e) = self.transport.open(link, &url) {
            self.on_error(&e.to_string());
        }
        self.schedule_connect(self.settings.options.ping_max_lag());
        self.ensure_ack_sweep();
        self.sync_status();
    }

    /// Send `{t, d}` to the server. Never fails from the caller's view: a
    /// failed write is retried once a second later, then dropped.
    pub fn send(&mut self, kind: &str, data: Option<Value>, options: SendOptions) {
        let mut data = data;
        if let Some(Value::Object(map)) = data.as_mut() {
            if options.with_lag {
                map.insert(
                    reserved::LAG.to_string(),
                    Value::from(self.lag.average().round() as u64),
                );
            }
            if let Some(encoded) = options.millis.and_then(encode_millis) {
                map.insert(reserved::MILLIS.to_string(), Value::from(encoded));
            }
        }

        if options.ackable {
            let now = self.clock.now_millis();
            match data.get_or_insert_with(|| Value::Object(Map::new())) {
                Value::Object(map) => {
                    let id = self.acks.register(kind, map, now);
                    tracing::trace!(socket = %self.settings.options.name, ack_id = id, kind, "Registered ackable message");
                }
                other => {
                    tracing::warn!(kind, payload = %other, "Cannot ack a non-object payload, sending untracked");
                }
            }
        }

        let envelope = Envelope {
            kind: kind.to_string(),
            data,
            version: None,
        };
        let frame = match envelope.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(kind, error = %e, "Failed to serialize socket message");
                return;
            }
        };

        self.log_frame("send", &frame);
        if let Err(e) = self.write(&frame) {
            // Most likely sent before the socket opened; try once more later.
            tracing::debug!(kind, error = %e, "Send failed, retrying once");
            let handle = self.scheduler.schedule_once(SEND_RETRY_DELAY, Timer::RetrySend);
            self.timers.retries.insert(handle, frame);
        }
        self.sync_status();
    }

    /// Stop auto-reconnecting and close the live link.
    ///
    /// `on_next_connect` runs once, first thing, on the next successful open.
    pub fn disconnect(&mut self, on_next_connect: Option<NextConnectFn>) {
        self.cancel_timer(Timer::Ping);
        self.cancel_timer(Timer::Connect);
        self.close_link();
        self.auto_reconnect = false;
        if let Some(callback) = on_next_connect {
            self.on_next_connect = Some(callback);
        }
        self.state = ConnectionState::Disconnected;
        self.sync_status();
    }

    /// Cancel every timer and close the link. Nothing happens afterwards
    /// until `connect` is called again.
    pub fn destroy(&mut self) {
        self.cancel_timer(Timer::AckSweep);
        self.cancel_timer(Timer::IdleCheck);
        self.cancel_timer(Timer::IdleDisconnect);
        for (handle, _) in self.timers.retries.drain() {
            self.scheduler.cancel(handle);
        }
        self.disconnect(None);
        self.auto_reconnect = false;
        self.destroyed = true;
        self.sync_status();
    }

    /// Report user activity; leaves idle mode if needed.
    pub fn notify_activity(&mut self) {
        self.last_activity_at = self.clock.now_millis();
        if !self.idle {
            return;
        }
        self.idle = false;
        tracing::info!(socket = %self.settings.options.name, "Activity resumed, leaving idle mode");

        if self.destroyed {
            self.resync(ResyncReason::WakeAfterDestroy);
            return;
        }
        self.cancel_timer(Timer::IdleDisconnect);
        if self.connect_count > 0 && self.timers.idle_check.is_none() {
            self.schedule_idle_check(self.settings.options.idle_timeout());
        }
        self.sync_status();
    }

    // =========================================================================
    // Transport events
    // =========================================================================

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.link != Some(event.link) {
            tracing::trace!(link = %event.link, "Ignoring event from detached link");
            return;
        }
        match event.kind {
            TransportEventKind::Opened => self.on_open(),
            TransportEventKind::Frame(text) => self.on_frame(&text),
            TransportEventKind::Error(message) => self.on_error(&message),
            TransportEventKind::Closed => self.on_close(),
        }
        self.sync_status();
    }

    fn on_open(&mut self) {
        if let Some(callback) = self.on_next_connect.take() {
            callback();
        }
        self.connect_count += 1;
        self.state = ConnectionState::Connected;
        tracing::info!(
            socket = %self.settings.options.name,
            sri = %self.settings.sri(),
            connects = self.connect_count,
            "Socket connected"
        );
        if self.connect_count == 1 {
            self.last_activity_at = self.clock.now_millis();
        }
        // Also re-arms the watch after a destroy.
        if self.timers.idle_check.is_none() && !self.idle {
            self.schedule_idle_check(self.settings.options.idle_timeout());
        }

        self.ping_now();
        self.bus
            .publish(topics::OPEN, &json!({ "reconnected": self.connect_count > 1 }));

        // Acks for anything sent on the old link died with it.
        let frames: Vec<String> = self
            .acks
            .pending()
            .iter()
            .filter_map(|m| m.frame().ok())
            .collect();
        for frame in frames {
            self.resend(&frame);
        }
    }

    fn on_frame(&mut self, text: &str) {
        let frame = match parse_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(socket = %self.settings.options.name, error = %e, "Dropping malformed frame");
                return;
            }
        };
        match frame {
            InboundFrame::Pong => self.pong(),
            InboundFrame::Single(envelope) => {
                if envelope.is_pong() {
                    self.pong();
                }
                self.handle(envelope);
            }
            InboundFrame::Batch(envelopes) => {
                for envelope in envelopes {
                    if self.destroyed {
                        break;
                    }
                    self.handle(envelope);
                }
            }
        }
    }

    fn on_error(&mut self, message: &str) {
        self.debug = true;
        tracing::warn!(socket = %self.settings.options.name, error = message, "Socket error");
        self.base_urls.request_other();
        self.cancel_timer(Timer::Ping);
    }

    fn on_close(&mut self) {
        self.link = None;
        if self.auto_reconnect {
            let delay = self.settings.options.auto_reconnect_delay();
            self.state = ConnectionState::Reconnecting;
            tracing::debug!(
                socket = %self.settings.options.name,
                delay_ms = delay.as_millis() as u64,
                "Socket closed, will reconnect"
            );
            self.schedule_connect(delay);
        } else {
            self.state = ConnectionState::Disconnected;
        }
    }

    /// Version bookkeeping, then dispatch.
    fn handle(&mut self, envelope: Envelope) {
        if let (Some(current), Some(v)) = (self.version, envelope.tracked_version()) {
            if v <= current {
                self.log_frame("already has event", &v.to_string());
                return;
            }
            if v > current + 1 {
                // Should not happen on an ordered transport, but it does.
                tracing::warn!(
                    socket = %self.settings.options.name,
                    expected = current + 1,
                    received = v,
                    "Event version gap"
                );
                self.resync(ResyncReason::VersionGap);
                return;
            }
            self.version = Some(v);
        }

        match ServerEvent::classify(&envelope) {
            ServerEvent::Untyped => {}
            ServerEvent::Resync => self.resync(ResyncReason::Requested),
            ServerEvent::Ack(Some(id)) => {
                let removed = self.acks.ack(id);
                tracing::trace!(ack_id = id, removed, "Ack received");
            }
            ServerEvent::Ack(None) => {
                tracing::debug!(payload = %envelope.data_or_null(), "Ack without a usable id");
            }
            ServerEvent::Redirect(Some(game)) => {
                self.bus.publish(topics::REDIRECT, &json!({ "game": game }));
            }
            ServerEvent::Redirect(None) => {}
            ServerEvent::Other { kind, data } => {
                self.bus.publish(&topics::inbound(kind), data);
                self.handlers.dispatch(kind, data, &envelope);
            }
        }
    }

    fn resync(&mut self, reason: ResyncReason) {
        tracing::warn!(socket = %self.settings.options.name, reason = reason.as_str(), "Resync required");
        self.bus
            .publish(topics::RESYNC, &json!({ "reason": reason.as_str() }));
        self.destroy();
    }

    // =========================================================================
    // Timers
    // =========================================================================

    pub fn handle_timer(&mut self, handle: TimerHandle, timer: Timer) {
        match timer {
            Timer::Ping => {
                if take_timer(&mut self.timers.ping, handle) {
                    self.ping_now();
                }
            }
            Timer::Connect => {
                if take_timer(&mut self.timers.connect, handle) {
                    self.state = ConnectionState::Reconnecting;
                    self.bus.publish(topics::OFFLINE, &Value::Null);
                    self.base_urls.request_other();
                    self.connect();
                }
            }
            Timer::AckSweep => {
                if take_timer(&mut self.timers.ack_sweep, handle) {
                    self.resend_overdue();
                    self.ensure_ack_sweep();
                }
            }
            Timer::RetrySend => {
                if let Some(frame) = self.timers.retries.remove(&handle) {
                    if let Err(e) = self.write(&frame) {
                        tracing::debug!(error = %e, "Retry failed, dropping message");
                    }
                }
            }
            Timer::IdleCheck => {
                if take_timer(&mut self.timers.idle_check, handle) {
                    self.check_idle();
                }
            }
            Timer::IdleDisconnect => {
                if take_timer(&mut self.timers.idle_disconnect, handle) {
                    tracing::info!(socket = %self.settings.options.name, "Idle for too long, destroying socket");
                    self.destroy();
                }
            }
        }
        self.sync_status();
    }

    fn ping_delay(&self) -> Duration {
        let bonus = if self.idle { IDLE_PING_BONUS_MS } else { 0 };
        self.settings.options.ping_delay() + Duration::from_millis(bonus)
    }

    fn ping_now(&mut self) {
        self.cancel_timer(Timer::Ping);
        self.cancel_timer(Timer::Connect);

        let report_lag = self.settings.options.is_auth
            && self.lag.pong_count() % LAG_REPORT_EVERY == LAG_REPORT_PHASE;
        let frame = ping_frame(report_lag.then(|| self.lag.reported()));
        match self.write(&frame) {
            Ok(()) => self.last_ping_at = self.clock.now_millis(),
            Err(e) => tracing::debug!(error = %e, "Ping failed"),
        }
        self.schedule_connect(self.settings.options.ping_max_lag());
    }

    fn pong(&mut self) {
        self.cancel_timer(Timer::Connect);
        let delay = self.ping_delay();
        self.schedule_timer(delay, Timer::Ping);

        let sample = self.clock.now_millis().saturating_sub(self.last_ping_at);
        let average = self.lag.record(sample as f64);
        self.bus.publish(topics::LAG, &json!(average));
    }

    /// Arm the reconnect timer, replacing any pending ping or reconnect.
    fn schedule_connect(&mut self, delay: Duration) {
        let delay = if self.idle {
            let jitter = (self.random.random_f64() * IDLE_RECONNECT_SPREAD_MS as f64) as u64;
            Duration::from_millis(IDLE_RECONNECT_MIN_MS + jitter)
        } else {
            delay
        };
        self.cancel_timer(Timer::Ping);
        self.schedule_timer(delay, Timer::Connect);
    }

    fn ensure_ack_sweep(&mut self) {
        if self.timers.ack_sweep.is_none() {
            self.schedule_timer(ACK_SWEEP_INTERVAL, Timer::AckSweep);
        }
    }

    fn resend_overdue(&mut self) {
        let now = self.clock.now_millis();
        let frames: Vec<String> = self
            .acks
            .overdue(now)
            .filter_map(|m| m.frame().ok())
            .collect();
        for frame in frames {
            self.resend(&frame);
        }
    }

    fn schedule_idle_check(&mut self, delay: Duration) {
        self.schedule_timer(delay, Timer::IdleCheck);
    }

    fn check_idle(&mut self) {
        let timeout = self.settings.options.idle_timeout();
        let quiet = Duration::from_millis(
            self.clock
                .now_millis()
                .saturating_sub(self.last_activity_at),
        );
        if quiet < timeout {
            self.schedule_idle_check(timeout - quiet);
            return;
        }
        if !self.idle {
            self.idle = true;
            tracing::info!(socket = %self.settings.options.name, "No activity, entering idle mode");
            let after = self.settings.options.idle_disconnect_after();
            self.schedule_timer(after, Timer::IdleDisconnect);
        }
    }

    fn slot(&mut self, timer: Timer) -> Option<&mut Option<TimerHandle>> {
        match timer {
            Timer::Ping => Some(&mut self.timers.ping),
            Timer::Connect => Some(&mut self.timers.connect),
            Timer::AckSweep => Some(&mut self.timers.ack_sweep),
            Timer::IdleCheck => Some(&mut self.timers.idle_check),
            Timer::IdleDisconnect => Some(&mut self.timers.idle_disconnect),
            Timer::RetrySend => None,
        }
    }

    /// Schedule a single-slot timer, replacing whatever the slot held.
    fn schedule_timer(&mut self, delay: Duration, timer: Timer) {
        self.cancel_timer(timer);
        let handle = self.scheduler.schedule_once(delay, timer);
        if let Some(slot) = self.slot(timer) {
            *slot = Some(handle);
        }
    }

    fn cancel_timer(&mut self, timer: Timer) {
        if let Some(handle) = self.slot(timer).and_then(Option::take) {
            self.scheduler.cancel(handle);
        }
    }

    // =========================================================================
    // Link plumbing
    // =========================================================================

    fn teardown(&mut self) {
        self.cancel_timer(Timer::Ping);
        self.cancel_timer(Timer::Connect);
        self.close_link();
    }

    fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            self.log_frame("disconnect", &link.to_string());
            self.auto_reconnect = false;
            self.transport.close(link);
        }
    }

    fn write(&mut self, frame: &str) -> Result<(), TransportError> {
        match self.link {
            Some(link) => self.transport.send(link, frame),
            None => Err(TransportError::NotOpen),
        }
    }

    /// Low-level resend of a tracked message; failures wait for the next sweep.
    fn resend(&mut self, frame: &str) {
        self.log_frame("resend", frame);
        if let Err(e) = self.write(frame) {
            tracing::trace!(error = %e, "Resend failed");
        }
    }

    fn log_frame(&self, what: &str, detail: &str) {
        let name = &self.settings.options.name;
        let sri = self.settings.sri();
        if self.debug {
            tracing::debug!(socket = %name, sri = %sri, "{} {}", what, detail);
        } else {
            tracing::trace!(socket = %name, sri = %sri, "{} {}", what, detail);
        }
    }

    fn sync_status(&self) {
        self.status.store(SocketStatus {
            state: self.state,
            average_lag: self.lag.average(),
            ping_interval: self.ping_interval(),
            version: self.version,
            connect_count: self.connect_count,
            idle: self.idle,
            pending_acks: self.acks.len(),
        });
    }
}
