//! Drives a [`SocketCore`] on virtual time with a recording transport.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::config::SocketSettings;
use crate::infrastructure::messaging::{topics, EventBus};
use crate::infrastructure::platform::MemoryStorage;
use crate::infrastructure::websocket::{SocketCore, SocketHandlers, SocketPorts};
use crate::ports::outbound::{LinkId, TransportEvent, TransportEventKind};

use super::{FakeTransport, FixedRandom, VirtualTime};

type Published = Arc<Mutex<Vec<(String, Value)>>>;

pub struct Harness {
    pub core: SocketCore,
    pub time: VirtualTime,
    pub transport: FakeTransport,
    pub storage: MemoryStorage,
    pub bus: EventBus,
    published: Published,
}

impl Harness {
    pub fn new(settings: SocketSettings) -> Self {
        Self::with_handlers(settings, SocketHandlers::new())
    }

    pub fn with_handlers(settings: SocketSettings, handlers: SocketHandlers) -> Self {
        Self::build(settings, handlers, MemoryStorage::new(), FixedRandom::constant(0.5))
    }

    /// Panics if `settings` are invalid.
    pub fn build(
        settings: SocketSettings,
        handlers: SocketHandlers,
        storage: MemoryStorage,
        random: FixedRandom,
    ) -> Self {
        let time = VirtualTime::new();
        let transport = FakeTransport::new();
        let bus = EventBus::new();
        let published: Published = Arc::default();

        let ports = SocketPorts {
            transport: Box::new(transport.clone()),
            scheduler: Box::new(time.scheduler()),
            clock: Arc::new(time.clock()),
            random: Arc::new(random),
            storage: Arc::new(storage.clone()),
        };
        let core = SocketCore::new(settings, handlers, bus.clone(), ports)
            .expect("valid socket settings");

        let harness = Self {
            core,
            time,
            transport,
            storage,
            bus,
            published,
        };
        for topic in [
            topics::OPEN,
            topics::OFFLINE,
            topics::LAG,
            topics::REDIRECT,
            topics::RESYNC,
        ] {
            harness.watch(topic);
        }
        harness
    }

    /// Record everything published on `topic`.
    pub fn watch(&self, topic: &str) {
        let published = Arc::clone(&self.published);
        let name = topic.to_string();
        self.bus.subscribe(topic, move |payload| {
            published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((name.clone(), payload.clone()));
        });
    }

    pub fn published(&self, topic: &str) -> Vec<Value> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Link of the latest connection attempt. Panics before the first one.
    pub fn link(&self) -> LinkId {
        self.transport.last_link().expect("no connection attempt yet")
    }

    pub fn connect(&mut self) {
        self.core.connect();
    }

    /// Complete the handshake of the latest link.
    pub fn open(&mut self) {
        let link = self.link();
        self.transport.mark_open(link);
        self.deliver(link, TransportEventKind::Opened);
    }

    pub fn connect_and_open(&mut self) {
        self.connect();
        self.open();
    }

    pub fn receive(&mut self, text: &str) {
        let link = self.link();
        self.deliver(link, TransportEventKind::Frame(text.to_string()));
    }

    pub fn error(&mut self, message: &str) {
        let link = self.link();
        self.deliver(link, TransportEventKind::Error(message.to_string()));
    }

    /// The server side drops the latest link.
    pub fn close(&mut self) {
        let link = self.link();
        self.transport.mark_closed(link);
        self.deliver(link, TransportEventKind::Closed);
    }

    pub fn deliver(&mut self, link: LinkId, kind: TransportEventKind) {
        self.core.handle_transport_event(TransportEvent::new(link, kind));
    }

    /// Let `millis` of virtual time pass, firing due timers in order.
    pub fn advance(&mut self, millis: u64) {
        let until = self.time.now() + millis;
        while let Some((handle, timer)) = self.time.pop_due(until) {
            self.core.handle_timer(handle, timer);
        }
        self.time.set_now(until);
    }

    pub fn sent(&self) -> Vec<String> {
        self.transport.sent()
    }

    /// Sent frames other than plain pings, parsed.
    pub fn sent_messages(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .filter(|frame| frame.as_str() != draughts_socket_wire::PING_FRAME)
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.transport.opened_urls()
    }
}
