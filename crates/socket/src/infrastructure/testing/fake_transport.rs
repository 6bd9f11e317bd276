//! Recording transport for tests.
//!
//! Lets tests decide when a link opens and assert every frame the core
//! writes. Clones share the same log.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use url::Url;

use crate::ports::outbound::{LinkId, Transport, TransportError};

#[derive(Debug, Default)]
struct Log {
    opened: Vec<(LinkId, String)>,
    sent: Vec<(LinkId, String)>,
    closed: Vec<LinkId>,
    /// Links the test has marked open and the core has not closed
    live: HashSet<LinkId>,
    fail_opens: bool,
    fail_sends: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    log: Arc<Mutex<Log>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept writes on `link` from now on.
    pub fn mark_open(&self, link: LinkId) {
        self.lock().live.insert(link);
    }

    pub fn mark_closed(&self, link: LinkId) {
        self.lock().live.remove(&link);
    }

    pub fn fail_opens(&self, fail: bool) {
        self.lock().fail_opens = fail;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// Most recently opened link.
    pub fn last_link(&self) -> Option<LinkId> {
        self.lock().opened.last().map(|(link, _)| *link)
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.lock().opened.iter().map(|(_, url)| url.clone()).collect()
    }

    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.iter().map(|(_, frame)| frame.clone()).collect()
    }

    pub fn sent_on(&self, link: LinkId) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .filter(|(l, _)| *l == link)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    pub fn closed(&self) -> Vec<LinkId> {
        self.lock().closed.clone()
    }
}

impl Transport for FakeTransport {
    fn open(&mut self, link: LinkId, url: &Url) -> Result<(), TransportError> {
        let mut log = self.lock();
        log.opened.push((link, url.to_string()));
        if log.fail_opens {
            return Err(TransportError::connect("connection refused"));
        }
        Ok(())
    }

    fn send(&mut self, link: LinkId, frame: &str) -> Result<(), TransportError> {
        let mut log = self.lock();
        if log.fail_sends || !log.live.contains(&link) {
            return Err(TransportError::NotOpen);
        }
        log.sent.push((link, frame.to_string()));
        Ok(())
    }

    fn close(&mut self, link: LinkId) {
        let mut log = self.lock();
        log.live.remove(&link);
        log.closed.push(link);
    }
}
