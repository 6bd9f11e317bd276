//! Duplex text channel to the server.
//!
//! Each connection attempt is a *link* with its own [`LinkId`]. The transport
//! reports everything that happens on a link as a [`TransportEvent`]; the core
//! drops events for links it has already let go of, so closing a link never
//! needs to wait for its callbacks to drain.

use thiserror::Error;
use url::Url;

/// Identifies one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub u64);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// Handshake completed, sends will now succeed
    Opened,
    /// A text frame (or an empty binary frame, reported as empty text)
    Frame(String),
    Error(String),
    /// The link is gone. Always the last event of a link.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub link: LinkId,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn new(link: LinkId, kind: TransportEventKind) -> Self {
        Self { link, kind }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Write attempted before the handshake completed or after the link died
    #[error("Transport not open")]
    NotOpen,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::Connect(msg.into())
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Start connecting. Progress is reported through events tagged `link`.
    fn open(&mut self, link: LinkId, url: &Url) -> Result<(), TransportError>;

    /// Write one text frame on an open link.
    fn send(&mut self, link: LinkId, frame: &str) -> Result<(), TransportError>;

    /// Close a link. No-op for links that are not live.
    fn close(&mut self, link: LinkId);
}
