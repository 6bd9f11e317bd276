//! Desktop WebSocket transport using tokio-tungstenite

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::ports::outbound::{
    LinkId, Transport, TransportError, TransportEvent, TransportEventKind,
};

/// One live connection attempt.
struct LiveLink {
    id: LinkId,
    outbound: mpsc::UnboundedSender<Message>,
    open: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl LiveLink {
    fn shutdown(self) {
        if self.open.load(Ordering::SeqCst) {
            // The writer flushes the close frame, then sees the channel end.
            let _ = self.outbound.send(Message::Close(None));
        } else {
            self.task.abort();
        }
    }
}

/// WebSocket transport for the socket core (Desktop).
///
/// Each link runs in its own task that reports back through `events`.
pub struct TungsteniteTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    live: Option<LiveLink>,
}

impl TungsteniteTransport {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { events, live: None }
    }
}

impl Transport for TungsteniteTransport {
    fn open(&mut self, link: LinkId, url: &Url) -> Result<(), TransportError> {
        if let Some(previous) = self.live.take() {
            previous.shutdown();
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_link(
            link,
            url.to_string(),
            outbound_rx,
            Arc::clone(&open),
            self.events.clone(),
        ));

        self.live = Some(LiveLink {
            id: link,
            outbound: outbound_tx,
            open,
            task,
        });
        Ok(())
    }

    fn send(&mut self, link: LinkId, frame: &str) -> Result<(), TransportError> {
        let live = self
            .live
            .as_ref()
            .filter(|live| live.id == link)
            .ok_or(TransportError::NotOpen)?;
        if !live.open.load(Ordering::SeqCst) {
            return Err(TransportError::NotOpen);
        }
        live.outbound
            .send(Message::Text(frame.to_string()))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self, link: LinkId) {
        if self.live.as_ref().map(|live| live.id) == Some(link) {
            if let Some(live) = self.live.take() {
                live.shutdown();
            }
        }
    }
}

impl Drop for TungsteniteTransport {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            live.task.abort();
        }
    }
}

async fn run_link(
    link: LinkId,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    open: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let emit = |kind: TransportEventKind| {
        let _ = events.send(TransportEvent::new(link, kind));
    };

    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            tracing::debug!(%link, url = %url, error = %e, "WebSocket connect failed");
            emit(TransportEventKind::Error(e.to_string()));
            emit(TransportEventKind::Closed);
            return;
        }
    };

    let (mut write, mut read) = stream.split();
    open.store(true, Ordering::SeqCst);
    emit(TransportEventKind::Opened);

    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => emit(TransportEventKind::Frame(text)),
                Some(Ok(Message::Binary(bytes))) if bytes.is_empty() => {
                    emit(TransportEventKind::Frame(String::new()));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    emit(TransportEventKind::Error(e.to_string()));
                    break;
                }
            },
            outgoing = outbound.recv() => match outgoing {
                Some(message) => {
                    let closing = matches!(message, Message::Close(_));
                    if let Err(e) = write.send(message).await {
                        emit(TransportEventKind::Error(e.to_string()));
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                None => {
                    let _ = write.close().await;
                    break;
                }
            },
        }
    }

    open.store(false, Ordering::SeqCst);
    emit(TransportEventKind::Closed);
}
