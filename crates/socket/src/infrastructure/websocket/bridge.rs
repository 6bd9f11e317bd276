//! Socket bridge - runs a [`SocketCore`] on tokio.
//!
//! This module provides the `create_socket` function that sets up:
//! - A `SocketHandle` for sending messages and controlling the connection
//! - The shared `EventBus` the socket publishes to
//! - A `SocketObserver` for reading state, lag and version
//! - A background task that feeds transport events, fired timers and
//!   application commands into the core, one at a time

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use super::core::{NextConnectFn, SendOptions, SocketCore, SocketPorts};
use super::desktop::{TokioScheduler, TungsteniteTransport};
use super::handlers::SocketHandlers;
use crate::config::{ConfigError, SocketSettings};
use crate::infrastructure::messaging::{EventBus, SocketObserver};
use crate::infrastructure::platform::{DesktopRandomProvider, SystemClock};
use crate::ports::outbound::{StorageProvider, Timer, TimerHandle, TransportEvent};

/// Commands from the application to the socket task.
enum SocketCommand {
    Send {
        kind: String,
        data: Option<Value>,
        options: SendOptions,
    },
    Connect,
    Disconnect(Option<NextConnectFn>),
    Activity,
    Destroy,
}

/// Result of creating a socket.
///
/// Contains all the pieces needed to use the socket:
/// - `handle`: send messages and control the connection
/// - `bus`: subscribe to socket topics
/// - `observer`: observe connection state (for UI binding)
pub struct Socket {
    pub handle: SocketHandle,
    pub bus: EventBus,
    pub observer: SocketObserver,
}

/// Cloneable, fire-and-forget control handle.
///
/// When every clone is dropped the socket destroys itself.
#[derive(Clone)]
pub struct SocketHandle {
    commands: mpsc::UnboundedSender<SocketCommand>,
}

impl SocketHandle {
    fn submit(&self, command: SocketCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Socket task is gone, dropping command");
        }
    }

    pub fn send(&self, kind: impl Into<String>, data: Option<Value>) {
        self.send_with(kind, data, SendOptions::default());
    }

    pub fn send_with(&self, kind: impl Into<String>, data: Option<Value>, options: SendOptions) {
        self.submit(SocketCommand::Send {
            kind: kind.into(),
            data,
            options,
        });
    }

    pub fn connect(&self) {
        self.submit(SocketCommand::Connect);
    }

    pub fn disconnect(&self) {
        self.submit(SocketCommand::Disconnect(None));
    }

    /// Disconnect, and run `callback` first thing on the next open.
    pub fn disconnect_then(&self, callback: impl FnOnce() + Send + 'static) {
        self.submit(SocketCommand::Disconnect(Some(Box::new(callback))));
    }

    pub fn notify_activity(&self) {
        self.submit(SocketCommand::Activity);
    }

    /// Cancel every timer and close the link. A later [`connect`](Self::connect)
    /// starts over.
    pub fn destroy(&self) {
        self.submit(SocketCommand::Destroy);
    }
}

/// Build a socket and start connecting. Must be called inside a tokio runtime.
pub fn create_socket(
    settings: SocketSettings,
    handlers: SocketHandlers,
    bus: EventBus,
    storage: Arc<dyn StorageProvider>,
) -> Result<Socket, ConfigError> {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();

    let ports = SocketPorts {
        transport: Box::new(TungsteniteTransport::new(event_tx)),
        scheduler: Box::new(TokioScheduler::new(timer_tx)),
        clock: Arc::new(SystemClock::new()),
        random: Arc::new(DesktopRandomProvider),
        storage,
    };
    let core = SocketCore::new(settings, handlers, bus.clone(), ports)?;
    let observer = core.observer();

    tokio::spawn(run_socket(core, command_rx, event_rx, timer_rx));

    Ok(Socket {
        handle: SocketHandle {
            commands: command_tx,
        },
        bus,
        observer,
    })
}

async fn run_socket(
    mut core: SocketCore,
    mut commands: mpsc::UnboundedReceiver<SocketCommand>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    mut timers: mpsc::UnboundedReceiver<(TimerHandle, Timer)>,
) {
    core.connect();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SocketCommand::Send { kind, data, options }) => core.send(&kind, data, options),
                Some(SocketCommand::Connect) => core.connect(),
                Some(SocketCommand::Disconnect(callback)) => core.disconnect(callback),
                Some(SocketCommand::Activity) => core.notify_activity(),
                Some(SocketCommand::Destroy) => core.destroy(),
                None => {
                    core.destroy();
                    break;
                }
            },
            Some(event) = events.recv() => core.handle_transport_event(event),
            Some((handle, timer)) = timers.recv() => core.handle_timer(handle, timer),
        }
    }

    tracing::debug!(socket = %core.settings().options.name, "Socket task finished");
}
