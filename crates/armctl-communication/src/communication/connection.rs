//! Connection Manager
//!
//! Owns the open link, runs the background receive loop and serialises the
//! write path. Decoded messages and lifecycle changes are pushed to a
//! [`LinkListener`].
//!
//! Exactly two threads touch a link: the caller's (send path, lifecycle) and
//! the receive loop (`armctl-rx`). The loop only delivers to the listener
//! while holding the session gate and after checking the stop flag;
//! `disconnect` raises the flag under the write side of that gate, so once
//! it returns no further messages from the old link can arrive.

use super::{ConnectionParams, LinkReader, LinkWriter, Transport};
use crate::protocol::{IncomingMessage, LineBuffer, StreamDecoder};
use armctl_core::{ConnectionError, ConnectionState};
use parking_lot::{Mutex, RwLock};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const RX_THREAD_NAME: &str = "armctl-rx";
const READ_CHUNK: usize = 256;
const STATUS_LINE: &str = "STATUS\n";

/// Receiver of everything that happens on a link
///
/// Callbacks run on the receive loop for messages, and on whichever thread
/// drove a lifecycle change for the others. Implementations must not call
/// back into the [`ConnectionManager`] lifecycle methods.
pub trait LinkListener: Send + Sync {
    /// A complete message was decoded
    fn on_message(&self, message: IncomingMessage);

    /// The connection state changed
    fn on_state_changed(&self, state: ConnectionState);

    /// The link failed on its own (read error, write error, end of stream)
    fn on_link_lost(&self, reason: &str);

    /// A line was accepted by the transport
    fn on_line_sent(&self, _line: &str) {}
}

/// One open link
struct Session {
    port: String,
    writer: Mutex<Option<LinkWriter>>,
    gate: RwLock<()>,
    stop: AtomicBool,
    closed: AtomicBool,
}

impl Session {
    fn new(port: String, writer: LinkWriter) -> Self {
        Self {
            port,
            writer: Mutex::new(Some(writer)),
            gate: RwLock::new(()),
            stop: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Run `f` unless the session has been stopped
    fn deliver(&self, f: impl FnOnce()) -> bool {
        let _gate = self.gate.read();
        if self.stopped() {
            return false;
        }
        f();
        true
    }

    /// Stop the session and drop the writer; true for the first caller only
    fn close(&self) -> bool {
        {
            let _gate = self.gate.write();
            self.stop.store(true, Ordering::Release);
        }
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.writer.lock().take();
        true
    }
}

/// State shared between the manager and its receive loop
struct Inner {
    state: RwLock<ConnectionState>,
    transitions: Mutex<()>,
    session: RwLock<Option<Arc<Session>>>,
    listener: Arc<dyn LinkListener>,
}

impl Inner {
    fn set_state(&self, new_state: ConnectionState) {
        self.transition(|_| Some(new_state));
    }

    /// Move to `Closing`, but only from `Connected`
    fn begin_closing(&self) {
        self.transition(|current| {
            (current == ConnectionState::Connected).then_some(ConnectionState::Closing)
        });
    }

    /// Apply a state change and notify, one change at a time so listeners
    /// see changes in the order they were made
    fn transition(&self, next: impl FnOnce(ConnectionState) -> Option<ConnectionState>) {
        let _transition = self.transitions.lock();
        let changed = {
            let mut state = self.state.write();
            match next(*state) {
                Some(new_state) if new_state != *state => {
                    *state = new_state;
                    Some(new_state)
                }
                _ => None,
            }
        };
        if let Some(new_state) = changed {
            tracing::debug!("Connection state -> {}", new_state);
            self.listener.on_state_changed(new_state);
        }
    }

    /// Write one line on `session`, tearing the link down on failure
    fn write_line(&self, session: &Arc<Session>, line: &str) -> Result<(), ConnectionError> {
        let result = {
            let mut writer = session.writer.lock();
            let writer = writer.as_mut().ok_or(ConnectionError::NotConnected)?;
            writer
                .write_all(line.as_bytes())
                .and_then(|_| writer.flush())
        };

        match result {
            Ok(()) => {
                let line = line.trim_end();
                tracing::debug!("TX {}", line);
                session.deliver(|| self.listener.on_line_sent(line));
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                self.fail(session, &format!("write failed: {}", reason));
                Err(ConnectionError::SendFailed { reason })
            }
        }
    }

    /// Fatal I/O on `session`: close it and report the loss
    fn fail(&self, session: &Arc<Session>, reason: &str) {
        {
            let mut slot = self.session.write();
            if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, session)) {
                *slot = None;
            }
        }
        if !session.close() {
            return;
        }

        tracing::error!("Link to {} lost: {}", session.port, reason);
        self.listener.on_link_lost(reason);
        self.set_state(ConnectionState::Disconnected);
    }
}

/// Owns the link to the arm controller
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    inner: Arc<Inner>,
    lifecycle: Mutex<()>,
    receive_task: Mutex<Option<(JoinHandle<()>, Duration)>>,
}

impl ConnectionManager {
    /// Create a manager that opens links through `transport`
    pub fn new(transport: Arc<dyn Transport>, listener: Arc<dyn LinkListener>) -> Self {
        Self {
            transport,
            inner: Arc::new(Inner {
                state: RwLock::new(ConnectionState::Disconnected),
                transitions: Mutex::new(()),
                session: RwLock::new(None),
                listener,
            }),
            lifecycle: Mutex::new(()),
            receive_task: Mutex::new(None),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Check whether a link is up
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Port of the active link
    pub fn port(&self) -> Option<String> {
        self.inner.session.read().as_ref().map(|s| s.port.clone())
    }

    /// Open a link and start the receive loop
    pub fn connect(&self, params: &ConnectionParams) -> Result<(), ConnectionError> {
        params.validate()?;
        let _lifecycle = self.lifecycle.lock();

        if let Some(session) = self.inner.session.read().as_ref() {
            return Err(ConnectionError::AlreadyConnected {
                port: session.port.clone(),
            });
        }
        self.reap_receive_task();

        self.inner.set_state(ConnectionState::Connecting);
        tracing::info!("Connecting to {} ({})", params.port, params.driver);

        let halves = match self.transport.open(params) {
            Ok(halves) => halves,
            Err(e) => {
                tracing::warn!("Connect to {} failed: {}", params.port, e);
                self.inner.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let session = Arc::new(Session::new(params.port.clone(), halves.writer));
        *self.inner.session.write() = Some(session.clone());
        self.inner.set_state(ConnectionState::Connected);

        let inner = self.inner.clone();
        let loop_session = session.clone();
        let poll = params.status_poll_interval;
        let spawned = std::thread::Builder::new()
            .name(RX_THREAD_NAME.to_string())
            .spawn(move || receive_loop(inner, loop_session, halves.reader, poll));

        match spawned {
            Ok(handle) => {
                *self.receive_task.lock() = Some((handle, params.read_timeout));
                tracing::info!("Connected to {}", params.port);
                Ok(())
            }
            Err(e) => {
                self.inner.fail(&session, "receive loop did not start");
                Err(ConnectionError::ConnectFailed {
                    port: params.port.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Stop the receive loop and close the link
    ///
    /// Calling this while disconnected is a no-op.
    pub fn disconnect(&self) {
        let _lifecycle = self.lifecycle.lock();

        let session = self.inner.session.write().take();
        let Some(session) = session else {
            self.reap_receive_task();
            return;
        };

        tracing::info!("Disconnecting from {}", session.port);
        self.inner.begin_closing();
        session.close();
        self.reap_receive_task();

        // A link loss racing this call may already have reported Disconnected
        self.inner.set_state(ConnectionState::Disconnected);
    }

    /// Write one line; a missing terminator is added
    ///
    /// Concurrent callers are serialised so lines never interleave.
    pub fn send_raw(&self, line: &str) -> Result<(), ConnectionError> {
        let session = self
            .inner
            .session
            .read()
            .clone()
            .ok_or(ConnectionError::NotConnected)?;

        if line.ends_with('\n') {
            self.inner.write_line(&session, line)
        } else {
            self.inner.write_line(&session, &format!("{}\n", line))
        }
    }

    /// Join the receive loop of a closed session, bounded by twice its read timeout
    fn reap_receive_task(&self) {
        let Some((handle, read_timeout)) = self.receive_task.lock().take() else {
            return;
        };

        let deadline = Instant::now() + read_timeout * 2 + Duration::from_millis(50);
        while !handle.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        if handle.is_finished() {
            if handle.join().is_err() {
                tracing::error!("Receive loop panicked");
            }
        } else {
            tracing::warn!("Receive loop did not exit within {:?}", read_timeout * 2);
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn is_idle(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

fn receive_loop(
    inner: Arc<Inner>,
    session: Arc<Session>,
    mut reader: LinkReader,
    status_poll: Option<Duration>,
) {
    let mut framer = LineBuffer::new();
    let mut decoder = StreamDecoder::new();
    let mut buf = [0u8; READ_CHUNK];
    let mut last_poll = Instant::now();

    tracing::debug!("Receive loop started for {}", session.port);

    while !session.stopped() {
        let mut messages = Vec::new();

        match reader.read(&mut buf) {
            Ok(0) => {
                inner.fail(&session, "device closed the link");
                break;
            }
            Ok(n) => {
                for line in framer.push(&buf[..n]) {
                    tracing::debug!("RX {}", line);
                    messages.extend(decoder.push_line(&line));
                }
            }
            Err(e) if is_idle(&e) => messages.extend(decoder.flush()),
            Err(e) => {
                inner.fail(&session, &format!("read failed: {}", e));
                break;
            }
        }

        for message in messages {
            if !session.deliver(|| inner.listener.on_message(message)) {
                break;
            }
        }

        if let Some(interval) = status_poll {
            if last_poll.elapsed() >= interval {
                last_poll = Instant::now();
                if inner.write_line(&session, STATUS_LINE).is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Receive loop for {} exited", session.port);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::LoopbackTransport;

    #[derive(Default)]
    struct CountingListener {
        states: Mutex<Vec<ConnectionState>>,
    }

    impl LinkListener for CountingListener {
        fn on_message(&self, _message: IncomingMessage) {}
        fn on_state_changed(&self, state: ConnectionState) {
            self.states.lock().push(state);
        }
        fn on_link_lost(&self, _reason: &str) {}
    }

    #[test]
    fn test_lifecycle_states() {
        let (transport, _device) = LoopbackTransport::pair();
        let listener = Arc::new(CountingListener::default());
        let manager = ConnectionManager::new(Arc::new(transport), listener.clone());
        let params = ConnectionParams::serial("loop").with_read_timeout(Duration::from_millis(10));

        manager.connect(&params).unwrap();
        manager.disconnect();
        manager.disconnect();

        assert_eq!(
            *listener.states.lock(),
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Closing,
                ConnectionState::Disconnected,
            ]
        );
    }

    #[test]
    fn test_hang_up_racing_disconnect_ends_disconnected() {
        let (transport, device) = LoopbackTransport::pair();
        let listener = Arc::new(CountingListener::default());
        let manager = ConnectionManager::new(Arc::new(transport), listener.clone());
        let params = ConnectionParams::serial("loop").with_read_timeout(Duration::from_millis(5));

        for _ in 0..200 {
            listener.states.lock().clear();
            manager.connect(&params).unwrap();

            std::thread::scope(|scope| {
                scope.spawn(|| device.hang_up());
                manager.disconnect();
            });

            assert_eq!(manager.state(), ConnectionState::Disconnected);
            let states = listener.states.lock().clone();
            assert_eq!(states.last(), Some(&ConnectionState::Disconnected));
            let disconnects = states.iter().filter(|s| **s == ConnectionState::Disconnected);
            assert_eq!(disconnects.count(), 1, "{:?}", states);
        }
    }
}
