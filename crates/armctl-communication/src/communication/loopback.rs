//! In-memory transport
//!
//! [`LoopbackTransport`] opens links whose far end is a [`LoopbackDevice`]:
//! the device side injects response bytes and inspects every line the engine
//! wrote, with a timestamp per write.

use super::{ConnectionParams, LinkHalves, Transport};
use armctl_core::ConnectionError;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct LoopbackState {
    inbound: VecDeque<u8>,
    written: Vec<(Instant, String)>,
    partial_write: Vec<u8>,
    hung_up: bool,
    refuse_open: bool,
    fail_writes: bool,
    opens: usize,
}

#[derive(Default)]
struct Shared {
    state: Mutex<LoopbackState>,
    data_ready: Condvar,
}

/// Transport whose links end in a [`LoopbackDevice`]
#[derive(Clone)]
pub struct LoopbackTransport {
    shared: Arc<Shared>,
}

/// Device end of a loopback link
#[derive(Clone)]
pub struct LoopbackDevice {
    shared: Arc<Shared>,
}

impl LoopbackTransport {
    /// Create a transport and the device end it connects to
    pub fn pair() -> (Self, LoopbackDevice) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                shared: shared.clone(),
            },
            LoopbackDevice { shared },
        )
    }
}

impl Transport for LoopbackTransport {
    fn open(&self, params: &ConnectionParams) -> Result<LinkHalves, ConnectionError> {
        let mut state = self.shared.state.lock();
        if state.refuse_open {
            return Err(ConnectionError::ConnectFailed {
                port: params.port.clone(),
                reason: "loopback refused".to_string(),
            });
        }
        state.hung_up = false;
        state.opens += 1;
        drop(state);

        Ok(LinkHalves {
            reader: Box::new(LoopbackReader {
                shared: self.shared.clone(),
                timeout: params.read_timeout,
            }),
            writer: Box::new(LoopbackWriter {
                shared: self.shared.clone(),
            }),
        })
    }
}

impl LoopbackDevice {
    /// Queue bytes for the engine to receive
    pub fn feed(&self, data: &str) {
        self.shared.state.lock().inbound.extend(data.as_bytes());
        self.shared.data_ready.notify_all();
    }

    /// Queue one newline-terminated line
    pub fn feed_line(&self, line: &str) {
        self.feed(&format!("{}\n", line));
    }

    /// Close the device end; the next read reports end-of-stream
    pub fn hang_up(&self) {
        self.shared.state.lock().hung_up = true;
        self.shared.data_ready.notify_all();
    }

    /// Make subsequent opens fail
    pub fn refuse_open(&self, refuse: bool) {
        self.shared.state.lock().refuse_open = refuse;
    }

    /// Make subsequent writes fail
    pub fn fail_writes(&self, fail: bool) {
        self.shared.state.lock().fail_writes = fail;
    }

    /// Number of times a link was opened
    pub fn open_count(&self) -> usize {
        self.shared.state.lock().opens
    }

    /// Every complete line written by the engine, without terminators
    pub fn written_lines(&self) -> Vec<String> {
        self.shared
            .state
            .lock()
            .written
            .iter()
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Written lines with the instant each was completed
    pub fn written_with_times(&self) -> Vec<(Instant, String)> {
        self.shared.state.lock().written.clone()
    }

    /// Forget all written lines
    pub fn clear_written(&self) {
        self.shared.state.lock().written.clear();
    }

    /// Wait until at least `count` lines have been written
    pub fn wait_for_lines(&self, count: usize, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.written.len() < count {
            if self
                .shared
                .data_ready
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                break;
            }
        }
        state.written.iter().map(|(_, line)| line.clone()).collect()
    }
}

struct LoopbackReader {
    shared: Arc<Shared>,
    timeout: Duration,
}

impl Read for LoopbackReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let deadline = Instant::now() + self.timeout;
        let mut state = self.shared.state.lock();

        loop {
            if !state.inbound.is_empty() {
                let n = buf.len().min(state.inbound.len());
                for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
            if state.hung_up {
                return Ok(0);
            }
            if self
                .shared
                .data_ready
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
            }
        }
    }
}

struct LoopbackWriter {
    shared: Arc<Shared>,
}

impl Write for LoopbackWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.shared.state.lock();
        if state.fail_writes || state.hung_up {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"));
        }

        for &byte in data {
            if byte == b'\n' {
                let line = String::from_utf8_lossy(&state.partial_write).into_owned();
                state.partial_write.clear();
                state.written.push((Instant::now(), line));
            } else {
                state.partial_write.push(byte);
            }
        }
        drop(state);

        self.shared.data_ready.notify_all();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
