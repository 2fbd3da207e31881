//! Command/response transactions
//!
//! [`Transceiver`] owns the receive side of the link and runs one
//! transaction at a time: encode the command, write it, then poll the link
//! until a complete frame arrives or the timeout elapses. The engine never
//! retries a failed transaction on its own.

use std::io;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{find_frame, PumpCommand, ProtocolError, POLL_INTERVAL_MS, TERMINATOR};

/// Byte-level transport the protocol engine drives.
///
/// Implemented by the `serialport`-backed [`super::SerialLink`] for real
/// hardware and by [`crate::demo::DemoPump`] for demo mode. Reads are
/// drain-style: return whatever the device has produced so far, `0` when
/// nothing is pending yet.
pub trait Link: Send {
    /// Write the whole command to the device.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Move pending reply bytes into `buf`, returning how many were read.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard anything the device has sent that was not consumed yet.
    fn clear_input(&mut self) -> io::Result<()>;
}

/// One half-duplex command/response channel.
///
/// Reply bytes past the first terminator are kept in the receive buffer
/// for the next transaction, so a late answer to a timed-out command does
/// not corrupt the following exchange's framing.
pub struct Transceiver<L> {
    link: L,
    rx: Vec<u8>,
    timeout: Duration,
    poll_interval: Duration,
    terminator: u8,
}

impl<L: Link> Transceiver<L> {
    /// Wrap `link` with the given per-command timeout.
    pub fn new(link: L, timeout: Duration) -> Self {
        Self {
            link,
            rx: Vec::new(),
            timeout,
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            terminator: TERMINATOR,
        }
    }

    /// Override the reply terminator byte.
    pub fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = terminator;
        self
    }

    /// Access the underlying link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Drop every byte received so far, both buffered here and pending in
    /// the link.
    pub fn clear_pending(&mut self) -> io::Result<()> {
        self.rx.clear();
        self.link.clear_input()
    }

    /// Run one full transaction and return the reply frame, terminator
    /// included.
    pub fn transact(&mut self, command: &PumpCommand) -> Result<Vec<u8>, ProtocolError> {
        let bytes = command.encode();
        debug!(command = %String::from_utf8_lossy(&bytes), "sending");
        self.link
            .send(&bytes)
            .map_err(|e| ProtocolError::Link(e.to_string()))?;

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(frame) = self.scan() {
                let reply: Vec<u8> = self.rx.drain(..=frame.end).collect();
                debug!(reply = %String::from_utf8_lossy(&reply), "frame received");
                return Ok(reply);
            }
            if Instant::now() >= deadline {
                warn!(
                    command = %String::from_utf8_lossy(&bytes),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "no reply"
                );
                return Err(ProtocolError::Timeout(self.timeout.as_millis() as u64));
            }
            self.pump_rx()?;
        }
    }

    /// Write a fire-and-forget command; no frame is awaited.
    pub fn send_only(&mut self, command: &PumpCommand) -> Result<(), ProtocolError> {
        let bytes = command.encode();
        debug!(command = %String::from_utf8_lossy(&bytes), "sending, not awaiting reply");
        self.link
            .send(&bytes)
            .map_err(|e| ProtocolError::Link(e.to_string()))
    }

    fn scan(&self) -> Option<super::Frame> {
        find_frame(&self.rx, self.terminator)
    }

    fn pump_rx(&mut self) -> Result<(), ProtocolError> {
        let mut buf = [0u8; 256];
        match self.link.recv(&mut buf) {
            Ok(0) => std::thread::sleep(self.poll_interval),
            Ok(n) => self.rx.extend_from_slice(&buf[..n]),
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                std::thread::sleep(self.poll_interval)
            }
            Err(e) => return Err(ProtocolError::Link(e.to_string())),
        }
        Ok(())
    }
}
