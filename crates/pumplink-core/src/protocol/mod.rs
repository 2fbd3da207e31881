//! Serial Protocol Communication
//!
//! Implements the ASCII command/response protocol spoken by the pump
//! firmware: fixed-format commands out, `/`-terminated replies back, one
//! transaction in flight at a time over a half-duplex 9600-8-N-1 link.

pub mod command;
mod error;
pub mod frame;
pub mod parser;
pub mod serial;
mod transceiver;

pub use command::PumpCommand;
pub use error::ProtocolError;
pub use frame::{find_frame, Frame};
pub use parser::ResponseParser;
pub use serial::{list_ports, open_pump_port, PortInfo, SerialLink};
pub use transceiver::{Link, Transceiver};

/// Reply terminator byte (`/`)
pub const TERMINATOR: u8 = 0x2F;

/// Baud rate the pump firmware is fixed at
pub const BAUD_RATE: u32 = 9600;

/// Default per-command response timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1500;

/// Interval between receive-buffer polls while awaiting a reply
pub const POLL_INTERVAL_MS: u64 = 2;
