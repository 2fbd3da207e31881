//! # PumpLink Core Library
//!
//! Core functionality for PumpLink LC pump control.

#![warn(missing_docs)]

//!
//! This library provides:
//! - The ASCII command/response protocol engine for the pump firmware
//!   (framing, command encoding, reply parsing, per-command timeouts)
//! - The device lifecycle state machine (open, start, stop, close,
//!   method download, auto-detect)
//! - Periodic status/fault/pressure polling with fault escalation
//! - A demo pump for running without hardware
//!
//! The chromatography host supplies configuration, method and monitor
//! storage through the capability traits in [`host`]; the physical serial
//! port sits behind [`protocol::Link`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use pumplink_core::prelude::*;
//!
//! let link = open_pump_port("/dev/ttyUSB0")?;
//! let driver = PumpDriver::new(link, DriverConfig::default(), host);
//!
//! driver.test_connect()?;
//! driver.open()?;
//! driver.start_acquisition()?;
//! ```

pub mod config;
pub mod demo;
pub mod driver;
pub mod host;
pub mod protocol;
pub mod pump;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::DriverConfig;
    pub use crate::demo::DemoPump;
    pub use crate::driver::{signal_plan, DriverError, LifecyclePhase, PumpDriver};
    pub use crate::host::{
        ErrorSeverity, ErrorSink, FrameProtocol, Host, Lifecycle, MethodSource, MonitorSink,
        Poller, SignalSink, Validation,
    };
    pub use crate::protocol::{
        open_pump_port, Link, ProtocolError, PumpCommand, ResponseParser, SerialLink, Transceiver,
    };
    pub use crate::pump::{FaultFlags, PumpProfile, PumpStatus};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
