//! Host collaborator seams
//!
//! The chromatography host owns naming, configuration storage, method
//! storage, monitor views and error display. The driver never subclasses
//! host types; instead the host hands it these capability traits at
//! construction and invokes the driver's own capability surface
//! ([`FrameProtocol`], [`Lifecycle`], [`Poller`]) from a thin adapter.

use std::time::Duration;

use crate::driver::DriverError;
use crate::protocol::Frame;

/// Severity/category attached to reported errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Communication-level problem (configuration mismatch, bad reply)
    Communication,
    /// Condition fatal to the current run (device fault during polling)
    Run,
}

/// Monitor-value store: current readings and the running flag.
pub trait MonitorSink: Send + Sync {
    /// Publish the measured flow rate in ml/min.
    fn set_current_flow(&self, ml_min: f64);

    /// Publish the measured pressure in MPa.
    fn set_current_pressure(&self, mpa: f64);

    /// Raise or clear the acquisition-running flag.
    fn set_running(&self, running: bool);
}

/// Auxiliary-signal publisher.
pub trait SignalSink: Send + Sync {
    /// Append one sample to the named signal trace.
    fn write_signal(&self, name: &str, value: f64);
}

/// Error-reporting sink.
pub trait ErrorSink: Send + Sync {
    /// Surface a driver-detected problem to the user.
    fn report(&self, severity: ErrorSeverity, message: &str);
}

/// Method-parameter store: the values of the currently loaded method.
pub trait MethodSource: Send + Sync {
    /// Programmed flow rate in ml/min.
    fn flow_rate(&self) -> f64;

    /// Upper pressure limit in psi.
    fn upper_pressure_psi(&self) -> f64;

    /// Lower pressure limit in psi.
    fn lower_pressure_psi(&self) -> f64;
}

/// The full set of host collaborators the driver needs.
pub struct Host {
    /// Monitor-value store
    pub monitor: Box<dyn MonitorSink>,
    /// Auxiliary-signal publisher
    pub signals: Box<dyn SignalSink>,
    /// Error display sink
    pub errors: Box<dyn ErrorSink>,
    /// Loaded-method parameters
    pub method: Box<dyn MethodSource>,
}

/// What a published auxiliary signal means to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMeaning {
    /// Standard flow-rate trace
    FlowRate,
    /// Flow of an auxiliary pump, kept out of flow-rate consumers
    AuxiliaryFlowRate,
    /// Pressure trace
    Pressure,
}

/// One auxiliary signal the host should register for this device.
#[derive(Debug, Clone)]
pub struct SignalSpec {
    /// Signal identifier used with [`SignalSink::write_signal`]
    pub name: &'static str,
    /// Display label
    pub label: &'static str,
    /// Semantic meaning for host-side routing
    pub meaning: SignalMeaning,
}

/// Result of a validation hook.
///
/// Validation differs from hard errors: a rejected value needs a message
/// the user can act on, while an accepted one needs nothing at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Value accepted
    Ok,
    /// Value rejected without explanation
    Fail,
    /// Value rejected; message is shown to the user
    FailWithMessage(String),
}

impl Validation {
    /// True when the value was accepted.
    pub fn is_ok(&self) -> bool {
        matches!(self, Validation::Ok)
    }

    /// Reject with a user-visible message.
    pub fn fail(message: impl Into<String>) -> Self {
        Validation::FailWithMessage(message.into())
    }
}

/// Frame-boundary and answer-correlation capability the host's receive
/// loop drives.
pub trait FrameProtocol {
    /// Locate one complete frame in the receive buffer, if any.
    fn find_frame(&self, received: &[u8]) -> Option<Frame>;

    /// Whether `frame` answers the most recent `sent` bytes.
    fn is_answer(&self, sent: &[u8], frame: &[u8]) -> bool;

    /// Handle a frame that is not an answer to anything.
    fn handle_unsolicited(&self, frame: &[u8]);
}

/// Named lifecycle transitions the host triggers.
pub trait Lifecycle {
    /// Instrument window opened.
    fn open(&self) -> Result<(), DriverError>;

    /// Instrument window closed.
    fn close(&self) -> Result<(), DriverError>;

    /// Instrument shutdown requested.
    fn shutdown(&self) -> Result<(), DriverError>;

    /// Acquisition started.
    fn start_acquisition(&self) -> Result<(), DriverError>;

    /// Acquisition stopped by the host.
    fn stop_acquisition(&self) -> Result<(), DriverError>;

    /// Run aborted because of an error.
    fn abort_run_error(&self) -> Result<(), DriverError>;

    /// Run aborted by the user.
    fn abort_run_user(&self) -> Result<(), DriverError>;

    /// Hardware finished its method.
    fn stop_run(&self) -> Result<(), DriverError>;

    /// Download the loaded method to the hardware.
    fn send_method(&self) -> Result<(), DriverError>;
}

/// Periodic status polling capability.
pub trait Poller {
    /// Run one status/fault/pressure polling cycle.
    fn poll(&self) -> Result<(), DriverError>;

    /// How often the host timer should call [`Poller::poll`].
    fn period(&self) -> Duration;
}
