//! Device lifecycle and polling state machine
//!
//! [`PumpDriver`] sequences the ordered command chains behind each
//! host-triggered lifecycle event and runs the periodic three-step polling
//! cycle. Every chain is all-or-nothing: the first failing transaction
//! aborts the remaining steps and the failure is surfaced to the host.
//! There is no compensation for steps already applied; a half-finished
//! close leaves the device in whatever state it reached.
//!
//! The pump link is a single exclusive resource. One mutex guards the
//! transceiver and the lifecycle phase together, so a polling tick that
//! fires while a transition is mid-sequence waits for the whole chain to
//! finish rather than interleaving frames on the wire.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::host::{
    ErrorSeverity, FrameProtocol, Host, Lifecycle, Poller, SignalMeaning, SignalSpec, Validation,
};
use crate::protocol::{
    find_frame, Frame, Link, ProtocolError, PumpCommand, ResponseParser, Transceiver,
};
use crate::pump::{FaultFlags, PumpProfile, PumpStatus};
use crate::units::psi_to_mpa;

/// Auxiliary flow signal name when the pump is configured as auxiliary
pub const AUX_FLOW_SIGNAL: &str = "LCFlow";

/// Standard flow signal name
pub const FLOW_SIGNAL: &str = "LCCurrentFlow";

/// Standard pressure signal name
pub const PRESSURE_SIGNAL: &str = "LCCurrentPressure";

/// Settling delay after a method download completes
const METHOD_SETTLE: Duration = Duration::from_millis(500);

/// Errors surfaced by lifecycle transitions and polling
#[derive(Error, Debug)]
pub enum DriverError {
    /// A transaction timed out or its reply did not parse
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The device reported hardware this driver does not know
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The device raised fault bits during polling; fatal to the run
    #[error("device fault: {0}")]
    Fault(FaultFlags),
}

/// Where the device is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// No session with the instrument
    Closed,
    /// Instrument window open, pump idle
    Opened,
    /// Acquisition in progress
    Running,
    /// Acquisition finished or aborted
    Stopped,
}

/// The auxiliary signals the host should register for a pump with this
/// configuration.
pub fn signal_plan(config: &DriverConfig) -> Vec<SignalSpec> {
    if config.auxiliary {
        // Auxiliary flow is kept away from the fraction-collector path.
        vec![SignalSpec {
            name: AUX_FLOW_SIGNAL,
            label: "LC flow",
            meaning: SignalMeaning::AuxiliaryFlowRate,
        }]
    } else {
        vec![
            SignalSpec {
                name: FLOW_SIGNAL,
                label: "LC flow",
                meaning: SignalMeaning::FlowRate,
            },
            SignalSpec {
                name: PRESSURE_SIGNAL,
                label: "LC pressure",
                meaning: SignalMeaning::Pressure,
            },
        ]
    }
}

struct Inner<L> {
    tx: Transceiver<L>,
    phase: LifecyclePhase,
}

/// Protocol engine and lifecycle state machine for one pump.
pub struct PumpDriver<L: Link> {
    inner: Mutex<Inner<L>>,
    profile: Mutex<PumpProfile>,
    config: DriverConfig,
    host: Host,
}

impl<L: Link> PumpDriver<L> {
    /// Build a driver over `link` with host collaborators attached.
    pub fn new(link: L, config: DriverConfig, host: Host) -> Self {
        let tx = Transceiver::new(link, config.timeout()).with_terminator(config.terminator);
        Self {
            inner: Mutex::new(Inner {
                tx,
                phase: LifecyclePhase::Closed,
            }),
            profile: Mutex::new(config.pump_type),
            config,
            host,
        }
    }

    /// The configuration this driver was built with.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.lock().phase
    }

    /// Currently configured pump-head profile (auto-detect may update it).
    pub fn profile(&self) -> PumpProfile {
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<L>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send `command` and require the bare `OK/` acknowledgement.
    fn expect_ok(tx: &mut Transceiver<L>, command: &PumpCommand) -> Result<(), ProtocolError> {
        let reply = tx.transact(command)?;
        ResponseParser::new(&reply).expect_literal("OK/")
    }

    /// Query current flow and pressure and publish both as monitored
    /// values.
    pub fn open(&self) -> Result<(), DriverError> {
        let mut inner = self.lock();
        let reply = inner.tx.transact(&PumpCommand::CurrentConditions)?;
        let mut p = ResponseParser::new(&reply);
        p.expect_literal("OK,")?;
        let flow = p.parse_double()?;
        p.expect_literal(",")?;
        let pressure = p.parse_double()?;
        p.expect_byte(self.config.terminator)?;

        self.host.monitor.set_current_flow(flow);
        self.host.monitor.set_current_pressure(psi_to_mpa(pressure));
        inner.phase = LifecyclePhase::Opened;
        info!(flow, pressure, "instrument opened");
        Ok(())
    }

    /// Lock the keypad, program the method flow rate and start the pump.
    ///
    /// The running flag is raised before the chain starts, mirroring the
    /// host framework's expectations; a failed chain leaves it for the
    /// host's abort path to clear.
    pub fn start_acquisition(&self) -> Result<(), DriverError> {
        self.host.monitor.set_running(true);
        let mut inner = self.lock();
        Self::expect_ok(&mut inner.tx, &PumpCommand::DisableKeypad)?;
        let flow = self.host.method.flow_rate();
        Self::expect_ok(&mut inner.tx, &PumpCommand::SetFlow(flow))?;
        Self::expect_ok(&mut inner.tx, &PumpCommand::Run)?;
        inner.phase = LifecyclePhase::Running;
        info!(flow, "acquisition started");
        Ok(())
    }

    /// Download the loaded method: pressure limits, flow, then run, with a
    /// settling delay once everything is acknowledged.
    pub fn send_method(&self) -> Result<(), DriverError> {
        let upper = self.host.method.upper_pressure_psi();
        let lower = self.host.method.lower_pressure_psi();
        let flow = self.host.method.flow_rate();

        let mut inner = self.lock();
        Self::expect_ok(&mut inner.tx, &PumpCommand::SetUpperLimit(upper))?;
        Self::expect_ok(&mut inner.tx, &PumpCommand::SetLowerLimit(lower))?;
        Self::expect_ok(&mut inner.tx, &PumpCommand::SetFlow(flow))?;
        Self::expect_ok(&mut inner.tx, &PumpCommand::Run)?;
        drop(inner);

        // Let the pump reach the programmed conditions before the host
        // continues with dependent devices.
        std::thread::sleep(METHOD_SETTLE);
        info!(upper, lower, flow, "method sent");
        Ok(())
    }

    /// Reprogram the flow rate alone (gradient table / event hook).
    pub fn set_flow(&self, ml_min: f64) -> Result<(), DriverError> {
        let mut inner = self.lock();
        Self::expect_ok(&mut inner.tx, &PumpCommand::SetFlow(ml_min))?;
        debug!(ml_min, "flow updated");
        Ok(())
    }

    /// Host stopped the acquisition; the pump keeps running, only the
    /// local state changes.
    pub fn stop_acquisition(&self) -> Result<(), DriverError> {
        self.mark_stopped();
        Ok(())
    }

    /// Run aborted because of an error condition.
    ///
    /// Identical to a user abort at the protocol layer.
    pub fn abort_run_error(&self) -> Result<(), DriverError> {
        self.mark_stopped();
        Ok(())
    }

    /// Run aborted by the user.
    pub fn abort_run_user(&self) -> Result<(), DriverError> {
        self.mark_stopped();
        Ok(())
    }

    /// Hardware finished its method.
    pub fn stop_run(&self) -> Result<(), DriverError> {
        self.mark_stopped();
        Ok(())
    }

    fn mark_stopped(&self) {
        self.host.monitor.set_running(false);
        let mut inner = self.lock();
        if inner.phase == LifecyclePhase::Running {
            inner.phase = LifecyclePhase::Stopped;
        }
    }

    /// Shut the instrument down: zero the flow, flush, stop the pump.
    pub fn shutdown(&self) -> Result<(), DriverError> {
        self.host.monitor.set_running(false);
        let mut inner = self.lock();
        Self::wind_down(&mut inner.tx)?;
        inner.phase = LifecyclePhase::Stopped;
        info!("instrument shut down");
        Ok(())
    }

    /// Close the instrument session with the same wind-down chain as
    /// [`PumpDriver::shutdown`].
    pub fn close(&self) -> Result<(), DriverError> {
        let mut inner = self.lock();
        Self::wind_down(&mut inner.tx)?;
        inner.phase = LifecyclePhase::Closed;
        info!("instrument closed");
        Ok(())
    }

    /// Zero flow, clear, stop. A failure anywhere aborts the rest, so the
    /// device may be left with flow zeroed but the pump still on; the host
    /// sees the failure and must decide what to do with the hardware.
    fn wind_down(tx: &mut Transceiver<L>) -> Result<(), ProtocolError> {
        Self::expect_ok(tx, &PumpCommand::SetFlow(0.0))?;
        tx.send_only(&PumpCommand::Clear)?;
        Self::expect_ok(tx, &PumpCommand::Stop)
    }

    /// Read the firmware serial number (CFR21 traceability).
    ///
    /// Characters accumulate until the terminator or a space; the firmware
    /// pads short serials with trailing spaces.
    pub fn serial_number(&self) -> Result<String, DriverError> {
        let mut inner = self.lock();
        let reply = inner.tx.transact(&PumpCommand::Identify)?;
        let mut p = ResponseParser::new(&reply);
        p.expect_literal("OK,")?;
        let mut serial = String::new();
        while let Some(byte) = p.parse_byte()? {
            if byte == self.config.terminator || byte == b' ' {
                break;
            }
            serial.push(byte as char);
        }
        Ok(serial)
    }

    /// Cheap presence probe: anything that answers `ID` with `OK,` is
    /// talking our protocol.
    ///
    /// Stale input is dropped first so a reply left over from a previous
    /// session cannot fake a live pump.
    pub fn test_connect(&self) -> Result<(), DriverError> {
        let mut inner = self.lock();
        inner.tx.clear_pending().map_err(ProtocolError::Io)?;
        let reply = inner.tx.transact(&PumpCommand::Identify)?;
        ResponseParser::new(&reply).expect_literal("OK,")?;
        Ok(())
    }

    /// Ask the firmware which head is installed and update the configured
    /// profile.
    ///
    /// An unrecognized code is a configuration error: it is reported to the
    /// host and the previously configured profile stays in effect.
    pub fn auto_detect(&self) -> Result<PumpProfile, DriverError> {
        let mut inner = self.lock();
        let reply = inner.tx.transact(&PumpCommand::ReadHead)?;
        let mut p = ResponseParser::new(&reply);
        p.expect_literal("OK,")?;
        let code = p.parse_int()?;
        p.expect_byte(self.config.terminator)?;
        drop(inner);

        match PumpProfile::from_head_code(code) {
            Some(profile) => {
                *self.profile.lock().unwrap_or_else(PoisonError::into_inner) = profile;
                info!(code, profile = profile.label(), "pump head detected");
                Ok(profile)
            }
            None => {
                self.host
                    .errors
                    .report(ErrorSeverity::Communication, "Pump type is not recognized");
                Err(DriverError::Configuration(format!(
                    "pump head code {code} is not recognized"
                )))
            }
        }
    }

    /// One polling cycle: status, faults, pressure.
    ///
    /// Readings are published only after all three queries succeed; a
    /// fault or failure at any step abandons the tick and the next tick
    /// starts again from the status query.
    pub fn poll(&self) -> Result<(), DriverError> {
        let mut inner = self.lock();

        let reply = inner.tx.transact(&PumpCommand::Status)?;
        let mut p = ResponseParser::new(&reply);
        p.expect_literal("OK,")?;
        let flow = p.parse_double()?;
        p.expect_literal(",")?;
        let upper_limit = p.parse_double()?;
        p.expect_literal(",")?;
        let lower_limit = p.parse_double()?;
        p.expect_byte(self.config.terminator)?;
        let status = PumpStatus {
            flow,
            upper_limit,
            lower_limit,
        };
        inner.tx.send_only(&PumpCommand::Clear)?;

        let reply = inner.tx.transact(&PumpCommand::Faults)?;
        let mut p = ResponseParser::new(&reply);
        p.expect_literal("OK,")?;
        let stall = p.parse_int()?;
        p.expect_literal(",")?;
        let upper = p.parse_int()?;
        p.expect_literal(",")?;
        let lower = p.parse_int()?;
        p.expect_byte(self.config.terminator)?;
        inner.tx.send_only(&PumpCommand::Clear)?;

        let faults = FaultFlags::from_bits(stall, upper, lower);
        if faults.any() {
            warn!(%faults, "device fault during polling");
            self.host.errors.report(
                ErrorSeverity::Run,
                &format!("Pump fault during run: {faults}"),
            );
            return Err(DriverError::Fault(faults));
        }

        let reply = inner.tx.transact(&PumpCommand::ReadPressure)?;
        let mut p = ResponseParser::new(&reply);
        p.expect_literal("OK,")?;
        let pressure = p.parse_double()?;
        p.expect_byte(self.config.terminator)?;
        inner.tx.send_only(&PumpCommand::Clear)?;
        drop(inner);

        let pressure_mpa = psi_to_mpa(pressure);
        let flow_signal = if self.config.auxiliary {
            AUX_FLOW_SIGNAL
        } else {
            FLOW_SIGNAL
        };
        self.host.signals.write_signal(flow_signal, status.flow);
        self.host.monitor.set_current_flow(status.flow);
        if !self.config.auxiliary {
            self.host.signals.write_signal(PRESSURE_SIGNAL, pressure_mpa);
        }
        self.host.monitor.set_current_pressure(pressure_mpa);
        debug!(flow = status.flow, pressure_mpa, "poll cycle complete");
        Ok(())
    }

    /// Validate a device name from the configuration screen.
    pub fn verify_name(&self, name: &str) -> Validation {
        if name.chars().count() >= 32 {
            return Validation::fail("Name is too long");
        }
        Validation::Ok
    }

    /// Validate a method flow rate against the configured head profile.
    pub fn verify_flow(&self, ml_min: f64) -> Validation {
        let ceiling = self.profile().flow_ceiling_ml_min();
        if !(0.0..=ceiling).contains(&ml_min) {
            return Validation::fail(format!(
                "Max flow limit for this type ranges from 0 - {ceiling} ml/min"
            ));
        }
        Validation::Ok
    }

    /// Validate a pressure limit (psi) against the configured head profile.
    pub fn verify_pressure(&self, psi: f64) -> Validation {
        let ceiling = self.profile().pressure_ceiling_psi();
        if !(0.0..=ceiling).contains(&psi) {
            return Validation::fail(format!(
                "Max pressure limit for this type ranges from 0 - {ceiling} psi"
            ));
        }
        Validation::Ok
    }
}

impl<L: Link> FrameProtocol for PumpDriver<L> {
    fn find_frame(&self, received: &[u8]) -> Option<Frame> {
        find_frame(received, self.config.terminator)
    }

    fn is_answer(&self, _sent: &[u8], _frame: &[u8]) -> bool {
        // Half-duplex with one outstanding request: every frame answers
        // the command most recently sent.
        true
    }

    fn handle_unsolicited(&self, frame: &[u8]) {
        debug!(frame = %String::from_utf8_lossy(frame), "unsolicited frame ignored");
    }
}

impl<L: Link> Lifecycle for PumpDriver<L> {
    fn open(&self) -> Result<(), DriverError> {
        PumpDriver::open(self)
    }

    fn close(&self) -> Result<(), DriverError> {
        PumpDriver::close(self)
    }

    fn shutdown(&self) -> Result<(), DriverError> {
        PumpDriver::shutdown(self)
    }

    fn start_acquisition(&self) -> Result<(), DriverError> {
        PumpDriver::start_acquisition(self)
    }

    fn stop_acquisition(&self) -> Result<(), DriverError> {
        PumpDriver::stop_acquisition(self)
    }

    fn abort_run_error(&self) -> Result<(), DriverError> {
        PumpDriver::abort_run_error(self)
    }

    fn abort_run_user(&self) -> Result<(), DriverError> {
        PumpDriver::abort_run_user(self)
    }

    fn stop_run(&self) -> Result<(), DriverError> {
        PumpDriver::stop_run(self)
    }

    fn send_method(&self) -> Result<(), DriverError> {
        PumpDriver::send_method(self)
    }
}

impl<L: Link> Poller for PumpDriver<L> {
    fn poll(&self) -> Result<(), DriverError> {
        PumpDriver::poll(self)
    }

    fn period(&self) -> Duration {
        self.config.timer_period()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ErrorSink, MethodSource, MonitorSink, SignalSink};
    use std::io;

    struct SilentLink;

    impl Link for SilentLink {
        fn send(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn recv(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn clear_input(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct NullHost;

    impl MonitorSink for NullHost {
        fn set_current_flow(&self, _: f64) {}
        fn set_current_pressure(&self, _: f64) {}
        fn set_running(&self, _: bool) {}
    }

    impl SignalSink for NullHost {
        fn write_signal(&self, _: &str, _: f64) {}
    }

    impl ErrorSink for NullHost {
        fn report(&self, _: ErrorSeverity, _: &str) {}
    }

    impl MethodSource for NullHost {
        fn flow_rate(&self) -> f64 {
            5.0
        }
        fn upper_pressure_psi(&self) -> f64 {
            2000.0
        }
        fn lower_pressure_psi(&self) -> f64 {
            0.0
        }
    }

    fn driver_with_profile(profile: PumpProfile) -> PumpDriver<SilentLink> {
        let config = DriverConfig {
            pump_type: profile,
            timeout_ms: 10,
            ..DriverConfig::default()
        };
        PumpDriver::new(
            SilentLink,
            config,
            Host {
                monitor: Box::new(NullHost),
                signals: Box::new(NullHost),
                errors: Box::new(NullHost),
                method: Box::new(NullHost),
            },
        )
    }

    #[test]
    fn new_driver_starts_closed() {
        let driver = driver_with_profile(PumpProfile::Ss10);
        assert_eq!(driver.phase(), LifecyclePhase::Closed);
        assert_eq!(driver.profile(), PumpProfile::Ss10);
    }

    #[test]
    fn name_validation_limits_length() {
        let driver = driver_with_profile(PumpProfile::Ss10);
        assert!(driver.verify_name("My LC Pump").is_ok());
        assert!(driver.verify_name(&"x".repeat(31)).is_ok());
        assert_eq!(
            driver.verify_name(&"x".repeat(32)),
            Validation::FailWithMessage("Name is too long".into())
        );
    }

    #[test]
    fn flow_validation_uses_profile_ceiling() {
        let driver = driver_with_profile(PumpProfile::Ss10);
        assert!(driver.verify_flow(10.0).is_ok());
        assert_eq!(
            driver.verify_flow(10.5),
            Validation::FailWithMessage(
                "Max flow limit for this type ranges from 0 - 10 ml/min".into()
            )
        );
        assert!(!driver.verify_flow(-1.0).is_ok());

        let driver = driver_with_profile(PumpProfile::Peek40);
        assert!(driver.verify_flow(39.9).is_ok());
        assert!(!driver.verify_flow(40.1).is_ok());
    }

    #[test]
    fn pressure_validation_uses_profile_ceiling() {
        let driver = driver_with_profile(PumpProfile::Peek10);
        assert!(driver.verify_pressure(2000.0).is_ok());
        assert_eq!(
            driver.verify_pressure(2500.0),
            Validation::FailWithMessage(
                "Max pressure limit for this type ranges from 0 - 2000 psi".into()
            )
        );

        let driver = driver_with_profile(PumpProfile::Ss40);
        assert!(driver.verify_pressure(5999.0).is_ok());
    }

    #[test]
    fn signal_plan_depends_on_auxiliary_flag() {
        let standard = signal_plan(&DriverConfig::default());
        assert_eq!(standard.len(), 2);
        assert_eq!(standard[0].name, FLOW_SIGNAL);
        assert_eq!(standard[1].meaning, SignalMeaning::Pressure);

        let aux = signal_plan(&DriverConfig {
            auxiliary: true,
            ..DriverConfig::default()
        });
        assert_eq!(aux.len(), 1);
        assert_eq!(aux[0].name, AUX_FLOW_SIGNAL);
        assert_eq!(aux[0].meaning, SignalMeaning::AuxiliaryFlowRate);
    }
}
