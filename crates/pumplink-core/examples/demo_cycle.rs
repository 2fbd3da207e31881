//! Demo Pump Exercise Tool
//!
//! Runs a complete session against the simulated pump: connection test,
//! open, auto-detect, method download, a few polling ticks, then shutdown.
//! Useful for watching the command traffic (RUST_LOG=debug) without any
//! hardware attached.
//!
//! Usage:
//!   cargo run --example demo_cycle
//!   RUST_LOG=debug cargo run --example demo_cycle

use pumplink_core::config::DriverConfig;
use pumplink_core::demo::DemoPump;
use pumplink_core::driver::{signal_plan, PumpDriver};
use pumplink_core::host::{ErrorSeverity, ErrorSink, Host, MethodSource, MonitorSink, SignalSink};

struct ConsoleMonitor;

impl MonitorSink for ConsoleMonitor {
    fn set_current_flow(&self, ml_min: f64) {
        println!("monitor: current flow    = {ml_min:.2} ml/min");
    }

    fn set_current_pressure(&self, mpa: f64) {
        println!("monitor: current pressure = {mpa:.3} MPa");
    }

    fn set_running(&self, running: bool) {
        println!("monitor: running = {running}");
    }
}

struct ConsoleSignals;

impl SignalSink for ConsoleSignals {
    fn write_signal(&self, name: &str, value: f64) {
        println!("signal : {name} <- {value:.3}");
    }
}

struct ConsoleErrors;

impl ErrorSink for ConsoleErrors {
    fn report(&self, severity: ErrorSeverity, message: &str) {
        eprintln!("error  : {severity:?}: {message}");
    }
}

struct DemoMethod;

impl MethodSource for DemoMethod {
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

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = DriverConfig::default();
    for spec in signal_plan(&config) {
        println!("register signal {:?} ({:?})", spec.name, spec.meaning);
    }

    let driver = PumpDriver::new(
        DemoPump::new(),
        config,
        Host {
            monitor: Box::new(ConsoleMonitor),
            signals: Box::new(ConsoleSignals),
            errors: Box::new(ConsoleErrors),
            method: Box::new(DemoMethod),
        },
    );

    if let Err(e) = run_session(&driver) {
        eprintln!("session failed: {e}");
        std::process::exit(1);
    }
}

fn run_session(
    driver: &PumpDriver<DemoPump>,
) -> Result<(), pumplink_core::driver::DriverError> {
    driver.test_connect()?;
    println!("serial number: {}", driver.serial_number()?);

    driver.open()?;
    println!("detected head: {}", driver.auto_detect()?.label());

    driver.send_method()?;
    driver.start_acquisition()?;

    for tick in 0..3 {
        driver.poll()?;
        println!("tick {tick} ok, phase = {:?}", driver.phase());
        std::thread::sleep(std::time::Duration::from_millis(200));
    }

    driver.stop_acquisition()?;
    driver.shutdown()?;
    println!("session complete");
    Ok(())
}
