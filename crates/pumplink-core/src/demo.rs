//! Demo Mode - Simulated pump for testing without hardware
//!
//! [`DemoPump`] implements [`Link`] and behaves like the firmware on the
//! other end of the serial line: it keeps the programmed registers (flow
//! setpoint, pressure limits, running state, installed head) and answers
//! each command the way the real pump would. Pressure readings carry a
//! little random jitter so monitor traces look alive.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::io;

use crate::protocol::Link;
use crate::pump::FaultFlags;

/// Simulated pump speaking the wire protocol
pub struct DemoPump {
    rng: StdRng,
    pending: VecDeque<u8>,
    serial: String,
    head_code: i64,
    flow_setpoint: f64,
    upper_limit: f64,
    lower_limit: f64,
    running: bool,
    keypad_locked: bool,
    faults: FaultFlags,
}

impl Default for DemoPump {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoPump {
    /// Create a demo pump with a randomly installed head.
    pub fn new() -> Self {
        let mut rng = StdRng::from_entropy();
        let head_code = rng.gen_range(1..=4);
        Self::build(rng, head_code)
    }

    /// Create a demo pump with a specific head code (tests exercise the
    /// auto-detect mapping this way).
    pub fn with_head_code(head_code: i64) -> Self {
        Self::build(StdRng::from_entropy(), head_code)
    }

    fn build(rng: StdRng, head_code: i64) -> Self {
        Self {
            rng,
            pending: VecDeque::new(),
            serial: "74012".to_string(),
            head_code,
            flow_setpoint: 0.0,
            upper_limit: 6000.0,
            lower_limit: 0.0,
            running: false,
            keypad_locked: false,
            faults: FaultFlags::default(),
        }
    }

    /// Raise fault bits that the next `RF` poll will report.
    pub fn inject_fault(&mut self, faults: FaultFlags) {
        self.faults = faults;
    }

    /// Whether the simulated motor is turning.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The most recently programmed flow in ml/min.
    pub fn flow_setpoint(&self) -> f64 {
        self.flow_setpoint
    }

    /// Whether the front panel is locked out.
    pub fn keypad_locked(&self) -> bool {
        self.keypad_locked
    }

    fn pressure_psi(&mut self) -> f64 {
        if self.running {
            // Backpressure roughly proportional to flow, with jitter.
            (self.flow_setpoint * 40.0 + self.rng.gen_range(-3.0..3.0)).max(0.0)
        } else {
            self.rng.gen_range(0.0..5.0)
        }
    }

    fn reply(&mut self, text: String) {
        self.pending.extend(text.bytes());
    }

    fn current_flow(&self) -> f64 {
        if self.running {
            self.flow_setpoint
        } else {
            0.0
        }
    }

    fn handle(&mut self, command: &[u8]) {
        let command = match std::str::from_utf8(command) {
            Ok(text) => text,
            // The driver only emits ASCII; garbage gets silence.
            Err(_) => return,
        };
        match command {
            "ID" => {
                let serial = self.serial.clone();
                self.reply(format!("OK,{serial}/"));
            }
            "CC" => {
                let flow = self.current_flow();
                let pressure = self.pressure_psi();
                self.reply(format!("OK,{flow:.1},{pressure:.0}/"));
            }
            "KD" => {
                self.keypad_locked = true;
                self.reply("OK/".to_string());
            }
            "RU" => {
                self.running = true;
                self.reply("OK/".to_string());
            }
            "ST" => {
                self.running = false;
                self.reply("OK/".to_string());
            }
            "CS" => {
                let flow = self.current_flow();
                let (upper, lower) = (self.upper_limit, self.lower_limit);
                self.reply(format!("OK,{flow:.1},{upper:.0},{lower:.0}/"));
            }
            "RF" => {
                let bits = [
                    self.faults.motor_stall,
                    self.faults.upper_pressure,
                    self.faults.lower_pressure,
                ]
                .map(|b| if b { "1" } else { "0" });
                self.reply(format!("OK,{},{},{}/", bits[0], bits[1], bits[2]));
            }
            "PR" => {
                let pressure = self.pressure_psi();
                self.reply(format!("OK,{pressure:.0}/"));
            }
            "RH" => {
                let code = self.head_code;
                self.reply(format!("OK,{code}/"));
            }
            "#" => {
                // Clear resets command state; nothing is answered.
            }
            _ => {
                if let Some(value) = command.strip_prefix("FO").and_then(parse_field) {
                    self.flow_setpoint = value;
                    self.reply("OK/".to_string());
                } else if let Some(value) = command.strip_prefix("UP").and_then(parse_field) {
                    self.upper_limit = value;
                    self.reply("OK/".to_string());
                } else if let Some(value) = command.strip_prefix("LP").and_then(parse_field) {
                    self.lower_limit = value;
                    self.reply("OK/".to_string());
                }
                // Anything else stays silent, like real firmware; the
                // caller's timeout handles it.
            }
        }
    }
}

fn parse_field(text: &str) -> Option<f64> {
    text.parse().ok()
}

impl Link for DemoPump {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.handle(bytes);
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.pending.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(pump: &mut DemoPump) -> Vec<u8> {
        let mut buf = [0u8; 64];
        let n = pump.recv(&mut buf).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn identify_returns_serial() {
        let mut pump = DemoPump::with_head_code(1);
        pump.send(b"ID").unwrap();
        assert_eq!(drain(&mut pump), b"OK,74012/");
    }

    #[test]
    fn flow_command_programs_the_setpoint() {
        let mut pump = DemoPump::with_head_code(1);
        pump.send(b"FO0005").unwrap();
        assert_eq!(drain(&mut pump), b"OK/");
        assert_eq!(pump.flow_setpoint(), 5.0);
    }

    #[test]
    fn run_and_stop_toggle_the_motor() {
        let mut pump = DemoPump::with_head_code(2);
        pump.send(b"RU").unwrap();
        drain(&mut pump);
        assert!(pump.is_running());
        pump.send(b"ST").unwrap();
        drain(&mut pump);
        assert!(!pump.is_running());
    }

    #[test]
    fn faults_report_injected_bits() {
        let mut pump = DemoPump::with_head_code(3);
        pump.send(b"RF").unwrap();
        assert_eq!(drain(&mut pump), b"OK,0,0,0/");

        pump.inject_fault(FaultFlags {
            motor_stall: true,
            ..FaultFlags::default()
        });
        pump.send(b"RF").unwrap();
        assert_eq!(drain(&mut pump), b"OK,1,0,0/");
    }

    #[test]
    fn clear_is_silent() {
        let mut pump = DemoPump::with_head_code(4);
        pump.send(b"#").unwrap();
        assert_eq!(drain(&mut pump), b"");
    }

    #[test]
    fn head_code_is_reported() {
        let mut pump = DemoPump::with_head_code(4);
        pump.send(b"RH").unwrap();
        assert_eq!(drain(&mut pump), b"OK,4/");
    }
}
