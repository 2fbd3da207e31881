//! Poll-cycle snapshots

use serde::{Deserialize, Serialize};
use std::fmt;

/// Values reported by the `CS` status query: the active flow rate and the
/// pressure limits currently programmed into the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PumpStatus {
    /// Current flow rate in ml/min
    pub flow: f64,
    /// Programmed upper pressure limit
    pub upper_limit: f64,
    /// Programmed lower pressure limit
    pub lower_limit: f64,
}

/// Fault bits reported by the `RF` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FaultFlags {
    /// Pump motor stalled
    pub motor_stall: bool,
    /// Pressure exceeded the upper limit
    pub upper_pressure: bool,
    /// Pressure fell below the lower limit
    pub lower_pressure: bool,
}

impl FaultFlags {
    /// Build the flags from the three `RF` reply fields (0 = clear).
    pub fn from_bits(stall: i64, upper: i64, lower: i64) -> Self {
        Self {
            motor_stall: stall != 0,
            upper_pressure: upper != 0,
            lower_pressure: lower != 0,
        }
    }

    /// True if any fault bit is set.
    pub fn any(&self) -> bool {
        self.motor_stall || self.upper_pressure || self.lower_pressure
    }
}

impl fmt::Display for FaultFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = Vec::new();
        if self.motor_stall {
            names.push("motor stall");
        }
        if self.upper_pressure {
            names.push("upper pressure limit");
        }
        if self.lower_pressure {
            names.push("lower pressure limit");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_reflects_each_bit() {
        assert!(!FaultFlags::from_bits(0, 0, 0).any());
        assert!(FaultFlags::from_bits(1, 0, 0).any());
        assert!(FaultFlags::from_bits(0, 1, 0).any());
        assert!(FaultFlags::from_bits(0, 0, 1).any());
    }

    #[test]
    fn display_lists_set_bits() {
        assert_eq!(FaultFlags::from_bits(0, 0, 0).to_string(), "none");
        assert_eq!(FaultFlags::from_bits(1, 0, 0).to_string(), "motor stall");
        assert_eq!(
            FaultFlags::from_bits(1, 1, 0).to_string(),
            "motor stall, upper pressure limit"
        );
    }
}
