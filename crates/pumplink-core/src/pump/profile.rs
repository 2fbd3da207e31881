//! Pump-head profiles
//!
//! Four physical head configurations are supported, distinguished by
//! material (stainless steel vs. PEEK) and flow class (10 vs. 40 ml/min).
//! The material decides the pressure envelope, the flow class the flow
//! envelope. The firmware reports the installed head as a numeric code via
//! the `RH` command.

use serde::{Deserialize, Serialize};

use crate::units::psi_to_mpa;

/// One of the four supported pump-head configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpProfile {
    /// 10 ml/min stainless-steel head
    Ss10,
    /// 10 ml/min PEEK head
    Peek10,
    /// 40 ml/min stainless-steel head
    Ss40,
    /// 40 ml/min PEEK head
    Peek40,
}

impl PumpProfile {
    /// Map the head code reported by `RH` to a profile.
    ///
    /// Codes outside 1..=4 are unknown hardware and yield `None`; the
    /// caller must treat that as a configuration error, not pick a
    /// fallback.
    pub fn from_head_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(PumpProfile::Ss10),
            2 => Some(PumpProfile::Peek10),
            3 => Some(PumpProfile::Ss40),
            4 => Some(PumpProfile::Peek40),
            _ => None,
        }
    }

    /// Parse the configuration-store label for a profile.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "10 ml/min SS" => Some(PumpProfile::Ss10),
            "10 ml/min PEEK" => Some(PumpProfile::Peek10),
            "40 ml/min SS" => Some(PumpProfile::Ss40),
            "40 ml/min PEEK" => Some(PumpProfile::Peek40),
            _ => None,
        }
    }

    /// Human-readable label, as shown in the configuration choice list.
    pub fn label(&self) -> &'static str {
        match self {
            PumpProfile::Ss10 => "10 ml/min SS",
            PumpProfile::Peek10 => "10 ml/min PEEK",
            PumpProfile::Ss40 => "40 ml/min SS",
            PumpProfile::Peek40 => "40 ml/min PEEK",
        }
    }

    /// Highest deliverable flow rate in ml/min.
    pub fn flow_ceiling_ml_min(&self) -> f64 {
        match self {
            PumpProfile::Ss10 | PumpProfile::Peek10 => 10.0,
            PumpProfile::Ss40 | PumpProfile::Peek40 => 40.0,
        }
    }

    /// Highest allowed pressure in psi. SS heads tolerate 6000 psi, PEEK
    /// heads 2000 psi.
    pub fn pressure_ceiling_psi(&self) -> f64 {
        match self {
            PumpProfile::Ss10 | PumpProfile::Ss40 => 6000.0,
            PumpProfile::Peek10 | PumpProfile::Peek40 => 2000.0,
        }
    }

    /// Pressure ceiling converted to MPa, the unit the host displays.
    pub fn pressure_ceiling_mpa(&self) -> f64 {
        psi_to_mpa(self.pressure_ceiling_psi())
    }
}
