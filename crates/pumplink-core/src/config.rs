//! Driver configuration
//!
//! One immutable value carries every tunable the engine consults. It is
//! built once (from host configuration storage) and passed into the driver;
//! nothing in the crate reads process-global state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::{DEFAULT_TIMEOUT_MS, TERMINATOR};
use crate::pump::PumpProfile;

/// Default polling period in milliseconds
pub const DEFAULT_TIMER_PERIOD_MS: u64 = 1000;

/// Driver configuration snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Device name shown by the host (validated to < 32 characters)
    pub device_name: String,

    /// Configured pump-head profile
    pub pump_type: PumpProfile,

    /// True when this pump is an auxiliary pump; changes which signals are
    /// published (auxiliary flow only, no pressure signal)
    pub auxiliary: bool,

    /// Reply terminator byte
    pub terminator: u8,

    /// Per-command response timeout in milliseconds
    pub timeout_ms: u64,

    /// Polling period in milliseconds
    pub timer_period_ms: u64,

    /// Delay between chained commands in milliseconds.
    ///
    /// Carried for hosts that need to throttle slow firmware; no send path
    /// consults it currently.
    pub command_delay_ms: u64,

    /// How many times a host may re-issue a failed command.
    ///
    /// Carried as an extension point; the transceiver never retries on its
    /// own.
    pub repeat_count: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            device_name: "LC Pump".to_string(),
            pump_type: PumpProfile::Ss10,
            auxiliary: false,
            terminator: TERMINATOR,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            timer_period_ms: DEFAULT_TIMER_PERIOD_MS,
            command_delay_ms: 100,
            repeat_count: 5,
        }
    }
}

impl DriverConfig {
    /// Per-command timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Polling period as a [`Duration`].
    pub fn timer_period(&self) -> Duration {
        Duration::from_millis(self.timer_period_ms)
    }
}
