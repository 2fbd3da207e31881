//! Protocol commands
//!
//! Defines the commands understood by the pump firmware and their
//! fixed-format ASCII encoding. Numeric fields are rendered with a
//! per-command width and precision, left-padded with `'0'`; the firmware
//! accepts no other layout. No terminator is appended to outgoing
//! commands; the command text is exactly what goes on the wire.

/// Width of the flow-rate field in `FO` commands (e.g. `FO0050`)
pub const FLOW_FIELD_WIDTH: usize = 4;

/// Width of the pressure field in `UP`/`LP` commands
pub const PRESSURE_FIELD_WIDTH: usize = 4;

/// Commands supported by the pump firmware
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PumpCommand {
    /// Read the serial number (`ID`)
    Identify,

    /// Read current flow and pressure (`CC`)
    CurrentConditions,

    /// Lock the front-panel keypad (`KD`)
    DisableKeypad,

    /// Set the flow rate in ml/min (`FO<flow>`; `FO0000` zeroes the flow)
    SetFlow(f64),

    /// Start the pump (`RU`)
    Run,

    /// Set the upper pressure limit in psi (`UP<pressure>`)
    SetUpperLimit(f64),

    /// Set the lower pressure limit in psi (`LP<pressure>`)
    SetLowerLimit(f64),

    /// Stop the pump (`ST`)
    Stop,

    /// Poll flow and configured pressure limits (`CS`)
    Status,

    /// Poll fault bits (`RF`)
    Faults,

    /// Poll current pressure (`PR`)
    ReadPressure,

    /// Read the installed pump-head code (`RH`)
    ReadHead,

    /// Flush device-side command state (`#`), never answered
    Clear,
}

impl PumpCommand {
    /// Encode the command as the exact byte sequence the firmware expects.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            PumpCommand::Identify => b"ID".to_vec(),
            PumpCommand::CurrentConditions => b"CC".to_vec(),
            PumpCommand::DisableKeypad => b"KD".to_vec(),
            PumpCommand::SetFlow(flow) => {
                let mut bytes = b"FO".to_vec();
                bytes.extend_from_slice(encode_field(*flow, FLOW_FIELD_WIDTH, 0, '0').as_bytes());
                bytes
            }
            PumpCommand::Run => b"RU".to_vec(),
            PumpCommand::SetUpperLimit(psi) => {
                let mut bytes = b"UP".to_vec();
                bytes.extend_from_slice(
                    encode_field(*psi, PRESSURE_FIELD_WIDTH, 0, '0').as_bytes(),
                );
                bytes
            }
            PumpCommand::SetLowerLimit(psi) => {
                let mut bytes = b"LP".to_vec();
                bytes.extend_from_slice(
                    encode_field(*psi, PRESSURE_FIELD_WIDTH, 0, '0').as_bytes(),
                );
                bytes
            }
            PumpCommand::Stop => b"ST".to_vec(),
            PumpCommand::Status => b"CS".to_vec(),
            PumpCommand::Faults => b"RF".to_vec(),
            PumpCommand::ReadPressure => b"PR".to_vec(),
            PumpCommand::ReadHead => b"RH".to_vec(),
            PumpCommand::Clear => b"#".to_vec(),
        }
    }

    /// Whether the firmware answers this command.
    ///
    /// `#` is fire-and-forget: it is written to the link and no frame is
    /// awaited for it.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, PumpCommand::Clear)
    }
}

/// Render a numeric field: `precision` decimals, left-padded with `pad` to
/// at least `width` characters.
///
/// `encode_field(5.0, 4, 0, '0')` is `"0005"`; values wider than `width`
/// are not truncated.
pub fn encode_field(value: f64, width: usize, precision: usize, pad: char) -> String {
    let rendered = format!("{value:.precision$}");
    if rendered.len() >= width {
        return rendered;
    }
    let mut field = String::with_capacity(width);
    for _ in 0..width - rendered.len() {
        field.push(pad);
    }
    field.push_str(&rendered);
    field
}
