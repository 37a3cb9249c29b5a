use std::fmt;

use thiserror::Error;

use crate::crc::crc8;

/// Every host command is 4 bytes on the wire: type, data lo, data hi, crc.
pub const COMMAND_LEN: usize = 4;
/// Telemetry replies are 8 bytes: three LE u16 fields, state, crc.
pub const TELEMETRY_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetSpeed { rpm: u16 },
    TelemetryRequest,
}

impl Command {
    pub fn encode(&self) -> [u8; COMMAND_LEN] {
        let payload = match *self {
            Command::SetSpeed { rpm } => [0x01, (rpm & 0xFF) as u8, (rpm >> 8) as u8],
            Command::TelemetryRequest => [0x02, 0x00, 0x00],
        };
        [payload[0], payload[1], payload[2], crc8(&payload)]
    }

    /// Only telemetry requests get an answer; SetSpeed is fire-and-forget.
    pub fn expects_reply(&self) -> bool {
        matches!(self, Command::TelemetryRequest)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a full 8-byte frame this cycle (timeouts read as 0 bytes). This is
    /// the ordinary "no telemetry right now" outcome, not a link fault.
    #[error("incomplete telemetry frame: got {0} bytes, want {TELEMETRY_LEN}")]
    Incomplete(usize),
    /// A full frame arrived but fails validation; it is dropped, never
    /// surfaced as data.
    #[error("checksum mismatch: expected {expected:#04X}, got {received:#04X}")]
    ChecksumMismatch { expected: u8, received: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Telemetry {
    pub duty_cycle: u16,
    pub reference_speed: u16,
    pub average_speed: u16,
    pub motor_state: u8,
}

pub fn decode_telemetry(buf: &[u8]) -> Result<Telemetry, DecodeError> {
    if buf.len() != TELEMETRY_LEN {
        return Err(DecodeError::Incomplete(buf.len()));
    }
    let expected = crc8(&buf[..TELEMETRY_LEN - 1]);
    let received = buf[TELEMETRY_LEN - 1];
    if expected != received {
        return Err(DecodeError::ChecksumMismatch { expected, received });
    }
    Ok(Telemetry {
        duty_cycle: u16::from_le_bytes([buf[0], buf[1]]),
        reference_speed: u16::from_le_bytes([buf[2], buf[3]]),
        average_speed: u16::from_le_bytes([buf[4], buf[5]]),
        motor_state: buf[6],
    })
}

/// Motor-control state codes as the firmware reports them. A flat lookup, not
/// a transition graph: the firmware alone decides what follows what, so any
/// code may appear after any other and unlisted codes stay usable as
/// `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    Idle,
    Alignment,
    Start,
    Run,
    Stop,
    FaultNow,
    FaultOver,
    IclWait,
    ChargeBootCap,
    OffsetCalib,
    SwitchOver,
    WaitStopMotor,
    Unknown(u8),
}

impl MotorState {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => MotorState::Idle,
            2 => MotorState::Alignment,
            4 => MotorState::Start,
            6 => MotorState::Run,
            8 => MotorState::Stop,
            10 => MotorState::FaultNow,
            11 => MotorState::FaultOver,
            12 => MotorState::IclWait,
            16 => MotorState::ChargeBootCap,
            17 => MotorState::OffsetCalib,
            19 => MotorState::SwitchOver,
            20 => MotorState::WaitStopMotor,
            c => MotorState::Unknown(c),
        }
    }

    pub fn is_fault(self) -> bool {
        matches!(self, MotorState::FaultNow | MotorState::FaultOver)
    }
}

impl fmt::Display for MotorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorState::Idle => write!(f, "IDLE"),
            MotorState::Alignment => write!(f, "ALIGNMENT"),
            MotorState::Start => write!(f, "START"),
            MotorState::Run => write!(f, "RUN"),
            MotorState::Stop => write!(f, "STOP"),
            MotorState::FaultNow => write!(f, "FAULT_NOW"),
            MotorState::FaultOver => write!(f, "FAULT_OVER"),
            MotorState::IclWait => write!(f, "ICLWAIT"),
            MotorState::ChargeBootCap => write!(f, "CHARGE_BOOT_CAP"),
            MotorState::OffsetCalib => write!(f, "OFFSET_CALIB"),
            MotorState::SwitchOver => write!(f, "SWITCH_OVER"),
            MotorState::WaitStopMotor => write!(f, "WAIT_STOP_MOTOR"),
            MotorState::Unknown(c) => write!(f, "UNKNOWN ({c})"),
        }
    }
}
