//! Sensor hub control channel (channel 2) cargo.
//!
//! Every control packet starts with a report ID from [`reports`]. Commands proper (tare,
//! calibration, DCD save and friends) travel inside a command request (`0xF2`) and are
//! answered by a command response (`0xF1`).

use std::fmt;

use bitflags::bitflags;

use crate::{
    decode::{expect_report_id, Decode, DecodeError},
    encode::{Encode, EncodeError},
};

/// Known control channel report IDs
#[allow(unused)]
pub mod reports {
    pub const COMMAND_RESPONSE: u8 = 0xF1;
    pub const COMMAND_REQUEST: u8 = 0xF2;

    // flash record system
    pub const FRS_READ_RESPONSE: u8 = 0xF3;
    pub const FRS_READ_REQUEST: u8 = 0xF4;
    pub const FRS_WRITE_RESPONSE: u8 = 0xF5;
    pub const FRS_WRITE_DATA: u8 = 0xF6;
    pub const FRS_WRITE_REQUEST: u8 = 0xF7;

    pub const PRODUCT_ID_RESPONSE: u8 = 0xF8;
    pub const PRODUCT_ID_REQUEST: u8 = 0xF9;
    pub const BASE_TIMESTAMP: u8 = 0xFB;

    // feature configuration
    pub const GET_FEATURE_RESPONSE: u8 = 0xFC;
    pub const SET_FEATURE_COMMAND: u8 = 0xFD;
    pub const GET_FEATURE_REQUEST: u8 = 0xFE;
}

/// Command IDs carried inside command requests
#[allow(unused)]
pub mod cmds {
    pub const ERRORS: u8 = 0x01;
    pub const COUNTER: u8 = 0x02;
    pub const TARE: u8 = 0x03;
    pub const INITIALIZE: u8 = 0x04;
    pub const DCD_SAVE: u8 = 0x06;
    pub const ME_CALIBRATION: u8 = 0x07;
    pub const DCD_PERIOD_SAVE: u8 = 0x09;
    pub const OSCILLATOR: u8 = 0x0A;
    pub const CLEAR_DCD: u8 = 0x0B;
}

/// Number of parameter bytes in a command request.
pub const COMMAND_PARAMS_LEN: usize = 9;

/// Command request (`0xF2`).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CommandRequest {
    /// Command sequence number, independent of the transport sequence.
    pub sequence: u8,
    pub command: u8,
    pub params: [u8; COMMAND_PARAMS_LEN],
}

impl Encode for CommandRequest {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut encoded = Vec::with_capacity(3 + COMMAND_PARAMS_LEN);
        encoded.push(reports::COMMAND_REQUEST);
        encoded.push(self.sequence);
        encoded.push(self.command);
        encoded.extend_from_slice(&self.params);
        Ok(encoded)
    }
}

/// Command response (`0xF1`).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommandResponse {
    pub sequence: u8,
    /// Command being answered. Bit 7 is set for unsolicited responses.
    pub command: u8,
    /// Sequence number of the request this responds to.
    pub command_sequence: u8,
    pub response_sequence: u8,
    /// Response bytes R0 and onwards.
    pub response: Vec<u8>,
}

impl CommandResponse {
    /// Response byte `Rn`, or `0` when the hub sent a shorter response.
    pub fn r(&self, n: usize) -> u8 {
        self.response.get(n).copied().unwrap_or(0)
    }
}

impl Decode for CommandResponse {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        expect_report_id(data, &[reports::COMMAND_RESPONSE])?;
        let sequence = u8::decode(data)?;
        let command = u8::decode(data)?;
        let command_sequence = u8::decode(data)?;
        let response_sequence = u8::decode(data)?;
        let response = data.to_vec();
        *data = &[];

        Ok(Self {
            sequence,
            command,
            command_sequence,
            response_sequence,
            response,
        })
    }
}

bitflags! {
    /// Sensors taking part in motion engine calibration.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
    pub struct CalibrationSensors: u8 {
        const ACCELEROMETER = 1 << 0;
        const GYROSCOPE = 1 << 1;
        const MAGNETOMETER = 1 << 2;
        const PLANAR_ACCELEROMETER = 1 << 3;
    }
}

/// Builds the parameters of a motion engine calibration command.
///
/// P0 to P2 enable accelerometer, gyroscope and magnetometer calibration, P3 is the
/// subcommand and P4 enables planar accelerometer calibration.
pub fn me_calibration_params(
    subcommand: MeCalibrationSubcommand,
    sensors: CalibrationSensors,
) -> [u8; COMMAND_PARAMS_LEN] {
    let mut params = [0u8; COMMAND_PARAMS_LEN];
    params[0] = sensors.contains(CalibrationSensors::ACCELEROMETER) as u8;
    params[1] = sensors.contains(CalibrationSensors::GYROSCOPE) as u8;
    params[2] = sensors.contains(CalibrationSensors::MAGNETOMETER) as u8;
    params[3] = subcommand as u8;
    params[4] = sensors.contains(CalibrationSensors::PLANAR_ACCELEROMETER) as u8;
    params
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum MeCalibrationSubcommand {
    Configure = 0x00,
    Get = 0x01,
}

/// Calibration enable state reported by a motion engine calibration response.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct CalibrationStatus {
    pub enabled: CalibrationSensors,
}

impl CalibrationStatus {
    pub fn accelerometer(&self) -> bool {
        self.enabled.contains(CalibrationSensors::ACCELEROMETER)
    }
    pub fn gyroscope(&self) -> bool {
        self.enabled.contains(CalibrationSensors::GYROSCOPE)
    }
    pub fn magnetometer(&self) -> bool {
        self.enabled.contains(CalibrationSensors::MAGNETOMETER)
    }
    pub fn planar_accelerometer(&self) -> bool {
        self.enabled.contains(CalibrationSensors::PLANAR_ACCELEROMETER)
    }
}

impl Decode for CalibrationStatus {
    /// Decodes the enable flags from cargo bytes 6 to 9 of a motion engine calibration
    /// command response.
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        if data.len() < 10 {
            return Err(DecodeError::UnexpectedEnd);
        }
        let response = CommandResponse::decode(data)?;
        if response.command != cmds::ME_CALIBRATION {
            return Err(DecodeError::UnexpectedValue {
                value: response.command,
                expected: &[cmds::ME_CALIBRATION],
            });
        }

        let mut enabled = CalibrationSensors::empty();
        enabled.set(CalibrationSensors::ACCELEROMETER, response.r(1) != 0);
        enabled.set(CalibrationSensors::GYROSCOPE, response.r(2) != 0);
        enabled.set(CalibrationSensors::MAGNETOMETER, response.r(3) != 0);
        enabled.set(CalibrationSensors::PLANAR_ACCELEROMETER, response.r(4) != 0);

        Ok(Self { enabled })
    }
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |enabled: bool| if enabled { "ON" } else { "OFF" };
        write!(
            f,
            "ACC={} GYRO={} MAG={} PLANAR-ACC={}",
            on_off(self.accelerometer()),
            on_off(self.gyroscope()),
            on_off(self.magnetometer()),
            on_off(self.planar_accelerometer())
        )
    }
}

bitflags! {
    /// Axes reset by a tare command.
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub struct TareAxes: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
    }
}

/// Rotation vector a tare is computed from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[repr(u8)]
pub enum TareBasis {
    #[default]
    RotationVector = 0,
    GameRotationVector = 1,
    GeomagneticRotationVector = 2,
    GyroIntegratedRotationVector = 3,
    ArVrStabilizedRotationVector = 4,
    ArVrStabilizedGameRotationVector = 5,
}

/// First tare parameter.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum TareSubcommand {
    TareNow = 0,
    PersistTare = 1,
}

/// Parameters that tare `axes` against `basis` right away.
pub fn tare_params(axes: TareAxes, basis: TareBasis) -> [u8; COMMAND_PARAMS_LEN] {
    let mut params = [0u8; COMMAND_PARAMS_LEN];
    params[0] = TareSubcommand::TareNow as u8;
    params[1] = axes.bits();
    params[2] = basis as u8;
    params
}

/// Parameters that store the current tare in flash. The rest are reserved.
pub fn persist_tare_params() -> [u8; COMMAND_PARAMS_LEN] {
    let mut params = [0u8; COMMAND_PARAMS_LEN];
    params[0] = TareSubcommand::PersistTare as u8;
    params
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct ProductIdRequest;

impl Encode for ProductIdRequest {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(vec![reports::PRODUCT_ID_REQUEST])
    }
}

/// Cause of the hub's last reset, as reported in the product ID response.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResetCause {
    NotApplicable,
    PowerOn,
    InternalSystem,
    WatchdogTimeout,
    External,
    Other,
    Unknown(u8),
}

impl From<u8> for ResetCause {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::NotApplicable,
            1 => Self::PowerOn,
            2 => Self::InternalSystem,
            3 => Self::WatchdogTimeout,
            4 => Self::External,
            5 => Self::Other,
            v => Self::Unknown(v),
        }
    }
}

impl fmt::Display for ResetCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable => write!(f, "Not Applicable"),
            Self::PowerOn => write!(f, "Power On Reset"),
            Self::InternalSystem => write!(f, "Internal System Reset"),
            Self::WatchdogTimeout => write!(f, "Watchdog Timeout"),
            Self::External => write!(f, "External Reset"),
            Self::Other => write!(f, "Other"),
            Self::Unknown(v) => write!(f, "Unknown ({v})"),
        }
    }
}

/// Product ID response (`0xF8`). The hub answers a request with one record per part.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ProductInfo {
    pub report_id: u8,
    pub reset_cause: ResetCause,
    pub version_major: u8,
    pub version_minor: u8,
    pub part_number: u32,
    pub build_number: u32,
    pub version_patch: u16,
}

impl ProductInfo {
    /// Size of one product ID record on the wire, including two reserved bytes.
    pub const RECORD_LEN: usize = 16;
}

impl Decode for ProductInfo {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let report_id = expect_report_id(data, &[reports::PRODUCT_ID_RESPONSE])?;
        let reset_cause = ResetCause::from(u8::decode(data)?);
        let version_major = u8::decode(data)?;
        let version_minor = u8::decode(data)?;
        let part_number = u32::decode(data)?;
        let build_number = u32::decode(data)?;
        let version_patch = u16::decode(data)?;

        Ok(Self {
            report_id,
            reset_cause,
            version_major,
            version_minor,
            part_number,
            build_number,
            version_patch,
        })
    }
}

impl fmt::Display for ProductInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Part {} : Version {}.{}.{} Build {} Last Reset: {}",
            self.part_number,
            self.version_major,
            self.version_minor,
            self.version_patch,
            self.build_number,
            self.reset_cause
        )
    }
}

/// FRS read request (`0xF4`).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FrsReadRequest {
    /// Offset into the record, in 32-bit words.
    pub offset: u16,
    pub record: u16,
    /// Number of words to read. Zero reads the whole record.
    pub block_size: u16,
}

impl FrsReadRequest {
    pub fn whole_record(record: u16) -> Self {
        Self {
            offset: 0,
            record,
            block_size: 0,
        }
    }
}

impl Encode for FrsReadRequest {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut encoded = vec![reports::FRS_READ_REQUEST, 0x00];
        encoded.extend_from_slice(&self.offset.to_le_bytes());
        encoded.extend_from_slice(&self.record.to_le_bytes());
        encoded.extend_from_slice(&self.block_size.to_le_bytes());
        Ok(encoded)
    }
}

/// Status nibble of an FRS read response.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FrsStatus {
    NoError,
    UnrecognizedType,
    Busy,
    RecordCompleted,
    OffsetOutOfRange,
    RecordEmpty,
    BlockCompleted,
    BlockAndRecordCompleted,
    DeviceError,
    Unknown(u8),
}

impl FrsStatus {
    /// The read is over and the response carries the last data words.
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            Self::RecordCompleted | Self::BlockCompleted | Self::BlockAndRecordCompleted
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedType
                | Self::Busy
                | Self::OffsetOutOfRange
                | Self::DeviceError
                | Self::Unknown(_)
        )
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::NoError => 0,
            Self::UnrecognizedType => 1,
            Self::Busy => 2,
            Self::RecordCompleted => 3,
            Self::OffsetOutOfRange => 4,
            Self::RecordEmpty => 5,
            Self::BlockCompleted => 6,
            Self::BlockAndRecordCompleted => 7,
            Self::DeviceError => 8,
            Self::Unknown(v) => *v,
        }
    }
}

impl From<u8> for FrsStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::UnrecognizedType,
            2 => Self::Busy,
            3 => Self::RecordCompleted,
            4 => Self::OffsetOutOfRange,
            5 => Self::RecordEmpty,
            6 => Self::BlockCompleted,
            7 => Self::BlockAndRecordCompleted,
            8 => Self::DeviceError,
            v => Self::Unknown(v),
        }
    }
}

/// FRS read response (`0xF3`). Carries up to two words of the record.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FrsReadResponse {
    /// Number of valid words in `words`.
    pub data_len: u8,
    pub status: FrsStatus,
    /// Word offset of `words[0]` in the record.
    pub offset: u16,
    pub words: [u32; 2],
    pub record: u16,
}

impl FrsReadResponse {
    pub fn valid_words(&self) -> &[u32] {
        &self.words[..(self.data_len as usize).min(2)]
    }
}

impl Decode for FrsReadResponse {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        expect_report_id(data, &[reports::FRS_READ_RESPONSE])?;
        let len_status = u8::decode(data)?;
        let offset = u16::decode(data)?;
        let words = [u32::decode(data)?, u32::decode(data)?];
        let record = u16::decode(data)?;

        Ok(Self {
            data_len: len_status >> 4,
            status: FrsStatus::from(len_status & 0x0F),
            offset,
            words,
            record,
        })
    }
}

bitflags! {
    /// Feature flags of a set feature command or get feature response.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
    pub struct FeatureFlags: u8 {
        const CHANGE_SENSITIVITY_RELATIVE = 1 << 0;
        const CHANGE_SENSITIVITY_ENABLED = 1 << 1;
        const WAKE_UP_ENABLED = 1 << 2;
        const ALWAYS_ON_ENABLED = 1 << 3;
    }
}

/// Set feature command (`0xFD`). Enables a sensor report at the given interval.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SetFeatureCommand {
    pub report_id: u8,
    pub flags: FeatureFlags,
    pub change_sensitivity: u16,
    /// Report interval in microseconds. Zero disables the report.
    pub report_interval_us: u32,
    pub batch_interval_us: u32,
    pub sensor_specific: u32,
}

impl SetFeatureCommand {
    pub fn new(report_id: u8, report_interval_us: u32) -> Self {
        Self {
            report_id,
            flags: FeatureFlags::empty(),
            change_sensitivity: 0,
            report_interval_us,
            batch_interval_us: 0,
            sensor_specific: 0,
        }
    }
}

impl Encode for SetFeatureCommand {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut encoded = Vec::with_capacity(17);
        encoded.push(reports::SET_FEATURE_COMMAND);
        encoded.push(self.report_id);
        encoded.push(self.flags.bits());
        encoded.extend_from_slice(&self.change_sensitivity.to_le_bytes());
        encoded.extend_from_slice(&self.report_interval_us.to_le_bytes());
        encoded.extend_from_slice(&self.batch_interval_us.to_le_bytes());
        encoded.extend_from_slice(&self.sensor_specific.to_le_bytes());
        Ok(encoded)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct GetFeatureRequest {
    pub report_id: u8,
}

impl Encode for GetFeatureRequest {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(vec![reports::GET_FEATURE_REQUEST, self.report_id])
    }
}

/// Get feature response (`0xFC`), sent on request and after every set feature command.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FeatureReport {
    pub report_id: u8,
    pub flags: FeatureFlags,
    pub change_sensitivity: u16,
    pub report_interval_us: u32,
    pub batch_interval_us: u32,
    pub sensor_specific: u32,
}

impl FeatureReport {
    pub fn is_enabled(&self) -> bool {
        self.report_interval_us != 0
    }
}

impl Decode for FeatureReport {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        expect_report_id(data, &[reports::GET_FEATURE_RESPONSE])?;
        let report_id = u8::decode(data)?;
        let flags = FeatureFlags::from_bits_truncate(u8::decode(data)?);
        let change_sensitivity = u16::decode(data)?;
        let report_interval_us = u32::decode(data)?;
        let batch_interval_us = u32::decode(data)?;
        let sensor_specific = u32::decode(data)?;

        Ok(Self {
            report_id,
            flags,
            change_sensitivity,
            report_interval_us,
            batch_interval_us,
            sensor_specific,
        })
    }
}
