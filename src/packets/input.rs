//! Input sensor reports (channels 3 to 5) and Q-format conversion.
//!
//! An input report packet starts with a five byte base timestamp reference (`0xFB` and a
//! 32-bit delta), followed by the sensor report itself:
//!
//! ```text
//! +0  sensor report ID
//! +1  report sequence number
//! +2  status, low two bits are the accuracy
//! +3  delay
//! +4  first 16-bit field, further fields follow at +6, +8, +10 and +12
//! ```

use std::fmt;

use log::warn;

use crate::decode::DecodeError;

/// Length of the base timestamp reference that precedes every sensor report.
pub const TIMESTAMP_PREAMBLE_LEN: usize = 5;

/// Sensor report IDs understood by the decoder.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum SensorReportId {
    Accelerometer = 0x01,
    Gyroscope = 0x02,
    MagneticField = 0x03,
    LinearAcceleration = 0x04,
    RotationVector = 0x05,
    Gravity = 0x06,
    GameRotationVector = 0x08,
    GeomagneticRotationVector = 0x09,
    TapDetector = 0x10,
    StepCounter = 0x11,
    StabilityClassifier = 0x13,
    PersonalActivityClassifier = 0x1E,
}

impl SensorReportId {
    pub const ALL: [SensorReportId; 12] = [
        Self::Accelerometer,
        Self::Gyroscope,
        Self::MagneticField,
        Self::LinearAcceleration,
        Self::RotationVector,
        Self::Gravity,
        Self::GameRotationVector,
        Self::GeomagneticRotationVector,
        Self::TapDetector,
        Self::StepCounter,
        Self::StabilityClassifier,
        Self::PersonalActivityClassifier,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Accelerometer => "Accelerometer",
            Self::Gyroscope => "Gyroscope",
            Self::MagneticField => "Magnetic Field",
            Self::LinearAcceleration => "Linear Acceleration",
            Self::RotationVector => "Rotation Vector",
            Self::Gravity => "Gravity",
            Self::GameRotationVector => "Game Rotation Vector",
            Self::GeomagneticRotationVector => "Geomagnetic Rotation Vector",
            Self::TapDetector => "Tap Detector",
            Self::StepCounter => "Step Counter",
            Self::StabilityClassifier => "Stability Classifier",
            Self::PersonalActivityClassifier => "Personal Activity Classifier",
        }
    }
}

impl TryFrom<u8> for SensorReportId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|id| *id as u8 == value)
            .ok_or(value)
    }
}

impl fmt::Display for SensorReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), *self as u8)
    }
}

/// Q-point exponents used to scale raw readings.
///
/// The defaults match the hub's factory metadata. [`LoadQPoints`](crate::commands::frs::LoadQPoints) refreshes
/// them from the FRS metadata records.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct QPoints {
    pub rotation_vector: i8,
    pub rotation_accuracy: i8,
    pub accelerometer: i8,
    pub linear_acceleration: i8,
    pub gravity: i8,
    pub gyroscope: i8,
    pub magnetometer: i8,
}

impl Default for QPoints {
    fn default() -> Self {
        Self {
            rotation_vector: 14,
            rotation_accuracy: 12,
            accelerometer: 8,
            linear_acceleration: 8,
            gravity: 8,
            gyroscope: 9,
            magnetometer: 4,
        }
    }
}

impl QPoints {
    /// Q-point of the main fields of a report, if the report carries fixed-point data.
    pub fn for_report(&self, id: SensorReportId) -> Option<i8> {
        match id {
            SensorReportId::Accelerometer => Some(self.accelerometer),
            SensorReportId::Gyroscope => Some(self.gyroscope),
            SensorReportId::MagneticField => Some(self.magnetometer),
            SensorReportId::LinearAcceleration => Some(self.linear_acceleration),
            SensorReportId::Gravity => Some(self.gravity),
            SensorReportId::RotationVector
            | SensorReportId::GameRotationVector
            | SensorReportId::GeomagneticRotationVector => Some(self.rotation_vector),
            _ => None,
        }
    }
}

/// Converts a fixed-point value to a float: `raw * 2^-q_point`.
///
/// Scaled in `f64` so that zero maps to zero for every Q-point.
pub fn q_to_float(raw: i16, q_point: i8) -> f32 {
    (raw as f64 * 2f64.powi(-(q_point as i32))) as f32
}

/// Three axis reading with its accuracy estimate.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Vector3Sample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    /// 0 (unreliable) to 3 (high).
    pub accuracy: u8,
}

impl Vector3Sample {
    pub fn scaled(&self, q_point: i8) -> [f32; 3] {
        [
            q_to_float(self.x, q_point),
            q_to_float(self.y, q_point),
            q_to_float(self.z, q_point),
        ]
    }
}

/// Unit quaternion reading.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct QuaternionSample {
    pub i: i16,
    pub j: i16,
    pub k: i16,
    pub real: i16,
    /// Heading accuracy estimate. Game rotation vectors have none.
    pub radian_accuracy: Option<i16>,
    pub accuracy: u8,
}

impl QuaternionSample {
    /// `[i, j, k, real]` as floats.
    pub fn scaled(&self, q_point: i8) -> [f32; 4] {
        [
            q_to_float(self.i, q_point),
            q_to_float(self.j, q_point),
            q_to_float(self.k, q_point),
            q_to_float(self.real, q_point),
        ]
    }

    pub fn radian_accuracy_scaled(&self, q_point: i8) -> Option<f32> {
        self.radian_accuracy.map(|raw| q_to_float(raw, q_point))
    }
}

/// One decoded input report.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SensorSample {
    Accelerometer(Vector3Sample),
    Gyroscope(Vector3Sample),
    MagneticField(Vector3Sample),
    LinearAcceleration(Vector3Sample),
    Gravity(Vector3Sample),
    RotationVector(QuaternionSample),
    GameRotationVector(QuaternionSample),
    GeomagneticRotationVector(QuaternionSample),
    TapDetector { flags: u8 },
    StepCounter { steps: u16 },
    StabilityClassifier { classification: u8 },
    PersonalActivityClassifier { most_likely: u8, confidences: [u8; 9] },
    Unrecognized { report_id: u8 },
}

/// Bounds-checked view of a sensor report. Reads past the end yield zero.
struct ReportReader<'a> {
    report: &'a [u8],
}

impl ReportReader<'_> {
    fn byte(&self, offset: usize) -> u8 {
        self.report.get(offset).copied().unwrap_or(0)
    }

    fn field(&self, offset: usize) -> i16 {
        i16::from_le_bytes([self.byte(offset), self.byte(offset + 1)])
    }

    fn accuracy(&self) -> u8 {
        self.byte(2) & 0x03
    }

    fn vector(&self) -> Vector3Sample {
        Vector3Sample {
            x: self.field(4),
            y: self.field(6),
            z: self.field(8),
            accuracy: self.accuracy(),
        }
    }

    fn quaternion(&self, with_accuracy: bool) -> QuaternionSample {
        QuaternionSample {
            i: self.field(4),
            j: self.field(6),
            k: self.field(8),
            real: self.field(10),
            radian_accuracy: with_accuracy.then(|| self.field(12)),
            accuracy: self.accuracy(),
        }
    }
}

impl SensorSample {
    /// Decodes the cargo of an input report packet.
    ///
    /// Fields missing from a truncated report decode as zero. Only a cargo too short to
    /// hold the sensor report ID is an error.
    pub fn decode(cargo: &[u8]) -> Result<Self, DecodeError> {
        let report = cargo
            .get(TIMESTAMP_PREAMBLE_LEN..)
            .filter(|report| !report.is_empty())
            .ok_or(DecodeError::UnexpectedEnd)?;
        let reader = ReportReader { report };

        let id = match SensorReportId::try_from(report[0]) {
            Ok(id) => id,
            Err(report_id) => {
                warn!("Unrecognized sensor report ID 0x{:02X}", report_id);
                return Ok(Self::Unrecognized { report_id });
            }
        };

        Ok(match id {
            SensorReportId::Accelerometer => Self::Accelerometer(reader.vector()),
            SensorReportId::Gyroscope => Self::Gyroscope(reader.vector()),
            SensorReportId::MagneticField => Self::MagneticField(reader.vector()),
            SensorReportId::LinearAcceleration => Self::LinearAcceleration(reader.vector()),
            SensorReportId::Gravity => Self::Gravity(reader.vector()),
            SensorReportId::RotationVector => Self::RotationVector(reader.quaternion(true)),
            SensorReportId::GameRotationVector => {
                Self::GameRotationVector(reader.quaternion(false))
            }
            SensorReportId::GeomagneticRotationVector => {
                Self::GeomagneticRotationVector(reader.quaternion(true))
            }
            SensorReportId::TapDetector => Self::TapDetector {
                flags: reader.byte(4),
            },
            SensorReportId::StepCounter => Self::StepCounter {
                steps: reader.field(8) as u16,
            },
            SensorReportId::StabilityClassifier => Self::StabilityClassifier {
                classification: reader.byte(4),
            },
            SensorReportId::PersonalActivityClassifier => {
                let mut confidences = [0u8; 9];
                for (i, confidence) in confidences.iter_mut().enumerate() {
                    *confidence = reader.byte(6 + i);
                }
                Self::PersonalActivityClassifier {
                    most_likely: reader.byte(5),
                    confidences,
                }
            }
        })
    }

    /// Report ID of the sample.
    pub fn report_id(&self) -> u8 {
        let id = match self {
            Self::Accelerometer(_) => SensorReportId::Accelerometer,
            Self::Gyroscope(_) => SensorReportId::Gyroscope,
            Self::MagneticField(_) => SensorReportId::MagneticField,
            Self::LinearAcceleration(_) => SensorReportId::LinearAcceleration,
            Self::Gravity(_) => SensorReportId::Gravity,
            Self::RotationVector(_) => SensorReportId::RotationVector,
            Self::GameRotationVector(_) => SensorReportId::GameRotationVector,
            Self::GeomagneticRotationVector(_) => SensorReportId::GeomagneticRotationVector,
            Self::TapDetector { .. } => SensorReportId::TapDetector,
            Self::StepCounter { .. } => SensorReportId::StepCounter,
            Self::StabilityClassifier { .. } => SensorReportId::StabilityClassifier,
            Self::PersonalActivityClassifier { .. } => SensorReportId::PersonalActivityClassifier,
            Self::Unrecognized { report_id } => return *report_id,
        };
        id as u8
    }

    /// Physical values of the sample, scaled with the given Q-points.
    ///
    /// Vectors yield `[x, y, z]`, quaternions `[i, j, k, real]` followed by the radian
    /// accuracy when present. Counters and classifiers yield their raw values.
    pub fn values(&self, q_points: &QPoints) -> Vec<f32> {
        match self {
            Self::Accelerometer(v) => v.scaled(q_points.accelerometer).to_vec(),
            Self::Gyroscope(v) => v.scaled(q_points.gyroscope).to_vec(),
            Self::MagneticField(v) => v.scaled(q_points.magnetometer).to_vec(),
            Self::LinearAcceleration(v) => v.scaled(q_points.linear_acceleration).to_vec(),
            Self::Gravity(v) => v.scaled(q_points.gravity).to_vec(),
            Self::RotationVector(q)
            | Self::GameRotationVector(q)
            | Self::GeomagneticRotationVector(q) => {
                let mut values = q.scaled(q_points.rotation_vector).to_vec();
                values.extend(q.radian_accuracy_scaled(q_points.rotation_accuracy));
                values
            }
            Self::TapDetector { flags } => vec![*flags as f32],
            Self::StepCounter { steps } => vec![*steps as f32],
            Self::StabilityClassifier { classification } => vec![*classification as f32],
            Self::PersonalActivityClassifier {
                most_likely,
                confidences,
            } => std::iter::once(*most_likely as f32)
                .chain(confidences.iter().map(|c| *c as f32))
                .collect(),
            Self::Unrecognized { .. } => Vec::new(),
        }
    }
}
