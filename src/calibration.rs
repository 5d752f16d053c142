//! Calibration data persistence.
//!
//! The data is stored as an INI file with one section for the enable flags and one per
//! calibrated sensor:
//!
//! ```ini
//! [enabled]
//! accelerometer=1
//! gyroscope=0
//! magnetometer=1
//! planar_accelerometer=0
//! [accelerometer]
//! offset_x=0
//! ...
//! ```

use std::{fs, io, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::packets::control::{CalibrationSensors, CalibrationStatus};

/// Calibration enable flags, `1` for enabled and `0` for disabled.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct CalibrationFlags {
    pub accelerometer: u8,
    pub gyroscope: u8,
    pub magnetometer: u8,
    pub planar_accelerometer: u8,
}

/// Offsets of one sensor. Gyroscopes have no radius and keep it at zero.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct SensorOffsets {
    pub offset_x: i32,
    pub offset_y: i32,
    pub offset_z: i32,
    pub radius: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct CalibrationData {
    pub enabled: CalibrationFlags,
    pub accelerometer: SensorOffsets,
    pub magnetometer: SensorOffsets,
    pub gyroscope: SensorOffsets,
}

impl CalibrationData {
    /// Calibration data carrying the enable flags of `status` and zero offsets.
    pub fn from_status(status: CalibrationStatus) -> Self {
        Self {
            enabled: CalibrationFlags {
                accelerometer: status.accelerometer() as u8,
                gyroscope: status.gyroscope() as u8,
                magnetometer: status.magnetometer() as u8,
                planar_accelerometer: status.planar_accelerometer() as u8,
            },
            ..Default::default()
        }
    }

    /// The enabled sensors, ready to hand to [`ConfigureCalibration`](crate::commands::calibration::ConfigureCalibration).
    pub fn sensors(&self) -> CalibrationSensors {
        let mut sensors = CalibrationSensors::empty();
        sensors.set(CalibrationSensors::ACCELEROMETER, self.enabled.accelerometer != 0);
        sensors.set(CalibrationSensors::GYROSCOPE, self.enabled.gyroscope != 0);
        sensors.set(CalibrationSensors::MAGNETOMETER, self.enabled.magnetometer != 0);
        sensors.set(
            CalibrationSensors::PLANAR_ACCELEROMETER,
            self.enabled.planar_accelerometer != 0,
        );
        sensors
    }
}

pub fn save(path: impl AsRef<Path>, data: &CalibrationData) -> io::Result<()> {
    let path = path.as_ref();
    let encoded = serde_ini::to_vec(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    fs::write(path, encoded)?;
    debug!("Saved calibration data to {}", path.display());
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> io::Result<CalibrationData> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let data = serde_ini::from_str(&text)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    debug!("Loaded calibration data from {}", path.display());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use std::{fs, io, path::PathBuf};

    use super::{load, save, CalibrationData, SensorOffsets};
    use crate::packets::control::{CalibrationSensors, CalibrationStatus};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bno080-shtp-{}-{}.ini", name, std::process::id()))
    }

    #[test]
    fn save_then_load() {
        let mut data = CalibrationData::from_status(CalibrationStatus {
            enabled: CalibrationSensors::ACCELEROMETER | CalibrationSensors::MAGNETOMETER,
        });
        data.magnetometer = SensorOffsets {
            offset_x: -12,
            offset_y: 40,
            offset_z: 3,
            radius: 512,
        };

        let path = temp_path("round-trip");
        save(&path, &data).unwrap();
        let loaded = load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded, data);
        assert_eq!(
            loaded.sensors(),
            CalibrationSensors::ACCELEROMETER | CalibrationSensors::MAGNETOMETER
        );
    }

    #[test]
    fn default_data_saves() {
        let path = temp_path("default");
        save(&path, &CalibrationData::default()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let loaded = load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(text.contains("[enabled]"));
        assert!(text.contains("accelerometer=0"));
        assert_eq!(loaded, CalibrationData::default());
        assert!(loaded.sensors().is_empty());
    }

    #[test]
    fn load_rejects_malformed_files() {
        let path = temp_path("malformed");
        fs::write(&path, "[enabled]\naccelerometer=maybe\n").unwrap();
        let result = load(&path);
        fs::remove_file(&path).unwrap();

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn load_missing_file() {
        let result = load(temp_path("missing"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
