//! Crate for driving BNO080 sensor hubs over the Sensor Hub Transport Protocol (SHTP).
//!
//! This crate is structured around two key traits: [`Encode`](encode::Encode) and [`Decode`](decode::Decode).
//! These traits are used to encode cargo sent to the hub and decode cargo received from it.
//! All packet types in this library have either an [`Encode`](encode::Encode) or [`Decode`](decode::Decode) implementation.
//!
//! A [`Session`](session::Session) owns the bus link and performs the packet exchanges. Because
//! assembling requests and matching responses by hand is a chore, this library also provides
//! high level [`Command`](commands::Command)s, such as reading a sensor or saving calibration.
//!
//! ```no_run
//! # #[cfg(all(feature = "i2c", target_os = "linux"))]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bno080_shtp::{
//!     commands::sensor::ReadSensor,
//!     connection::i2c::{I2cLink, DEFAULT_ADDRESS, DEFAULT_BUS},
//!     packets::input::SensorReportId,
//!     session::Session,
//! };
//!
//! let mut session = Session::new(I2cLink::open(DEFAULT_BUS, DEFAULT_ADDRESS)?);
//! session.startup_check()?;
//! let sample = session.execute_command(ReadSensor::new(SensorReportId::RotationVector))?;
//! println!("{:?}", sample.values(session.q_points()));
//! # Ok(())
//! # }
//! # #[cfg(not(all(feature = "i2c", target_os = "linux")))]
//! # fn main() {}
//! ```

pub mod channel;
pub mod commands;
pub mod connection;
pub mod decode;
pub mod encode;
pub mod packets;
pub mod session;

#[cfg(feature = "calibration-file")]
pub mod calibration;
