//! Sensor feature configuration and input report reads.

use log::debug;

use super::Command;
use crate::{
    channel::Channel,
    connection::BusLink,
    decode::Decode,
    packets::{
        control::{reports, FeatureReport, GetFeatureRequest, SetFeatureCommand},
        executable::ExecutableCommand,
        input::{SensorReportId, SensorSample, TIMESTAMP_PREAMBLE_LEN},
        Packet,
    },
    session::{Session, SessionError},
};

/// Report interval used when none is given.
pub const DEFAULT_REPORT_INTERVAL_US: u32 = 60_000;

fn is_feature_report(packet: &Packet, sensor: SensorReportId) -> bool {
    packet.is_report(Channel::Control, reports::GET_FEATURE_RESPONSE)
        && packet.cargo.get(1) == Some(&(sensor as u8))
}

fn is_input_report(packet: &Packet, sensor: SensorReportId) -> bool {
    matches!(packet.channel, Channel::Reports | Channel::WakeReports)
        && packet.cargo.get(TIMESTAMP_PREAMBLE_LEN) == Some(&(sensor as u8))
}

/// Starts periodic reports of `sensor` and returns the configuration the hub confirmed.
#[derive(Debug, Clone, Copy)]
pub struct EnableFeature {
    pub sensor: SensorReportId,
    /// Report interval in microseconds. Zero disables the sensor.
    pub interval_us: u32,
}

impl Command for EnableFeature {
    type Output = FeatureReport;

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        debug!("Enabling {} every {} us", self.sensor, self.interval_us);
        session.send_packet(
            Channel::Control,
            SetFeatureCommand::new(self.sensor as u8, self.interval_us),
        )?;
        let attempts = session.config().max_attempts;
        let packet =
            session.await_response(|packet| is_feature_report(packet, self.sensor), attempts)?;
        Ok(FeatureReport::decode(&mut packet.cargo.as_slice())?)
    }
}

/// Reads the current configuration of `sensor`.
#[derive(Debug, Clone, Copy)]
pub struct GetFeature {
    pub sensor: SensorReportId,
}

impl Command for GetFeature {
    type Output = FeatureReport;

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        session.send_packet(
            Channel::Control,
            GetFeatureRequest {
                report_id: self.sensor as u8,
            },
        )?;
        let attempts = session.config().max_attempts;
        let packet =
            session.await_response(|packet| is_feature_report(packet, self.sensor), attempts)?;
        Ok(FeatureReport::decode(&mut packet.cargo.as_slice())?)
    }
}

/// Enables `sensor` and returns its first input report.
///
/// Packets other than the sensor's input reports, including the hub's feature confirmation,
/// are skipped.
#[derive(Debug, Clone, Copy)]
pub struct ReadSensor {
    pub sensor: SensorReportId,
    pub interval_us: u32,
}

impl ReadSensor {
    pub fn new(sensor: SensorReportId) -> Self {
        Self {
            sensor,
            interval_us: DEFAULT_REPORT_INTERVAL_US,
        }
    }
}

impl Command for ReadSensor {
    type Output = SensorSample;

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        session.send_packet(
            Channel::Control,
            SetFeatureCommand::new(self.sensor as u8, self.interval_us),
        )?;
        session.settle();

        let attempts = session.config().report_attempts;
        let packet =
            session.await_response(|packet| is_input_report(packet, self.sensor), attempts)?;
        Ok(SensorSample::decode(&packet.cargo)?)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PowerState {
    On,
    Sleep,
}

/// Wakes the hub or puts it to sleep. The hub does not answer.
#[derive(Debug, Clone, Copy)]
pub struct SetPowerState(pub PowerState);

impl Command for SetPowerState {
    type Output = ();

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        let command = match self.0 {
            PowerState::On => ExecutableCommand::On,
            PowerState::Sleep => ExecutableCommand::Sleep,
        };
        session.send_packet(Channel::Executable, command)
    }
}

#[cfg(test)]
mod tests {
    use super::{EnableFeature, GetFeature, PowerState, ReadSensor, SetPowerState};
    use crate::{
        channel::Channel,
        connection::mock::MockLink,
        packets::input::{QPoints, SensorReportId, SensorSample},
        session::{tests::session, SessionError},
    };

    fn feature_response(report_id: u8, interval_us: u32) -> Vec<u8> {
        let mut cargo = vec![0xFC, report_id, 0x00, 0x00, 0x00];
        cargo.extend_from_slice(&interval_us.to_le_bytes());
        cargo.extend_from_slice(&[0; 8]);
        cargo
    }

    #[test]
    fn enable_feature() {
        let mut link = MockLink::new();
        link.queue(Channel::Control, 1, &feature_response(0x05, 60_000));
        let mut session = session(link);

        let report = session
            .execute_command(EnableFeature {
                sensor: SensorReportId::RotationVector,
                interval_us: 60_000,
            })
            .unwrap();
        assert!(report.is_enabled());
        assert_eq!(report.report_interval_us, 60_000);

        let written = session.link().written_cargo();
        assert_eq!(written[0].len(), 17);
        assert_eq!(&written[0][..2], &[0xFD, 0x05]);
    }

    #[test]
    fn get_feature_matches_sensor() {
        let mut link = MockLink::new();
        link.queue(Channel::Control, 1, &feature_response(0x01, 10_000))
            .queue(Channel::Control, 2, &feature_response(0x06, 0));
        let mut session = session(link);

        let report = session
            .execute_command(GetFeature {
                sensor: SensorReportId::Gravity,
            })
            .unwrap();
        assert_eq!(report.report_id, 0x06);
        assert!(!report.is_enabled());
        assert_eq!(session.link().written_cargo(), vec![&[0xFE, 0x06][..]]);
    }

    #[test]
    fn read_sensor() {
        let mut link = MockLink::new();
        link.queue(Channel::Control, 1, &feature_response(0x06, 60_000))
            .queue(
                Channel::Reports,
                1,
                &[0xFB, 0, 0, 0, 0, 0x01, 0, 3, 0, 0, 1, 0, 0, 0, 0],
            )
            .queue(
                Channel::Reports,
                2,
                &[0xFB, 0, 0, 0, 0, 0x06, 0, 3, 0, 0x00, 0x00, 0x00, 0x00, 0xCE, 0x09],
            );
        let mut session = session(link);

        let sample = session
            .execute_command(ReadSensor::new(SensorReportId::Gravity))
            .unwrap();
        let SensorSample::Gravity(v) = sample else {
            panic!("unexpected sample {sample:?}");
        };
        assert_eq!(v.z, 0x09CE);
        assert_eq!(v.accuracy, 3);
        let values = sample.values(&QPoints::default());
        assert!((values[2] - 9.805).abs() < 0.01);
    }

    #[test]
    fn read_sensor_gives_up() {
        let mut session = session(MockLink::new());
        assert!(matches!(
            session.execute_command(ReadSensor::new(SensorReportId::Accelerometer)),
            Err(SessionError::ResponseTimeout { attempts: 10 })
        ));
    }

    #[test]
    fn read_sensor_ignores_gyro_channel() {
        // Gyro channel reports carry no timestamp preamble, so byte 5 is not a sensor ID
        let mut link = MockLink::new();
        link.queue(Channel::Gyro, 1, &[0, 0, 0, 0, 0, 0x01, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut session = session(link);

        assert!(matches!(
            session.execute_command(ReadSensor::new(SensorReportId::Accelerometer)),
            Err(SessionError::ResponseTimeout { attempts: 10 })
        ));
        assert_eq!(session.link().pending(), 0);
    }

    #[test]
    fn power_state() {
        let mut session = session(MockLink::new());
        session
            .execute_command(SetPowerState(PowerState::Sleep))
            .unwrap();
        assert_eq!(session.link().written[0], vec![0x05, 0x00, 0x01, 0x01, 0x03]);
    }
}
