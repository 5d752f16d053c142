//! Flash record system reads.

use log::{debug, warn};

use super::Command;
use crate::{
    channel::Channel,
    connection::BusLink,
    decode::Decode,
    packets::{
        control::{reports, FrsReadRequest, FrsReadResponse, FrsStatus},
        input::QPoints,
    },
    session::{Session, SessionError},
};

/// Metadata record IDs of the sensors with configurable Q-points.
#[allow(unused)]
pub mod records {
    pub const ACCELEROMETER_METADATA: u16 = 0xE302;
    pub const LINEAR_ACCELERATION_METADATA: u16 = 0xE303;
    pub const GRAVITY_METADATA: u16 = 0xE304;
    pub const GYROSCOPE_METADATA: u16 = 0xE306;
    pub const MAGNETOMETER_METADATA: u16 = 0xE309;
    pub const ROTATION_VECTOR_METADATA: u16 = 0xE30B;
}

/// Word of a metadata record holding Q-point 1 in its low half.
const Q_POINT_WORD: usize = 7;

/// Reads a whole flash record as 32-bit words. An empty record yields no words.
#[derive(Debug, Clone, Copy)]
pub struct ReadFrs {
    pub record: u16,
}

impl Command for ReadFrs {
    type Output = Vec<u32>;

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        session.send_packet(Channel::Control, FrsReadRequest::whole_record(self.record))?;
        let attempts = session.config().max_attempts;
        let record = self.record.to_le_bytes();

        let mut words = Vec::new();
        loop {
            let packet = session.await_response(
                |packet| {
                    packet.is_report(Channel::Control, reports::FRS_READ_RESPONSE)
                        && packet.cargo.get(12..14) == Some(&record[..])
                },
                attempts,
            )?;
            let response = FrsReadResponse::decode(&mut packet.cargo.as_slice())?;

            if response.status == FrsStatus::RecordEmpty {
                debug!("FRS record 0x{:04X} is empty", self.record);
                return Ok(Vec::new());
            }
            if response.status.is_failure() {
                return Err(SessionError::CommandFailed {
                    command: reports::FRS_READ_REQUEST,
                    status: response.status.code(),
                });
            }

            let offset = response.offset as usize;
            let data = response.valid_words();
            if words.len() < offset + data.len() {
                words.resize(offset + data.len(), 0);
            }
            words[offset..offset + data.len()].copy_from_slice(data);

            if response.status.is_complete() {
                debug!(
                    "Read {} words of FRS record 0x{:04X}",
                    words.len(),
                    self.record
                );
                return Ok(words);
            }
        }
    }
}

/// Refreshes the session's Q-points from the sensor metadata records.
///
/// Sensors whose metadata record is empty, short or holds a Q-point outside the `i8` range
/// keep their current Q-point. The rotation accuracy Q-point is not part of the loaded
/// records and stays at its current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadQPoints;

impl Command for LoadQPoints {
    type Output = QPoints;

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        let mut q_points = *session.q_points();
        let targets: [(u16, &mut i8); 6] = [
            (records::ACCELEROMETER_METADATA, &mut q_points.accelerometer),
            (
                records::LINEAR_ACCELERATION_METADATA,
                &mut q_points.linear_acceleration,
            ),
            (records::GRAVITY_METADATA, &mut q_points.gravity),
            (records::GYROSCOPE_METADATA, &mut q_points.gyroscope),
            (records::MAGNETOMETER_METADATA, &mut q_points.magnetometer),
            (
                records::ROTATION_VECTOR_METADATA,
                &mut q_points.rotation_vector,
            ),
        ];

        for (record, q_point) in targets {
            let words = session.execute_command(ReadFrs { record })?;
            match words.get(Q_POINT_WORD) {
                Some(word) => {
                    let raw = (*word & 0xFFFF) as u16 as i16;
                    match i8::try_from(raw) {
                        Ok(q) => {
                            *q_point = q;
                            debug!("Q-point of record 0x{:04X} is {}", record, q);
                        }
                        Err(_) => warn!(
                            "Metadata record 0x{:04X} has Q-point {}, keeping {}",
                            record, raw, q_point
                        ),
                    }
                }
                None => warn!(
                    "Metadata record 0x{:04X} has {} words, keeping Q-point {}",
                    record,
                    words.len(),
                    q_point
                ),
            }
        }

        session.set_q_points(q_points);
        Ok(q_points)
    }
}

#[cfg(test)]
mod tests {
    use super::{records, LoadQPoints, ReadFrs};
    use crate::{
        channel::Channel,
        connection::mock::MockLink,
        packets::input::QPoints,
        session::{tests::session, SessionError},
    };

    fn frs_response(status: u8, offset: u16, words: [u32; 2], len: u8, record: u16) -> Vec<u8> {
        let mut cargo = vec![0xF3, len << 4 | status];
        cargo.extend_from_slice(&offset.to_le_bytes());
        cargo.extend_from_slice(&words[0].to_le_bytes());
        cargo.extend_from_slice(&words[1].to_le_bytes());
        cargo.extend_from_slice(&record.to_le_bytes());
        cargo.extend_from_slice(&[0, 0]);
        cargo
    }

    /// Queues the eight-word metadata record `record` with `q_point` in word 7.
    fn queue_metadata(link: &mut MockLink, record: u16, q_point: u32) {
        for offset in (0..8).step_by(2) {
            let status = if offset == 6 { 7 } else { 0 };
            let second = if offset == 6 { q_point } else { offset as u32 + 1 };
            link.queue(
                Channel::Control,
                1,
                &frs_response(status, offset, [offset as u32, second], 2, record),
            );
        }
    }

    #[test]
    fn read_frs_collects_words() {
        let mut link = MockLink::new();
        queue_metadata(&mut link, 0xE302, 0x0001_0008);
        let mut session = session(link);

        let words = session
            .execute_command(ReadFrs { record: 0xE302 })
            .unwrap();
        assert_eq!(words, vec![0, 1, 2, 3, 4, 5, 6, 0x0001_0008]);
        assert_eq!(
            session.link().written_cargo(),
            vec![&[0xF4, 0x00, 0x00, 0x00, 0x02, 0xE3, 0x00, 0x00][..]]
        );
    }

    #[test]
    fn read_frs_skips_other_records() {
        let mut link = MockLink::new();
        link.queue(
            Channel::Control,
            1,
            &frs_response(3, 0, [9, 9], 2, 0xE303),
        )
        .queue(Channel::Control, 2, &frs_response(3, 0, [1, 2], 1, 0xE302));
        let mut session = session(link);

        let words = session
            .execute_command(ReadFrs { record: 0xE302 })
            .unwrap();
        assert_eq!(words, vec![1]);
    }

    #[test]
    fn read_frs_empty_and_failed() {
        let mut link = MockLink::new();
        link.queue(Channel::Control, 1, &frs_response(5, 0, [0, 0], 0, 0xE312))
            .queue(Channel::Control, 2, &frs_response(1, 0, [0, 0], 0, 0xE312));
        let mut session = session(link);

        let words = session
            .execute_command(ReadFrs { record: 0xE312 })
            .unwrap();
        assert!(words.is_empty());
        assert!(matches!(
            session.execute_command(ReadFrs { record: 0xE312 }),
            Err(SessionError::CommandFailed {
                command: 0xF4,
                status: 1
            })
        ));
    }

    #[test]
    fn load_q_points() {
        let mut link = MockLink::new();
        queue_metadata(&mut link, records::ACCELEROMETER_METADATA, 7);
        queue_metadata(&mut link, records::LINEAR_ACCELERATION_METADATA, 8);
        queue_metadata(&mut link, records::GRAVITY_METADATA, 8);
        queue_metadata(&mut link, records::GYROSCOPE_METADATA, 10);
        // Short magnetometer record keeps the default
        link.queue(
            Channel::Control,
            1,
            &frs_response(7, 0, [0, 0], 2, records::MAGNETOMETER_METADATA),
        );
        queue_metadata(&mut link, records::ROTATION_VECTOR_METADATA, 0x000C_000E);
        let mut session = session(link);

        let q_points = session.execute_command(LoadQPoints).unwrap();
        assert_eq!(
            q_points,
            QPoints {
                accelerometer: 7,
                gyroscope: 10,
                ..QPoints::default()
            }
        );
        assert_eq!(session.q_points(), &q_points);
    }

    #[test]
    fn load_q_points_rejects_out_of_range_values() {
        let mut link = MockLink::new();
        queue_metadata(&mut link, records::ACCELEROMETER_METADATA, 0x0000_0180);
        queue_metadata(&mut link, records::LINEAR_ACCELERATION_METADATA, 0x0000_FF80);
        queue_metadata(&mut link, records::GRAVITY_METADATA, 8);
        queue_metadata(&mut link, records::GYROSCOPE_METADATA, 9);
        queue_metadata(&mut link, records::MAGNETOMETER_METADATA, 4);
        // Q-point 2 in the high half does not touch the rotation accuracy
        queue_metadata(&mut link, records::ROTATION_VECTOR_METADATA, 0x000D_0180);
        let mut session = session(link);

        let q_points = session.execute_command(LoadQPoints).unwrap();
        assert_eq!(
            q_points,
            QPoints {
                linear_acceleration: -128,
                ..QPoints::default()
            }
        );
        assert_eq!(q_points.accelerometer, 8);
        assert_eq!(q_points.rotation_vector, 14);
        assert_eq!(q_points.rotation_accuracy, 12);
    }
}
