//! SHTP channels and per-channel sequence tracking.

use std::fmt;

use log::trace;

use crate::decode::DecodeError;

/// Number of logical channels multiplexed over one bus connection.
pub const NUM_CHANNELS: usize = 6;

/// Logical SHTP channel.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Channel {
    /// SHTP command channel: advertisement and error list.
    Command = 0,
    /// Executable channel: reset, on and sleep. Reports "reset complete".
    Executable = 1,
    /// Sensor hub control channel for configuration commands and responses.
    Control = 2,
    /// Input sensor reports, device to host only.
    Reports = 3,
    /// Wake input sensor reports.
    WakeReports = 4,
    /// Gyro rotation vector, kept on its own channel for prioritization.
    Gyro = 5,
}

impl Channel {
    pub const ALL: [Channel; NUM_CHANNELS] = [
        Channel::Command,
        Channel::Executable,
        Channel::Control,
        Channel::Reports,
        Channel::WakeReports,
        Channel::Gyro,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Channel {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(DecodeError::UnknownChannel(value))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Command => "command",
            Channel::Executable => "executable",
            Channel::Control => "control",
            Channel::Reports => "reports",
            Channel::WakeReports => "wake reports",
            Channel::Gyro => "gyro",
        };
        write!(f, "{name} ({})", *self as u8)
    }
}

/// Tracks the host's send sequence and the hub's last reported sequence for every channel.
///
/// Sequence numbers are bookkeeping only. Nothing is retransmitted or rejected based on them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChannelSequencer {
    send: [u8; NUM_CHANNELS],
    received: [Option<u8>; NUM_CHANNELS],
}

impl ChannelSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the channel's send counter and returns the new value.
    pub fn next_send_sequence(&mut self, channel: Channel) -> u8 {
        let seq = &mut self.send[channel.index()];
        *seq = seq.wrapping_add(1);
        *seq
    }

    /// Records the sequence number the hub used on `channel`.
    pub fn observe_receive_sequence(&mut self, channel: Channel, sequence: u8) {
        let last = self.received[channel.index()].replace(sequence);
        if let Some(last) = last {
            if sequence != last.wrapping_add(1) {
                trace!(
                    "Hub sequence on {} jumped from {} to {}",
                    channel,
                    last,
                    sequence
                );
            }
        }
    }

    /// The last send sequence handed out for `channel`.
    pub fn last_sent(&self, channel: Channel) -> u8 {
        self.send[channel.index()]
    }

    pub fn last_received(&self, channel: Channel) -> Option<u8> {
        self.received[channel.index()]
    }

    /// Returns all counters to zero, as the hub does after a reset.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
