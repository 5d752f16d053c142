//! Request/response exchanges with the sensor hub and the reset handshake.

use std::{io, thread::sleep, time::Duration};

use log::{debug, error, trace, warn};
use thiserror::Error;

use crate::{
    channel::{Channel, ChannelSequencer},
    commands::Command,
    connection::{BusLink, TransportError},
    decode::{Decode, DecodeError},
    encode::{Encode, EncodeError},
    packets::{
        command::{Advertisement, ErrorList, ErrorListRequest, ERROR_LIST},
        control::{reports, CommandRequest, COMMAND_PARAMS_LEN},
        executable::{ExecutableCommand, ExecutableResponse},
        input::QPoints,
        Packet, ShtpHeader, HEADER_LEN,
    },
};

/// Timing and polling limits of a [`Session`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SessionConfig {
    /// Delay before every poll while waiting for a response.
    pub poll_interval: Duration,
    /// Delay between reading a header and reading the packet body.
    pub body_read_delay: Duration,
    /// Time the hub needs to reboot after a reset command.
    pub reset_delay: Duration,
    /// Time given to the hub after enabling a feature and between product ID records.
    pub settle_delay: Duration,
    /// Polls spent waiting for a control response.
    pub max_attempts: usize,
    /// Polls spent waiting for an input report.
    pub report_attempts: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_micros(200),
            body_read_delay: Duration::from_millis(1),
            reset_delay: Duration::from_millis(700),
            settle_delay: Duration::from_millis(200),
            max_attempts: 4,
            report_attempts: 10,
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No matching response after {attempts} attempts")]
    ResponseTimeout { attempts: usize },

    #[error("Reset handshake expected {expected}, found {found:?}")]
    ProtocolSequence {
        expected: &'static str,
        /// Channel and report ID of the packet received instead, if any.
        found: Option<(Channel, u8)>,
    },

    #[error("Packet decoding error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Packet encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Command 0x{command:02X} failed with status {status}")]
    CommandFailed { command: u8, status: u8 },
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        Self::Transport(error.into())
    }
}

/// Progress of the reset handshake.
///
/// A failed handshake leaves the state at the step that failed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum HandshakeState {
    #[default]
    Idle,
    SendReset,
    AwaitAdvertisement,
    AwaitResetComplete,
    AwaitHubInit,
    Ready,
}

/// A connection to one sensor hub.
///
/// The session owns the bus link and all per-channel bookkeeping. Every operation takes
/// `&mut self`, so at most one exchange is in flight at any time.
#[derive(Debug)]
pub struct Session<B: BusLink> {
    link: B,
    sequencer: ChannelSequencer,
    command_sequence: u8,
    state: HandshakeState,
    q_points: QPoints,
    config: SessionConfig,
}

impl<B: BusLink> Session<B> {
    pub fn new(link: B) -> Self {
        Self::with_config(link, SessionConfig::default())
    }

    pub fn with_config(link: B, config: SessionConfig) -> Self {
        Self {
            link,
            sequencer: ChannelSequencer::new(),
            command_sequence: 0,
            state: HandshakeState::Idle,
            q_points: QPoints::default(),
            config,
        }
    }

    /// Sends `cargo` on `channel` with the channel's next sequence number.
    pub fn send(&mut self, channel: Channel, cargo: &[u8]) -> Result<(), SessionError> {
        let sequence = self.sequencer.next_send_sequence(channel);
        let encoded = Packet::encode(channel, sequence, cargo)?;
        trace!("TX {} seq {}: {:02X?}", channel, sequence, encoded);

        let written = self.link.write_bytes(&encoded)?;
        if written != encoded.len() {
            return Err(TransportError::ShortWrite {
                expected: encoded.len(),
                written,
            }
            .into());
        }
        Ok(())
    }

    /// Encodes `payload` and sends it on `channel`.
    pub fn send_packet(
        &mut self,
        channel: Channel,
        payload: impl Encode,
    ) -> Result<(), SessionError> {
        let cargo = payload.encode()?;
        self.send(channel, &cargo)
    }

    /// First phase of a receive: reads the next header.
    ///
    /// Returns `None` when the hub has no cargo queued. The body of such a packet must not
    /// be read, the hub stops answering if it is.
    pub fn peek_length(&mut self) -> Result<Option<ShtpHeader>, SessionError> {
        let mut raw = [0u8; HEADER_LEN];
        let read = self.link.read_bytes(&mut raw)?;
        if read != HEADER_LEN {
            return Err(TransportError::ShortRead {
                expected: HEADER_LEN,
                read,
            }
            .into());
        }

        let header = ShtpHeader::decode(&mut raw.as_slice())?;
        if !header.has_cargo() {
            trace!("RX header {:02X?} without cargo", raw);
            return Ok(None);
        }
        Ok(Some(header))
    }

    /// Second phase of a receive: reads the whole packet `header` announced.
    pub fn read_body(&mut self, header: &ShtpHeader) -> Result<Packet, SessionError> {
        sleep(self.config.body_read_delay);

        let expected = header.length as usize;
        let mut body = vec![0u8; expected];
        let read = self.link.read_bytes(&mut body)?;
        if read != expected {
            return Err(TransportError::ShortRead { expected, read }.into());
        }

        let packet = Packet::from_body(&body)?;
        trace!(
            "RX {} seq {}: {:02X?}",
            packet.channel,
            packet.sequence,
            &body[..body.len().min(24)]
        );
        self.sequencer
            .observe_receive_sequence(packet.channel, packet.sequence);
        Ok(packet)
    }

    /// Reads the next packet, or `None` when the hub has nothing queued.
    pub fn receive(&mut self) -> Result<Option<Packet>, SessionError> {
        match self.peek_length()? {
            Some(header) => Ok(Some(self.read_body(&header)?)),
            None => Ok(None),
        }
    }

    /// Polls for a packet accepted by `matcher`, discarding anything else.
    ///
    /// Gives up with [`SessionError::ResponseTimeout`] after exactly `max_attempts` polls.
    pub fn await_response(
        &mut self,
        mut matcher: impl FnMut(&Packet) -> bool,
        max_attempts: usize,
    ) -> Result<Packet, SessionError> {
        for attempt in 1..=max_attempts {
            sleep(self.config.poll_interval);
            match self.receive()? {
                Some(packet) if matcher(&packet) => {
                    debug!("Response on {} after {} polls", packet.channel, attempt);
                    return Ok(packet);
                }
                Some(packet) => warn!(
                    "Discarding packet on {} with report ID {:02X?}",
                    packet.channel,
                    packet.report_id()
                ),
                None => trace!("Poll {}/{} returned no data", attempt, max_attempts),
            }
        }

        Err(SessionError::ResponseTimeout {
            attempts: max_attempts,
        })
    }

    /// Sends `cargo` on `channel` and waits for a packet accepted by `matcher`.
    pub fn request_response(
        &mut self,
        channel: Channel,
        cargo: &[u8],
        matcher: impl FnMut(&Packet) -> bool,
        max_attempts: usize,
    ) -> Result<Packet, SessionError> {
        self.send(channel, cargo)?;
        self.await_response(matcher, max_attempts)
    }

    /// Sends a control channel command request and returns the command sequence it used.
    pub fn send_command_request(
        &mut self,
        command: u8,
        params: [u8; COMMAND_PARAMS_LEN],
    ) -> Result<u8, SessionError> {
        let request = CommandRequest {
            sequence: self.next_command_sequence(),
            command,
            params,
        };
        debug!(
            "Command request 0x{:02X} with sequence {}",
            command, request.sequence
        );
        self.send_packet(Channel::Control, request)?;
        Ok(request.sequence)
    }

    /// Sends a command request and waits for the command response answering it.
    pub fn command(
        &mut self,
        command: u8,
        params: [u8; COMMAND_PARAMS_LEN],
    ) -> Result<Packet, SessionError> {
        self.send_command_request(command, params)?;
        let attempts = self.config.max_attempts;
        self.await_response(
            |packet| {
                packet.is_report(Channel::Control, reports::COMMAND_RESPONSE)
                    && packet.cargo.get(2) == Some(&command)
            },
            attempts,
        )
    }

    /// Resets the hub and walks it through its startup announcements.
    ///
    /// After the reset command the hub sends, in this order, an advertisement on the command
    /// channel, "reset complete" on the executable channel and a hub initialization packet
    /// on the control channel. Anything else aborts the handshake.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.state = HandshakeState::SendReset;
        debug!("Resetting sensor hub");
        self.send_packet(Channel::Executable, ExecutableCommand::Reset)?;
        self.sequencer.reset();
        sleep(self.config.reset_delay);

        self.state = HandshakeState::AwaitAdvertisement;
        let advertisement =
            self.expect_startup_packet("advertisement", |packet| packet.is_advertisement())?;
        match Advertisement::decode(&mut advertisement.cargo.as_slice()) {
            Ok(advertisement) => debug!(
                "Advertisement with {} entries",
                advertisement.entries.len()
            ),
            Err(e) => warn!("Could not decode advertisement: {}", e),
        }

        self.state = HandshakeState::AwaitResetComplete;
        self.expect_startup_packet("reset complete", |packet| {
            packet.is_report(Channel::Executable, ExecutableResponse::RESET_COMPLETE)
        })?;

        self.state = HandshakeState::AwaitHubInit;
        self.expect_startup_packet("hub initialization", |packet| {
            packet.channel == Channel::Control
        })?;

        self.state = HandshakeState::Ready;
        debug!("Reset complete");
        Ok(())
    }

    fn expect_startup_packet(
        &mut self,
        expected: &'static str,
        accept: impl Fn(&Packet) -> bool,
    ) -> Result<Packet, SessionError> {
        match self.receive()? {
            Some(packet) if accept(&packet) => {
                if packet.sequence != 1 {
                    warn!(
                        "Got {} with sequence {}, expected 1",
                        expected, packet.sequence
                    );
                }
                Ok(packet)
            }
            other => {
                let found =
                    other.map(|packet| (packet.channel, packet.report_id().unwrap_or(0)));
                error!(
                    "Reset handshake failed waiting for {}, found {:?}",
                    expected, found
                );
                Err(SessionError::ProtocolSequence { expected, found })
            }
        }
    }

    /// Brings a freshly opened session into the ready state.
    ///
    /// Right after power-up the hub records an error for the first host write, since its
    /// advertisement is still pending. A non-empty error list therefore triggers a reset.
    pub fn startup_check(&mut self) -> Result<(), SessionError> {
        self.send_packet(Channel::Command, ErrorListRequest)?;
        let attempts = self.config.max_attempts;
        let packet = self.await_response(
            |packet| packet.is_report(Channel::Command, ERROR_LIST),
            attempts,
        )?;

        // Any entry counts, including codes missing from the error table
        let entries = packet.cargo.len().saturating_sub(1);
        if entries == 0 {
            debug!("Error list is empty");
            self.state = HandshakeState::Ready;
            return Ok(());
        }

        match ErrorList::decode(&mut packet.cargo.as_slice()) {
            Ok(errors) => {
                for error in errors.into_inner() {
                    debug!("SHTP error {}", error);
                }
            }
            Err(e) => warn!("Error list with {} entries: {}", entries, e),
        }
        self.reset()
    }

    /// Increments the command sequence and returns the new value.
    pub fn next_command_sequence(&mut self) -> u8 {
        self.command_sequence = self.command_sequence.wrapping_add(1);
        self.command_sequence
    }

    /// Executes a [`Command`].
    pub fn execute_command<C: Command>(
        &mut self,
        command: C,
    ) -> Result<C::Output, SessionError> {
        command.execute(self)
    }

    /// Sleeps for the configured settle delay.
    pub fn settle(&self) {
        sleep(self.config.settle_delay);
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sequencer(&self) -> &ChannelSequencer {
        &self.sequencer
    }

    pub fn q_points(&self) -> &QPoints {
        &self.q_points
    }

    pub fn set_q_points(&mut self, q_points: QPoints) {
        self.q_points = q_points;
    }

    /// Releases the bus link.
    pub fn into_inner(self) -> B {
        self.link
    }

    #[cfg(test)]
    pub(crate) fn link(&self) -> &B {
        &self.link
    }

    #[cfg(test)]
    pub(crate) fn link_mut(&mut self) -> &mut B {
        &mut self.link
    }
}
