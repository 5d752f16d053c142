//! SHTP packet framing and the typed cargo carried on each channel.
//!
//! Every SHTP packet starts with a four byte header:
//!
//! ```text
//! byte 0  length LSB
//! byte 1  length MSB, bit 7 is the continuation flag
//! byte 2  channel number
//! byte 3  sender's sequence number for that channel
//! ```
//!
//! The length counts the header itself, so a packet that carries no cargo has a length of 4
//! (or 0 when the hub has nothing queued at all).

use log::trace;

use crate::{
    channel::Channel,
    decode::{Decode, DecodeError},
    encode::{Encode, EncodeError},
};

pub mod command;
pub mod control;
pub mod executable;
pub mod input;

/// Size of the SHTP packet header.
pub const HEADER_LEN: usize = 4;

/// Largest packet (header and cargo) the hub accepts.
pub const MAX_PACKET_SIZE: usize = 32762;

/// Largest cargo that fits into one packet.
pub const MAX_CARGO_LEN: usize = MAX_PACKET_SIZE - HEADER_LEN;

const CONTINUATION_BIT: u16 = 1 << 15;

/// Decoded SHTP packet header.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ShtpHeader {
    /// Total packet length including the header, continuation bit masked out.
    pub length: u16,
    /// Set when this packet continues a cargo that did not fit a single transfer.
    pub continuation: bool,
    /// Raw channel byte.
    pub channel: u8,
    /// Raw sequence byte.
    pub sequence: u8,
}

impl ShtpHeader {
    pub fn new(channel: Channel, sequence: u8, cargo_len: usize) -> Result<Self, EncodeError> {
        let size = cargo_len + HEADER_LEN;
        if size > MAX_PACKET_SIZE {
            return Err(EncodeError::PacketTooLarge { size });
        }

        Ok(Self {
            length: size as u16,
            continuation: false,
            channel: channel as u8,
            sequence,
        })
    }

    /// Number of cargo bytes advertised by this header.
    ///
    /// Headers advertising less than a full header (including the all-zero "nothing queued"
    /// header) carry no cargo.
    pub fn cargo_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_LEN)
    }

    pub fn has_cargo(&self) -> bool {
        self.cargo_len() > 0
    }
}

impl Encode for ShtpHeader {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut length = self.length & !CONTINUATION_BIT;
        if self.continuation {
            length |= CONTINUATION_BIT;
        }
        let [lsb, msb] = length.to_le_bytes();
        Ok(vec![lsb, msb, self.channel, self.sequence])
    }
}

impl Decode for ShtpHeader {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let raw_length = u16::decode(data)?;
        let channel = u8::decode(data)?;
        let sequence = u8::decode(data)?;

        Ok(Self {
            length: raw_length & !CONTINUATION_BIT,
            continuation: raw_length & CONTINUATION_BIT != 0,
            channel,
            sequence,
        })
    }
}

/// One SHTP packet as seen by the session.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Packet {
    pub channel: Channel,
    pub sequence: u8,
    pub continuation: bool,
    pub cargo: Vec<u8>,
}

impl Packet {
    pub fn new(channel: Channel, sequence: u8, cargo: Vec<u8>) -> Self {
        Self {
            channel,
            sequence,
            continuation: false,
            cargo,
        }
    }

    /// Frames `cargo` for transmission on `channel`.
    pub fn encode(channel: Channel, sequence: u8, cargo: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let header = ShtpHeader::new(channel, sequence, cargo.len())?;

        let mut encoded = header.encode()?;
        encoded.extend_from_slice(cargo);
        Ok(encoded)
    }

    /// Builds a packet from the bytes of a body read.
    ///
    /// The body read repeats the header, and its channel and sequence bytes are the
    /// authoritative ones. Only the number of bytes the header advertises is kept as cargo.
    pub fn from_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut data = body;
        let header = ShtpHeader::decode(&mut data)?;
        let channel = Channel::try_from(header.channel)?;

        let cargo_len = header.cargo_len().min(data.len());
        if cargo_len < header.cargo_len() {
            trace!(
                "Body repeats a header advertising {} cargo bytes, only {} present",
                header.cargo_len(),
                data.len()
            );
        }

        Ok(Self {
            channel,
            sequence: header.sequence,
            continuation: header.continuation,
            cargo: data[..cargo_len].to_vec(),
        })
    }

    /// First cargo byte, which identifies the report or command carried by the packet.
    pub fn report_id(&self) -> Option<u8> {
        self.cargo.first().copied()
    }

    /// Returns true if this packet arrived on `channel` and carries report `report_id`.
    pub fn is_report(&self, channel: Channel, report_id: u8) -> bool {
        self.channel == channel && self.report_id() == Some(report_id)
    }

    /// Returns true for the unsolicited advertisement the hub sends after power-up or reset.
    pub fn is_advertisement(&self) -> bool {
        self.is_report(Channel::Command, command::ADVERTISEMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::{Packet, ShtpHeader, MAX_CARGO_LEN};
    use crate::{
        channel::Channel,
        decode::{Decode, DecodeError},
        encode::{Encode, EncodeError},
    };

    #[test]
    fn encode_writes_header_then_cargo() {
        let encoded = Packet::encode(Channel::Control, 3, &[0xF9, 0x00]).unwrap();
        assert_eq!(encoded, vec![0x06, 0x00, 0x02, 0x03, 0xF9, 0x00]);
    }

    #[test]
    fn encode_rejects_oversized_cargo() {
        let cargo = vec![0u8; MAX_CARGO_LEN + 1];
        assert_eq!(
            Packet::encode(Channel::Reports, 0, &cargo),
            Err(EncodeError::PacketTooLarge {
                size: MAX_CARGO_LEN + 5
            })
        );

        let cargo = vec![0u8; MAX_CARGO_LEN];
        let encoded = Packet::encode(Channel::Reports, 0, &cargo).unwrap();
        assert_eq!(encoded.len(), 32762);
    }

    #[test]
    fn advertisement_header() {
        let mut data: &[u8] = &[0x14, 0x81, 0x00, 0x01];
        let header = ShtpHeader::decode(&mut data).unwrap();

        // 0x8114 with the continuation bit masked out
        assert_eq!(header.length, 276);
        assert!(header.continuation);
        assert_eq!(header.channel, 0);
        assert_eq!(header.sequence, 1);
        assert_eq!(header.cargo_len(), 272);

        let mut body = vec![0x14, 0x81, 0x00, 0x01, 0x00, 0x01, 0x04, 0x00, 0x00, 0x00, 0x00];
        body.resize(276, 0);
        let packet = Packet::from_body(&body).unwrap();
        assert_eq!(packet.channel, Channel::Command);
        assert_eq!(packet.sequence, 1);
        assert_eq!(packet.cargo.len(), 272);
        assert!(packet.is_advertisement());
    }

    #[test]
    fn continuation_flag_round_trips() {
        let header = ShtpHeader {
            length: 20,
            continuation: true,
            channel: 3,
            sequence: 9,
        };
        let encoded = header.encode().unwrap();
        assert_eq!(encoded, vec![0x14, 0x80, 0x03, 0x09]);
        assert_eq!(ShtpHeader::decode(&mut encoded.as_slice()).unwrap(), header);
    }

    #[test]
    fn empty_headers_carry_no_cargo() {
        for raw in [[0u8, 0, 0, 0], [4, 0, 2, 7], [2, 0, 0, 0]] {
            let header = ShtpHeader::decode(&mut raw.as_slice()).unwrap();
            assert!(!header.has_cargo());
        }
    }

    #[test]
    fn body_on_unknown_channel() {
        let body = [0x05, 0x00, 0x09, 0x00, 0x01];
        assert_eq!(
            Packet::from_body(&body),
            Err(DecodeError::UnknownChannel(9))
        );
    }
}
