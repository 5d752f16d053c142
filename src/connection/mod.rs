//! Byte-level access to the bus the sensor hub is attached to.

use std::io;

use thiserror::Error;

#[cfg(feature = "i2c")]
pub mod i2c;

/// Blocking byte transport to one addressed sensor hub.
///
/// Each call is one bus transaction. Implementations return the number of bytes actually
/// transferred; the session treats any count other than the requested one as an error.
pub trait BusLink {
    /// Writes `buf` to the hub in a single transaction.
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Reads up to `buf.len()` bytes from the hub in a single transaction.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<B: BusLink + ?Sized> BusLink for &mut B {
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write_bytes(buf)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_bytes(buf)
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Short write: wrote {written} of {expected} bytes")]
    ShortWrite { expected: usize, written: usize },

    #[error("Short read: got {read} of {expected} bytes")]
    ShortRead { expected: usize, read: usize },

    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted bus link used by the session and command tests.

    use std::{collections::VecDeque, io};

    use log::trace;

    use super::BusLink;
    use crate::{channel::Channel, packets::Packet};

    /// Plays back queued hub packets the way the hub serves them: a header read followed by
    /// a body read that repeats the header. With nothing queued, header reads return zeros.
    #[derive(Debug, Default)]
    pub struct MockLink {
        incoming: VecDeque<Vec<u8>>,
        pending_body: Option<Vec<u8>>,
        /// Every buffer written by the host, in order.
        pub written: Vec<Vec<u8>>,
        /// Size of every read the host issued, in order.
        pub reads: Vec<usize>,
        short_write: Option<usize>,
        short_read: Option<usize>,
    }

    impl MockLink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a packet the hub will send.
        pub fn queue(&mut self, channel: Channel, sequence: u8, cargo: &[u8]) -> &mut Self {
            let packet = Packet::encode(channel, sequence, cargo).unwrap();
            self.incoming.push_back(packet);
            self
        }

        /// Queues raw bytes, header included.
        pub fn queue_raw(&mut self, bytes: Vec<u8>) -> &mut Self {
            self.incoming.push_back(bytes);
            self
        }

        /// Makes the next write transfer at most `limit` bytes.
        pub fn fail_next_write(&mut self, limit: usize) {
            self.short_write = Some(limit);
        }

        /// Makes the next body read transfer at most `limit` bytes.
        pub fn fail_next_body_read(&mut self, limit: usize) {
            self.short_read = Some(limit);
        }

        pub fn pending(&self) -> usize {
            self.incoming.len()
        }

        /// Cargo of every written packet, header stripped.
        pub fn written_cargo(&self) -> Vec<&[u8]> {
            self.written.iter().map(|w| &w[4..]).collect()
        }
    }

    impl BusLink for MockLink {
        fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
            trace!("mock write {:02X?}", buf);
            self.written.push(buf.to_vec());
            Ok(self
                .short_write
                .take()
                .map_or(buf.len(), |limit| limit.min(buf.len())))
        }

        fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.push(buf.len());

            if let Some(body) = self.pending_body.take() {
                let mut n = body.len().min(buf.len());
                if let Some(limit) = self.short_read.take() {
                    n = n.min(limit);
                }
                buf[..n].copy_from_slice(&body[..n]);
                return Ok(n);
            }

            match self.incoming.pop_front() {
                Some(packet) => {
                    let n = packet.len().min(buf.len());
                    buf[..n].copy_from_slice(&packet[..n]);
                    let length = u16::from_le_bytes([packet[0], packet[1]]) & 0x7FFF;
                    if length > 4 {
                        self.pending_body = Some(packet);
                    }
                    Ok(n)
                }
                None => {
                    buf.fill(0);
                    Ok(buf.len())
                }
            }
        }
    }
}
