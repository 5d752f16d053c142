//! I2C bus link over any `embedded-hal` bus.

use std::io;

use embedded_hal::i2c::I2c;
use log::debug;

use super::BusLink;

/// Bus the hub is usually wired to on a Raspberry Pi.
pub const DEFAULT_BUS: &str = "/dev/i2c-1";

/// Hub address with SA0 pulled low.
pub const DEFAULT_ADDRESS: u8 = 0x4A;

/// Hub address with SA0 pulled high.
pub const ALTERNATE_ADDRESS: u8 = 0x4B;

/// A hub at a fixed 7-bit address on an I2C bus.
///
/// Every `write_bytes` and `read_bytes` is one complete bus transfer, so a read always
/// starts at the SHTP header.
#[derive(Debug)]
pub struct I2cLink<I> {
    bus: I,
    address: u8,
}

impl<I: I2c> I2cLink<I> {
    pub fn new(bus: I, address: u8) -> Self {
        debug!("Using I2C target 0x{:02X}", address);
        Self { bus, address }
    }

    /// Selects the 7-bit address all further transfers go to.
    pub fn set_target_address(&mut self, address: u8) {
        debug!("Selected I2C target 0x{:02X}", address);
        self.address = address;
    }

    pub fn target_address(&self) -> u8 {
        self.address
    }

    /// Gives the bus back.
    pub fn release(self) -> I {
        self.bus
    }
}

#[cfg(target_os = "linux")]
impl I2cLink<linux_embedded_hal::I2cdev> {
    /// Opens a `/dev/i2c-N` character device and targets the hub at `address`.
    pub fn open(path: impl AsRef<std::path::Path>, address: u8) -> io::Result<Self> {
        let path = path.as_ref();
        debug!("Opening I2C bus {}", path.display());
        let bus = linux_embedded_hal::I2cdev::new(path)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(Self::new(bus, address))
    }
}

fn bus_error<E: embedded_hal::i2c::Error>(error: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("I2C {:?}", error.kind()))
}

impl<I: I2c> BusLink for I2cLink<I> {
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bus.write(self.address, buf).map_err(bus_error)?;
        Ok(buf.len())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.bus.read(self.address, buf).map_err(bus_error)?;
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

    use super::{I2cLink, ALTERNATE_ADDRESS, DEFAULT_ADDRESS};
    use crate::connection::BusLink;

    #[derive(Debug, Default)]
    struct FakeBus {
        writes: Vec<(u8, Vec<u8>)>,
        reads: VecDeque<Vec<u8>>,
        nack: bool,
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.nack {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for operation in operations {
                match operation {
                    Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                    Operation::Read(buf) => {
                        let data = self.reads.pop_front().unwrap_or_default();
                        let n = data.len().min(buf.len());
                        buf[..n].copy_from_slice(&data[..n]);
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn transfers_go_to_target_address() {
        let mut link = I2cLink::new(FakeBus::default(), DEFAULT_ADDRESS);
        assert_eq!(link.write_bytes(&[0x05, 0x00, 0x01, 0x00, 0xF9]).unwrap(), 5);

        link.set_target_address(ALTERNATE_ADDRESS);
        assert_eq!(link.target_address(), 0x4B);
        link.write_bytes(&[0x05, 0x00, 0x01, 0x01, 0x01]).unwrap();

        let bus = link.release();
        assert_eq!(bus.writes[0].0, 0x4A);
        assert_eq!(bus.writes[1], (0x4B, vec![0x05, 0x00, 0x01, 0x01, 0x01]));
    }

    #[test]
    fn read_fills_whole_buffer() {
        let mut bus = FakeBus::default();
        bus.reads.push_back(vec![0x14, 0x81, 0x00, 0x01]);
        let mut link = I2cLink::new(bus, DEFAULT_ADDRESS);

        let mut header = [0u8; 4];
        assert_eq!(link.read_bytes(&mut header).unwrap(), 4);
        assert_eq!(header, [0x14, 0x81, 0x00, 0x01]);
    }

    #[test]
    fn bus_errors_become_io_errors() {
        let bus = FakeBus {
            nack: true,
            ..Default::default()
        };
        let mut link = I2cLink::new(bus, DEFAULT_ADDRESS);

        let err = link.write_bytes(&[0x00]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Other);
        assert!(err.to_string().contains("NoAcknowledge"));
        assert!(link.read_bytes(&mut [0u8; 4]).is_err());
    }
}
