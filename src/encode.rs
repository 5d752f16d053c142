use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Packet of {size} bytes exceeds the maximum SHTP packet size of 32762 bytes")]
    PacketTooLarge { size: usize },
}

/// A trait that allows for encoding a structure into cargo bytes.
pub trait Encode {
    /// Encodes a structure into a byte sequence.
    fn encode(&self) -> Result<Vec<u8>, EncodeError>;
    fn into_encoded(self) -> Result<Vec<u8>, EncodeError>
    where
        Self: Sized,
    {
        self.encode()
    }
}
impl Encode for () {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(Vec::new())
    }
}
impl Encode for Vec<u8> {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(self.clone())
    }
}
impl Encode for [u8] {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(self.to_vec())
    }
}
