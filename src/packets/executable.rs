//! Executable channel (channel 1) cargo.

use crate::{
    decode::{Decode, DecodeError},
    encode::{Encode, EncodeError},
};

/// Host to hub commands on the executable channel.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum ExecutableCommand {
    Reset = 1,
    On = 2,
    Sleep = 3,
}

impl Encode for ExecutableCommand {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(vec![*self as u8])
    }
}

/// Hub to host responses on the executable channel.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExecutableResponse {
    ResetComplete,
}

impl ExecutableResponse {
    pub const RESET_COMPLETE: u8 = 1;
}

impl Decode for ExecutableResponse {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(data)? {
            Self::RESET_COMPLETE => Ok(Self::ResetComplete),
            value => Err(DecodeError::UnexpectedValue {
                value,
                expected: &[Self::RESET_COMPLETE],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExecutableCommand, ExecutableResponse};
    use crate::{decode::Decode, encode::Encode};

    #[test]
    fn commands() {
        assert_eq!(ExecutableCommand::Reset.encode().unwrap(), vec![1]);
        assert_eq!(ExecutableCommand::Sleep.encode().unwrap(), vec![3]);
    }

    #[test]
    fn reset_complete() {
        assert_eq!(
            ExecutableResponse::decode(&mut [0x01].as_slice()).unwrap(),
            ExecutableResponse::ResetComplete
        );
        assert!(ExecutableResponse::decode(&mut [0x02].as_slice()).is_err());
    }
}
