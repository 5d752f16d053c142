use std::mem::size_of;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Cargo too short")]
    UnexpectedEnd,

    #[error("Could not decode byte with unexpected value. Found {value:x}, expected one of: {expected:x?}")]
    UnexpectedValue { value: u8, expected: &'static [u8] },

    #[error("SHTP error code {0} is not in the error table")]
    UnknownErrorCode(u8),

    #[error("Packet arrived on unknown channel {0}")]
    UnknownChannel(u8),
}

pub trait Decode {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

impl Decode for () {
    fn decode(_data: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(())
    }
}

macro_rules! impl_decode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
                    let bytes = data.get(..size_of::<Self>()).ok_or(DecodeError::UnexpectedEnd)?;
                    *data = &data[size_of::<Self>()..];
                    Ok(Self::from_le_bytes(bytes.try_into().unwrap()))
                }
            }
        )*
    };
}

impl_decode_for_primitive!(u8, u16, u32, i8, i16, i32);

impl<const N: usize> Decode for [u8; N] {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let bytes = data.get(..N).ok_or(DecodeError::UnexpectedEnd)?;
        *data = &data[N..];
        let mut arr = [0u8; N];
        arr.copy_from_slice(bytes);
        Ok(arr)
    }
}

/// Checks that the next byte of `data` is the expected report ID and consumes it.
pub(crate) fn expect_report_id(data: &mut &[u8], expected: &'static [u8]) -> Result<u8, DecodeError> {
    let value = u8::decode(data)?;
    if !expected.contains(&value) {
        return Err(DecodeError::UnexpectedValue { value, expected });
    }
    Ok(value)
}
