//! SHTP command channel (channel 0) cargo.

use std::fmt;

use crate::{
    decode::{expect_report_id, Decode, DecodeError},
    encode::{Encode, EncodeError},
};

/// Advertisement response tag. The hub also sends one unsolicited at power-up.
pub const ADVERTISEMENT: u8 = 0x00;

/// Error list request and response tag.
pub const ERROR_LIST: u8 = 0x01;

/// SHTP error strings, indexed by error code.
const ERROR_TABLE: [&str; 13] = [
    "No error",
    "Hub application attempted to exceed maximum read cargo length",
    "Hub application attempted to exceed maximum read cargo length",
    "Host wrote a header with length greater than maximum write cargo length",
    "Host wrote a header with length <= header length (invalid or no payload)",
    "Host tried to fragment cargo (transfer length < full cargo length)",
    "Host wrote continuation of fragmented cargo (continuation bit set)",
    "Unrecognized command on control channel (2)",
    "Unrecognized parameter to get-advertisement command",
    "Host wrote to unrecognized channel",
    "Advertisement request received while Advertisement Response was pending",
    "Host write before the hub finished sending advertisement response",
    "Error list too long to send, truncated",
];

/// Asks the hub for the errors it has recorded since the last reset.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct ErrorListRequest;

impl Encode for ErrorListRequest {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(vec![ERROR_LIST])
    }
}

/// An entry of the hub's SHTP error list.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ErrorCode(u8);

impl ErrorCode {
    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn description(&self) -> &'static str {
        ERROR_TABLE[self.0 as usize]
    }
}

impl TryFrom<u8> for ErrorCode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (value as usize) < ERROR_TABLE.len() {
            Ok(Self(value))
        } else {
            Err(DecodeError::UnknownErrorCode(value))
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.0, self.description())
    }
}

/// Decoded error list response. Empty after a clean reset.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ErrorList(pub Vec<ErrorCode>);

impl ErrorList {
    pub fn into_inner(self) -> Vec<ErrorCode> {
        self.0
    }
}

impl Decode for ErrorList {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        expect_report_id(data, &[ERROR_LIST])?;

        let codes = data
            .iter()
            .map(|&code| ErrorCode::try_from(code))
            .collect::<Result<Vec<_>, _>>()?;
        *data = &[];

        Ok(Self(codes))
    }
}

/// One tag/length/value entry of an advertisement.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AdvertisementEntry {
    pub tag: u8,
    pub value: Vec<u8>,
}

/// Advertisement response listing the hub's applications and channels.
///
/// Entries that run past the end of the received cargo are dropped, since large
/// advertisements may arrive split over continuation packets.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Advertisement {
    pub entries: Vec<AdvertisementEntry>,
}

impl Decode for Advertisement {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        expect_report_id(data, &[ADVERTISEMENT])?;

        let mut entries = Vec::new();
        while data.len() >= 2 {
            let tag = u8::decode(data)?;
            let len = u8::decode(data)? as usize;
            let Some(value) = data.get(..len) else {
                break;
            };
            entries.push(AdvertisementEntry {
                tag,
                value: value.to_vec(),
            });
            *data = &data[len..];
        }
        *data = &[];

        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::{Advertisement, ErrorCode, ErrorList};
    use crate::decode::{Decode, DecodeError};

    #[test]
    fn clean_error_list() {
        let list = ErrorList::decode(&mut [0x01].as_slice()).unwrap();
        assert!(list.0.is_empty());
    }

    #[test]
    fn error_list_entries() {
        let list = ErrorList::decode(&mut [0x01, 0x01, 0x0B].as_slice()).unwrap();
        assert_eq!(
            list.0,
            vec![
                ErrorCode::try_from(1).unwrap(),
                ErrorCode::try_from(11).unwrap()
            ]
        );
        assert_eq!(
            list.0[1].description(),
            "Host write before the hub finished sending advertisement response"
        );
    }

    #[test]
    fn error_code_out_of_table() {
        assert_eq!(
            ErrorList::decode(&mut [0x01, 0x02, 0x0D].as_slice()),
            Err(DecodeError::UnknownErrorCode(0x0D))
        );
    }

    #[test]
    fn error_list_wrong_report() {
        assert!(matches!(
            ErrorList::decode(&mut [0x00, 0x01].as_slice()),
            Err(DecodeError::UnexpectedValue { value: 0x00, .. })
        ));
    }

    #[test]
    fn advertisement_entries() {
        let cargo = [0x00, 0x01, 0x04, 0x00, 0x00, 0x00, 0x00, 0x80, 0x06, 0x31];
        let advert = Advertisement::decode(&mut cargo.as_slice()).unwrap();

        assert_eq!(advert.entries.len(), 1);
        assert_eq!(advert.entries[0].tag, 0x01);
        assert_eq!(advert.entries[0].value, vec![0, 0, 0, 0]);
    }
}
