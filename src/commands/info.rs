use log::debug;

use super::Command;
use crate::{
    channel::Channel,
    connection::BusLink,
    decode::Decode,
    packets::{
        command::{ErrorCode, ErrorList, ErrorListRequest, ERROR_LIST},
        control::{reports, ProductIdRequest, ProductInfo},
        Packet,
    },
    session::{Session, SessionError},
};

/// Reads the SHTP error list. The list is empty after a clean reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetErrorList;

impl Command for GetErrorList {
    type Output = Vec<ErrorCode>;

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        session.send_packet(Channel::Command, ErrorListRequest)?;
        let attempts = session.config().max_attempts;
        let packet = session.await_response(
            |packet| packet.is_report(Channel::Command, ERROR_LIST),
            attempts,
        )?;

        let errors = ErrorList::decode(&mut packet.cargo.as_slice())?.into_inner();
        debug!("Error list has {} entries", errors.len());
        Ok(errors)
    }
}

/// Reads the product ID records. The hub reports one record per firmware part.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetProductIds;

fn is_product_id(packet: &Packet) -> bool {
    packet.is_report(Channel::Control, reports::PRODUCT_ID_RESPONSE)
}

impl Command for GetProductIds {
    type Output = [ProductInfo; 2];

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        session.send_packet(Channel::Control, ProductIdRequest)?;
        let attempts = session.config().max_attempts;
        let first = session.await_response(is_product_id, attempts)?;
        let first_info = ProductInfo::decode(&mut first.cargo.as_slice())?;

        // Both records may arrive back to back in a single packet
        let second_info = match first.cargo.get(ProductInfo::RECORD_LEN..) {
            Some(rest) if rest.first() == Some(&reports::PRODUCT_ID_RESPONSE) => {
                ProductInfo::decode(&mut &rest[..])?
            }
            _ => {
                session.settle();
                let second = session.await_response(is_product_id, attempts)?;
                ProductInfo::decode(&mut second.cargo.as_slice())?
            }
        };

        Ok([first_info, second_info])
    }
}
