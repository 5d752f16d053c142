//! High level operations built from one or more exchanges with the hub.

use crate::{
    connection::BusLink,
    session::{Session, SessionError},
};

pub mod calibration;
pub mod frs;
pub mod info;
pub mod sensor;

pub trait Command {
    type Output;

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError>;
}
