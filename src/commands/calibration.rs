//! Motion engine calibration, DCD persistence and tare.

use log::{debug, info};

use super::Command;
use crate::{
    connection::BusLink,
    decode::Decode,
    packets::control::{
        cmds, me_calibration_params, persist_tare_params, tare_params, CalibrationSensors,
        CalibrationStatus, CommandResponse, MeCalibrationSubcommand, TareAxes, TareBasis,
    },
    session::{Session, SessionError},
};

/// Fails with [`SessionError::CommandFailed`] unless the response status R0 is zero.
fn check_status(response: &CommandResponse) -> Result<(), SessionError> {
    match response.r(0) {
        0 => Ok(()),
        status => Err(SessionError::CommandFailed {
            command: response.command,
            status,
        }),
    }
}

/// Reads which sensors the motion engine currently calibrates.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetCalibrationStatus;

impl Command for GetCalibrationStatus {
    type Output = CalibrationStatus;

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        let params =
            me_calibration_params(MeCalibrationSubcommand::Get, CalibrationSensors::empty());
        let packet = session.command(cmds::ME_CALIBRATION, params)?;
        let status = CalibrationStatus::decode(&mut packet.cargo.as_slice())?;
        debug!("Calibration status: {}", status);
        Ok(status)
    }
}

/// Enables calibration for `sensors` and disables it for all others.
#[derive(Debug, Clone, Copy)]
pub struct ConfigureCalibration {
    pub sensors: CalibrationSensors,
}

impl Command for ConfigureCalibration {
    type Output = CalibrationStatus;

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        let params = me_calibration_params(MeCalibrationSubcommand::Configure, self.sensors);
        let packet = session.command(cmds::ME_CALIBRATION, params)?;
        check_status(&CommandResponse::decode(&mut packet.cargo.as_slice())?)?;

        let status = CalibrationStatus::decode(&mut packet.cargo.as_slice())?;
        info!("Calibration configured: {}", status);
        Ok(status)
    }
}

/// Saves the dynamic calibration data to flash.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveCalibration;

impl Command for SaveCalibration {
    type Output = ();

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        let packet = session.command(cmds::DCD_SAVE, [0; 9])?;
        check_status(&CommandResponse::decode(&mut packet.cargo.as_slice())?)?;
        info!("Calibration data saved");
        Ok(())
    }
}

/// Redefines the current orientation as the reference orientation.
///
/// The hub sends no response to a tare.
#[derive(Debug, Clone, Copy)]
pub struct Tare {
    pub axes: TareAxes,
    pub basis: TareBasis,
}

impl Default for Tare {
    fn default() -> Self {
        Self {
            axes: TareAxes::all(),
            basis: TareBasis::RotationVector,
        }
    }
}

impl Command for Tare {
    type Output = ();

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        session.send_command_request(cmds::TARE, tare_params(self.axes, self.basis))?;
        Ok(())
    }
}

/// Stores the current tare in flash so it survives a reset.
///
/// Like [`Tare`], this gets no response.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersistTare;

impl Command for PersistTare {
    type Output = ();

    fn execute<B: BusLink>(self, session: &mut Session<B>) -> Result<Self::Output, SessionError> {
        session.send_command_request(cmds::TARE, persist_tare_params())?;
        Ok(())
    }
}
