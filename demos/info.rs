use bno080_shtp::{
    commands::{
        calibration::GetCalibrationStatus,
        frs::LoadQPoints,
        info::{GetErrorList, GetProductIds},
    },
    connection::i2c::{I2cLink, DEFAULT_ADDRESS, DEFAULT_BUS},
    session::{Session, SessionError},
};
use log::info;

fn main() -> Result<(), SessionError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let bus = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_BUS.to_string());
    let link = I2cLink::open(&bus, DEFAULT_ADDRESS)?;

    let mut session = Session::new(link);
    session.startup_check()?;

    for product in session.execute_command(GetProductIds)? {
        info!("{}", product);
    }

    let errors = session.execute_command(GetErrorList)?;
    info!("SHTP Errors # : {} entries", errors.len());
    for error in errors {
        info!("  {}", error);
    }

    let status = session.execute_command(GetCalibrationStatus)?;
    info!("Calibration: {}", status);

    let q_points = session.execute_command(LoadQPoints)?;
    info!("{:?}", q_points);

    Ok(())
}
