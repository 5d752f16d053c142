use bno080_shtp::{
    commands::sensor::ReadSensor,
    connection::i2c::{I2cLink, ALTERNATE_ADDRESS, DEFAULT_ADDRESS, DEFAULT_BUS},
    packets::input::SensorReportId,
    session::{Session, SessionError},
};
use log::{info, warn};

fn main() -> Result<(), SessionError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    // Report ID in hex, defaults to the rotation vector
    let sensor = std::env::args()
        .nth(1)
        .and_then(|arg| u8::from_str_radix(arg.trim_start_matches("0x"), 16).ok())
        .and_then(|id| SensorReportId::try_from(id).ok())
        .unwrap_or(SensorReportId::RotationVector);
    let address = match std::env::var("BNO080_ALTERNATE_ADDRESS") {
        Ok(_) => ALTERNATE_ADDRESS,
        Err(_) => DEFAULT_ADDRESS,
    };

    let link = I2cLink::open(DEFAULT_BUS, address)?;
    let mut session = Session::new(link);
    session.startup_check()?;

    info!("Reading {}", sensor);
    for _ in 0..10 {
        match session.execute_command(ReadSensor::new(sensor)) {
            Ok(sample) => info!("{:?} -> {:?}", sample, sample.values(session.q_points())),
            Err(SessionError::ResponseTimeout { attempts }) => {
                warn!("No report after {} polls", attempts)
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
