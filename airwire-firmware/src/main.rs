//! Airwire - Air Quality Station Firmware
//!
//! Main firmware binary for RP2040-based boards. An SGP30 (VOC and
//! equivalent CO2) and an optional Si7021 (humidity and temperature) each
//! sit on their own pair of GPIO lines driven by the software I2C engine.
//!
//! Tasks:
//! - sampling: one station tick per period, publishes readings
//! - transform: moving average over the CO2eq samples
//! - encode: JSON document per averaged sample, with the latest readings
//! - control: starts sampling, then the transform after sensor warm-up

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_time::{Delay, Timer};
use {defmt_rtt as _, panic_probe as _};

use airwire_bus::{BusConfig, ConfigError, SoftI2c};
use airwire_core::station::Station;
use airwire_drivers::sensor::{sgp30, Sgp30, Si7021};
use airwire_hal::PinId;
use airwire_hal_rp2040::{FlexPins, GpioAllocator, PinBank};

use crate::board::BusPins;

mod board;
mod channels;
mod tasks;

/// Software I2C bus on two RP2040 GPIOs
pub type SensorBus = SoftI2c<FlexPins<'static>, Delay>;

/// The station the sampling task drives
pub type AirStation = Station<Sgp30<SensorBus>, Si7021<SensorBus>>;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Airwire firmware starting...");

    let p = embassy_rp::init(Default::default());
    let mut bank = PinBank::new(p);
    let mut allocator = GpioAllocator::new();
    info!("Peripherals initialized");

    let mut config = board::sampling_config();
    if let Err(e) = config.validate() {
        error!("Invalid sampling config: {}, using defaults", e);
        config = Default::default();
    }

    let Some(sgp30) = open_sgp30(&mut bank, &mut allocator) else {
        error!("No air quality sensor, nothing to sample");
        return;
    };

    let si7021 = open_si7021(&mut bank, &mut allocator);
    if si7021.is_none() {
        warn!("Running without humidity compensation");
    }

    let station = Station::new(sgp30, si7021, config);

    spawner
        .spawn(tasks::sampling_task(station))
        .unwrap();
    spawner
        .spawn(tasks::transform_task(config.sample_wait_ms))
        .unwrap();
    spawner.spawn(tasks::encode_task()).unwrap();
    spawner
        .spawn(tasks::control_task(config.period_ms, config.window as u32))
        .unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Claim two GPIOs and bring up a released bus on them
fn open_bus(
    bank: &mut PinBank,
    allocator: &mut GpioAllocator,
    pins: BusPins,
    bus_config: impl FnOnce(PinId, PinId) -> Result<BusConfig, ConfigError>,
) -> Option<SensorBus> {
    if let Err(e) = allocator.allocate_pair(pins.scl, pins.sda) {
        error!("Bus pins {} unavailable: {}", pins, e);
        return None;
    }

    let config = match bus_config(pins.scl, pins.sda) {
        Ok(config) => config,
        Err(e) => {
            error!("Bus config rejected: {}", e);
            return None;
        }
    };

    let lines = match FlexPins::take(bank, pins.scl, pins.sda) {
        Ok(lines) => lines,
        Err(e) => {
            error!("GPIO {} already taken", e.0);
            return None;
        }
    };

    let mut bus = SoftI2c::new(config, lines, Delay);
    if let Err(e) = bus.init() {
        error!("Bus {} init failed: {}", bus.config().name(), e);
        return None;
    }
    Some(bus)
}

fn open_sgp30(bank: &mut PinBank, allocator: &mut GpioAllocator) -> Option<Sgp30<SensorBus>> {
    let Some(pins) = board::sgp30_pins() else {
        error!("Invalid SGP30 pins");
        return None;
    };
    let bus = open_bus(bank, allocator, pins, |scl, sda| {
        Sgp30::<SensorBus>::bus_config("sgp30", scl, sda)
    })?;

    let mut sensor = Sgp30::new(bus);
    if let Err(e) = sensor.check_feature_set(sgp30::MIN_FEATURE_SET) {
        error!("SGP30 not usable: {}", e);
        return None;
    }
    match sensor.serial_id() {
        Ok(serial) => info!("SGP30 serial {=u64:#x}", serial),
        Err(e) => warn!("SGP30 serial read failed: {}", e),
    }
    Some(sensor)
}

fn open_si7021(bank: &mut PinBank, allocator: &mut GpioAllocator) -> Option<Si7021<SensorBus>> {
    let pins = board::si7021_pins()?;
    let bus = open_bus(bank, allocator, pins, |scl, sda| {
        Si7021::<SensorBus>::bus_config("si7021", scl, sda)
    })?;

    let mut sensor = Si7021::new(bus);
    if let Err(e) = sensor.reset() {
        warn!("Si7021 not responding: {}", e);
        return None;
    }
    match (sensor.serial_number(), sensor.firmware_revision()) {
        (Ok(serial), Ok(revision)) => {
            info!("Si7021 serial {=u64:#x} firmware {=u8:#x}", serial, revision)
        }
        _ => warn!("Si7021 identification failed"),
    }
    Some(sensor)
}
