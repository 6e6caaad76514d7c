//! Encode task
//!
//! Serializes each averaged sample to a JSON document and logs it together
//! with the latest raw readings.

use defmt::*;

use airwire_core::encode::{encode_json, MAX_JSON_LEN};
use airwire_core::sample::Readings;

use crate::channels::{BASELINE, CO2EQ, RH, TEMPERATURE, TRANSFORMED_CHANNEL, TVOC};

#[embassy_executor::task]
pub async fn encode_task() {
    info!("Encode task started");

    let mut buf = [0u8; MAX_JSON_LEN];
    let mut readings = Readings::default();

    loop {
        let sample = TRANSFORMED_CHANNEL.receive().await;
        readings.update(Readings {
            tvoc_ppb: TVOC.try_take(),
            co2_eq_ppm: CO2EQ.try_take(),
            baseline: BASELINE.try_take(),
            rh_x100: RH.try_take(),
            celsius_x100: TEMPERATURE.try_take(),
        });

        match encode_json(&sample, &mut buf) {
            Ok(len) => match core::str::from_utf8(&buf[..len]) {
                Ok(json) => info!("{} latest {}", json, readings),
                Err(_) => error!("Encoded sample is not UTF-8"),
            },
            Err(e) => error!("Sample encoding failed: {}", e),
        }
    }
}
