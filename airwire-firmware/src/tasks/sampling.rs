//! Sampling task
//!
//! Runs one station tick per period once a non-zero period arrives on
//! `SAMPLING_CMD`. The bus work inside a tick is blocking
//! (bit-banged lines and device execution times); ticks are short next to
//! the one-second period.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Ticker};

use airwire_core::control::StageControl;
use airwire_core::sample::Sample;

use crate::channels::{BASELINE, CO2EQ, RH, SAMPLE_CHANNEL, SAMPLING_CMD, TEMPERATURE, TVOC};
use crate::AirStation;

#[embassy_executor::task]
pub async fn sampling_task(mut station: AirStation) {
    info!("Sampling task started");

    if let Err(e) = station.start() {
        error!("IAQ start failed: {}", e);
    }

    let mut control = StageControl::stopped();

    loop {
        let Some(period) = control.active() else {
            info!("Sampling stopped");
            // Passive: only a non-zero period restarts sampling
            while !control.apply(SAMPLING_CMD.wait().await).needs_restart() {
                warn!("Sampling already stopped");
            }
            continue;
        };

        info!("Sampling every {} ms", period);
        let mut ticker = Ticker::every(Duration::from_millis(u64::from(period)));

        loop {
            match select(ticker.next(), SAMPLING_CMD.wait()).await {
                Either::First(()) => sample(&mut station),
                Either::Second(value) => {
                    if control.apply(value).needs_restart() {
                        break;
                    }
                }
            }
        }
    }
}

/// One tick: publish readings and queue the CO2eq sample
fn sample(station: &mut AirStation) {
    let report = station.tick();

    if let Some(climate) = report.climate {
        RH.signal(climate.rh_x100);
        TEMPERATURE.signal(climate.celsius_x100);
    }

    if let Some(baseline) = report.baseline {
        BASELINE.signal(baseline);
    }

    let Some(air_quality) = report.air_quality else {
        return;
    };
    TVOC.signal(air_quality.tvoc_ppb);
    CO2EQ.signal(air_quality.co2_eq_ppm);

    let sample = Sample {
        timestamp_ms: Instant::now().as_millis(),
        co2_eq_ppm: air_quality.co2_eq_ppm,
    };
    if SAMPLE_CHANNEL.try_send(sample).is_err() {
        warn!("Sample queue full, sample dropped");
    }
}
