//! Control task
//!
//! Starts the pipeline stages through their command signals. Sampling
//! starts at once; the transform waits out the SGP30 warm-up, during which
//! the sensor reports a fixed 400 ppm / 0 ppb.

use defmt::*;
use embassy_time::Timer;

use airwire_core::control::TransformCommand;

use crate::channels::{SAMPLING_CMD, TRANSFORM_CMD};

/// Time after IAQ init before readings are meaningful
const WARM_UP_MS: u64 = 15_000;

#[embassy_executor::task]
pub async fn control_task(period_ms: u32, window: u32) {
    info!("Control task started");

    SAMPLING_CMD.signal(period_ms);

    Timer::after_millis(WARM_UP_MS).await;
    info!("Warm-up done, averaging over {} samples", window);
    TRANSFORM_CMD.signal(TransformCommand::SetWindow(window));
}
