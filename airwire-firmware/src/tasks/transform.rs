//! Transform task
//!
//! Averages raw samples over the configured window. If no sample arrives
//! within the wait time the window is discarded, so a mean never spans a
//! sampling pause. While stopped, incoming samples are dropped.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{with_timeout, Duration};

use airwire_core::config::MAX_WINDOW;
use airwire_core::control::{clamp_window, StageControl, TransformCommand};
use airwire_core::transform::MovingAverage;

use crate::channels::{SAMPLE_CHANNEL, TRANSFORMED_CHANNEL, TRANSFORM_CMD};

type Average = MovingAverage<MAX_WINDOW>;

fn average_for(control: &StageControl) -> Option<Average> {
    let window = clamp_window(control.active()?);
    match Average::new(window) {
        Ok(average) => Some(average),
        Err(e) => {
            error!("Invalid transform window {}: {}", window, e);
            None
        }
    }
}

#[embassy_executor::task]
pub async fn transform_task(sample_wait_ms: u32) {
    info!("Transform task started");

    let mut control = StageControl::stopped();
    let mut wait = Duration::from_millis(u64::from(sample_wait_ms));
    let mut average = average_for(&control);

    loop {
        let Some(active) = average.as_mut() else {
            let command = match select(SAMPLE_CHANNEL.receive(), TRANSFORM_CMD.wait()).await {
                Either::First(sample) => {
                    trace!("Transform stopped, sample at {} ms dropped", sample.timestamp_ms);
                    continue;
                }
                Either::Second(command) => command,
            };
            match command {
                TransformCommand::SetWindow(n) => {
                    if control.apply(n).needs_restart() {
                        info!("Transform window set: {}", n);
                        average = average_for(&control);
                    } else {
                        warn!("Transform already stopped");
                    }
                }
                TransformCommand::SetWait(ms) => {
                    info!("Sample wait set: {} ms", ms);
                    wait = Duration::from_millis(u64::from(ms));
                }
            }
            continue;
        };

        match select(with_timeout(wait, SAMPLE_CHANNEL.receive()), TRANSFORM_CMD.wait()).await {
            Either::First(Ok(sample)) => {
                if let Some(transformed) = active.push(sample) {
                    TRANSFORMED_CHANNEL.send(transformed).await;
                }
            }
            Either::First(Err(_)) => {
                error!("No sample within {} ms, window reset", wait.as_millis());
                active.reset();
            }
            Either::Second(TransformCommand::SetWindow(n)) => {
                if control.apply(n).needs_restart() {
                    info!("Transform window set: {}", n);
                    average = average_for(&control);
                }
            }
            Either::Second(TransformCommand::SetWait(ms)) => {
                info!("Sample wait set: {} ms", ms);
                wait = Duration::from_millis(u64::from(ms));
            }
        }
    }
}
