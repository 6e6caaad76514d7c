//! Inter-task communication channels
//!
//! Latest-value readings are [`Signal`]s: a new value overwrites one nobody
//! has consumed yet. Samples flow between stages through bounded channels.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use airwire_core::control::TransformCommand;
use airwire_core::sample::{Sample, TransformedSample};

/// Channel capacity for raw samples
const SAMPLE_CHANNEL_SIZE: usize = 8;

/// Channel capacity for transformed samples
const TRANSFORMED_CHANNEL_SIZE: usize = 4;

/// Raw CO2eq samples from the sampling task to the transform task
pub static SAMPLE_CHANNEL: Channel<CriticalSectionRawMutex, Sample, SAMPLE_CHANNEL_SIZE> =
    Channel::new();

/// Averaged samples from the transform task to the encode task
pub static TRANSFORMED_CHANNEL: Channel<
    CriticalSectionRawMutex,
    TransformedSample,
    TRANSFORMED_CHANNEL_SIZE,
> = Channel::new();

/// Sampling period in ms; 0 stops sampling
pub static SAMPLING_CMD: Signal<CriticalSectionRawMutex, u32> = Signal::new();

/// Transform window and wait time changes
pub static TRANSFORM_CMD: Signal<CriticalSectionRawMutex, TransformCommand> = Signal::new();

/// Latest TVOC reading (ppb)
pub static TVOC: Signal<CriticalSectionRawMutex, u16> = Signal::new();

/// Latest CO2eq reading (ppm)
pub static CO2EQ: Signal<CriticalSectionRawMutex, u16> = Signal::new();

/// Latest IAQ baseline read from the sensor
pub static BASELINE: Signal<CriticalSectionRawMutex, u32> = Signal::new();

/// Latest relative humidity (0.01 %RH)
pub static RH: Signal<CriticalSectionRawMutex, i32> = Signal::new();

/// Latest temperature (0.01 °C)
pub static TEMPERATURE: Signal<CriticalSectionRawMutex, i32> = Signal::new();
