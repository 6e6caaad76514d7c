//! Moving-average transform
//!
//! Smooths raw CO2 samples over a sliding window. With a window of one,
//! samples pass straight through. Otherwise nothing is emitted until the
//! window has filled; from then on every new sample yields the mean of the
//! last `window` samples.

use heapless::Deque;

use crate::sample::{Sample, TransformedSample};

/// Transform configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransformError {
    /// Window is zero or larger than the buffer capacity
    InvalidWindow,
}

/// Sliding mean over up to `N` samples
#[derive(Debug)]
pub struct MovingAverage<const N: usize> {
    window: usize,
    samples: Deque<u16, N>,
    sum: u32,
}

impl<const N: usize> MovingAverage<N> {
    pub fn new(window: usize) -> Result<Self, TransformError> {
        Self::check(window)?;
        Ok(Self {
            window,
            samples: Deque::new(),
            sum: 0,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Change the window; discards buffered samples
    pub fn set_window(&mut self, window: usize) -> Result<(), TransformError> {
        Self::check(window)?;
        self.window = window;
        self.reset();
        Ok(())
    }

    /// Drop buffered samples
    pub fn reset(&mut self) {
        self.samples.clear();
        self.sum = 0;
    }

    /// Feed one sample; returns the mean once the window is full
    pub fn push(&mut self, sample: Sample) -> Option<TransformedSample> {
        if self.window == 1 {
            return Some(TransformedSample {
                timestamp_ms: sample.timestamp_ms,
                co2_eq_ppm_mean_x100: u32::from(sample.co2_eq_ppm) * 100,
            });
        }

        if self.samples.len() >= self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= u32::from(oldest);
            }
        }
        if self.samples.push_back(sample.co2_eq_ppm).is_ok() {
            self.sum += u32::from(sample.co2_eq_ppm);
        }

        if self.samples.len() < self.window {
            return None;
        }

        let count = self.window as u32;
        Some(TransformedSample {
            timestamp_ms: sample.timestamp_ms,
            co2_eq_ppm_mean_x100: (self.sum * 100 + count / 2) / count,
        })
    }

    fn check(window: usize) -> Result<(), TransformError> {
        if window == 0 || window > N {
            return Err(TransformError::InvalidWindow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(t: u64, ppm: u16) -> Sample {
        Sample {
            timestamp_ms: t,
            co2_eq_ppm: ppm,
        }
    }

    #[test]
    fn test_window_one_passes_through() {
        let mut avg = MovingAverage::<8>::new(1).unwrap();
        let out = avg.push(sample(1000, 412)).unwrap();
        assert_eq!(out.timestamp_ms, 1000);
        assert_eq!(out.co2_eq_ppm_mean_x100, 41_200);
    }

    #[test]
    fn test_first_mean_after_window_fills() {
        let mut avg = MovingAverage::<8>::new(3).unwrap();
        assert_eq!(avg.push(sample(1, 400)), None);
        assert_eq!(avg.push(sample(2, 410)), None);
        let out = avg.push(sample(3, 420)).unwrap();
        assert_eq!(out.timestamp_ms, 3);
        assert_eq!(out.co2_eq_ppm_mean_x100, 41_000);
    }

    #[test]
    fn test_sliding_mean() {
        let mut avg = MovingAverage::<8>::new(2).unwrap();
        avg.push(sample(1, 400));
        assert_eq!(avg.push(sample(2, 401)).unwrap().co2_eq_ppm_mean_x100, 40_050);
        assert_eq!(avg.push(sample(3, 403)).unwrap().co2_eq_ppm_mean_x100, 40_200);
        assert_eq!(avg.push(sample(4, 403)).unwrap().co2_eq_ppm_mean_x100, 40_300);
    }

    #[test]
    fn test_mean_rounds_to_nearest() {
        let mut avg = MovingAverage::<4>::new(3).unwrap();
        avg.push(sample(1, 400));
        avg.push(sample(2, 400));
        // 1201 / 3 = 400.333...
        assert_eq!(avg.push(sample(3, 401)).unwrap().co2_eq_ppm_mean_x100, 40_033);
    }

    #[test]
    fn test_invalid_window() {
        assert_eq!(
            MovingAverage::<4>::new(0).unwrap_err(),
            TransformError::InvalidWindow
        );
        assert_eq!(
            MovingAverage::<4>::new(5).unwrap_err(),
            TransformError::InvalidWindow
        );
        assert!(MovingAverage::<4>::new(4).is_ok());
    }

    #[test]
    fn test_set_window_resets() {
        let mut avg = MovingAverage::<4>::new(2).unwrap();
        avg.push(sample(1, 400));
        avg.set_window(3).unwrap();
        assert_eq!(avg.push(sample(2, 500)), None);
        assert_eq!(avg.push(sample(3, 500)), None);
        assert_eq!(avg.push(sample(4, 500)).unwrap().co2_eq_ppm_mean_x100, 50_000);
    }

    proptest! {
        #[test]
        fn prop_mean_within_window_bounds(values in proptest::collection::vec(400u16..60_000, 1..40), window in 1usize..=8) {
            let mut avg = MovingAverage::<8>::new(window).unwrap();
            for (i, v) in values.iter().enumerate() {
                let out = avg.push(sample(i as u64, *v));
                if i + 1 < window {
                    prop_assert!(out.is_none());
                    continue;
                }
                let out = out.unwrap();
                let recent = &values[i + 1 - window..=i];
                let min = *recent.iter().min().unwrap() as u32 * 100;
                let max = *recent.iter().max().unwrap() as u32 * 100;
                prop_assert!(out.co2_eq_ppm_mean_x100 >= min);
                prop_assert!(out.co2_eq_ppm_mean_x100 <= max);
                prop_assert_eq!(out.timestamp_ms, i as u64);
            }
        }
    }
}
