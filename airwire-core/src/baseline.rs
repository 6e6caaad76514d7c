//! IAQ baseline schedule
//!
//! The SGP30 needs 12 hours of operation before its first baseline is
//! worth keeping. After that (or right away, if a stored baseline was
//! restored at start-up) the baseline is read back every hour.

/// Ticks before the first baseline read on a fresh sensor (12 h at 1 Hz)
pub const EARLY_PHASE_TICKS: u32 = 43_200;

/// Ticks between baseline reads afterwards (1 h at 1 Hz)
pub const REFRESH_TICKS: u32 = 3_600;

/// Counts measurement ticks and says when a baseline read is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaselineSchedule {
    early_phase: bool,
    ticks: u32,
    early_ticks: u32,
    refresh_ticks: u32,
}

impl BaselineSchedule {
    /// Schedule with the default 12 h / 1 h timing
    pub fn new(restored: bool) -> Self {
        Self::with_periods(restored, EARLY_PHASE_TICKS, REFRESH_TICKS)
    }

    /// Schedule with custom timing (both periods clamped to at least 1)
    pub fn with_periods(restored: bool, early_ticks: u32, refresh_ticks: u32) -> Self {
        Self {
            early_phase: !restored,
            ticks: 0,
            early_ticks: early_ticks.max(1),
            refresh_ticks: refresh_ticks.max(1),
        }
    }

    /// Still waiting for the first baseline of a fresh sensor
    pub fn in_early_phase(&self) -> bool {
        self.early_phase
    }

    /// Advance one tick; returns true when the baseline should be read
    pub fn tick(&mut self) -> bool {
        self.ticks += 1;
        let period = if self.early_phase {
            self.early_ticks
        } else {
            self.refresh_ticks
        };

        if self.ticks >= period {
            self.early_phase = false;
            self.ticks = 0;
            true
        } else {
            false
        }
    }
}
