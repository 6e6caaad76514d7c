//! Run-time control of the sampling and transform stages
//!
//! Both stages are steered by plain numbers: the sampling period in
//! milliseconds and the transform window in samples. Zero stops the stage;
//! any other value (re)starts it with the new setting.

use crate::config::MAX_WINDOW;

/// Effect of applying a control value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Stage was stopped and now runs
    Started,
    /// Stage keeps running with a new setting
    Changed,
    /// Stage was running and now stops
    Stopped,
    /// Nothing changed (same setting, or stop while stopped)
    Unchanged,
}

impl Transition {
    /// The stage has to rebuild its timing or window state
    pub fn needs_restart(self) -> bool {
        !matches!(self, Transition::Unchanged)
    }
}

/// Run state of one pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StageControl {
    setting: u32,
    running: bool,
}

impl StageControl {
    /// A stage that starts running with `setting` (stopped if zero)
    pub fn new(setting: u32) -> Self {
        Self {
            setting,
            running: setting != 0,
        }
    }

    /// A stage that waits for its first non-zero setting
    pub fn stopped() -> Self {
        Self {
            setting: 0,
            running: false,
        }
    }

    /// Current setting, or `None` while stopped
    pub fn active(&self) -> Option<u32> {
        self.running.then_some(self.setting)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn apply(&mut self, value: u32) -> Transition {
        let transition = match (self.running, value) {
            (false, 0) => Transition::Unchanged,
            (true, 0) => Transition::Stopped,
            (false, _) => Transition::Started,
            (true, v) if v == self.setting => Transition::Unchanged,
            (true, _) => Transition::Changed,
        };
        if value != 0 {
            self.setting = value;
        }
        self.running = value != 0;
        transition
    }
}

/// Transform stage commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransformCommand {
    /// Samples per mean; 0 stops the transform
    SetWindow(u32),
    /// How long to wait for the next sample before resetting the window
    SetWait(u32),
}

/// Clamp a requested window to what the transform supports
pub fn clamp_window(window: u32) -> usize {
    (window as usize).min(MAX_WINDOW)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_transitions() {
        let mut control = StageControl::new(1000);
        assert_eq!(control.active(), Some(1000));

        assert_eq!(control.apply(1000), Transition::Unchanged);
        assert_eq!(control.apply(500), Transition::Changed);
        assert_eq!(control.active(), Some(500));

        assert_eq!(control.apply(0), Transition::Stopped);
        assert_eq!(control.active(), None);
        assert_eq!(control.apply(0), Transition::Unchanged);

        assert_eq!(control.apply(2000), Transition::Started);
        assert_eq!(control.active(), Some(2000));
    }

    #[test]
    fn test_zero_initial_setting_is_stopped() {
        assert!(!StageControl::new(0).is_running());
        assert_eq!(StageControl::stopped().active(), None);
    }

    #[test]
    fn test_restart_needed() {
        assert!(Transition::Started.needs_restart());
        assert!(Transition::Stopped.needs_restart());
        assert!(!Transition::Unchanged.needs_restart());
    }

    #[test]
    fn test_clamp_window() {
        assert_eq!(clamp_window(10), 10);
        assert_eq!(clamp_window(1000), MAX_WINDOW);
    }
}
