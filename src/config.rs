use crate::{hx711::ReadyWait, weight::CalibrationFactor};

/// Build-time parameters of the drip monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Raw counts per gram
    pub calibration: CalibrationFactor,
    /// Weights at or below this value (centigrams) stop the flow
    pub open_threshold_cg: i32,
    /// Time given to the load cell to settle before taring
    pub settle_ms: u32,
    /// Pause between two steady-state samples
    pub sample_interval_ms: u32,
    /// Clock high and low hold time of the HX711 serial interface
    pub clock_half_period_us: u32,
    pub ready_wait: ReadyWait,
}

impl MonitorConfig {
    pub const DEFAULT: Self = Self {
        calibration: CalibrationFactor::new(214),
        open_threshold_cg: 3500,
        settle_ms: 200,
        sample_interval_ms: 500,
        clock_half_period_us: 1,
        ready_wait: ReadyWait::Forever,
    };

    pub const fn with_calibration(mut self, calibration: CalibrationFactor) -> Self {
        self.calibration = calibration;
        self
    }

    pub const fn with_open_threshold_cg(mut self, open_threshold_cg: i32) -> Self {
        self.open_threshold_cg = open_threshold_cg;
        self
    }

    pub const fn with_settle_ms(mut self, settle_ms: u32) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    pub const fn with_sample_interval_ms(mut self, sample_interval_ms: u32) -> Self {
        self.sample_interval_ms = sample_interval_ms;
        self
    }

    pub const fn with_clock_half_period_us(mut self, clock_half_period_us: u32) -> Self {
        self.clock_half_period_us = clock_half_period_us;
        self
    }

    /// Bound the wait for the HX711 data-ready signal. The default blocks forever.
    pub const fn with_ready_wait(mut self, ready_wait: ReadyWait) -> Self {
        self.ready_wait = ready_wait;
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
