#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod controller;
pub mod hx711;
pub mod status;
pub mod weight;

pub use config::MonitorConfig;
pub use controller::{ActuationState, Controller, CycleReport, MonitorError};
pub use hx711::{Hx711, RawSample, RawSampleSource, ReadyWait, SensorError, TareOffset};
pub use weight::{to_centigrams, CalibrationFactor, Centigrams};
