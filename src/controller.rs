use embedded_hal::digital::{ErrorKind, OutputPin, StatefulOutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_io::Write;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    config::MonitorConfig,
    hx711::{RawSample, RawSampleSource, SensorError, TareOffset},
    status,
    weight::{to_centigrams, Centigrams},
};

/// Output state of the drip valve, recomputed from every sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActuationState {
    /// Relay released, flow stopped, indicator toggled every cycle
    Open,
    /// Relay energised, flow permitted, indicator off
    Closed,
}

impl ActuationState {
    pub fn for_weight(weight: Centigrams, open_threshold_cg: i32) -> Self {
        if weight.get() <= open_threshold_cg {
            ActuationState::Open
        } else {
            ActuationState::Closed
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorError {
    #[error("{0}")]
    Sensor(#[from] SensorError),
    #[error("actuator pin error: {0:?}")]
    Actuator(ErrorKind),
}

fn actuator_err<E: embedded_hal::digital::Error>(e: E) -> MonitorError {
    MonitorError::Actuator(e.kind())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleReport {
    pub raw: RawSample,
    pub weight: Centigrams,
    pub state: ActuationState,
}

pub struct Controller<S, RELAY, LED, W> {
    sensor: S,
    relay: RELAY,
    indicator: LED,
    sink: W,
    config: MonitorConfig,
    tare: TareOffset,
}

impl<S, RELAY, LED, W> Controller<S, RELAY, LED, W>
where
    S: RawSampleSource,
    RELAY: OutputPin,
    LED: StatefulOutputPin,
    W: Write,
{
    /// Let the load cell settle, capture the tare offset and report one
    /// informational weight reading.
    pub async fn start<D: DelayNs>(
        mut sensor: S,
        relay: RELAY,
        indicator: LED,
        mut sink: W,
        config: MonitorConfig,
        delay: &mut D,
    ) -> Result<Self, MonitorError> {
        status!(&mut sink, "=== IV Drip Monitor ===");

        delay.delay_ms(config.settle_ms).await;

        let tare = TareOffset::new(sensor.read_raw()?);
        info!("Tare offset captured: {}", tare.raw().get());
        status!(&mut sink, "Tare offset = {}", tare.raw().get());

        // reported only, never used for actuation
        let initial = to_centigrams(sensor.read_raw()?, tare, config.calibration);
        status!(&mut sink, "Initial weight = {}", initial);

        Ok(Self {
            sensor,
            relay,
            indicator,
            sink,
            config,
            tare,
        })
    }

    pub fn tare(&self) -> TareOffset {
        self.tare
    }

    /// Sample, convert, report and drive the outputs once.
    pub fn cycle(&mut self) -> Result<CycleReport, MonitorError> {
        let raw = self.sensor.read_raw()?;
        let weight = to_centigrams(raw, self.tare, self.config.calibration);
        debug!("raw {} -> {} cg", raw.get(), weight.get());
        status!(&mut self.sink, "Weight: {}", weight);

        let state = ActuationState::for_weight(weight, self.config.open_threshold_cg);
        self.actuate(state)?;

        Ok(CycleReport { raw, weight, state })
    }

    fn actuate(&mut self, state: ActuationState) -> Result<(), MonitorError> {
        let threshold = Centigrams::new(self.config.open_threshold_cg);

        match state {
            ActuationState::Open => {
                self.relay.set_low().map_err(actuator_err)?;
                self.indicator.toggle().map_err(actuator_err)?;
                status!(&mut self.sink, "Solenoid OFF (<= {})", threshold);
            }
            ActuationState::Closed => {
                self.relay.set_high().map_err(actuator_err)?;
                self.indicator.set_low().map_err(actuator_err)?;
                status!(&mut self.sink, "Solenoid ON (> {})", threshold);
            }
        }

        Ok(())
    }

    pub async fn run<D: DelayNs>(mut self, delay: &mut D) -> ! {
        loop {
            if let Err(e) = self.cycle() {
                warn!("Sample skipped: {}", e);
            }
            delay.delay_ms(self.config.sample_interval_ms).await;
        }
    }

    pub fn release(self) -> (S, RELAY, LED, W) {
        (self.sensor, self.relay, self.indicator, self.sink)
    }
}
