use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorKind, InputPin, OutputPin},
};
use log::trace;
use thiserror::Error;

use crate::config::MonitorConfig;

const DATA_BITS: usize = 24;
// one trailing pulse selects channel A, gain 128 for the next conversion
const GAIN_PULSES: usize = 1;
// PD_SCK high for longer than 60us powers the chip down
const POWER_DOWN_HOLD_US: u32 = 60;

/// Signed 24-bit HX711 conversion, sign extended to `i32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSample(i32);

impl RawSample {
    pub const MIN: i32 = -(1 << 23);
    pub const MAX: i32 = (1 << 23) - 1;

    /// Wraps `value` as is. The driver only produces values in `MIN..=MAX`;
    /// the range is not checked here.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn get(&self) -> i32 {
        self.0
    }
}

/// Unloaded reading captured once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TareOffset(RawSample);

impl TareOffset {
    pub const fn new(raw: RawSample) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> RawSample {
        self.0
    }
}

/// How long to wait for DOUT to signal a finished conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyWait {
    /// Spin on DOUT until it goes low, however long that takes
    Forever,
    Within { timeout_us: u32, poll_interval_us: u32 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("HX711 not ready after {0} us")]
    NotReady(u32),
    #[error("HX711 pin error: {0:?}")]
    Pin(ErrorKind),
}

fn pin_err<E: embedded_hal::digital::Error>(e: E) -> SensorError {
    SensorError::Pin(e.kind())
}

/// Anything able to produce raw load cell samples.
pub trait RawSampleSource {
    fn read_raw(&mut self) -> Result<RawSample, SensorError>;
}

/// Convert the 24 bit two's complement word clocked out of the HX711 to `i32`.
pub const fn sign_extend_24(word: u32) -> i32 {
    let word = word & 0x00FF_FFFF;
    if word & 0x0080_0000 != 0 {
        (word | 0xFF00_0000) as i32
    } else {
        word as i32
    }
}

/// Bit-banged HX711 driver: PD_SCK is driven by us, DOUT is sampled.
pub struct Hx711<CLK, DATA, D> {
    clock: CLK,
    data: DATA,
    delay: D,
    half_period_us: u32,
    ready_wait: ReadyWait,
}

impl<CLK, DATA, D> Hx711<CLK, DATA, D>
where
    CLK: OutputPin,
    DATA: InputPin,
    D: DelayNs,
{
    pub fn new(
        mut clock: CLK,
        data: DATA,
        delay: D,
        config: &MonitorConfig,
    ) -> Result<Self, SensorError> {
        clock.set_low().map_err(pin_err)?;

        Ok(Self {
            clock,
            data,
            delay,
            half_period_us: config.clock_half_period_us,
            ready_wait: config.ready_wait,
        })
    }

    pub fn power_down(&mut self) -> Result<(), SensorError> {
        self.clock.set_high().map_err(pin_err)?;
        self.delay.delay_us(POWER_DOWN_HOLD_US);
        Ok(())
    }

    pub fn power_up(&mut self) -> Result<(), SensorError> {
        self.clock.set_low().map_err(pin_err)
    }

    pub fn release(self) -> (CLK, DATA, D) {
        (self.clock, self.data, self.delay)
    }

    /// DOUT low means a conversion is waiting to be clocked out.
    fn wait_ready(&mut self) -> Result<(), SensorError> {
        match self.ready_wait {
            ReadyWait::Forever => {
                while self.data.is_high().map_err(pin_err)? {}
                Ok(())
            }
            ReadyWait::Within {
                timeout_us,
                poll_interval_us,
            } => {
                let mut waited_us: u32 = 0;
                loop {
                    if self.data.is_low().map_err(pin_err)? {
                        return Ok(());
                    }
                    if waited_us >= timeout_us {
                        return Err(SensorError::NotReady(timeout_us));
                    }
                    self.delay.delay_us(poll_interval_us);
                    waited_us = waited_us.saturating_add(poll_interval_us.max(1));
                }
            }
        }
    }

    fn pulse(&mut self) -> Result<(), SensorError> {
        self.clock.set_high().map_err(pin_err)?;
        self.delay.delay_us(self.half_period_us);
        self.clock.set_low().map_err(pin_err)?;
        self.delay.delay_us(self.half_period_us);
        Ok(())
    }
}

impl<CLK, DATA, D> RawSampleSource for Hx711<CLK, DATA, D>
where
    CLK: OutputPin,
    DATA: InputPin,
    D: DelayNs,
{
    fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        self.wait_ready()?;

        let mut word: u32 = 0;
        for _ in 0..DATA_BITS {
            self.clock.set_high().map_err(pin_err)?;
            self.delay.delay_us(self.half_period_us);
            word <<= 1;
            self.clock.set_low().map_err(pin_err)?;
            self.delay.delay_us(self.half_period_us);
            if self.data.is_high().map_err(pin_err)? {
                word |= 1;
            }
        }

        for _ in 0..GAIN_PULSES {
            self.pulse()?;
        }

        trace!("hx711 word {:#08x}", word);
        Ok(RawSample::new(sign_extend_24(word)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        digital::{Mock as PinMock, State, Transaction},
    };
    use rstest::rstest;

    fn driver(chip: &sim::Shared, config: &MonitorConfig) -> Hx711<sim::Clock, sim::Data, NoopDelay> {
        Hx711::new(
            sim::Clock(chip.clone()),
            sim::Data(chip.clone()),
            NoopDelay::new(),
            config,
        )
        .unwrap()
    }

    #[rstest]
    #[case(0x000000, 0)]
    #[case(0x000001, 1)]
    #[case(0x7FFFFF, RawSample::MAX)]
    #[case(0x800000, RawSample::MIN)]
    #[case(0xFFFFFF, -1)]
    #[case(0xFFFFF3, -13)]
    #[case(0xFF_800000, RawSample::MIN)]
    fn sign_extends_from_bit_23(#[case] word: u32, #[case] expected: i32) {
        assert_eq!(sign_extend_24(word), expected);
    }

    #[test]
    fn raw_sample_wraps_value_unchecked() {
        assert_eq!(RawSample::new(i32::MAX).get(), i32::MAX);
        assert_eq!(RawSample::new(RawSample::MIN - 1).get(), -(1 << 23) - 1);
    }

    #[test]
    fn reads_words_msb_first() {
        let chip = sim::chip();
        let mut hx711 = driver(&chip, &MonitorConfig::default());

        for word in [0x000000, 0x123456, 0x7FFFFF, 0x800000, 0xABCDEF, 0xFFFFFF] {
            sim::push(&chip, word, 3);
            let expected = sign_extend_24(word);
            assert_eq!(hx711.read_raw(), Ok(RawSample::new(expected)));
        }
    }

    #[test]
    fn negative_words_come_back_negative() {
        let chip = sim::chip();
        let mut hx711 = driver(&chip, &MonitorConfig::default());

        sim::push(&chip, 0xFFFF38, 0);
        assert_eq!(hx711.read_raw(), Ok(RawSample::new(-200)));
    }

    #[test]
    fn issues_exactly_twenty_five_pulses() {
        let chip = sim::chip();
        let mut hx711 = driver(&chip, &MonitorConfig::default());

        sim::push(&chip, 0x5A5A5A, 10);
        hx711.read_raw().unwrap();

        let state = chip.borrow();
        assert_eq!(state.pulses, DATA_BITS + GAIN_PULSES);
        assert_eq!(state.high_samples, 0, "DOUT must be sampled with the clock low");
        assert!(!state.clock_high);
    }

    #[test]
    fn bounded_wait_reports_not_ready() {
        let config = MonitorConfig::default().with_ready_wait(ReadyWait::Within {
            timeout_us: 30,
            poll_interval_us: 10,
        });
        let clock = PinMock::new(&[Transaction::set(State::Low)]);
        let data = PinMock::new(&[
            Transaction::get(State::High),
            Transaction::get(State::High),
            Transaction::get(State::High),
            Transaction::get(State::High),
        ]);

        let mut hx711 = Hx711::new(clock, data, NoopDelay::new(), &config).unwrap();
        assert_eq!(hx711.read_raw(), Err(SensorError::NotReady(30)));

        let (mut clock, mut data, _) = hx711.release();
        clock.done();
        data.done();
    }

    #[test]
    fn bounded_wait_still_reads_a_late_sample() {
        let config = MonitorConfig::default().with_ready_wait(ReadyWait::Within {
            timeout_us: 100,
            poll_interval_us: 10,
        });
        let chip = sim::chip();
        let mut hx711 = driver(&chip, &config);

        sim::push(&chip, 0x000010, 5);
        assert_eq!(hx711.read_raw(), Ok(RawSample::new(16)));
    }

    #[test]
    fn power_down_holds_clock_high() {
        let clock = PinMock::new(&[
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::set(State::Low),
        ]);
        let data = PinMock::new(&[]);

        let mut hx711 = Hx711::new(clock, data, NoopDelay::new(), &MonitorConfig::default()).unwrap();
        hx711.power_down().unwrap();
        hx711.power_up().unwrap();

        let (mut clock, mut data, _) = hx711.release();
        clock.done();
        data.done();
    }
}
