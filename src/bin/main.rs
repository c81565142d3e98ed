#![no_std]
#![no_main]

use core::fmt::Debug;

use embassy_executor::Spawner;
use embassy_time::{Delay, Timer};
use esp_backtrace as _;
use esp_hal::{
    delay::Delay as BusyDelay,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    timer::systimer::SystemTimer,
    uart::{Config, Uart, UartTx},
    Blocking,
};
use esp_println::println;
use ivmon_lib::{Controller, Hx711, MonitorConfig};

type Sensor = Hx711<Output<'static>, Input<'static>, BusyDelay>;
type Monitor = Controller<Sensor, Output<'static>, Output<'static>, UartTx<'static, Blocking>>;

/// Fail-stop: interrupts off, spin forever.
fn halt(reason: impl Debug) -> ! {
    println!("Halting: {reason:?}");
    critical_section::with(|_| loop {
        core::hint::spin_loop();
    });
    loop {
        core::hint::spin_loop();
    }
}

#[embassy_executor::task]
async fn iv_monitor(monitor: Monitor) {
    monitor.run(&mut Delay).await
}

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    println!("Init!");

    let peripherals = esp_hal::init(esp_hal::Config::default());
    let config = MonitorConfig::default();

    let systimer = SystemTimer::new(peripherals.SYSTIMER);
    esp_hal_embassy::init(systimer.alarm0);

    // relay released and indicator off until the first sample decides otherwise
    let relay = Output::new(peripherals.GPIO5, Level::Low, OutputConfig::default());
    let indicator = Output::new(peripherals.GPIO8, Level::Low, OutputConfig::default());

    let clock = Output::new(peripherals.GPIO6, Level::Low, OutputConfig::default());
    let data = Input::new(peripherals.GPIO7, InputConfig::default().with_pull(Pull::None));
    let sensor = match Hx711::new(clock, data, BusyDelay::new(), &config) {
        Ok(sensor) => sensor,
        Err(e) => halt(e),
    };
    println!("HX711 setup");

    let uart0 = match Uart::new(peripherals.UART0, Config::default()) {
        Ok(uart) => uart
            .with_tx(peripherals.GPIO16)
            .with_rx(peripherals.GPIO17),
        Err(e) => halt(e),
    };
    let (_rx, tx) = uart0.split();
    println!("UART setup");

    match Controller::start(sensor, relay, indicator, tx, config, &mut Delay).await {
        Ok(monitor) => {
            if let Err(e) = spawner.spawn(iv_monitor(monitor)) {
                halt(e);
            }
        }
        Err(e) => halt(e),
    }

    loop {
        Timer::after_millis(1000).await;
    }
}
