use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::i2c::{Config as I2cConfig, I2c};
use embassy_stm32::time::Hertz;

use alert_core::config::WristConfig;
use alert_core::signal::SensorCapability;

use crate::alerts::{AlertBus, AlertCoordinator, WristStore};
use crate::hw::accel::Lis3dh;
use crate::hw::haptic::HapticMotor;

mod alert_task;
mod button_task;
mod haptic_task;
mod link_task;
mod sensor_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static ALERT_BUS: AlertBus = AlertBus::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA6,
        PB0,
        PB1,
        PB8,
        PB9,
        PC13,
        EXTI13,
        I2C1,
        USART5,
        ..
    } = hal::init(config);

    let wrist_config = WristConfig::DEFAULT;
    wrist_config
        .validate()
        .expect("default wrist configuration rejected");

    let mut i2c_config = I2cConfig::default();
    i2c_config.frequency = Hertz::khz(400);
    let mut accel = Lis3dh::new(I2c::new_blocking(I2C1, PB8, PB9, i2c_config));
    if let Err(error) = accel.init() {
        defmt::error!("accelerometer unavailable: {}", error);
    }

    let coordinator =
        AlertCoordinator::new(&wrist_config, WristStore::new(), accel.is_available());
    let button = ExtiInput::new(PC13, EXTI13, Pull::Up);
    let motor = HapticMotor::new(Output::new(PA6, Level::Low, Speed::Low));

    spawner
        .spawn(sensor_task::run(accel, &ALERT_BUS, wrist_config.signal))
        .expect("failed to spawn sensor task");
    spawner
        .spawn(alert_task::run(coordinator, &ALERT_BUS))
        .expect("failed to spawn alert task");
    spawner
        .spawn(link_task::run(&ALERT_BUS, USART5, PB0, PB1))
        .expect("failed to spawn link task");
    spawner
        .spawn(button_task::run(button, &ALERT_BUS))
        .expect("failed to spawn button task");
    spawner
        .spawn(haptic_task::run(motor, &ALERT_BUS))
        .expect("failed to spawn haptic task");

    core::future::pending::<()>().await;
}
