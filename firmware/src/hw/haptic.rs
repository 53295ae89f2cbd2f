//! Vibration motor driven from a push-pull GPIO.

use embassy_stm32::gpio::Output;
use embassy_time::Timer;

use crate::alerts::HapticPattern;

pub struct HapticMotor<'d> {
    pin: Output<'d>,
}

impl<'d> HapticMotor<'d> {
    pub fn new(mut pin: Output<'d>) -> Self {
        pin.set_low();
        Self { pin }
    }

    pub async fn play(&mut self, pattern: HapticPattern) {
        for &(on_ms, off_ms) in pattern.pulses() {
            self.pin.set_high();
            Timer::after_millis(u64::from(on_ms)).await;
            self.pin.set_low();
            if off_ms > 0 {
                Timer::after_millis(u64::from(off_ms)).await;
            }
        }
    }
}
