use crate::alerts::AlertBus;
use crate::hw::haptic::HapticMotor;

#[embassy_executor::task]
pub async fn run(mut motor: HapticMotor<'static>, bus: &'static AlertBus) -> ! {
    let patterns = bus.haptics.receiver();
    loop {
        let pattern = patterns.receive().await;
        motor.play(pattern).await;
    }
}
