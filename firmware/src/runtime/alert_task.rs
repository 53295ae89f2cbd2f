use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Ticker};

use crate::alerts::{AlertBus, AlertCoordinator, AlertInput, WristStore};
use crate::clock::FirmwareInstant;

/// Countdown and cooldown evaluation period.
const TICK_PERIOD: Duration = Duration::from_millis(100);

#[embassy_executor::task]
pub async fn run(mut coordinator: AlertCoordinator<WristStore>, bus: &'static AlertBus) -> ! {
    let actions = coordinator.start();
    bus.publish(actions).await;

    let inputs = bus.inputs.receiver();
    let mut ticker = Ticker::every(TICK_PERIOD);

    loop {
        let input = match select(inputs.receive(), ticker.next()).await {
            Either::First(input) => input,
            Either::Second(()) => AlertInput::Tick,
        };

        let now = FirmwareInstant::from(Instant::now());
        let actions = coordinator.handle(input, now);
        let dropped = bus.publish(actions).await;
        if dropped > 0 {
            defmt::warn!("alert: dropped {} haptic patterns", dropped);
        }
    }
}
