use embassy_futures::select::{Either, select};
use embassy_stm32::exti::ExtiInput;
use embassy_time::{Duration, Timer};

use crate::alerts::{AlertBus, AlertInput};

const DEBOUNCE: Duration = Duration::from_millis(30);

/// Holding the button this long sends a test alert.
const LONG_PRESS: Duration = Duration::from_secs(2);

#[embassy_executor::task]
pub async fn run(mut button: ExtiInput<'static>, bus: &'static AlertBus) -> ! {
    let inputs = bus.inputs.sender();

    loop {
        button.wait_for_falling_edge().await;
        Timer::after(DEBOUNCE).await;
        if button.is_high() {
            continue;
        }

        let press = select(button.wait_for_rising_edge(), Timer::after(LONG_PRESS)).await;
        match press {
            Either::First(()) => inputs.send(AlertInput::Button).await,
            Either::Second(()) => {
                inputs.send(AlertInput::TestAlert).await;
                button.wait_for_rising_edge().await;
            }
        }
        Timer::after(DEBOUNCE).await;
    }
}
