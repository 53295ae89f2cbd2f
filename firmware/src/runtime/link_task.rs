use alert_core::delivery::DeliveryChannel;
use embassy_futures::select::{Either, select};
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use embassy_time::{Duration, Timer};
use static_cell::StaticCell;

use crate::alerts::{AlertBus, AlertInput};
use crate::radio::RadioLink;

const RADIO_UART_BUFFER_SIZE: usize = 256;
const RADIO_UART_BAUD: u32 = 115_200;

static UART_TX_BUFFER: StaticCell<[u8; RADIO_UART_BUFFER_SIZE]> = StaticCell::new();
static UART_RX_BUFFER: StaticCell<[u8; RADIO_UART_BUFFER_SIZE]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

#[embassy_executor::task]
pub async fn run(
    bus: &'static AlertBus,
    usart: Peri<'static, hal::peripherals::USART5>,
    tx_pin: Peri<'static, hal::peripherals::PB0>,
    rx_pin: Peri<'static, hal::peripherals::PB1>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = RADIO_UART_BAUD;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let uart = BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        UART_TX_BUFFER.init([0; RADIO_UART_BUFFER_SIZE]),
        UART_RX_BUFFER.init([0; RADIO_UART_BUFFER_SIZE]),
        UartIrqs,
        config,
    )
    .expect("failed to initialize radio UART");

    let mut channel = DeliveryChannel::new(RadioLink::new(uart));
    let requests = bus.dispatch.receiver();
    let inputs = bus.inputs.sender();

    loop {
        let next = select(requests.receive(), channel.link_mut().next_notice()).await;
        match next {
            Either::First(event) => {
                let receipt = channel.send(&event).await;
                if let Some(failure) = receipt.direct_failure {
                    defmt::info!("link: direct send failed ({})", failure.label());
                }
                inputs.send(AlertInput::DeliveryFinished(receipt)).await;
            }
            Either::Second(Ok(notice)) => inputs.send(AlertInput::Link(notice)).await,
            Either::Second(Err(error)) => {
                defmt::warn!("link: radio read failed ({})", error.label());
                Timer::after(Duration::from_millis(5)).await;
            }
        }
    }
}
