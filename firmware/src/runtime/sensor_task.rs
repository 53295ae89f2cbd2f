use alert_core::orchestrator::DetectorCommand;
use alert_core::signal::{SignalConfig, SignalProcessor};
use embassy_time::{Duration, Instant, Ticker};

use crate::alerts::{AlertBus, AlertInput};
use crate::clock::FirmwareInstant;
use crate::hw::accel::Lis3dh;
use crate::status;

#[embassy_executor::task]
pub async fn run(mut accel: Lis3dh<'static>, bus: &'static AlertBus, config: SignalConfig) -> ! {
    let mut processor = SignalProcessor::<FirmwareInstant>::new(config);
    let period = u64::try_from(config.sample_period().as_micros()).unwrap_or(20_000);
    let mut ticker = Ticker::every(Duration::from_micros(period));
    let triggers = bus.inputs.sender();

    loop {
        if !processor.is_running() {
            let command = bus.detector.wait().await;
            apply(&mut processor, &accel, command);
            ticker.reset();
            continue;
        }

        ticker.next().await;
        if let Some(command) = bus.detector.try_take() {
            apply(&mut processor, &accel, command);
        }

        let now = FirmwareInstant::from(Instant::now());
        let sample = match accel.read_sample(now) {
            Ok(sample) => sample,
            Err(error) => {
                defmt::warn!("sensor: read failed ({})", error);
                continue;
            }
        };

        if let Some(update) = processor.ingest(&sample) {
            status::record_magnitude(update.magnitude);
            if update.triggered {
                defmt::info!("sensor: sustained motion trigger t={}us", now.as_micros());
                triggers.send(AlertInput::Trigger(now)).await;
            }
        }
    }
}

fn apply(
    processor: &mut SignalProcessor<FirmwareInstant>,
    accel: &Lis3dh<'static>,
    command: DetectorCommand,
) {
    match command {
        DetectorCommand::Start => {
            if let Err(error) = processor.start(accel) {
                defmt::error!("sensor: start refused ({})", error.label());
            }
        }
        DetectorCommand::Stop => processor.stop(),
        DetectorCommand::Reset => processor.reset(),
    }
}
