//! Blocking I2C driver for the LIS3DH accelerometer.

use alert_core::signal::{Sample, SensorCapability};
use embassy_stm32::i2c::{Error as I2cError, I2c};
use embassy_stm32::mode::Blocking;

use crate::clock::FirmwareInstant;
use crate::sensor::{
    AUTO_INCREMENT, CTRL_REG1, CTRL_REG1_50HZ_XYZ, CTRL_REG4, CTRL_REG4_4G_HR, LIS3DH_ADDRESS,
    OUT_X_L, WHO_AM_I, WHO_AM_I_VALUE, sample_from_registers,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, defmt::Format)]
pub enum AccelError {
    Bus,
    /// WHO_AM_I returned something other than a LIS3DH.
    UnknownDevice(u8),
}

impl From<I2cError> for AccelError {
    fn from(_: I2cError) -> Self {
        Self::Bus
    }
}

pub struct Lis3dh<'d> {
    i2c: I2c<'d, Blocking>,
    ready: bool,
}

impl<'d> Lis3dh<'d> {
    pub fn new(i2c: I2c<'d, Blocking>) -> Self {
        Self { i2c, ready: false }
    }

    /// Checks the device identity and starts 50 Hz conversions.
    pub fn init(&mut self) -> Result<(), AccelError> {
        let mut id = [0u8; 1];
        self.i2c
            .blocking_write_read(LIS3DH_ADDRESS, &[WHO_AM_I], &mut id)?;
        if id[0] != WHO_AM_I_VALUE {
            return Err(AccelError::UnknownDevice(id[0]));
        }

        self.i2c
            .blocking_write(LIS3DH_ADDRESS, &[CTRL_REG1, CTRL_REG1_50HZ_XYZ])?;
        self.i2c
            .blocking_write(LIS3DH_ADDRESS, &[CTRL_REG4, CTRL_REG4_4G_HR])?;
        self.ready = true;
        Ok(())
    }

    pub fn read_sample(
        &mut self,
        timestamp: FirmwareInstant,
    ) -> Result<Sample<FirmwareInstant>, AccelError> {
        let mut raw = [0u8; 6];
        self.i2c
            .blocking_write_read(LIS3DH_ADDRESS, &[OUT_X_L | AUTO_INCREMENT], &mut raw)?;
        Ok(sample_from_registers(&raw, timestamp))
    }
}

impl SensorCapability for Lis3dh<'_> {
    fn is_available(&self) -> bool {
        self.ready
    }
}
