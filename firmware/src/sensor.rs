//! LIS3DH register map and sample conversion.
//!
//! The accelerometer runs in high-resolution mode at ±4 g, where each output
//! register pair holds a left-justified 12-bit value at 2 mg per digit.

use alert_core::signal::Sample;

use crate::clock::FirmwareInstant;

pub const LIS3DH_ADDRESS: u8 = 0x18;
pub const WHO_AM_I: u8 = 0x0F;
pub const WHO_AM_I_VALUE: u8 = 0x33;
pub const CTRL_REG1: u8 = 0x20;
pub const CTRL_REG4: u8 = 0x23;
pub const OUT_X_L: u8 = 0x28;

/// Register auto-increment flag for multi-byte reads.
pub const AUTO_INCREMENT: u8 = 0x80;

/// 50 Hz output data rate, normal power, X/Y/Z enabled.
pub const CTRL_REG1_50HZ_XYZ: u8 = 0x47;

/// Block data update, ±4 g full scale, high resolution.
pub const CTRL_REG4_4G_HR: u8 = 0x98;

const G_PER_DIGIT: f64 = 0.002;

/// Converts one little-endian output register pair into g.
pub fn axis_to_g(low: u8, high: u8) -> f64 {
    let raw = i16::from_le_bytes([low, high]) >> 4;
    f64::from(raw) * G_PER_DIGIT
}

/// Builds a [`Sample`] from the six output bytes starting at `OUT_X_L`.
pub fn sample_from_registers(bytes: &[u8; 6], timestamp: FirmwareInstant) -> Sample<FirmwareInstant> {
    Sample::new(
        axis_to_g(bytes[0], bytes[1]),
        axis_to_g(bytes[2], bytes[3]),
        axis_to_g(bytes[4], bytes[5]),
        timestamp,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_g_reads_as_five_hundred_digits() {
        // 500 digits << 4 = 8000 = 0x1F40.
        assert!((axis_to_g(0x40, 0x1F) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn negative_values_are_sign_extended() {
        let bytes = (-8000i16).to_le_bytes();
        assert!((axis_to_g(bytes[0], bytes[1]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn resting_face_up_is_one_g() {
        let sample = sample_from_registers(
            &[0x00, 0x00, 0x00, 0x00, 0x40, 0x1F],
            FirmwareInstant::from_micros(0),
        );
        assert!(sample.user_magnitude() < 1e-9);
    }
}
