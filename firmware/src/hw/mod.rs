//! Board peripherals behind the alert tasks.

#![cfg(target_os = "none")]

pub mod accel;
pub mod haptic;
