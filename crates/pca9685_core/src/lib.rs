//!Driver for the PCA9685, NXP's 16-channel 12-bit PWM controller.
//!
//! The driver is a thin binding over an I2C transport: it owns a fixed
//! table of open chips, runs the datasheet reset/frequency sequence,
//! and writes per-channel duty values. Bring your own transport by
//! implementing [`transport::I2cTransport`]; the `pca9685_rpi` crate
//! supplies one for the Raspberry Pi.

//internal error type for driver operations
pub mod error;

//chip register map and mode bits
pub mod registers;

//the transport trait the driver drives the bus through
pub mod transport;

//serde config for a chip instance
pub mod config;

//the device table and register sequences
pub mod controller;

pub use config::Pca9685DeviceConfig;
pub use controller::{
    prescale_for_frequency, ChannelPhase, DeviceHandle, DeviceInfo, Pca9685Controller, MAX_DEVICES,
};
pub use error::Pca9685Error;
pub use transport::I2cTransport;
