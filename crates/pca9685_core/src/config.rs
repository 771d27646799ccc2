//!System level config for one chip instance.

use serde::Deserialize;

///Deserializable settings for one PCA9685 on the bus.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pca9685DeviceConfig {
    pub i2c_address: u8,
    pub frequency_hz: u32,
}

impl Default for Pca9685DeviceConfig {
    fn default() -> Self {
        //0x40 is the chip's address with all address pins low. 50Hz
        //suits the hobby servos this chip usually drives.
        Self {
            i2c_address: 0x40,
            frequency_hz: 50,
        }
    }
}
