//!Transport abstraction over the I2C bus.
//!
//! The driver only needs three bus operations: read one 8-bit
//! register, write one 8-bit register, and sleep between writes during
//! the power-up sequence. Anything that can do those can drive the
//! chip; `pca9685_rpi` provides the Raspberry Pi implementation and
//! the `hal` feature bridges any `embedded-hal` 1.0 bus.

use std::fmt::Debug;

///One open session with a single chip at a fixed bus address.
pub trait I2cTransport {
    type Error: Debug;

    ///Read an 8-bit register.
    fn read_register(&mut self, register: u8) -> Result<u8, Self::Error>;

    ///Write an 8-bit register.
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    ///Coarse blocking sleep, used only for chip power-up timing.
    fn delay_ms(&mut self, ms: u64);
}

///Adapter for an `embedded-hal` bus plus delay source, bound to one
/// device address.
#[cfg(feature = "hal")]
pub struct HalTransport<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

#[cfg(feature = "hal")]
impl<I2C, D> HalTransport<I2C, D>
where
    I2C: embedded_hal::i2c::I2c,
    D: embedded_hal::delay::DelayNs,
{
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        HalTransport { i2c, delay, address }
    }
}

#[cfg(feature = "hal")]
impl<I2C, D> I2cTransport for HalTransport<I2C, D>
where
    I2C: embedded_hal::i2c::I2c,
    D: embedded_hal::delay::DelayNs,
{
    type Error = I2C::Error;

    fn read_register(&mut self, register: u8) -> Result<u8, Self::Error> {
        let mut buffer = [0u8];
        self.i2c.write_read(self.address, &[register], &mut buffer)?;
        Ok(buffer[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[register, value])
    }

    fn delay_ms(&mut self, ms: u64) {
        self.delay.delay_ms(ms as u32);
    }
}
