//!Raspberry Pi transport for `pca9685_core`. It is a wrapper around
//! the rppal library.
//!
//! The `open` and `open_default` functions open one session with a
//! chip on an I2C bus. `connector` packages bus selection into the
//! connect closure a `Pca9685Controller` wants.

use std::thread;
use std::time::Duration;

use pca9685_core::error::Pca9685Error;
use pca9685_core::transport::I2cTransport;
use rppal::i2c::I2c;
use tracing::debug;

///One open rppal I2C session, addressed to a single PCA9685.
pub struct RpiI2cTransport {
    i2c: I2c,
}

impl I2cTransport for RpiI2cTransport {
    type Error = rppal::i2c::Error;

    fn read_register(&mut self, register: u8) -> Result<u8, Self::Error> {
        let mut buffer = [0u8];
        self.i2c.write_read(&[register], &mut buffer)?;
        Ok(buffer[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(&[register, value])?;
        Ok(())
    }

    fn delay_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

///Open a session with the chip at `address` on i2c bus `bus`.
pub fn open(bus: u8, address: u8) -> Result<RpiI2cTransport, Pca9685Error> {
    debug!("opening rppal i2c bus {} for address {:02X}", bus, address);
    let mut i2c = I2c::with_bus(bus)
        .map_err(|err| Pca9685Error::TransportOpen(format!("rppal i2c bus {}: {}", bus, err)))?;
    i2c.set_slave_address(address as u16).map_err(|err| {
        Pca9685Error::TransportOpen(format!("rppal slave address {:02X}: {}", address, err))
    })?;
    Ok(RpiI2cTransport { i2c })
}

///Open a session on the default i2c bus.
pub fn open_default(address: u8) -> Result<RpiI2cTransport, Pca9685Error> {
    debug!("opening default rppal i2c bus for address {:02X}", address);
    let mut i2c = I2c::new()
        .map_err(|err| Pca9685Error::TransportOpen(format!("rppal i2c bus: {}", err)))?;
    i2c.set_slave_address(address as u16).map_err(|err| {
        Pca9685Error::TransportOpen(format!("rppal slave address {:02X}: {}", address, err))
    })?;
    Ok(RpiI2cTransport { i2c })
}

///Connect closure for `Pca9685Controller::new`, bound to one bus.
pub fn connector(bus: u8) -> impl Fn(u8) -> Result<RpiI2cTransport, Pca9685Error> {
    move |address| open(bus, address)
}
