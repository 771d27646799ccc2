//!A mod for the error types

use std::fmt::{Debug, Display, Formatter};

///Common error type for every driver operation. The first failure is
/// terminal for that call; the driver performs no retries and no
/// rollback of registers already written.
pub enum Pca9685Error {
    ///The transport could not open a session at the requested address.
    TransportOpen(String),
    ///Every slot in the device table is claimed.
    TooManyDevices,
    ///A single register read transaction failed.
    RegisterRead { register: u8, cause: String },
    ///A single register write transaction failed.
    RegisterWrite { register: u8, cause: String },
    ///Out-of-range channel, duty, frequency or handle.
    InvalidArgument(String),
}

impl Pca9685Error {
    pub fn register_read<E: Debug>(register: u8, cause: E) -> Self {
        Self::RegisterRead {
            register,
            cause: format!("{:?}", cause),
        }
    }
    pub fn register_write<E: Debug>(register: u8, cause: E) -> Self {
        Self::RegisterWrite {
            register,
            cause: format!("{:?}", cause),
        }
    }
    pub fn invalid_argument(msg: &str) -> Self {
        Self::InvalidArgument(msg.to_string())
    }
}

impl Debug for Pca9685Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransportOpen(cause) => {
                f.write_fmt(format_args!("Pca9685Error::TransportOpen - Cause: {}", cause))
            }
            Self::TooManyDevices => f.write_str("Pca9685Error::TooManyDevices"),
            Self::RegisterRead { register, cause } => f.write_fmt(format_args!(
                "Pca9685Error::RegisterRead (register: {:02X}) - Cause: {}",
                register, cause
            )),
            Self::RegisterWrite { register, cause } => f.write_fmt(format_args!(
                "Pca9685Error::RegisterWrite (register: {:02X}) - Cause: {}",
                register, cause
            )),
            Self::InvalidArgument(msg) => {
                f.write_fmt(format_args!("Pca9685Error::InvalidArgument - {}", msg))
            }
        }
    }
}

impl Display for Pca9685Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransportOpen(_) => write!(f, "could not open a transport session"),
            Self::TooManyDevices => write!(f, "device table is full"),
            Self::RegisterRead { register, .. } => {
                write!(f, "read of register {:02X} failed", register)
            }
            Self::RegisterWrite { register, .. } => {
                write!(f, "write of register {:02X} failed", register)
            }
            Self::InvalidArgument(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Pca9685Error {}
