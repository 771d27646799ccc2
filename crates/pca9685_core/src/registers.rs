//!Register map and mode bits for the PCA9685, from the NXP datasheet.
//!
//! Channel registers repeat every 4 bytes starting at `LED0_ON_L`. The
//! broadcast registers at the top of the address space affect all 16
//! channels at once.

pub const MODE1: u8 = 0x00;
pub const MODE2: u8 = 0x01;

pub const LED0_ON_L: u8 = 0x06;
pub const LED0_ON_H: u8 = 0x07;
pub const LED0_OFF_L: u8 = 0x08;
pub const LED0_OFF_H: u8 = 0x09;

pub const ALL_ON_L: u8 = 0xFA;
pub const ALL_ON_H: u8 = 0xFB;
pub const ALL_OFF_L: u8 = 0xFC;
pub const ALL_OFF_H: u8 = 0xFD;
pub const PRESCALE: u8 = 0xFE;

//MODE1 bits
pub const MODE1_RESTART: u8 = 0x80;
pub const MODE1_SLEEP: u8 = 0x10;
pub const MODE1_ALLCALL: u8 = 0x01;

//MODE2 bits
pub const MODE2_OUTDRV: u8 = 0x04;

//MODE1 with RESTART and SLEEP cleared
pub const MODE1_BASE_MASK: u8 = 0x6F;

///Fixed internal oscillator frequency in Hz.
pub const OSCILLATOR_HZ: f64 = 25_000_000.0;

///PWM counter width, 12 bits.
pub const COUNTER_STEPS: f64 = 4096.0;

pub const NUM_CHANNELS: u8 = 16;
pub const MAX_DUTY: u16 = 4095;
