//!Device table and register I/O sequences for the PCA9685.

use tracing::debug;

use crate::config::Pca9685DeviceConfig;
use crate::error::Pca9685Error;
use crate::registers as reg;
use crate::transport::I2cTransport;

///Max number of chips one controller will track.
pub const MAX_DEVICES: usize = 10;

//the datasheet requires at least 500us for the oscillator to
//stabilize after a sleep transition. 1ms is the coarsest sleep the
//transport offers.
const OSCILLATOR_WAIT_MS: u64 = 1;

//longer warm-up after the initial mode configuration
const STARTUP_WAIT_MS: u64 = 5;

///Opaque identifier for one entry in the device table. Handles stay
/// valid for the life of the controller; there is no close operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHandle(usize);

///Which 12-bit register pair of a channel to write. The PWM output
/// asserts at the ON count and deasserts at the OFF count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    On,
    Off,
}

///Address and last requested frequency of an open device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub address: u8,
    pub frequency_hz: u32,
}

struct DeviceRecord<T> {
    transport: T,
    address: u8,
    frequency_hz: u32,
}

impl<T: I2cTransport> DeviceRecord<T> {
    fn read_reg(&mut self, register: u8) -> Result<u8, Pca9685Error> {
        self.transport
            .read_register(register)
            .map_err(|err| Pca9685Error::register_read(register, err))
    }

    fn write_reg(&mut self, register: u8, value: u8) -> Result<(), Pca9685Error> {
        self.transport
            .write_register(register, value)
            .map_err(|err| Pca9685Error::register_write(register, err))
    }
}

///Compute the PRESCALE register value for a target PWM frequency.
///
/// The chip divides its fixed 25MHz oscillator by `4096 * (prescale + 1)`.
/// Rounding adds 0.5 before truncating, per the datasheet, so the
/// realized frequency lands as close as possible to the request.
pub fn prescale_for_frequency(frequency_hz: u32) -> u8 {
    let raw = reg::OSCILLATOR_HZ / reg::COUNTER_STEPS / (frequency_hz as f64);
    (raw + 0.5 - 1.0) as u8
}

///Tracks every chip opened through it and owns their transport
/// sessions. This is the explicit-context replacement for the process
/// global table such drivers usually keep: handles are still slot
/// indices, but all state lives here.
pub struct Pca9685Controller<T, F>
where
    T: I2cTransport,
    F: Fn(u8) -> Result<T, Pca9685Error>,
{
    devices: [Option<DeviceRecord<T>>; MAX_DEVICES],
    connect: F,
}

impl<T, F> Pca9685Controller<T, F>
where
    T: I2cTransport,
    F: Fn(u8) -> Result<T, Pca9685Error>,
{
    ///Create a controller with an empty device table. `connect` opens
    /// a transport session at a 7-bit bus address; see
    /// `pca9685_rpi::connector` for the Raspberry Pi one.
    pub fn new(connect: F) -> Self {
        Pca9685Controller {
            devices: std::array::from_fn(|_| None),
            connect,
        }
    }

    ///Open the chip at `address`, claim a table slot for it and run
    /// the full reset and setup sequence. The returned handle is valid
    /// for all other operations until the controller is dropped.
    pub fn open_device(
        &mut self,
        address: u8,
        frequency_hz: u32,
    ) -> Result<DeviceHandle, Pca9685Error> {
        debug!("opening pca9685 at address {:02X}, {}Hz", address, frequency_hz);
        if frequency_hz == 0 {
            return Err(Pca9685Error::invalid_argument("frequency must be nonzero"));
        }

        let transport = (self.connect)(address)?;

        let slot = self
            .devices
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(Pca9685Error::TooManyDevices)?;

        debug!("adding pca9685 at address {:02X} to table row {}", address, slot);
        self.devices[slot] = Some(DeviceRecord {
            transport,
            address,
            frequency_hz,
        });

        let handle = DeviceHandle(slot);
        self.reset(handle)?;
        self.setup(handle)?;
        Ok(handle)
    }

    ///Open a device described by a deserialized config.
    pub fn open_from_config(
        &mut self,
        config: &Pca9685DeviceConfig,
    ) -> Result<DeviceHandle, Pca9685Error> {
        self.open_device(config.i2c_address, config.frequency_hz)
    }

    ///Software reset: put the chip to sleep. The prescale register is
    /// only writable while the SLEEP bit is set, so this is the first
    /// write of every initialization.
    pub fn reset(&mut self, handle: DeviceHandle) -> Result<(), Pca9685Error> {
        debug!("resetting pca9685 {:?}", handle);
        self.record_mut(handle)?
            .write_reg(reg::MODE1, reg::MODE1_SLEEP)
    }

    ///Reprogram the PWM frequency and restart the outputs.
    ///
    /// The MODE1/PRESCALE write order and the waits between them come
    /// from the datasheet power-up timing. A failure partway through
    /// aborts immediately and can leave the chip asleep; the caller
    /// decides whether to rerun the whole call.
    pub fn set_frequency(
        &mut self,
        handle: DeviceHandle,
        frequency_hz: u32,
    ) -> Result<(), Pca9685Error> {
        debug!("setting pca9685 {:?} frequency to {}Hz", handle, frequency_hz);
        if frequency_hz == 0 {
            return Err(Pca9685Error::invalid_argument("frequency must be nonzero"));
        }

        let record = self.record_mut(handle)?;
        record.frequency_hz = frequency_hz;

        let prescale = prescale_for_frequency(frequency_hz);
        debug!("prescale for {}Hz: {}", frequency_hz, prescale);

        let base_mode = record.read_reg(reg::MODE1)? & reg::MODE1_BASE_MASK;

        //prescale is only writable while asleep
        record.write_reg(reg::MODE1, base_mode | reg::MODE1_SLEEP)?;
        record.write_reg(reg::PRESCALE, prescale)?;
        record.transport.delay_ms(OSCILLATOR_WAIT_MS);

        //wake up, wait for the oscillator, then restart the outputs
        record.write_reg(reg::MODE1, base_mode)?;
        record.transport.delay_ms(OSCILLATOR_WAIT_MS);
        record.write_reg(reg::MODE1, base_mode | reg::MODE1_RESTART)
    }

    ///Standard one-time configuration, run from `open_device` after
    /// the reset: all channels off, totem-pole outputs, all-call
    /// addressing enabled, then the frequency sequence (which finishes
    /// the chip's restart).
    fn setup(&mut self, handle: DeviceHandle) -> Result<(), Pca9685Error> {
        debug!("running standard setup for pca9685 {:?}", handle);
        let record = self.record_mut(handle)?;

        record.write_reg(reg::ALL_OFF_L, 0x00)?;
        record.write_reg(reg::ALL_OFF_H, 0x00)?;
        record.write_reg(reg::MODE2, reg::MODE2_OUTDRV)?;
        record.write_reg(reg::MODE1, reg::MODE1_ALLCALL)?;
        record.transport.delay_ms(STARTUP_WAIT_MS);

        let frequency_hz = record.frequency_hz;
        self.set_frequency(handle, frequency_hz)
    }

    ///Set a channel's duty cycle. The output turns on at counter 0 and
    /// off at `duty`, so `duty` out of 4096 counts is the high time.
    pub fn write_channel_duty(
        &mut self,
        handle: DeviceHandle,
        channel: u8,
        duty: u16,
    ) -> Result<(), Pca9685Error> {
        debug!("pca9685 {:?} channel {} duty {}", handle, channel, duty);
        self.write_channel_phase(handle, channel, ChannelPhase::On, 0x000)?;
        self.write_channel_phase(handle, channel, ChannelPhase::Off, duty)
    }

    ///Write one 12-bit value to a channel's ON or OFF register pair,
    /// low byte then high nibble.
    pub fn write_channel_phase(
        &mut self,
        handle: DeviceHandle,
        channel: u8,
        phase: ChannelPhase,
        value: u16,
    ) -> Result<(), Pca9685Error> {
        if channel >= reg::NUM_CHANNELS {
            return Err(Pca9685Error::InvalidArgument(format!(
                "channel {} out of range (0-15)",
                channel
            )));
        }
        if value > reg::MAX_DUTY {
            return Err(Pca9685Error::InvalidArgument(format!(
                "value {} out of range (0-4095)",
                value
            )));
        }

        let phase_base = match phase {
            ChannelPhase::On => reg::LED0_ON_L,
            ChannelPhase::Off => reg::LED0_OFF_L,
        };
        let base = phase_base + 4 * channel;

        let record = self.record_mut(handle)?;
        record.write_reg(base, (value & 0xFF) as u8)?;
        record.write_reg(base + 1, ((value >> 8) & 0x0F) as u8)
    }

    ///Raw register escape hatch for anything the driver does not
    /// cover, such as the subaddress registers.
    pub fn write_register(
        &mut self,
        handle: DeviceHandle,
        register: u8,
        value: u8,
    ) -> Result<(), Pca9685Error> {
        debug!("pca9685 {:?} raw write {:02X} = {:02X}", handle, register, value);
        self.record_mut(handle)?.write_reg(register, value)
    }

    ///Address and last requested frequency for an open device.
    pub fn device_info(&self, handle: DeviceHandle) -> Result<DeviceInfo, Pca9685Error> {
        match self.devices.get(handle.0).and_then(Option::as_ref) {
            Some(record) => Ok(DeviceInfo {
                address: record.address,
                frequency_hz: record.frequency_hz,
            }),
            None => Err(Pca9685Error::invalid_argument("no device for handle")),
        }
    }

    fn record_mut(&mut self, handle: DeviceHandle) -> Result<&mut DeviceRecord<T>, Pca9685Error> {
        self.devices
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| Pca9685Error::invalid_argument("no device for handle"))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    //scripted bus standing in for real hardware: records every
    //register write, models MODE1 so read-backs work, and can be told
    //to fail writes to one register.
    #[derive(Clone, Default)]
    struct MockTransport {
        writes: Rc<RefCell<Vec<(u8, u8)>>>,
        mode1: Rc<Cell<u8>>,
        fail_register: Rc<Cell<Option<u8>>>,
    }

    impl I2cTransport for MockTransport {
        type Error = &'static str;

        fn read_register(&mut self, register: u8) -> Result<u8, Self::Error> {
            if register == reg::MODE1 {
                Ok(self.mode1.get())
            } else {
                Ok(0)
            }
        }

        fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
            if self.fail_register.get() == Some(register) {
                return Err("injected write failure");
            }
            if register == reg::MODE1 {
                self.mode1.set(value);
            }
            self.writes.borrow_mut().push((register, value));
            Ok(())
        }

        fn delay_ms(&mut self, _ms: u64) {}
    }

    fn controller_with_mock() -> (
        Pca9685Controller<MockTransport, impl Fn(u8) -> Result<MockTransport, Pca9685Error>>,
        MockTransport,
    ) {
        let mock = MockTransport::default();
        let shared = mock.clone();
        let controller = Pca9685Controller::new(move |_addr| Ok(shared.clone()));
        (controller, mock)
    }

    #[test]
    fn test_prescale_for_frequency() {
        //25e6 / 4096 / 50 = 122.07, rounds to 122, minus 1
        assert_eq!(prescale_for_frequency(50), 121);
        assert_eq!(prescale_for_frequency(60), 101);
        //chip's physical frequency limits
        assert_eq!(prescale_for_frequency(24), 253);
        assert_eq!(prescale_for_frequency(1526), 3);
    }

    #[test]
    fn test_open_device_runs_init_sequence() {
        let (mut controller, mock) = controller_with_mock();
        let handle = controller.open_device(0x40, 50).unwrap();

        let info = controller.device_info(handle).unwrap();
        assert_eq!(info.address, 0x40);
        assert_eq!(info.frequency_hz, 50);

        //reset, setup, then the full frequency sequence
        assert_eq!(
            *mock.writes.borrow(),
            vec![
                (reg::MODE1, reg::MODE1_SLEEP),
                (reg::ALL_OFF_L, 0x00),
                (reg::ALL_OFF_H, 0x00),
                (reg::MODE2, reg::MODE2_OUTDRV),
                (reg::MODE1, reg::MODE1_ALLCALL),
                (reg::MODE1, reg::MODE1_ALLCALL | reg::MODE1_SLEEP),
                (reg::PRESCALE, 121),
                (reg::MODE1, reg::MODE1_ALLCALL),
                (reg::MODE1, reg::MODE1_ALLCALL | reg::MODE1_RESTART),
            ]
        );
    }

    #[test]
    fn test_open_device_table_exhaustion() {
        let (mut controller, _mock) = controller_with_mock();
        for n in 0..MAX_DEVICES {
            controller.open_device(0x40 + n as u8, 50).unwrap();
        }
        let err = controller.open_device(0x40 + MAX_DEVICES as u8, 50).unwrap_err();
        assert!(matches!(err, Pca9685Error::TooManyDevices));
    }

    #[test]
    fn test_write_channel_duty_zero() {
        let (mut controller, mock) = controller_with_mock();
        let handle = controller.open_device(0x40, 50).unwrap();

        mock.writes.borrow_mut().clear();
        controller.write_channel_duty(handle, 0, 0).unwrap();
        assert_eq!(
            *mock.writes.borrow(),
            vec![
                (reg::LED0_ON_L, 0x00),
                (reg::LED0_ON_H, 0x00),
                (reg::LED0_OFF_L, 0x00),
                (reg::LED0_OFF_H, 0x00),
            ]
        );
    }

    #[test]
    fn test_write_channel_duty_offsets_and_split() {
        let (mut controller, mock) = controller_with_mock();
        let handle = controller.open_device(0x40, 50).unwrap();

        mock.writes.borrow_mut().clear();
        //channel 5: registers advance 4 per channel. 2048 = 0x800
        controller.write_channel_duty(handle, 5, 2048).unwrap();
        assert_eq!(
            *mock.writes.borrow(),
            vec![
                (reg::LED0_ON_L + 20, 0x00),
                (reg::LED0_ON_H + 20, 0x00),
                (reg::LED0_OFF_L + 20, 0x00),
                (reg::LED0_OFF_H + 20, 0x08),
            ]
        );
    }

    #[test]
    fn test_write_channel_phase_on_pair() {
        let (mut controller, mock) = controller_with_mock();
        let handle = controller.open_device(0x40, 50).unwrap();

        mock.writes.borrow_mut().clear();
        controller
            .write_channel_phase(handle, 2, ChannelPhase::On, 0xABC)
            .unwrap();
        assert_eq!(
            *mock.writes.borrow(),
            vec![(reg::LED0_ON_L + 8, 0xBC), (reg::LED0_ON_H + 8, 0x0A)]
        );
    }

    #[test]
    fn test_write_channel_duty_validation() {
        let (mut controller, _mock) = controller_with_mock();
        let handle = controller.open_device(0x40, 50).unwrap();

        let err = controller.write_channel_duty(handle, 16, 0).unwrap_err();
        assert!(matches!(err, Pca9685Error::InvalidArgument(_)));

        let err = controller.write_channel_duty(handle, 0, 4096).unwrap_err();
        assert!(matches!(err, Pca9685Error::InvalidArgument(_)));
    }

    #[test]
    fn test_stale_handle_rejected() {
        let (controller, _mock) = controller_with_mock();
        let err = controller.device_info(DeviceHandle(3)).unwrap_err();
        assert!(matches!(err, Pca9685Error::InvalidArgument(_)));
    }

    #[test]
    fn test_set_frequency_aborts_on_prescale_failure() {
        let (mut controller, mock) = controller_with_mock();
        let handle = controller.open_device(0x40, 50).unwrap();

        mock.writes.borrow_mut().clear();
        mock.fail_register.set(Some(reg::PRESCALE));
        let err = controller.set_frequency(handle, 100).unwrap_err();
        assert!(matches!(
            err,
            Pca9685Error::RegisterWrite {
                register: reg::PRESCALE,
                ..
            }
        ));

        //only the sleep write landed; no wake or restart afterwards
        assert_eq!(
            *mock.writes.borrow(),
            vec![(reg::MODE1, reg::MODE1_ALLCALL | reg::MODE1_SLEEP)]
        );
        assert_ne!(mock.mode1.get() & reg::MODE1_SLEEP, 0);
    }

    #[test]
    fn test_set_frequency_restarts_and_wakes() {
        let (mut controller, mock) = controller_with_mock();
        let handle = controller.open_device(0x40, 50).unwrap();

        controller.set_frequency(handle, 60).unwrap();
        let mode1 = mock.mode1.get();
        assert_ne!(mode1 & reg::MODE1_RESTART, 0);
        assert_eq!(mode1 & reg::MODE1_SLEEP, 0);

        assert_eq!(controller.device_info(handle).unwrap().frequency_hz, 60);
    }
}
