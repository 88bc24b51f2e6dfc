//! FT5206 capacitive multi-touch controller on an I2C side channel.
//!
//! The controller pulls its interrupt line low whenever it has new touch data. The interrupt
//! handler only calls [`TouchSignals::interrupt`]; the register block is read here, in the main
//! thread, the next time the panel is polled.
//!
//! All five touch slots are read on every interrupt regardless of the reported count. Slots past
//! the count carry whatever the controller left there and are ignored by [`InterruptCapacitive::touches`].

use embedded_hal::i2c::I2c;
use heapless::Vec;

use crate::idle::IdleHandler;
use crate::regs::ft5206::*;
use crate::signals::{Cursor, TouchSignals};
use crate::source::{Contact, Gesture, Report, TouchSource};
use crate::{RawSample, TouchCode, MAX_CHANNELS};

pub struct InterruptCapacitive<'a, I2C> {
    i2c: I2C,
    address: u8,
    signals: &'a TouchSignals,
    irq: Cursor,
    contacts: [Contact; MAX_CHANNELS],
    count: u8,
    gesture: Gesture,
}

fn event_code(xh: u8) -> TouchCode {
    match xh >> 6 {
        EVENT_FLAG_PUT_DOWN => TouchCode::Touch,
        EVENT_FLAG_PUT_UP => TouchCode::Release,
        EVENT_FLAG_CONTACT => TouchCode::Held,
        // 0b11 is reserved
        _ => TouchCode::NoTouch,
    }
}

impl<'a, I2C> InterruptCapacitive<'a, I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C, address: u8, signals: &'a TouchSignals) -> Self {
        Self {
            i2c,
            address,
            signals,
            irq: Cursor::new(signals.interrupts()),
            contacts: [Contact::none(); MAX_CHANNELS],
            count: 0,
            gesture: Gesture::None,
        }
    }

    pub fn bus_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Contacts the controller currently reports as active
    pub fn touches(&self) -> Vec<Contact, MAX_CHANNELS> {
        self.contacts
            .iter()
            .take(self.count as usize)
            .copied()
            .collect()
    }

    /// Read the register block if the interrupt fired since the last call.
    ///
    /// Returns false when there was nothing new or the block was rejected.
    fn service(&mut self) -> Result<bool, I2C::Error> {
        if self.irq.take(self.signals.interrupts()) == 0 {
            return Ok(false);
        }

        let mut regs = [0u8; NUMBER_OF_REGISTERS];
        self.i2c
            .write_read(self.address, &[DEVICE_MODE], &mut regs)?;

        let count = regs[TD_STATUS as usize] & 0x0F;
        if count as usize > MAX_CHANNELS {
            log::warn!("ft5206 reported {} touches, ignoring", count);
            return Ok(false);
        }

        self.count = count;
        self.gesture = Gesture::from_id(regs[GEST_ID as usize]);

        for (slot, contact) in self.contacts.iter_mut().enumerate() {
            let base = TOUCH1_XH as usize + slot * TOUCH_BLOCK_STRIDE;
            let (xh, xl, yh, yl) = (regs[base], regs[base + 1], regs[base + 2], regs[base + 3]);
            *contact = Contact {
                id: yh >> 4,
                code: event_code(xh),
                raw: RawSample::new(
                    ((xh & 0x0F) as u16) << 8 | xl as u16,
                    ((yh & 0x0F) as u16) << 8 | yl as u16,
                ),
            };
        }
        log::trace!("ft5206: {} touches, gesture {:?}", count, self.gesture);
        Ok(true)
    }
}

impl<'a, I2C> TouchSource for InterruptCapacitive<'a, I2C>
where
    I2C: I2c,
{
    type Error = I2C::Error;

    fn channels(&self) -> usize {
        MAX_CHANNELS
    }

    fn requires_calibration(&self) -> bool {
        // The controller reports display pixels
        false
    }

    fn init(&mut self, _idle: &mut Option<&mut dyn IdleHandler>) -> Result<(), Self::Error> {
        // Normal operating mode
        self.i2c.write(self.address, &[DEVICE_MODE, 0])?;
        self.irq = Cursor::new(self.signals.interrupts());
        self.restart();
        log::debug!("ft5206 at {:#04x} in normal mode", self.address);
        Ok(())
    }

    fn poll(&mut self) -> Result<Report, Self::Error> {
        if !self.service()? {
            return Ok(Report::Nothing);
        }

        let primary = self.contacts[0];
        Ok(match primary.code {
            TouchCode::Touch | TouchCode::Held => Report::Contact(primary.raw),
            TouchCode::Release => Report::Lifted,
            _ if self.count == 0 => Report::Lifted,
            _ => Report::Pending,
        })
    }

    fn read_raw(&mut self) -> Result<Option<RawSample>, Self::Error> {
        self.service()?;
        let primary = self.contacts[0];
        Ok(primary.code.is_active().then_some(primary.raw))
    }

    fn restart(&mut self) {
        self.contacts = [Contact::none(); MAX_CHANNELS];
        self.count = 0;
    }

    fn contact(&self, ch: usize) -> Option<Contact> {
        self.contacts.get(ch).copied()
    }

    fn touch_count(&self) -> u8 {
        self.count
    }

    fn gesture(&self) -> Gesture {
        self.gesture
    }
}
