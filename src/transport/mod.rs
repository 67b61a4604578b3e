//! Byte-level link to a physical servo bus.
//!
//! The engine only needs three primitives from a bus: send one byte, receive
//! one byte within a timeout, and drop whatever is pending in the receive
//! buffer. [`serial::SerialPort`] provides them on top of `embedded-hal`
//! serial and timer traits, [`mock::MockTransport`] in memory.
use crate::error::TransportFlags;

pub mod mock;
pub mod serial;

/// Failure reported by a [`Transport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Nothing arrived before the timeout expired.
    Timeout,
    /// The peripheral reported an error.
    Fault,
}

/// Byte transport shared by one or more buses.
///
/// `bus` selects the physical line so that a single implementation can serve
/// several interfaces.
pub trait Transport {
    /// Queues one byte for transmission.
    fn send_byte(&mut self, bus: u8, byte: u8) -> Result<(), LinkError>;
    /// Waits at most `timeout_ms` for the next received byte.
    fn receive_byte(&mut self, bus: u8, timeout_ms: u32) -> Result<u8, LinkError>;
    /// Waits until the bytes sent have left the line, then discards every
    /// byte received so far. Called after an instruction, before its status
    /// packet is read, so it also drops the echo of a half-duplex line.
    fn flush(&mut self, bus: u8) -> Result<(), LinkError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_byte(&mut self, bus: u8, byte: u8) -> Result<(), LinkError> {
        (**self).send_byte(bus, byte)
    }
    fn receive_byte(&mut self, bus: u8, timeout_ms: u32) -> Result<u8, LinkError> {
        (**self).receive_byte(bus, timeout_ms)
    }
    fn flush(&mut self, bus: u8) -> Result<(), LinkError> {
        (**self).flush(bus)
    }
}

/// A transport bound to one bus and one receive timeout, as seen by the
/// frame codecs.
pub struct Port<'a, T: ?Sized> {
    transport: &'a mut T,
    bus: u8,
    timeout_ms: u32,
}

impl<'a, T: Transport + ?Sized> Port<'a, T> {
    /// Binds `transport` to `bus`.
    pub fn new(transport: &'a mut T, bus: u8, timeout_ms: u32) -> Port<'a, T> {
        Port {
            transport,
            bus,
            timeout_ms,
        }
    }
    /// Receives one byte. Any link failure is reported as a timeout.
    pub fn receive(&mut self) -> Result<u8, TransportFlags> {
        self.transport
            .receive_byte(self.bus, self.timeout_ms)
            .map_err(|_| TransportFlags::TIMEOUT)
    }
    /// Sends `bytes` in order, stopping at the first refused byte.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), TransportFlags> {
        for &b in bytes {
            self.transport
                .send_byte(self.bus, b)
                .map_err(|_| TransportFlags::TRANSMIT)?;
        }
        Ok(())
    }
    /// Drops pending received bytes.
    pub fn flush(&mut self) -> Result<(), TransportFlags> {
        self.transport
            .flush(self.bus)
            .map_err(|_| TransportFlags::TRANSMIT)
    }
}
