//! Transport over `embedded-hal` serial halves and a count-down timer.
use hal::serial::{Read, Write};
use hal::timer::CountDown;

use super::{LinkError, Transport};

/// Bytes drained at most by one flush, so a babbling line cannot stall it.
const FLUSH_LIMIT: usize = 256;

/// Polls `$e` until it yields a byte or `$timer` expires.
macro_rules! busy_wait {
    ($e:expr, $timer:expr) => {{
        loop {
            match $e {
                Ok(b) => break Ok(b),
                Err(nb::Error::Other(_)) => break Err(LinkError::Fault),
                Err(nb::Error::WouldBlock) => {}
            }
            if $timer.wait().is_ok() {
                break Err(LinkError::Timeout);
            }
        }
    }};
}

/// One half-duplex serial line.
///
/// The `bus` argument of the [`Transport`] methods is ignored: a
/// `SerialPort` always talks to the line it was built from.
pub struct SerialPort<RX, TX, TIMER> {
    rx: RX,
    tx: TX,
    timer: TIMER,
}

impl<RX, TX, TIMER> SerialPort<RX, TX, TIMER>
where
    RX: Read<u8>,
    TX: Write<u8>,
    TIMER: CountDown,
    u32: Into<TIMER::Time>,
{
    /// Wraps the receive and transmit halves of a UART and a timer counting
    /// milliseconds.
    pub fn new(rx: RX, tx: TX, timer: TIMER) -> SerialPort<RX, TX, TIMER> {
        SerialPort { rx, tx, timer }
    }
    /// Gives the peripherals back.
    pub fn release(self) -> (RX, TX, TIMER) {
        (self.rx, self.tx, self.timer)
    }
}

impl<RX, TX, TIMER> Transport for SerialPort<RX, TX, TIMER>
where
    RX: Read<u8>,
    TX: Write<u8>,
    TIMER: CountDown,
    u32: Into<TIMER::Time>,
{
    fn send_byte(&mut self, _bus: u8, byte: u8) -> Result<(), LinkError> {
        nb::block!(self.tx.write(byte)).map_err(|_| LinkError::Fault)
    }
    fn receive_byte(&mut self, _bus: u8, timeout_ms: u32) -> Result<u8, LinkError> {
        self.timer.start(timeout_ms);
        busy_wait!(self.rx.read(), self.timer)
    }
    fn flush(&mut self, _bus: u8) -> Result<(), LinkError> {
        nb::block!(self.tx.flush()).map_err(|_| LinkError::Fault)?;
        for _ in 0..FLUSH_LIMIT {
            match self.rx.read() {
                Ok(_) => {}
                Err(nb::Error::WouldBlock) => return Ok(()),
                Err(nb::Error::Other(_)) => return Err(LinkError::Fault),
            }
        }
        Ok(())
    }
}
