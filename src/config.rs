//! Bus configuration and defaults.
use crate::error::TransportFlags;
use crate::protocol::Protocol;

/// Return delay programmed in servos by default, in milliseconds.
pub const DEFAULT_RETURN_DELAY_MS: u32 = 1;
/// Added to the return delay to get the per-byte receive timeout.
pub const RECEIVE_MARGIN_MS: u32 = 1;
/// Most ids a single scan reports.
pub const SCAN_CAPACITY: usize = 32;

/// Which instructions the servos on a bus answer with a status packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReturnLevel {
    /// Only ping is answered.
    NoAnswer = 0,
    /// Ping and read are answered.
    ReadOnly = 1,
    /// Every instruction is answered.
    Everything = 2,
}

impl TryFrom<u8> for ReturnLevel {
    type Error = TransportFlags;

    fn try_from(level: u8) -> Result<ReturnLevel, TransportFlags> {
        match level {
            0 => Ok(ReturnLevel::NoAnswer),
            1 => Ok(ReturnLevel::ReadOnly),
            2 => Ok(ReturnLevel::Everything),
            _ => Err(TransportFlags::PROTOCOL),
        }
    }
}

/// Settings of one bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Protocol spoken by every servo on the bus.
    pub protocol: Protocol,
    /// Status return level programmed in the servos.
    pub return_level: ReturnLevel,
    /// Return delay programmed in the servos, in milliseconds.
    pub return_delay_ms: u32,
}

impl Default for BusConfig {
    fn default() -> BusConfig {
        BusConfig {
            protocol: Protocol::V1,
            return_level: ReturnLevel::Everything,
            return_delay_ms: DEFAULT_RETURN_DELAY_MS,
        }
    }
}

impl BusConfig {
    /// Default settings for `protocol`.
    pub fn new(protocol: Protocol) -> BusConfig {
        BusConfig {
            protocol,
            ..BusConfig::default()
        }
    }
    /// Sets the status return level.
    pub fn with_return_level(mut self, level: ReturnLevel) -> BusConfig {
        self.return_level = level;
        self
    }
    /// Sets the return delay.
    pub fn with_return_delay_ms(mut self, delay: u32) -> BusConfig {
        self.return_delay_ms = delay;
        self
    }
    /// How long to wait for each reply byte.
    pub fn receive_timeout_ms(&self) -> u32 {
        self.return_delay_ms.saturating_add(RECEIVE_MARGIN_MS)
    }
}
