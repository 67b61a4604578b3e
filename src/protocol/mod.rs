//! Wire formats of the Dynamixel protocols 1.0 and 2.0.
use heapless::Vec;

use crate::error::TransportFlags;

pub mod v1;
pub mod v2;

/// Id addressing every device on the bus at once.
pub const BROADCAST_ID: u8 = 0xFE;
/// Capacity of a packet's parameter buffer.
pub const MAX_PARAMETERS: usize = 8;
/// Largest encoded frame of either protocol.
pub const FRAME_CAPACITY: usize = 24;

/// Logical parameter bytes of a packet.
pub type Parameters = Vec<u8, MAX_PARAMETERS>;
/// Bytes of one frame as they go on the wire.
pub type Frame = Vec<u8, FRAME_CAPACITY>;

/// Protocol generation spoken on a bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    /// Checksum framing, 8-bit addresses.
    V1 = 1,
    /// CRC16 framing with byte stuffing, 16-bit addresses.
    V2 = 2,
}

impl TryFrom<u8> for Protocol {
    type Error = TransportFlags;

    fn try_from(version: u8) -> Result<Protocol, TransportFlags> {
        match version {
            1 => Ok(Protocol::V1),
            2 => Ok(Protocol::V2),
            _ => Err(TransportFlags::PROTOCOL),
        }
    }
}

/// Instruction codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instruction {
    /// Checks that a device answers.
    Ping = 0x01,
    /// Reads a range of the control table.
    Read = 0x02,
    /// Writes a range of the control table.
    Write = 0x03,
    /// Writes on the next [`Instruction::Action`].
    RegWrite = 0x04,
    /// Applies registered writes.
    Action = 0x05,
    /// Restores the factory control table.
    Reset = 0x06,
    /// Restarts the device (2.0 only).
    Reboot = 0x08,
    /// Reply to an instruction (2.0 only).
    Status = 0x55,
}

impl From<Instruction> for u8 {
    fn from(i: Instruction) -> u8 {
        i as u8
    }
}

/// Copies `parameters` into a bounded buffer.
pub fn parameters(bytes: &[u8]) -> Result<Parameters, TransportFlags> {
    Vec::from_slice(bytes).map_err(|_| TransportFlags::OVERFLOW)
}

pub(crate) fn put(frame: &mut Frame, bytes: &[u8]) -> Result<(), TransportFlags> {
    frame
        .extend_from_slice(bytes)
        .map_err(|_| TransportFlags::OVERFLOW)
}
