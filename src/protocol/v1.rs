//! Protocol 1.0 framing.
//!
//! `[0xFF, 0xFF, ID, LEN, INSTRUCTION | ERROR, PARAM 1, ..., PARAM N, CHECKSUM]`
//! with `LEN = N + 2` and `CHECKSUM = !(ID + LEN + INSTRUCTION + PARAMS)`.
use super::{put, Frame, Parameters, MAX_PARAMETERS};
use crate::error::TransportFlags;
use crate::transport::{Port, Transport};

const HEADER: u8 = 0xFF;

/// Instruction or status packet.
///
/// `content` is the instruction code on the way out and the device error
/// byte on the way back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Device id.
    pub id: u8,
    /// Instruction or error byte.
    pub content: u8,
    /// Parameter bytes.
    pub parameters: Parameters,
}

impl Packet {
    /// Builds a packet, failing with `OVERFLOW` past the parameter bound.
    pub fn new(id: u8, content: u8, parameters: &[u8]) -> Result<Packet, TransportFlags> {
        Ok(Packet {
            id,
            content,
            parameters: super::parameters(parameters)?,
        })
    }
    /// Value of the length field.
    pub fn length(&self) -> u8 {
        self.parameters.len() as u8 + 2
    }
    /// Checksum of the packet.
    pub fn checksum(&self) -> u8 {
        checksum(self.id, self.length(), self.content, &self.parameters)
    }
    /// Serializes the packet.
    pub fn encode(&self) -> Result<Frame, TransportFlags> {
        let mut frame = Frame::new();
        put(&mut frame, &[HEADER, HEADER, self.id, self.length(), self.content])?;
        put(&mut frame, &self.parameters)?;
        put(&mut frame, &[self.checksum()])?;
        Ok(frame)
    }
    /// Reads one packet from `port`.
    ///
    /// Stops at the first missing byte. The declared length is checked
    /// against the parameter bound before any parameter is read.
    pub fn decode<T: Transport + ?Sized>(port: &mut Port<'_, T>) -> Result<Packet, TransportFlags> {
        let first = port.receive()?;
        let second = port.receive()?;
        if first != HEADER || second != HEADER {
            return Err(TransportFlags::HEADER);
        }

        let (id, length, content) = match (port.receive(), port.receive(), port.receive()) {
            (Ok(id), Ok(length), Ok(content)) => (id, length, content),
            _ => return Err(TransportFlags::TIMEOUT),
        };
        if length < 2 || usize::from(length - 2) > MAX_PARAMETERS {
            return Err(TransportFlags::LENGTH);
        }

        let mut parameters = Parameters::new();
        for _ in 0..length - 2 {
            let b = port.receive()?;
            parameters.push(b).map_err(|_| TransportFlags::LENGTH)?;
        }
        let received = port.receive()?;

        let packet = Packet {
            id,
            content,
            parameters,
        };
        if packet.checksum() != received {
            return Err(TransportFlags::CHECKSUM);
        }
        Ok(packet)
    }
}

/// One's complement of the byte sum of the checked fields.
pub fn checksum(id: u8, length: u8, content: u8, parameters: &[u8]) -> u8 {
    let sum = parameters
        .iter()
        .fold(id.wrapping_add(length).wrapping_add(content), |acc, b| {
            acc.wrapping_add(*b)
        });
    !sum
}
