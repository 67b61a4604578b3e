//! Protocol 2.0 framing.
//!
//! `[0xFF, 0xFF, 0xFD, 0x00, ID, LEN_L, LEN_H, INST, PARAM 1, ..., PARAM N, CRC_L, CRC_H]`
//!
//! Parameters are byte-stuffed so that the header never shows up inside a
//! packet: a `0xFD` following two or more `0xFF` is sent twice. `LEN` counts
//! the instruction, the stuffed parameters and the CRC. The CRC covers every
//! byte from the header through the last stuffed parameter.
use super::{put, Frame, Parameters, MAX_PARAMETERS};
use crate::error::TransportFlags;
use crate::transport::{Port, Transport};

const HEADER: [u8; 4] = [0xFF, 0xFF, 0xFD, 0x00];
const STUFFING: u8 = HEADER[2];
/// Instruction byte and CRC.
const OVERHEAD: u16 = 3;
/// Every stuffed byte needs two `0xFF` and one `0xFD` in front of it.
const MAX_RAW_PARAMETERS: usize = MAX_PARAMETERS + MAX_PARAMETERS / 3;

/// Instruction or status packet.
///
/// For a status packet the first parameter is the device error byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Device id.
    pub id: u8,
    /// Instruction code, `0x55` for a status packet.
    pub instruction: u8,
    /// Logical (unstuffed) parameter bytes.
    pub parameters: Parameters,
}

impl Packet {
    /// Builds a packet, failing with `OVERFLOW` past the parameter bound.
    pub fn new(id: u8, instruction: u8, parameters: &[u8]) -> Result<Packet, TransportFlags> {
        Ok(Packet {
            id,
            instruction,
            parameters: super::parameters(parameters)?,
        })
    }
    /// Value of the length field, stuffing included.
    pub fn length(&self) -> u16 {
        let stuffed = stuff(&self.parameters, |_| Ok(())).unwrap_or(0);
        (self.parameters.len() + stuffed) as u16 + OVERHEAD
    }
    /// Serializes the packet, stuffing its parameters.
    pub fn encode(&self) -> Result<Frame, TransportFlags> {
        let [len_l, len_h] = self.length().to_le_bytes();

        let mut frame = Frame::new();
        put(&mut frame, &HEADER)?;
        put(&mut frame, &[self.id, len_l, len_h, self.instruction])?;
        let mut body = Frame::new();
        stuff(&self.parameters, |b| put(&mut body, &[b]))?;
        put(&mut frame, &body)?;

        let [crc_l, crc_h] = crc(&frame).to_le_bytes();
        put(&mut frame, &[crc_l, crc_h])?;
        Ok(frame)
    }
    /// Reads one packet from `port`, removing the stuffing.
    pub fn decode<T: Transport + ?Sized>(port: &mut Port<'_, T>) -> Result<Packet, TransportFlags> {
        let mut raw = Frame::new();
        for &expected in HEADER.iter() {
            let b = port.receive()?;
            if b != expected {
                return Err(TransportFlags::HEADER);
            }
            put(&mut raw, &[b])?;
        }

        let id = port.receive()?;
        let len_l = port.receive()?;
        let len_h = port.receive()?;
        let instruction = port.receive()?;
        put(&mut raw, &[id, len_l, len_h, instruction])?;

        let length = u16::from_le_bytes([len_l, len_h]);
        if length < OVERHEAD || usize::from(length - OVERHEAD) > MAX_RAW_PARAMETERS {
            return Err(TransportFlags::LENGTH);
        }

        let mut parameters = Parameters::new();
        let mut run = 0;
        for _ in 0..length - OVERHEAD {
            let b = port.receive()?;
            put(&mut raw, &[b])?;
            if b == STUFFING && run >= 2 {
                run = 0;
                continue;
            }
            parameters.push(b).map_err(|_| TransportFlags::LENGTH)?;
            run = if b == HEADER[0] { run + 1 } else { 0 };
        }

        let crc_l = port.receive()?;
        let crc_h = port.receive()?;
        if crc(&raw) != u16::from_le_bytes([crc_l, crc_h]) {
            return Err(TransportFlags::CHECKSUM);
        }

        Ok(Packet {
            id,
            instruction,
            parameters,
        })
    }
}

/// Passes `parameters` to `emit` as they go on the wire and returns the
/// number of stuffing bytes inserted.
fn stuff<F>(parameters: &[u8], mut emit: F) -> Result<usize, TransportFlags>
where
    F: FnMut(u8) -> Result<(), TransportFlags>,
{
    let mut run = 0;
    let mut stuffed = 0;
    for &b in parameters {
        emit(b)?;
        if b == STUFFING && run >= 2 {
            emit(STUFFING)?;
            stuffed += 1;
            run = 0;
        } else if b == HEADER[0] {
            run += 1;
        } else {
            run = 0;
        }
    }
    Ok(stuffed)
}

/// CRC-16 with polynomial `0x8005`, as used by the 2.0 protocol.
pub fn crc(bytes: &[u8]) -> u16 {
    crc16::State::<crc16::BUYPASS>::calculate(bytes)
}
