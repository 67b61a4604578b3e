//! Status returned by every bus transaction.
//!
//! A [`Status`] keeps two independent parts: the transport flags raised while
//! framing and validating the exchange, and the error reported by the device
//! itself. Protocol 1.0 devices report a bit set of alarms, protocol 2.0
//! devices a single error code plus a hardware-alert bit.
use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Errors detected by the engine while moving and checking frames.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TransportFlags: u16 {
        /// A byte did not arrive in time.
        const TIMEOUT = 1 << 0;
        /// The frame did not start with the expected header.
        const HEADER = 1 << 1;
        /// The reply was not a status packet.
        const INSTRUCTION = 1 << 2;
        /// The reply came from another id than the one addressed.
        const ID = 1 << 3;
        /// Declared or received length is not the expected one.
        const LENGTH = 1 << 4;
        /// Checksum (1.0) or CRC (2.0) mismatch.
        const CHECKSUM = 1 << 5;
        /// Unknown protocol version or operation the protocol cannot express.
        const PROTOCOL = 1 << 6;
        /// Request or reply does not fit in the parameter buffer.
        const OVERFLOW = 1 << 7;
        /// The device is not expected to answer, so no data is available.
        const NO_REPLY = 1 << 8;
        /// The transport refused to send a byte.
        const TRANSMIT = 1 << 9;
        /// The register does not exist in the servo's control table.
        const UNSUPPORTED = 1 << 10;
    }
}

impl TransportFlags {
    const TOKENS: [(TransportFlags, &'static str); 11] = [
        (Self::TIMEOUT, "Timeout"),
        (Self::HEADER, "Header"),
        (Self::INSTRUCTION, "Instruction"),
        (Self::ID, "ID"),
        (Self::LENGTH, "Data length"),
        (Self::CHECKSUM, "Checksum"),
        (Self::PROTOCOL, "Protocol"),
        (Self::OVERFLOW, "Overflow"),
        (Self::NO_REPLY, "No reply"),
        (Self::TRANSMIT, "Transmit"),
        (Self::UNSUPPORTED, "Unsupported"),
    ];
}

impl Default for TransportFlags {
    fn default() -> TransportFlags {
        TransportFlags::empty()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TransportFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "TransportFlags({=u16:#x})", self.bits())
    }
}

bitflags! {
    /// Alarm bits of a protocol 1.0 status packet. Several can be set at once.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct V1Error: u8 {
        /// Supply voltage out of the configured range.
        const INPUT_VOLTAGE = 1 << 0;
        /// Goal position outside the angle limits.
        const ANGLE_LIMIT = 1 << 1;
        /// Internal temperature above the limit.
        const OVERHEATING = 1 << 2;
        /// Instruction argument out of range.
        const RANGE = 1 << 3;
        /// The device saw a bad checksum.
        const CHECKSUM = 1 << 4;
        /// Load exceeds the maximum torque.
        const OVERLOAD = 1 << 5;
        /// Undefined instruction, or action without a registered write.
        const INSTRUCTION = 1 << 6;
    }
}

impl V1Error {
    const TOKENS: [(V1Error, &'static str); 7] = [
        (Self::INPUT_VOLTAGE, "V1: Input voltage"),
        (Self::ANGLE_LIMIT, "V1: Angle limit"),
        (Self::OVERHEATING, "V1: Overheating"),
        (Self::RANGE, "V1: Range"),
        (Self::CHECKSUM, "V1: Checksum"),
        (Self::OVERLOAD, "V1: Overload"),
        (Self::INSTRUCTION, "V1: Instruction"),
    ];
}

impl Default for V1Error {
    fn default() -> V1Error {
        V1Error::empty()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for V1Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "V1Error({=u8:#x})", self.bits())
    }
}

/// Error code of a protocol 2.0 status packet. Exactly one per packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum V2Error {
    /// Failed to process the instruction.
    Result,
    /// Undefined instruction, or action without a registered write.
    Instruction,
    /// The device saw a bad CRC.
    Crc,
    /// Data out of range.
    DataRange,
    /// Data shorter than the register.
    DataLength,
    /// Data exceeds the register limit.
    DataLimit,
    /// Read-only register written, or write-only register read.
    Access,
    /// Code not defined by the protocol.
    Unknown(u8),
}

impl V2Error {
    /// Decodes the low seven bits of the error byte. `0` means no error.
    pub fn from_code(code: u8) -> Option<V2Error> {
        match code & 0x7F {
            0 => None,
            1 => Some(V2Error::Result),
            2 => Some(V2Error::Instruction),
            3 => Some(V2Error::Crc),
            4 => Some(V2Error::DataRange),
            5 => Some(V2Error::DataLength),
            6 => Some(V2Error::DataLimit),
            7 => Some(V2Error::Access),
            other => Some(V2Error::Unknown(other)),
        }
    }
    /// Code as found on the wire.
    pub fn code(self) -> u8 {
        match self {
            V2Error::Result => 1,
            V2Error::Instruction => 2,
            V2Error::Crc => 3,
            V2Error::DataRange => 4,
            V2Error::DataLength => 5,
            V2Error::DataLimit => 6,
            V2Error::Access => 7,
            V2Error::Unknown(code) => code,
        }
    }
    fn token(self) -> &'static str {
        match self {
            V2Error::Result => "V2: Result fail",
            V2Error::Instruction => "V2: Instruction",
            V2Error::Crc => "V2: CRC",
            V2Error::DataRange => "V2: Data range",
            V2Error::DataLength => "V2: Data length",
            V2Error::DataLimit => "V2: Data limit",
            V2Error::Access => "V2: Access",
            V2Error::Unknown(_) => "V2: Unknown",
        }
    }
}

/// Error reported by the device in its status packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// No status packet was decoded.
    #[default]
    None,
    /// Protocol 1.0 alarm set.
    V1(V1Error),
    /// Protocol 2.0 error code and hardware alert bit.
    V2 {
        /// Error code, if any.
        error: Option<V2Error>,
        /// A hardware error is latched in the device.
        alert: bool,
    },
}

impl DeviceError {
    /// Interprets a protocol 2.0 error byte.
    pub fn from_v2(byte: u8) -> DeviceError {
        DeviceError::V2 {
            error: V2Error::from_code(byte),
            alert: byte & 0x80 != 0,
        }
    }
    /// `true` when the device reported nothing wrong.
    pub fn is_ok(&self) -> bool {
        match *self {
            DeviceError::None => true,
            DeviceError::V1(bits) => bits.is_empty(),
            DeviceError::V2 { error, alert } => error.is_none() && !alert,
        }
    }
    fn for_each_token<F>(&self, mut f: F) -> fmt::Result
    where
        F: FnMut(&'static str) -> fmt::Result,
    {
        match *self {
            DeviceError::None => Ok(()),
            DeviceError::V1(bits) => {
                for (flag, token) in V1Error::TOKENS.iter() {
                    if bits.contains(*flag) {
                        f(token)?;
                    }
                }
                Ok(())
            }
            DeviceError::V2 { error, alert } => {
                if let Some(e) = error {
                    f(e.token())?;
                }
                if alert {
                    f("V2: Hardware alert")?;
                }
                Ok(())
            }
        }
    }
}

/// Outcome of one transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    transport: TransportFlags,
    device: DeviceError,
}

impl Status {
    /// Nothing went wrong.
    pub const OK: Status = Status {
        transport: TransportFlags::empty(),
        device: DeviceError::None,
    };

    /// Combines transport flags and a device error.
    pub fn new(transport: TransportFlags, device: DeviceError) -> Status {
        Status { transport, device }
    }
    /// Transport failure without any device report.
    pub fn transport_error(flags: TransportFlags) -> Status {
        Status::new(flags, DeviceError::None)
    }
    /// Flags raised by the engine.
    pub fn transport(&self) -> TransportFlags {
        self.transport
    }
    /// Error reported by the device.
    pub fn device(&self) -> DeviceError {
        self.device
    }
    /// `true` when neither part reports an error.
    pub fn is_ok(&self) -> bool {
        self.transport.is_empty() && self.device.is_ok()
    }
    /// `true` when all of `flags` are raised.
    pub fn has(&self, flags: TransportFlags) -> bool {
        self.transport.contains(flags)
    }
    pub(crate) fn raise(&mut self, flags: TransportFlags) {
        self.transport.insert(flags);
    }
    pub(crate) fn set_device(&mut self, device: DeviceError) {
        self.device = device;
    }
}

impl From<TransportFlags> for Status {
    fn from(flags: TransportFlags) -> Status {
        Status::transport_error(flags)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut sep = "";
        let mut token = |t: &'static str| {
            let r = write!(f, "{}{}", sep, t);
            sep = " ";
            r
        };
        for (flag, t) in TransportFlags::TOKENS.iter() {
            if self.transport.contains(*flag) {
                token(t)?;
            }
        }
        self.device.for_each_token(token)
    }
}
