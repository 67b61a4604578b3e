//! Instruction / status transactions.
//!
//! Every operation goes through the same steps: build the instruction packet
//! for the bus protocol and send it, then, if the servo is expected to
//! answer, flush the line and decode its status packet, checking it against
//! the instruction. There is no retry: the first error ends the transaction and
//! is returned, recorded as the bus status and counted.
use core::ops::RangeInclusive;

use heapless::Vec;

use crate::bus::{Bus, Event};
use crate::config::{ReturnLevel, SCAN_CAPACITY};
use crate::error::{DeviceError, Status, TransportFlags, V1Error};
use crate::motors::Register;
use crate::protocol::{v1, v2, Instruction, Parameters, Protocol, BROADCAST_ID, MAX_PARAMETERS};
use crate::registers::{self, Control, RegisterEntry};
use crate::servo::Servo;
use crate::transport::{Port, Transport};

/// When a status packet comes back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reply {
    Never,
    Always,
    OnEverything,
    OnRead,
}

struct Request<'a> {
    id: u8,
    instruction: Instruction,
    parameters: &'a [u8],
    reply: Reply,
    /// Data bytes the status packet carries, error byte excluded.
    expected: usize,
    /// The caller needs the data of the reply.
    needs_data: bool,
}

/// Answer to a ping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PingInfo {
    /// Model number, reported by 2.0 servos only.
    pub model_number: Option<u16>,
    /// Firmware version, reported by 2.0 servos only.
    pub firmware: Option<u8>,
}

/// Ids found by [`Bus::scan`].
pub type ScanResult = Vec<u8, SCAN_CAPACITY>;

impl<T: Transport> Bus<T> {
    /// Checks that servo answers.
    ///
    /// A ping is always answered, except when broadcast.
    pub fn ping(&mut self, servo: &Servo) -> Result<PingInfo, Status> {
        self.ping_id(servo.id())
    }
    /// Restores the factory settings of the servo.
    ///
    /// Never answered on protocol 1.0.
    pub fn reset(&mut self, servo: &Servo) -> Result<(), Status> {
        let reply = match self.config.protocol {
            Protocol::V1 => Reply::Never,
            Protocol::V2 => Reply::OnEverything,
        };
        self.transact(Request {
            id: servo.id(),
            instruction: Instruction::Reset,
            parameters: &[],
            reply,
            expected: 0,
            needs_data: false,
        })
        .map(drop)
    }
    /// Restarts the servo. Protocol 2.0 only.
    pub fn reboot(&mut self, servo: &Servo) -> Result<(), Status> {
        if self.config.protocol == Protocol::V1 {
            return self.finish(servo.id(), Err(TransportFlags::PROTOCOL.into()));
        }
        self.transact(Request {
            id: servo.id(),
            instruction: Instruction::Reboot,
            parameters: &[],
            reply: Reply::OnEverything,
            expected: 0,
            needs_data: false,
        })
        .map(drop)
    }
    /// Writes `data` from `address` on. A registered write waits for
    /// [`Bus::action`].
    pub fn write(
        &mut self,
        servo: &Servo,
        address: u16,
        data: &[u8],
        registered: bool,
    ) -> Result<(), Status> {
        let parameters = match self.address_parameters(address, data) {
            Ok(p) => p,
            Err(e) => return self.finish(servo.id(), Err(e.into())),
        };
        let instruction = if registered {
            Instruction::RegWrite
        } else {
            Instruction::Write
        };
        self.transact(Request {
            id: servo.id(),
            instruction,
            parameters: &parameters,
            reply: Reply::OnEverything,
            expected: 0,
            needs_data: false,
        })
        .map(drop)
    }
    /// Writes the `size` low bytes of `value`, little-endian. `size` is 1, 2
    /// or 4.
    pub fn write_int(
        &mut self,
        servo: &Servo,
        address: u16,
        value: u32,
        size: u8,
        registered: bool,
    ) -> Result<(), Status> {
        let size = match checked_size(size) {
            Ok(size) => size,
            Err(e) => return self.finish(servo.id(), Err(e.into())),
        };
        self.write(servo, address, &value.to_le_bytes()[..size], registered)
    }
    /// Reads `count` bytes from `address` on.
    ///
    /// With the return level at [`ReturnLevel::NoAnswer`] or on broadcast the
    /// instruction is sent but no answer is waited for, and the read fails
    /// with `NO_REPLY`.
    pub fn read(&mut self, servo: &Servo, address: u16, count: usize) -> Result<Parameters, Status> {
        let capacity = match self.config.protocol {
            Protocol::V1 => MAX_PARAMETERS,
            Protocol::V2 => MAX_PARAMETERS - 1,
        };
        if count == 0 {
            return self.finish(servo.id(), Err(TransportFlags::LENGTH.into()));
        }
        if count > capacity {
            return self.finish(servo.id(), Err(TransportFlags::OVERFLOW.into()));
        }
        let length = (count as u16).to_le_bytes();
        let length = match self.config.protocol {
            Protocol::V1 => &length[..1],
            Protocol::V2 => &length[..],
        };
        let parameters = match self.address_parameters(address, length) {
            Ok(p) => p,
            Err(e) => return self.finish(servo.id(), Err(e.into())),
        };
        self.transact(Request {
            id: servo.id(),
            instruction: Instruction::Read,
            parameters: &parameters,
            reply: Reply::OnRead,
            expected: count,
            needs_data: true,
        })
    }
    /// Reads a little-endian integer of `size` bytes. `size` is 1, 2 or 4.
    pub fn read_int(&mut self, servo: &Servo, address: u16, size: u8) -> Result<u32, Status> {
        let size = match checked_size(size) {
            Ok(size) => size,
            Err(e) => return self.finish(servo.id(), Err(e.into())),
        };
        let data = self.read(servo, address, size)?;
        let mut bytes = [0; 4];
        bytes[..size].copy_from_slice(&data);
        Ok(u32::from_le_bytes(bytes))
    }
    /// Applies the registered writes.
    ///
    /// On protocol 1.0 the action is broadcast and never answered.
    pub fn action(&mut self, servo: &Servo) -> Result<(), Status> {
        let id = match self.config.protocol {
            Protocol::V1 => BROADCAST_ID,
            Protocol::V2 => servo.id(),
        };
        self.transact(Request {
            id,
            instruction: Instruction::Action,
            parameters: &[],
            reply: Reply::OnEverything,
            expected: 0,
            needs_data: false,
        })
        .map(drop)
    }
    /// Reads register `reg`, one or two bytes wide.
    pub fn read_register<REG>(&mut self, servo: &Servo, reg: REG) -> Result<u16, Status>
    where
        REG: Register,
    {
        match reg.length() {
            1 | 2 => {
                let data = self.read(servo, reg.address(), usize::from(reg.length()))?;
                Ok(data.iter().rev().fold(0, |v, &b| v << 8 | u16::from(b)))
            }
            _ => self.finish(servo.id(), Err(TransportFlags::UNSUPPORTED.into())),
        }
    }
    /// Writes `value` to register `reg`, one or two bytes wide.
    pub fn write_register<REG>(&mut self, servo: &Servo, reg: REG, value: u16) -> Result<(), Status>
    where
        REG: Register,
    {
        let (l, h) = unpack!(value);
        match reg.length() {
            1 => self.write(servo, reg.address(), &[l], false),
            2 => self.write(servo, reg.address(), &[l, h], false),
            _ => self.finish(servo.id(), Err(TransportFlags::UNSUPPORTED.into())),
        }
    }
    /// Pings every id of `ids` and returns those that answered.
    ///
    /// A silent id is skipped, any other error ends the scan. At most
    /// [`SCAN_CAPACITY`] ids are reported.
    pub fn scan(&mut self, ids: RangeInclusive<u8>) -> Result<ScanResult, Status> {
        let mut found = ScanResult::new();
        for id in ids {
            if id == BROADCAST_ID {
                continue;
            }
            match self.ping_id(id) {
                Ok(_) => {
                    if found.push(id).is_err() {
                        break;
                    }
                }
                Err(s) if s.transport() == TransportFlags::TIMEOUT => {}
                Err(s) => return Err(s),
            }
        }
        debug!("bus {}: scan found {} servo(s)", self.index, found.len());
        Ok(found)
    }
    /// Programs a new id into the servo and re-addresses the handle.
    pub fn change_id(&mut self, servo: &mut Servo, id: u8) -> Result<(), Status> {
        self.write_control(servo, Control::Id, u32::from(id))?;
        servo.set_id(id);
        Ok(())
    }
    /// Model number read from the servo.
    pub fn model_number(&mut self, servo: &Servo) -> Result<u16, Status> {
        self.read_control(servo, Control::ModelNumber).map(|v| v as u16)
    }
    /// Firmware version read from the servo.
    pub fn firmware_version(&mut self, servo: &Servo) -> Result<u8, Status> {
        self.read_control(servo, Control::FirmwareVersion).map(|v| v as u8)
    }
    /// Turns the torque on or off.
    pub fn set_torque_enable(&mut self, servo: &Servo, enable: bool) -> Result<(), Status> {
        self.write_control(servo, Control::TorqueEnable, u32::from(enable))
    }
    /// Moves to `position`, clamped to the servo bounds when it has some.
    pub fn set_goal_position(&mut self, servo: &Servo, position: u16) -> Result<(), Status> {
        let position = servo.clamp(position);
        self.write_control(servo, Control::GoalPosition, u32::from(position))
    }
    /// Sets the moving speed.
    pub fn set_goal_velocity(&mut self, servo: &Servo, velocity: u16) -> Result<(), Status> {
        self.write_control(servo, Control::GoalVelocity, u32::from(velocity))
    }
    /// Sets the torque limit (legacy layouts) or goal torque.
    pub fn set_goal_torque(&mut self, servo: &Servo, torque: u16) -> Result<(), Status> {
        self.write_control(servo, Control::GoalTorque, u32::from(torque))
    }
    /// Sets the LED: on/off on the legacy layouts, a color on the XL-320.
    pub fn set_led<L: Into<u8>>(&mut self, servo: &Servo, led: L) -> Result<(), Status> {
        self.write_control(servo, Control::Led, u32::from(led.into()))
    }
    /// Reads the present position and caches it in the handle.
    pub fn present_position(&mut self, servo: &mut Servo) -> Result<u16, Status> {
        let position = self.read_control(servo, Control::PresentPosition)? as u16;
        servo.cache_position(position);
        Ok(position)
    }

    fn resolve(&mut self, servo: &Servo, control: Control) -> Result<&'static RegisterEntry, Status> {
        match registers::resolve(servo.model().table, control) {
            Some(entry) => Ok(entry),
            None => self.finish(servo.id(), Err(TransportFlags::UNSUPPORTED.into())),
        }
    }
    fn write_control(&mut self, servo: &Servo, control: Control, value: u32) -> Result<(), Status> {
        let entry = self.resolve(servo, control)?;
        self.write_int(servo, entry.address, value, entry.size, false)
    }
    fn read_control(&mut self, servo: &Servo, control: Control) -> Result<u32, Status> {
        let entry = self.resolve(servo, control)?;
        self.read_int(servo, entry.address, entry.size)
    }
    fn ping_id(&mut self, id: u8) -> Result<PingInfo, Status> {
        let expected = match self.config.protocol {
            Protocol::V1 => 0,
            Protocol::V2 => 3,
        };
        let data = self.transact(Request {
            id,
            instruction: Instruction::Ping,
            parameters: &[],
            reply: Reply::Always,
            expected,
            needs_data: false,
        })?;
        Ok(match data[..] {
            [l, h, firmware] => PingInfo {
                model_number: Some(pack!(l, h)),
                firmware: Some(firmware),
            },
            _ => PingInfo::default(),
        })
    }
    /// Address then data, the address on one byte (1.0) or two (2.0).
    fn address_parameters(&self, address: u16, data: &[u8]) -> Result<Parameters, TransportFlags> {
        let mut parameters = Parameters::new();
        match self.config.protocol {
            Protocol::V1 => {
                let address = u8::try_from(address).map_err(|_| TransportFlags::PROTOCOL)?;
                extend(&mut parameters, &[address])?;
            }
            Protocol::V2 => extend(&mut parameters, &address.to_le_bytes())?,
        }
        extend(&mut parameters, data)?;
        Ok(parameters)
    }
    fn awaits_reply(&self, request: &Request<'_>) -> bool {
        if request.id == BROADCAST_ID {
            return false;
        }
        match request.reply {
            Reply::Never => false,
            Reply::Always => true,
            Reply::OnEverything => self.config.return_level == ReturnLevel::Everything,
            Reply::OnRead => self.config.return_level != ReturnLevel::NoAnswer,
        }
    }
    fn transact(&mut self, request: Request<'_>) -> Result<Parameters, Status> {
        let result = self.exchange(&request);
        self.finish(request.id, result)
    }
    /// Records the outcome of an operation.
    fn finish<R>(&mut self, id: u8, result: Result<R, Status>) -> Result<R, Status> {
        match &result {
            Ok(_) => self.status = Status::OK,
            Err(status) => {
                self.status = *status;
                self.statistics.errors = self.statistics.errors.wrapping_add(1);
                warn!("bus {}: id {} failed: {}", self.index, id, status);
                self.notify(&Event::Failed {
                    bus: self.index,
                    id,
                    status: *status,
                });
            }
        }
        result
    }
    fn exchange(&mut self, request: &Request<'_>) -> Result<Parameters, Status> {
        let protocol = self.config.protocol;
        let frame = match protocol {
            Protocol::V1 => {
                v1::Packet::new(request.id, request.instruction.into(), request.parameters)?.encode()?
            }
            Protocol::V2 => {
                v2::Packet::new(request.id, request.instruction.into(), request.parameters)?.encode()?
            }
        };

        let timeout = self.config.receive_timeout_ms();
        Port::new(&mut self.transport, self.index, timeout).send(&frame)?;
        self.statistics.packets_sent = self.statistics.packets_sent.wrapping_add(1);
        trace!(
            "bus {}: sent instruction {} to id {}",
            self.index,
            request.instruction as u8,
            request.id
        );
        self.notify(&Event::Sent {
            bus: self.index,
            protocol,
            id: request.id,
            instruction: request.instruction.into(),
            parameters: request.parameters,
        });

        if !self.awaits_reply(request) {
            return if request.needs_data {
                Err(TransportFlags::NO_REPLY.into())
            } else {
                Ok(Parameters::new())
            };
        }

        let mut port = Port::new(&mut self.transport, self.index, timeout);
        port.flush()?;
        match protocol {
            Protocol::V1 => {
                let reply = v1::Packet::decode(&mut port)?;
                self.received(protocol, reply.id, reply.content, &reply.parameters);
                validate_v1(request, reply)
            }
            Protocol::V2 => {
                let reply = v2::Packet::decode(&mut port)?;
                self.received(protocol, reply.id, reply.instruction, &reply.parameters);
                validate_v2(request, reply)
            }
        }
    }
    fn received(&mut self, protocol: Protocol, id: u8, content: u8, parameters: &[u8]) {
        self.statistics.packets_received = self.statistics.packets_received.wrapping_add(1);
        trace!("bus {}: status from id {}, {} byte(s)", self.index, id, parameters.len());
        self.notify(&Event::Received {
            bus: self.index,
            protocol,
            id,
            content,
            parameters,
        });
    }
}

/// Id and length are checked against the instruction; the error byte is a
/// set of alarms reported alongside.
fn validate_v1(request: &Request<'_>, reply: v1::Packet) -> Result<Parameters, Status> {
    let mut status = Status::new(
        TransportFlags::empty(),
        DeviceError::V1(V1Error::from_bits_truncate(reply.content)),
    );
    if reply.id != request.id {
        status.raise(TransportFlags::ID);
    }
    if reply.parameters.len() != request.expected {
        status.raise(TransportFlags::LENGTH);
    }
    if status.is_ok() {
        Ok(reply.parameters)
    } else {
        Err(status)
    }
}

/// The first parameter is the error byte: one code plus the alert bit, kept
/// apart from the transport flags.
fn validate_v2(request: &Request<'_>, reply: v2::Packet) -> Result<Parameters, Status> {
    let mut status = Status::OK;
    let data = match reply.parameters.split_first() {
        Some((&error, data)) => {
            status.set_device(DeviceError::from_v2(error));
            data
        }
        None => {
            status.raise(TransportFlags::LENGTH);
            &[]
        }
    };
    if reply.instruction != u8::from(Instruction::Status) {
        status.raise(TransportFlags::INSTRUCTION);
    }
    if reply.id != request.id {
        status.raise(TransportFlags::ID);
    }
    if !reply.parameters.is_empty() && data.len() != request.expected {
        status.raise(TransportFlags::LENGTH);
    }
    if status.is_ok() {
        Ok(Parameters::from_slice(data).unwrap_or_default())
    } else {
        Err(status)
    }
}

fn extend(parameters: &mut Parameters, bytes: &[u8]) -> Result<(), TransportFlags> {
    parameters
        .extend_from_slice(bytes)
        .map_err(|_| TransportFlags::OVERFLOW)
}

fn checked_size(size: u8) -> Result<usize, TransportFlags> {
    match size {
        1 | 2 | 4 => Ok(usize::from(size)),
        _ => Err(TransportFlags::LENGTH),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::BusConfig;
    use crate::transport::mock::MockTransport;

    fn request(id: u8, reply: Reply) -> Request<'static> {
        Request {
            id,
            instruction: Instruction::Write,
            parameters: &[],
            reply,
            expected: 0,
            needs_data: false,
        }
    }

    #[test]
    fn reply_policy() {
        let mut bus = Bus::new(0, MockTransport::new(), BusConfig::default());
        let cases = [
            (ReturnLevel::NoAnswer, [false, true, false, false]),
            (ReturnLevel::ReadOnly, [false, true, false, true]),
            (ReturnLevel::Everything, [false, true, true, true]),
        ];
        for (level, expected) in cases.iter() {
            bus.set_return_level(*level);
            let replies = [Reply::Never, Reply::Always, Reply::OnEverything, Reply::OnRead];
            for (reply, awaits) in replies.iter().zip(expected.iter()) {
                assert_eq!(bus.awaits_reply(&request(1, *reply)), *awaits, "{:?} {:?}", level, reply);
                assert!(!bus.awaits_reply(&request(BROADCAST_ID, *reply)));
            }
        }
    }

    #[test]
    fn failures_are_recorded_once() {
        let mut bus = Bus::new(0, MockTransport::new(), BusConfig::default());
        let err = bus.finish::<()>(3, Err(Status::transport_error(TransportFlags::ID | TransportFlags::LENGTH)));
        assert!(err.is_err());
        assert_eq!(bus.statistics().errors, 1);
        assert!(bus.status().has(TransportFlags::ID));

        assert_eq!(bus.finish(3, Ok(())), Ok(()));
        assert!(bus.status().is_ok());
        assert_eq!(bus.statistics().errors, 1);
    }

    #[test]
    fn address_width() {
        let v1 = Bus::new(0, MockTransport::new(), BusConfig::new(Protocol::V1));
        let v2 = Bus::new(0, MockTransport::new(), BusConfig::new(Protocol::V2));
        assert_eq!(&v1.address_parameters(30, &[1]).unwrap()[..], &[30, 1]);
        assert_eq!(&v2.address_parameters(0x0102, &[1]).unwrap()[..], &[0x02, 0x01, 1]);
        assert_eq!(v1.address_parameters(0x0102, &[]), Err(TransportFlags::PROTOCOL));
        assert_eq!(v2.address_parameters(0, &[0; 7]), Err(TransportFlags::OVERFLOW));
    }
}
