//! Per-bus state.
use crate::config::{BusConfig, ReturnLevel};
use crate::error::{Status, TransportFlags};
use crate::models::{self, ServoModel};
use crate::protocol::Protocol;
use crate::servo::Servo;

/// Packet counters of a bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Statistics {
    /// Instruction packets sent.
    pub packets_sent: u32,
    /// Status packets decoded, valid or not.
    pub packets_received: u32,
    /// Failed operations.
    pub errors: u32,
}

/// What an observer is told about.
#[derive(Clone, Copy, Debug)]
pub enum Event<'a> {
    /// An instruction packet went out.
    Sent {
        /// Bus index.
        bus: u8,
        /// Protocol of the bus.
        protocol: Protocol,
        /// Addressed id.
        id: u8,
        /// Instruction code.
        instruction: u8,
        /// Parameters before stuffing.
        parameters: &'a [u8],
    },
    /// A status packet was decoded.
    Received {
        /// Bus index.
        bus: u8,
        /// Protocol of the bus.
        protocol: Protocol,
        /// Id of the sender.
        id: u8,
        /// Error byte (1.0) or instruction (2.0).
        content: u8,
        /// Parameters after destuffing.
        parameters: &'a [u8],
    },
    /// An operation failed.
    Failed {
        /// Bus index.
        bus: u8,
        /// Addressed id.
        id: u8,
        /// Outcome.
        status: Status,
    },
}

/// Callback receiving every [`Event`] of a bus.
pub type Observer = fn(&Event<'_>);

/// One physical bus and the transport driving it.
///
/// Operations are serialized by the `&mut self` receiver: one transaction at
/// a time per bus. See the [`engine`](crate::engine) for the operations.
pub struct Bus<T> {
    pub(crate) index: u8,
    pub(crate) config: BusConfig,
    pub(crate) transport: T,
    pub(crate) status: Status,
    pub(crate) statistics: Statistics,
    pub(crate) observer: Option<Observer>,
}

impl<T> Bus<T> {
    /// Bus number `index` driven by `transport`.
    pub fn new(index: u8, transport: T, config: BusConfig) -> Bus<T> {
        Bus {
            index,
            config,
            transport,
            status: Status::OK,
            statistics: Statistics::default(),
            observer: None,
        }
    }
    /// Index given to the transport.
    pub fn index(&self) -> u8 {
        self.index
    }
    /// Current settings.
    pub fn config(&self) -> &BusConfig {
        &self.config
    }
    /// Protocol spoken on the bus.
    pub fn protocol(&self) -> Protocol {
        self.config.protocol
    }
    /// Tells the engine which instructions the servos answer. Must match
    /// what is programmed in them.
    pub fn set_return_level(&mut self, level: ReturnLevel) {
        self.config.return_level = level;
    }
    /// Tells the engine how long the servos wait before answering.
    pub fn set_return_delay_ms(&mut self, delay: u32) {
        self.config.return_delay_ms = delay;
    }
    /// Outcome of the last operation.
    pub fn status(&self) -> Status {
        self.status
    }
    /// Packet counters.
    pub fn statistics(&self) -> Statistics {
        self.statistics
    }
    /// Zeroes the packet counters.
    pub fn reset_statistics(&mut self) {
        self.statistics = Statistics::default();
    }
    /// Installs or removes the observer.
    pub fn set_observer(&mut self, observer: Option<Observer>) {
        self.observer = observer;
    }
    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
    /// Underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
    /// Gives the transport back.
    pub fn release(self) -> T {
        self.transport
    }
    /// Handle on servo `id` of the given model.
    ///
    /// Fails with `PROTOCOL` when the model does not speak the bus protocol.
    pub fn attach(&self, model: &'static ServoModel, id: u8) -> Result<Servo, Status> {
        if model.protocol != self.config.protocol {
            return Err(TransportFlags::PROTOCOL.into());
        }
        debug!(
            "bus {}: servo {} attached, model {}",
            self.index,
            id,
            model.model_id
        );
        Ok(Servo::new(model, id))
    }
    /// Like [`Bus::attach`], with the model looked up by name.
    ///
    /// Fails with `UNSUPPORTED` for an unknown model.
    pub fn attach_by_name(&self, name: &str, id: u8) -> Result<Servo, Status> {
        let model = models::find_by_name(name).ok_or(TransportFlags::UNSUPPORTED)?;
        self.attach(model, id)
    }
    pub(crate) fn notify(&self, event: &Event<'_>) {
        if let Some(observer) = self.observer {
            observer(event);
        }
    }
}
