//! Robotis Dynamixel servo bus engine for protocols 1.0 and 2.0.
//!
//! A [`Bus`] owns a byte [`Transport`] and the settings of one physical
//! line. Servos attached to it are plain [`Servo`] handles; every operation
//! takes the bus mutably and performs one instruction / status exchange,
//! framed for the protocol the bus speaks.
//!
//! ## Example
//!
//! ```ignore
//! use dynamixel_bus::motors::XL_320;
//! use dynamixel_bus::transport::serial::SerialPort;
//!
//! let mut bus = dynamixel_bus::with_protocol_v2(0, SerialPort::new(rx, tx, timer));
//! let servo = bus.attach_by_name("XL320", 1)?;
//!
//! loop {
//!     let pos = bus.read_register(&servo, XL_320::PresentPosition)?;
//!     bus.set_goal_position(&servo, pos)?;
//!     bus.set_led(&servo, XL_320::Color::Green)?;
//! }
//! ```
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate embedded_hal as hal;

#[macro_use]
mod fmt;
#[macro_use]
pub mod motors;

pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod protocol;
pub mod registers;
pub mod servo;
pub mod transport;

pub use crate::bus::{Bus, Event, Observer, Statistics};
pub use crate::config::{BusConfig, ReturnLevel};
pub use crate::engine::{PingInfo, ScanResult};
pub use crate::error::{DeviceError, Status, TransportFlags, V1Error, V2Error};
pub use crate::models::ServoModel;
pub use crate::protocol::{Protocol, BROADCAST_ID};
pub use crate::servo::Servo;
pub use crate::transport::{LinkError, Transport};

/// Bus `index` speaking protocol 1.0, with the default settings.
pub fn with_protocol_v1<T: Transport>(index: u8, transport: T) -> Bus<T> {
    Bus::new(index, transport, BusConfig::new(Protocol::V1))
}

/// Bus `index` speaking protocol 2.0, with the default settings.
pub fn with_protocol_v2<T: Transport>(index: u8, transport: T) -> Bus<T> {
    Bus::new(index, transport, BusConfig::new(Protocol::V2))
}
