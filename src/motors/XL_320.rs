//! Definition of the `XL_320` registers
//!
//! The XL-320 speaks protocol 2.0 and uses the newest control table layout.
#![allow(missing_docs)]

register![
    /// Model number, 350 for an XL-320.
    ModelNumber: 0x00, 2,
    FirmwareVersion: 0x02, 1,
    ID: 0x03, 1,
    /// Line speed code, see [`Baud`].
    BaudRate: 0x04, 1,
    ReturnDelayTime: 0x05, 1,
    CwAngleLimit: 0x06, 2,
    CcwAngleLimit: 0x08, 2,
    /// See [`Mode`].
    ControlMode: 0x0B, 1,
    TemperatureLimit: 0x0C, 1,
    MinVoltageLimit: 0x0D, 1,
    MaxVoltageLimit: 0x0E, 1,
    MaxTorque: 0x0F, 2,
    StatusReturnLevel: 0x11, 1,
    ShutdownAlarm: 0x12, 1,
    TorqueEnable: 0x18, 1,
    /// See [`Color`].
    Led: 0x19, 1,
    DGain: 0x1B, 1,
    IGain: 0x1C, 1,
    PGain: 0x1D, 1,
    GoalPosition: 0x1E, 2,
    MovingSpeed: 0x20, 2,
    TorqueLimit: 0x23, 2,
    PresentPosition: 0x25, 2,
    PresentSpeed: 0x27, 2,
    PresentLoad: 0x29, 2,
    PresentVoltage: 0x2D, 1,
    PresentTemperature: 0x2E, 1,
    RegisteredInstruction: 0x2F, 1,
    Moving: 0x31, 1,
    HardwareErrorStatus: 0x32, 1,
    Punch: 0x33, 2,
];

/// Largest goal position, speed or punch value.
pub const MAX_VALUE: u16 = 0x3FF;

/// Values of the [`BaudRate`](struct.BaudRate.html) register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Baud {
    /// 9600 bps.
    B9600 = 0,
    /// 57600 bps.
    B57600 = 1,
    /// 115200 bps.
    B115200 = 2,
    /// 1 Mbps.
    B1M = 3,
}

impl Baud {
    /// Line speed in bits per second.
    pub fn bps(self) -> u32 {
        match self {
            Baud::B9600 => 9_600,
            Baud::B57600 => 57_600,
            Baud::B115200 => 115_200,
            Baud::B1M => 1_000_000,
        }
    }
}

/// Values of the [`ControlMode`](struct.ControlMode.html) register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Endless rotation, speed controlled.
    Wheel = 1,
    /// Position controlled.
    Joint = 2,
}

/// Colors of the RGB LED.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    Off = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
}

macro_rules! register_value {
    ($($t:ty),+) => {
        $(
            impl From<$t> for u8 {
                fn from(v: $t) -> u8 {
                    v as u8
                }
            }
            impl From<$t> for u16 {
                fn from(v: $t) -> u16 {
                    v as u16
                }
            }
        )+
    }
}
register_value!(Baud, Mode, Color);
