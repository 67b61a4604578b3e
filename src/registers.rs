//! Control table catalog.
//!
//! Dynamixel servos went through five control table layouts. Every entry of
//! [`REGISTERS`] carries a mask of the layouts it belongs to; within one
//! layout addresses are unique. The newest layout (XM series) is declared but
//! not described yet.
use core::fmt;

use crate::motors::Register;

/// Control table layout, usable as a bit mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Table {
    /// Legacy layout of protocol 1.0 servos (AX, RX, DX, EX).
    Reg1 = 0x01,
    /// Legacy layout with PID gains (MX-12, MX-28).
    Reg2 = 0x02,
    /// Legacy layout with PID gains and torque control (MX-64, MX-106).
    Reg3 = 0x04,
    /// Layout introduced with protocol 2.0 (XL-320).
    Reg4 = 0x08,
    /// Layout of the XM/XH series.
    Reg5 = 0x10,
}

impl Table {
    /// Mask bit of the layout.
    pub fn mask(self) -> u8 {
        self as u8
    }
}

/// Storage area of a register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Area {
    /// Non-volatile, writable only with torque off.
    Eeprom,
    /// Cleared at power-off.
    Ram,
}

impl Area {
    /// Printable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Area::Eeprom => "EEPROM",
            Area::Ram => "RAM",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access rights of a register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    /// Read and write.
    ReadWrite,
    /// Read only.
    ReadOnly,
}

impl Access {
    /// Printable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Access::ReadWrite => "RW",
            Access::ReadOnly => "R",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One register of one or more control table layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterEntry {
    /// Layouts implementing the register, see [`Table::mask`].
    pub tables: u8,
    /// Storage area.
    pub area: Area,
    /// Address of the first byte.
    pub address: u16,
    /// Name, lower snake case.
    pub name: &'static str,
    /// Access rights.
    pub access: Access,
    /// Size in bytes.
    pub size: u8,
}

impl RegisterEntry {
    /// `true` when `table` implements the register.
    pub fn belongs_to(&self, table: Table) -> bool {
        self.tables & table.mask() != 0
    }
    /// `true` when the register can be written.
    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }
}

impl Register for RegisterEntry {
    fn address(&self) -> u16 {
        self.address
    }
    fn length(&self) -> u16 {
        u16::from(self.size)
    }
}

impl<'a> Register for &'a RegisterEntry {
    fn address(&self) -> u16 {
        self.address
    }
    fn length(&self) -> u16 {
        u16::from(self.size)
    }
}

macro_rules! entries {
    ($($tables:expr, $area:ident, $address:expr, $name:expr, $access:ident, $size:expr;)+) => {
        [$(
            RegisterEntry {
                tables: $tables,
                area: Area::$area,
                address: $address,
                name: $name,
                access: Access::$access,
                size: $size,
            },
        )+]
    }
}

/// Every known register.
pub static REGISTERS: [RegisterEntry; 65] = entries![
    // Common to layouts 1 to 4
    0x0F, Eeprom,  0, "model_number",          ReadOnly,  2;
    0x0F, Eeprom,  2, "firmware_version",      ReadOnly,  1;
    0x0F, Eeprom,  3, "id",                    ReadWrite, 1;
    0x0F, Eeprom,  4, "baudrate",              ReadWrite, 1;
    0x0F, Eeprom,  5, "return_delay_time",     ReadWrite, 1;
    0x0F, Eeprom,  6, "cw_angle_limit",        ReadWrite, 2;
    0x0F, Eeprom,  8, "ccw_angle_limit",       ReadWrite, 2;
    // Legacy layouts
    0x07, Eeprom, 11, "temperature_limit",     ReadWrite, 1;
    0x07, Eeprom, 12, "low_voltage_limit",     ReadWrite, 1;
    0x07, Eeprom, 13, "high_voltage_limit",    ReadWrite, 1;
    0x07, Eeprom, 14, "max_torque",            ReadWrite, 2;
    0x07, Eeprom, 16, "status_return_level",   ReadWrite, 1;
    0x07, Eeprom, 17, "alarm_led",             ReadWrite, 1;
    0x07, Eeprom, 18, "alarm_shutdown",        ReadWrite, 1;
    0x06, Eeprom, 20, "multi-turn_offset",     ReadWrite, 2;
    0x06, Eeprom, 22, "resolution_divider",    ReadWrite, 1;
    // Layout 4
    0x08, Eeprom, 11, "control_mode",          ReadWrite, 1;
    0x08, Eeprom, 12, "temperature_limit",     ReadWrite, 1;
    0x08, Eeprom, 13, "low_voltage_limit",     ReadWrite, 1;
    0x08, Eeprom, 14, "high_voltage_limit",    ReadWrite, 1;
    0x08, Eeprom, 15, "max_torque",            ReadWrite, 2;
    0x08, Eeprom, 17, "status_return_level",   ReadWrite, 1;
    0x08, Eeprom, 18, "alarm_shutdown",        ReadWrite, 1;
    // Legacy layouts
    0x07, Ram,    24, "torque_enable",         ReadWrite, 1;
    0x07, Ram,    25, "led",                   ReadWrite, 1;
    0x01, Ram,    26, "cw_compliance_margin",  ReadWrite, 1;
    0x01, Ram,    27, "ccw_compliance_margin", ReadWrite, 1;
    0x01, Ram,    28, "cw_compliance_slope",   ReadWrite, 1;
    0x01, Ram,    29, "ccw_compliance_slope",  ReadWrite, 1;
    0x06, Ram,    26, "d_gain",                ReadWrite, 1;
    0x06, Ram,    27, "i_gain",                ReadWrite, 1;
    0x06, Ram,    28, "p_gain",                ReadWrite, 1;
    0x07, Ram,    30, "goal_position",         ReadWrite, 2;
    0x07, Ram,    32, "moving_speed",          ReadWrite, 2;
    0x07, Ram,    34, "max_torque",            ReadWrite, 2;
    0x07, Ram,    36, "present_position",      ReadOnly,  2;
    0x07, Ram,    38, "present_velocity",      ReadOnly,  2;
    0x07, Ram,    40, "present_load",          ReadOnly,  2;
    0x07, Ram,    42, "present_voltage",       ReadOnly,  1;
    0x07, Ram,    43, "present_temperature",   ReadOnly,  1;
    0x07, Ram,    44, "registered",            ReadOnly,  1;
    0x07, Ram,    46, "moving",                ReadOnly,  1;
    0x07, Ram,    47, "lock",                  ReadWrite, 1;
    0x07, Ram,    48, "punch",                 ReadWrite, 2;
    0x04, Ram,    68, "current",               ReadWrite, 2;
    0x04, Ram,    70, "torque_control_enable", ReadWrite, 1;
    0x04, Ram,    71, "goal_torque",           ReadWrite, 2;
    0x04, Ram,    73, "goal_acceleration",     ReadWrite, 1;
    // Layout 4
    0x08, Ram,    24, "torque_enable",         ReadWrite, 1;
    0x08, Ram,    25, "led",                   ReadWrite, 1;
    0x08, Ram,    27, "d_gain",                ReadWrite, 1;
    0x08, Ram,    28, "i_gain",                ReadWrite, 1;
    0x08, Ram,    29, "p_gain",                ReadWrite, 1;
    0x08, Ram,    30, "goal_position",         ReadWrite, 2;
    0x08, Ram,    32, "goal_velocity",         ReadWrite, 2;
    0x08, Ram,    35, "goal_torque",           ReadWrite, 2;
    0x08, Ram,    37, "present_position",      ReadOnly,  2;
    0x08, Ram,    39, "present_velocity",      ReadOnly,  2;
    0x08, Ram,    41, "present_load",          ReadOnly,  2;
    0x08, Ram,    45, "present_voltage",       ReadOnly,  1;
    0x08, Ram,    46, "present_temperature",   ReadOnly,  1;
    0x08, Ram,    47, "registered",            ReadOnly,  1;
    0x08, Ram,    49, "moving",                ReadOnly,  1;
    0x08, Ram,    50, "hardware_error_status", ReadWrite, 1;
    0x08, Ram,    51, "punch",                 ReadWrite, 2;
];

/// Entries implemented by `table`, in address order within each area.
pub fn entries(table: Table) -> impl Iterator<Item = &'static RegisterEntry> {
    REGISTERS.iter().filter(move |r| r.belongs_to(table))
}

/// Register of `table` called `name`, in `area`.
///
/// Some names exist in both areas (`max_torque` is an EEPROM limit and a
/// RAM setting on the legacy layouts).
pub fn find(table: Table, area: Area, name: &str) -> Option<&'static RegisterEntry> {
    entries(table).find(|r| r.area == area && r.name == name)
}

/// First register of `table` called `name`, EEPROM before RAM.
pub fn find_by_name(table: Table, name: &str) -> Option<&'static RegisterEntry> {
    entries(table).find(|r| r.name == name)
}

/// Register of `table` starting at `address`.
pub fn find_by_address(table: Table, address: u16) -> Option<&'static RegisterEntry> {
    entries(table).find(|r| r.address == address)
}

/// Control concepts shared by every generation, whatever their address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    /// Model number.
    ModelNumber,
    /// Firmware version.
    FirmwareVersion,
    /// Bus id.
    Id,
    /// Line speed code.
    BaudRate,
    /// Delay before a status packet.
    ReturnDelay,
    /// Which instructions are answered.
    StatusReturnLevel,
    /// Torque on or off.
    TorqueEnable,
    /// LED state or color.
    Led,
    /// Target position.
    GoalPosition,
    /// Moving speed on the legacy layouts.
    GoalVelocity,
    /// Torque limit in RAM on the legacy layouts.
    GoalTorque,
    /// Measured position.
    PresentPosition,
}

impl Control {
    /// Name and area on the legacy layouts.
    fn legacy(self) -> (&'static str, Area) {
        match self {
            Control::ModelNumber => ("model_number", Area::Eeprom),
            Control::FirmwareVersion => ("firmware_version", Area::Eeprom),
            Control::Id => ("id", Area::Eeprom),
            Control::BaudRate => ("baudrate", Area::Eeprom),
            Control::ReturnDelay => ("return_delay_time", Area::Eeprom),
            Control::StatusReturnLevel => ("status_return_level", Area::Eeprom),
            Control::TorqueEnable => ("torque_enable", Area::Ram),
            Control::Led => ("led", Area::Ram),
            Control::GoalPosition => ("goal_position", Area::Ram),
            Control::GoalVelocity => ("moving_speed", Area::Ram),
            Control::GoalTorque => ("max_torque", Area::Ram),
            Control::PresentPosition => ("present_position", Area::Ram),
        }
    }
    /// Name and area on layout 4.
    fn newest(self) -> (&'static str, Area) {
        match self {
            Control::GoalVelocity => ("goal_velocity", Area::Ram),
            Control::GoalTorque => ("goal_torque", Area::Ram),
            other => other.legacy(),
        }
    }
}

/// Register implementing `control` on `table`.
///
/// Only the legacy layouts and layout 4 are told apart; `None` when the
/// layout does not carry the register.
pub fn resolve(table: Table, control: Control) -> Option<&'static RegisterEntry> {
    let (name, area) = match table {
        Table::Reg4 => control.newest(),
        _ => control.legacy(),
    };
    find(table, area, name)
}
