//! Servo models known to the crate.
use crate::protocol::Protocol;
use crate::registers::Table;

/// A servo model: protocol spoken and control table layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoModel {
    /// Value of the model number register.
    pub model_id: u16,
    /// Commercial name.
    pub name: &'static str,
    /// Protocol spoken.
    pub protocol: Protocol,
    /// Control table layout.
    pub table: Table,
}

macro_rules! models {
    ($($id:expr, $name:expr, $protocol:ident, $table:ident;)+) => {
        [$(
            ServoModel {
                model_id: $id,
                name: $name,
                protocol: Protocol::$protocol,
                table: Table::$table,
            },
        )+]
    }
}

/// Every supported model.
pub static MODELS: [ServoModel; 20] = models![
    // AX
      12, "AX-12",      V1, Reg1;
     300, "AX-12W",     V1, Reg1;
      18, "AX-18",      V1, Reg1;
    // EX
     107, "EX-106",     V1, Reg1;
    // RX
      10, "RX-10",      V1, Reg1;
      24, "RX-24",      V1, Reg1;
      28, "RX-28",      V1, Reg1;
      64, "RX-64",      V1, Reg1;
    // DX
     113, "DX-113",     V1, Reg1;
     116, "DX-116",     V1, Reg1;
     117, "DX-117",     V1, Reg1;
    // MX
     360, "MX-12",      V1, Reg2;
      29, "MX-28",      V1, Reg2;
     310, "MX-64",      V1, Reg3;
     320, "MX-106",     V1, Reg3;
    // XL
     350, "XL320",      V2, Reg4;
    // XH
    1000, "XH430-W350", V2, Reg5;
    1010, "XH430-W210", V2, Reg5;
    // XM
    1020, "XM430-W350", V2, Reg5;
    1030, "XM430-W210", V2, Reg5;
];

/// Line speeds servos can be configured for, in bits per second.
pub const BAUDRATES: [u32; 9] = [
    9_600, 19_200, 57_600, 115_200, 200_000, 250_000, 400_000, 500_000, 1_000_000,
];

/// Model whose model number is `model_id`.
pub fn find_by_id(model_id: u16) -> Option<&'static ServoModel> {
    MODELS.iter().find(|m| m.model_id == model_id)
}

/// Model called `name`, ignoring ASCII case. A plain linear scan.
pub fn find_by_name(name: &str) -> Option<&'static ServoModel> {
    MODELS.iter().find(|m| m.name.eq_ignore_ascii_case(name))
}
