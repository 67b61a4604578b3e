//! Typed registers of specific servo models.
//!
//! Each model module declares its control table with [`register!`], giving
//! one unit struct per register. They can be passed to
//! [`Bus::read_register`](crate::Bus::read_register) and
//! [`Bus::write_register`](crate::Bus::write_register) just like the entries
//! of the generic [catalog](crate::registers).

/// A register of a servo control table.
pub trait Register {
    /// Address of the first byte.
    fn address(&self) -> u16;
    /// Size in bytes.
    fn length(&self) -> u16;
}

macro_rules! register {
    ($($(#[$attr:meta])* $reg:ident : $addr:expr, $len:expr,)+) => {
        $(
            $(#[$attr])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq)]
            pub struct $reg;
            impl $crate::motors::Register for $reg {
                fn address(&self) -> u16 { $addr }
                fn length(&self) -> u16 { $len }
            }
        )+
    }
}

#[allow(non_snake_case)]
pub mod XL_320;

macro_rules! pack {
    ($l:expr, $h:expr) => (u16::from($h) << 8 | u16::from($l))
}
macro_rules! unpack {
    ($b:expr) => {
        ($b as u8, ($b >> 8) as u8)
    }
}
