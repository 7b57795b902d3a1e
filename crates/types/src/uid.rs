//! Unique identifier types
//!
//! A [`Guid`] is a 128-bit globally unique id, a [`Tuid`] is the engine's
//! 64-bit unique id. A `Tuid` embeds losslessly into the low 64 bits of a
//! `Guid`, which is how the two are bridged.

use std::fmt;
use std::str::FromStr;

use crate::parse::ParseError;

/// 128-bit globally unique identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid(pub u128);

/// 64-bit unique identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuid(pub u64);

impl Guid {
    pub const NULL: Self = Self(0);

    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub const fn to_bytes(&self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_le_bytes(bytes))
    }

    /// Embed a TUID in the low 64 bits
    pub const fn from_tuid(tuid: Tuid) -> Self {
        Self(tuid.0 as u128)
    }
}

impl Tuid {
    pub const NULL: Self = Self(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Take the low 64 bits of a GUID
    pub const fn from_guid(guid: Guid) -> Self {
        Self(guid.0 as u64)
    }
}

impl From<u64> for Tuid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Tuid> for u64 {
    fn from(value: Tuid) -> Self {
        value.0
    }
}

impl From<Tuid> for Guid {
    fn from(value: Tuid) -> Self {
        Self::from_tuid(value)
    }
}

impl fmt::Display for Guid {
    /// Hyphenated form, e.g. `0123abcd-0000-0000-0000-00000000beef`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xffff_ffff_ffff
        )
    }
}

impl FromStr for Guid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('{').trim_end_matches('}');
        let hex: String = trimmed.chars().filter(|c| *c != '-').collect();
        if hex.len() != 32 {
            return Err(ParseError::new("Guid", s));
        }
        u128::from_str_radix(&hex, 16)
            .map(Self)
            .map_err(|_| ParseError::new("Guid", s))
    }
}

impl fmt::Display for Tuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl FromStr for Tuid {
    type Err = ParseError;

    /// Accepts `0x`-prefixed hex or plain decimal
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse(),
        };
        parsed.map(Self).map_err(|_| ParseError::new("Tuid", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_text_round_trip() {
        let guid = Guid(0x0123_4567_89ab_cdef_0011_2233_4455_6677);
        let text = guid.to_string();
        assert_eq!(text, "01234567-89ab-cdef-0011-223344556677");
        assert_eq!(text.parse::<Guid>().unwrap(), guid);
        assert_eq!(format!("{{{}}}", text).parse::<Guid>().unwrap(), guid);
    }

    #[test]
    fn test_tuid_text() {
        let tuid = Tuid(0xbeef);
        assert_eq!(tuid.to_string(), "0x000000000000BEEF");
        assert_eq!("0x000000000000BEEF".parse::<Tuid>().unwrap(), tuid);
        assert_eq!("48879".parse::<Tuid>().unwrap(), tuid);
        assert!("nope".parse::<Tuid>().is_err());
    }

    #[test]
    fn test_tuid_guid_bridge() {
        let tuid = Tuid(u64::MAX - 7);
        let guid = Guid::from_tuid(tuid);
        assert_eq!(Tuid::from_guid(guid), tuid);
    }

    #[test]
    fn test_guid_bytes() {
        let guid = Guid(42);
        assert_eq!(Guid::from_bytes(guid.to_bytes()), guid);
    }
}
