//! Color value types
//!
//! `Color3`/`Color4` hold 8-bit channels, `HdrColor3`/`HdrColor4` hold
//! unbounded floating point channels.

use std::fmt;
use std::str::FromStr;

use crate::parse::{parse_components, write_components, ParseError};

/// 8-bit RGB color
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color3 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// 8-bit RGBA color
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color4 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Floating point RGB color
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HdrColor3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Floating point RGBA color
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HdrColor4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color3 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Color4 {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl HdrColor3 {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl HdrColor4 {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Color3> for HdrColor3 {
    fn from(c: Color3) -> Self {
        Self::new(
            c.r as f32 / 255.0,
            c.g as f32 / 255.0,
            c.b as f32 / 255.0,
        )
    }
}

macro_rules! impl_text {
    ($ty:ident, $elem:ty, $n:literal, $name:literal, [$($field:ident),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_components(f, &[$(self.$field),+])
            }
        }

        impl FromStr for $ty {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let [$($field),+]: [$elem; $n] = parse_components(s, $name)?;
                Ok(Self { $($field),+ })
            }
        }
    };
}

impl_text!(Color3, u8, 3, "Color3", [r, g, b]);
impl_text!(Color4, u8, 4, "Color4", [r, g, b, a]);
impl_text!(HdrColor3, f32, 3, "HdrColor3", [r, g, b]);
impl_text!(HdrColor4, f32, 4, "HdrColor4", [r, g, b, a]);
