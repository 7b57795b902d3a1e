//! Vector and matrix value types
//!
//! These are storage types only: the reflection core reads and writes them
//! as fixed-size runs of `f32` and never performs arithmetic on them.

use std::fmt;
use std::str::FromStr;

use crate::parse::{parse_components, write_components, ParseError};

/// Two component vector
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

/// Three component vector
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Four component vector
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vector2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }

    pub const fn from_array(a: [f32; 2]) -> Self {
        Self::new(a[0], a[1])
    }
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub const fn from_array(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }
}

impl Vector4 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub const fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    pub const fn from_array(a: [f32; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }
}

/// Row-major 3x3 matrix
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3 {
    pub m: [f32; 9],
}

/// Row-major 4x4 matrix
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4 {
    pub m: [f32; 16],
}

impl Matrix3 {
    pub const IDENTITY: Self = Self {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    pub const fn from_array(m: [f32; 9]) -> Self {
        Self { m }
    }

    /// Element at `row`, `col`
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.m[row * 3 + col]
    }
}

impl Matrix4 {
    pub const IDENTITY: Self = Self {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub const fn from_array(m: [f32; 16]) -> Self {
        Self { m }
    }

    /// Element at `row`, `col`
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.m[row * 4 + col]
    }

    /// Matrix with the given translation in the last row
    pub fn from_translation(t: Vector3) -> Self {
        let mut m = Self::IDENTITY;
        m.m[12] = t.x;
        m.m[13] = t.y;
        m.m[14] = t.z;
        m
    }
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

macro_rules! impl_text {
    ($ty:ident, $n:literal, $name:literal, |$v:ident| $to:expr, |$a:ident| $from:expr) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let $v = self;
                write_components(f, &$to)
            }
        }

        impl FromStr for $ty {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let $a: [f32; $n] = parse_components(s, $name)?;
                Ok($from)
            }
        }
    };
}

impl_text!(Vector2, 2, "Vector2", |v| v.to_array(), |a| Vector2::from_array(a));
impl_text!(Vector3, 3, "Vector3", |v| v.to_array(), |a| Vector3::from_array(a));
impl_text!(Vector4, 4, "Vector4", |v| v.to_array(), |a| Vector4::from_array(a));
impl_text!(Matrix3, 9, "Matrix3", |v| v.m, |a| Matrix3::from_array(a));
impl_text!(Matrix4, 16, "Matrix4", |v| v.m, |a| Matrix4::from_array(a));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_text_round_trip() {
        let v = Vector3::new(1.5, -2.0, 0.25);
        let text = v.to_string();
        assert_eq!(text, "1.5, -2, 0.25");
        assert_eq!(text.parse::<Vector3>().unwrap(), v);
    }

    #[test]
    fn test_matrix_text_round_trip() {
        let m = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        let parsed: Matrix4 = m.to_string().parse().unwrap();
        assert_eq!(parsed, m);
        assert_eq!(parsed.get(3, 1), 2.0);
    }

    #[test]
    fn test_matrix_default_is_identity() {
        assert_eq!(Matrix3::default(), Matrix3::IDENTITY);
        assert_eq!(Matrix4::default().get(2, 2), 1.0);
    }

    #[test]
    fn test_vector_parse_error() {
        let err = "1, 2".parse::<Vector3>().unwrap_err();
        assert_eq!(err.kind(), "Vector3");
    }
}
