//! Helium Types - Leaf value types for the reflection core
//!
//! This crate contains the plain value types that reflected objects store in
//! their fields. It has no dependencies and compiles quickly, allowing parallel
//! compilation of dependent crates.
//!
//! Every type supports text insertion and extraction through [`std::fmt::Display`]
//! and [`std::str::FromStr`]. Binary encoding lives in the reflection crate.
//!
//! # Modules
//!
//! - [`math`] - Vectors and matrices
//! - [`color`] - Low and high dynamic range colors
//! - [`uid`] - 128-bit GUIDs and 64-bit TUIDs
//! - [`path`] - Normalized file paths

pub mod color;
pub mod math;
pub mod path;
pub mod uid;

mod parse;

pub use color::{Color3, Color4, HdrColor3, HdrColor4};
pub use math::{Matrix3, Matrix4, Vector2, Vector3, Vector4};
pub use parse::ParseError;
pub use path::Path;
pub use uid::{Guid, Tuid};
