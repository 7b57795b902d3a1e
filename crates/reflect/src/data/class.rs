//! Data class tags
//!
//! Every Data variant reports a [`DataClass`], a closed tag that replaces
//! runtime class pointers. The tag's [`name`](DataClass::name) is what archives
//! write to identify a value's type on the wire.

use std::fmt;

use crate::hash::hash_str;

/// Leaf value kinds that can be stored directly in a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Bool,
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float32,
    Float64,
    String,
    Guid,
    Tuid,
    Path,
    Vector2,
    Vector3,
    Vector4,
    Matrix3,
    Matrix4,
    Color3,
    Color4,
    HdrColor3,
    HdrColor4,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 24] = [
        Self::Bool,
        Self::UInt8,
        Self::Int8,
        Self::UInt16,
        Self::Int16,
        Self::UInt32,
        Self::Int32,
        Self::UInt64,
        Self::Int64,
        Self::Float32,
        Self::Float64,
        Self::String,
        Self::Guid,
        Self::Tuid,
        Self::Path,
        Self::Vector2,
        Self::Vector3,
        Self::Vector4,
        Self::Matrix3,
        Self::Matrix4,
        Self::Color3,
        Self::Color4,
        Self::HdrColor3,
        Self::HdrColor4,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::UInt8 => "UInt8",
            Self::Int8 => "Int8",
            Self::UInt16 => "UInt16",
            Self::Int16 => "Int16",
            Self::UInt32 => "UInt32",
            Self::Int32 => "Int32",
            Self::UInt64 => "UInt64",
            Self::Int64 => "Int64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::String => "String",
            Self::Guid => "Guid",
            Self::Tuid => "Tuid",
            Self::Path => "Path",
            Self::Vector2 => "Vector2",
            Self::Vector3 => "Vector3",
            Self::Vector4 => "Vector4",
            Self::Matrix3 => "Matrix3",
            Self::Matrix4 => "Matrix4",
            Self::Color3 => "Color3",
            Self::Color4 => "Color4",
            Self::HdrColor3 => "HdrColor3",
            Self::HdrColor4 => "HdrColor4",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Integer or floating point
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::UInt8
                | Self::Int8
                | Self::UInt16
                | Self::Int16
                | Self::UInt32
                | Self::Int32
                | Self::UInt64
                | Self::Int64
        )
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a container class, used to decide element-wise casts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Array,
    Set,
    Map,
}

/// Runtime type tag of a Data instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataClass {
    Scalar(ScalarKind),
    DynArray(ScalarKind),
    Set(ScalarKind),
    SortedSet(ScalarKind),
    Map(ScalarKind, ScalarKind),
    SortedMap(ScalarKind, ScalarKind),
    /// A single, possibly null, object reference
    Pointer,
    ObjectDynArray,
    ObjectSet,
    ObjectMap(ScalarKind),
    ObjectSortedMap(ScalarKind),
    /// A nested reflected structure, by composite name
    Structure(&'static str),
}

impl DataClass {
    /// Name written to archives, e.g. `UInt32StringMap`
    pub fn name(&self) -> String {
        match self {
            Self::Scalar(k) => k.name().to_string(),
            Self::DynArray(k) => format!("{}DynArray", k),
            Self::Set(k) => format!("{}Set", k),
            Self::SortedSet(k) => format!("{}SortedSet", k),
            Self::Map(k, v) => format!("{}{}Map", k, v),
            Self::SortedMap(k, v) => format!("{}{}SortedMap", k, v),
            Self::Pointer => "Pointer".to_string(),
            Self::ObjectDynArray => "ObjectDynArray".to_string(),
            Self::ObjectSet => "ObjectSet".to_string(),
            Self::ObjectMap(k) => format!("{}ObjectMap", k),
            Self::ObjectSortedMap(k) => format!("{}ObjectSortedMap", k),
            Self::Structure(name) => (*name).to_string(),
        }
    }

    /// FNV-1a hash of the name, the registry key for this class
    pub fn hash(&self) -> u32 {
        hash_str(&self.name())
    }

    /// Container family for value containers
    ///
    /// Object-holding containers return `None`: they only convert between
    /// identical classes.
    pub const fn container_kind(&self) -> Option<ContainerKind> {
        match self {
            Self::DynArray(_) => Some(ContainerKind::Array),
            Self::Set(_) | Self::SortedSet(_) => Some(ContainerKind::Set),
            Self::Map(..) | Self::SortedMap(..) => Some(ContainerKind::Map),
            _ => None,
        }
    }

    /// Whether values of this class can reference objects
    pub const fn may_hold_objects(&self) -> bool {
        matches!(
            self,
            Self::Pointer
                | Self::ObjectDynArray
                | Self::ObjectSet
                | Self::ObjectMap(_)
                | Self::ObjectSortedMap(_)
                | Self::Structure(_)
        )
    }

    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }
}

impl fmt::Display for DataClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_names_round_trip() {
        for kind in ScalarKind::ALL {
            assert_eq!(ScalarKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ScalarKind::from_name("Quaternion"), None);
    }

    #[test]
    fn test_class_names() {
        use ScalarKind::*;
        assert_eq!(DataClass::Scalar(UInt32).name(), "UInt32");
        assert_eq!(DataClass::DynArray(String).name(), "StringDynArray");
        assert_eq!(DataClass::Map(UInt32, String).name(), "UInt32StringMap");
        assert_eq!(DataClass::SortedMap(Guid, Matrix4).name(), "GuidMatrix4SortedMap");
        assert_eq!(DataClass::ObjectSortedMap(Tuid).name(), "TuidObjectSortedMap");
        assert_eq!(DataClass::Structure("Transform").name(), "Transform");
    }

    #[test]
    fn test_container_kinds() {
        use ScalarKind::*;
        assert_eq!(
            DataClass::Set(Int32).container_kind(),
            DataClass::SortedSet(UInt8).container_kind()
        );
        assert_eq!(DataClass::ObjectDynArray.container_kind(), None);
        assert!(DataClass::Pointer.may_hold_objects());
        assert!(!DataClass::DynArray(Bool).may_hold_objects());
    }
}
