//! Built-in Data classes and their aliases

use std::collections::{HashMap, HashSet};

use helium_types::{
    Color3, Color4, Guid, HdrColor3, HdrColor4, Matrix3, Matrix4, Path, Tuid, Vector2, Vector3,
    Vector4,
};
use paste::paste;

use super::{
    DynArrayData, MapData, ObjectMapData, ObjectSortedMapData, SetData, SimpleData,
    SortedMapData, SortedSetData,
};
use crate::object::{ObjectHandle, ObjectPtr};
use crate::rbtree::{SortedMap, SortedSet};
use crate::registry::Registry;

macro_rules! scalar_classes {
    ($($name:ident => $ty:ty),* $(,)?) => {
        paste! {
            $(
                pub type [<$name Data>] = SimpleData<$ty>;
                pub type [<$name DynArrayData>] = DynArrayData<$ty>;
            )*
        }

        fn register_scalars(registry: &Registry) {
            $(
                registry.register_data::<$ty>();
                registry.register_data::<Vec<$ty>>();
            )*
        }
    };
}

macro_rules! key_classes {
    ($($name:ident => $ty:ty),* $(,)?) => {
        paste! {
            $(
                pub type [<$name SetData>] = SetData<$ty>;
                pub type [<$name SortedSetData>] = SortedSetData<$ty>;
                pub type [<$name ObjectMapData>] = ObjectMapData<$ty>;
                pub type [<$name ObjectSortedMapData>] = ObjectSortedMapData<$ty>;
            )*
        }

        fn register_keys(registry: &Registry) {
            $(
                registry.register_data::<HashSet<$ty>>();
                registry.register_data::<SortedSet<$ty>>();
                registry.register_data::<HashMap<$ty, Option<ObjectPtr>>>();
                registry.register_data::<SortedMap<$ty, Option<ObjectPtr>>>();
            )*
        }
    };
}

macro_rules! map_classes {
    ($($key:ident => $k:ty, $value:ident => $v:ty);* $(;)?) => {
        paste! {
            $(
                pub type [<$key $value MapData>] = MapData<$k, $v>;
                pub type [<$key $value SortedMapData>] = SortedMapData<$k, $v>;
            )*
        }

        fn register_maps(registry: &Registry) {
            $(
                registry.register_data::<HashMap<$k, $v>>();
                registry.register_data::<SortedMap<$k, $v>>();
            )*
        }
    };
}

scalar_classes!(
    Bool => bool,
    UInt8 => u8,
    Int8 => i8,
    UInt16 => u16,
    Int16 => i16,
    UInt32 => u32,
    Int32 => i32,
    UInt64 => u64,
    Int64 => i64,
    Float32 => f32,
    Float64 => f64,
    String => String,
    Guid => Guid,
    Tuid => Tuid,
    Path => Path,
    Vector2 => Vector2,
    Vector3 => Vector3,
    Vector4 => Vector4,
    Matrix3 => Matrix3,
    Matrix4 => Matrix4,
    Color3 => Color3,
    Color4 => Color4,
    HdrColor3 => HdrColor3,
    HdrColor4 => HdrColor4,
);

key_classes!(
    UInt8 => u8,
    Int8 => i8,
    UInt16 => u16,
    Int16 => i16,
    UInt32 => u32,
    Int32 => i32,
    UInt64 => u64,
    Int64 => i64,
    String => String,
    Guid => Guid,
    Tuid => Tuid,
    Path => Path,
);

map_classes!(
    String => String, String => String;
    String => String, Bool => bool;
    String => String, UInt32 => u32;
    String => String, Int32 => i32;
    String => String, Float32 => f32;
    String => String, Float64 => f64;
    String => String, Guid => Guid;
    String => String, Tuid => Tuid;
    UInt32 => u32, String => String;
    UInt32 => u32, UInt32 => u32;
    UInt32 => u32, Int32 => i32;
    UInt32 => u32, UInt64 => u64;
    Int32 => i32, String => String;
    Int32 => i32, Int32 => i32;
    UInt64 => u64, String => String;
    UInt64 => u64, UInt64 => u64;
    Int64 => i64, Int64 => i64;
    Guid => Guid, UInt32 => u32;
    Guid => Guid, Matrix4 => Matrix4;
    Tuid => Tuid, UInt32 => u32;
    Tuid => Tuid, Matrix4 => Matrix4;
    Tuid => Tuid, String => String;
);

/// Register every built-in class with `registry`
pub(crate) fn register_builtin_data(registry: &Registry) {
    register_scalars(registry);
    register_keys(registry);
    register_maps(registry);

    registry.register_data::<Option<ObjectPtr>>();
    registry.register_data::<Vec<Option<ObjectPtr>>>();
    registry.register_data::<HashSet<ObjectHandle>>();
}
