//! Conversions between Data classes
//!
//! Conversion is resolved in order:
//!
//! 1. Identical classes copy with [`Data::set`]
//! 2. A registered cast for the exact `(source, destination)` pair
//! 3. Containers of the same family (array, set, map; hash and sorted variants
//!    count as one family) convert element by element
//!
//! Numeric casts saturate: integers clamp to the destination range, floats
//! truncate toward zero when narrowed to integers and NaN becomes zero.
//! Container casts are all or nothing; if any element fails the destination is
//! left unchanged.

use std::collections::HashMap;

use helium_types::{Guid, Tuid};
use tracing::trace;

use super::{
    ArrayContainer, ContainerMut, ContainerRef, Data, DataClass, DataFlags, MapContainer, Scalar,
    ScalarKind, SetContainer, SimpleData,
};
use crate::context::ReflectionContext;

/// A registered conversion, returning `false` if the inputs are not the
/// expected classes
pub type CastFn = fn(&dyn Data, &mut dyn Data) -> bool;

/// Lookup of scalar conversions by class pair
#[derive(Clone, Default)]
pub struct CastTable {
    casts: HashMap<(DataClass, DataClass), CastFn>,
}

impl CastTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Every numeric pair plus the `UInt64`/`Tuid` and `Tuid`/`Guid` bridges
    pub fn with_builtin() -> Self {
        let mut table = Self::new();
        table.register_from::<u8>();
        table.register_from::<i8>();
        table.register_from::<u16>();
        table.register_from::<i16>();
        table.register_from::<u32>();
        table.register_from::<i32>();
        table.register_from::<u64>();
        table.register_from::<i64>();
        table.register_from::<f32>();
        table.register_from::<f64>();

        table.register_bridge::<u64, Tuid>();
        table.register_bridge::<Tuid, u64>();
        table.register_bridge::<Tuid, Guid>();
        table.register_bridge::<Guid, Tuid>();
        table
    }

    pub fn register(&mut self, src: DataClass, dest: DataClass, cast: CastFn) {
        self.casts.insert((src, dest), cast);
    }

    pub fn get(&self, src: DataClass, dest: DataClass) -> Option<CastFn> {
        self.casts.get(&(src, dest)).copied()
    }

    pub fn contains(&self, src: DataClass, dest: DataClass) -> bool {
        self.casts.contains_key(&(src, dest))
    }

    pub fn len(&self) -> usize {
        self.casts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.casts.is_empty()
    }

    /// Every numeric destination for source `S`
    fn register_from<S: Numeric>(&mut self) {
        self.register_numeric::<S, u8>();
        self.register_numeric::<S, i8>();
        self.register_numeric::<S, u16>();
        self.register_numeric::<S, i16>();
        self.register_numeric::<S, u32>();
        self.register_numeric::<S, i32>();
        self.register_numeric::<S, u64>();
        self.register_numeric::<S, i64>();
        self.register_numeric::<S, f32>();
        self.register_numeric::<S, f64>();
    }

    fn register_numeric<S: Numeric, D: Numeric>(&mut self) {
        if S::KIND != D::KIND {
            self.register(
                DataClass::Scalar(S::KIND),
                DataClass::Scalar(D::KIND),
                cast_numeric::<S, D>,
            );
        }
    }

    fn register_bridge<S: Bridge<D>, D: Scalar>(&mut self) {
        self.register(
            DataClass::Scalar(S::KIND),
            DataClass::Scalar(D::KIND),
            cast_bridge::<S, D>,
        );
    }
}

impl std::fmt::Debug for CastTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CastTable")
            .field("casts", &self.casts.len())
            .finish()
    }
}

/// Common representation for numeric conversion
#[derive(Debug, Clone, Copy)]
enum Wide {
    Int(i128),
    Float(f64),
}

trait Numeric: Scalar + Copy {
    fn widen(self) -> Wide;

    fn narrow(wide: Wide) -> Self;
}

macro_rules! impl_numeric_int {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                fn widen(self) -> Wide {
                    Wide::Int(self as i128)
                }

                fn narrow(wide: Wide) -> Self {
                    match wide {
                        Wide::Int(v) => v.clamp(<$ty>::MIN as i128, <$ty>::MAX as i128) as $ty,
                        // `as` saturates and maps NaN to zero
                        Wide::Float(v) => v as $ty,
                    }
                }
            }
        )*
    };
}

impl_numeric_int!(u8, i8, u16, i16, u32, i32, u64, i64);

impl Numeric for f32 {
    fn widen(self) -> Wide {
        Wide::Float(self as f64)
    }

    fn narrow(wide: Wide) -> Self {
        match wide {
            Wide::Int(v) => v as f32,
            Wide::Float(v) => v as f32,
        }
    }
}

impl Numeric for f64 {
    fn widen(self) -> Wide {
        Wide::Float(self)
    }

    fn narrow(wide: Wide) -> Self {
        match wide {
            Wide::Int(v) => v as f64,
            Wide::Float(v) => v,
        }
    }
}

fn cast_numeric<S: Numeric, D: Numeric>(src: &dyn Data, dest: &mut dyn Data) -> bool {
    let Some(src) = src.downcast_ref::<SimpleData<S>>() else {
        return false;
    };
    let Some(dest) = dest.downcast_mut::<SimpleData<D>>() else {
        return false;
    };
    dest.set_value(D::narrow(src.get().widen()));
    true
}

/// Lossless conversion between identifier-like scalars
trait Bridge<D: Scalar>: Scalar {
    fn convert(&self) -> D;
}

fn cast_bridge<S: Bridge<D>, D: Scalar>(src: &dyn Data, dest: &mut dyn Data) -> bool {
    let Some(src) = src.downcast_ref::<SimpleData<S>>() else {
        return false;
    };
    let Some(dest) = dest.downcast_mut::<SimpleData<D>>() else {
        return false;
    };
    dest.set_value(src.get().convert());
    true
}

macro_rules! impl_bridge {
    ($($src:ty => $dest:ty: |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl Bridge<$dest> for $src {
                fn convert(&self) -> $dest {
                    let $v = self;
                    $body
                }
            }
        )*
    };
}

impl_bridge!(
    u64 => Tuid: |v| Tuid(*v),
    Tuid => u64: |v| v.0,
    Tuid => Guid: |v| Guid::from_tuid(*v),
    Guid => Tuid: |v| Tuid::from_guid(*v),
);

/// Whether a value of class `src` can be converted to `dest`
pub(crate) fn cast_supported(table: &CastTable, src: DataClass, dest: DataClass) -> bool {
    use DataClass::*;

    if src == dest || table.contains(src, dest) {
        return true;
    }
    let scalar = |a: ScalarKind, b: ScalarKind| a == b || table.contains(Scalar(a), Scalar(b));
    match (src, dest) {
        (DynArray(a), DynArray(b)) => scalar(a, b),
        (Set(a) | SortedSet(a), Set(b) | SortedSet(b)) => scalar(a, b),
        (Map(ka, va) | SortedMap(ka, va), Map(kb, vb) | SortedMap(kb, vb)) => {
            scalar(ka, kb) && scalar(va, vb)
        }
        (ObjectMap(a) | ObjectSortedMap(a), ObjectMap(b) | ObjectSortedMap(b)) => scalar(a, b),
        _ => false,
    }
}

/// Convert `src` into `dest`, returning whether the destination was written
pub(crate) fn cast_value(
    ctx: &ReflectionContext,
    src: &dyn Data,
    dest: &mut dyn Data,
    flags: DataFlags,
) -> bool {
    let (src_class, dest_class) = (src.data_class(), dest.data_class());
    if src_class == dest_class {
        return dest.set(src, flags);
    }
    if let Some(cast) = ctx.casts().get(src_class, dest_class) {
        return cast(src, dest);
    }

    if src.as_container().is_none() || dest.as_container().is_none() {
        trace!("No conversion from {} to {}", src_class, dest_class);
        return false;
    }

    // Items land in a scratch copy; `dest` is only written once all of them convert
    let mut scratch = dest.clone_data();
    let converted = match (src.as_container(), scratch.as_container_mut()) {
        (Some(ContainerRef::Array(src)), Some(ContainerMut::Array(scratch))) => {
            cast_array(ctx, src, scratch, flags)
        }
        (Some(ContainerRef::Set(src)), Some(ContainerMut::Set(scratch))) => {
            cast_set(ctx, src, scratch, flags)
        }
        (Some(ContainerRef::Map(src)), Some(ContainerMut::Map(scratch))) => {
            cast_map(ctx, src, scratch, flags)
        }
        _ => false,
    };
    if !converted {
        trace!("No conversion from {} to {}", src_class, dest_class);
        return false;
    }
    // References in the scratch copy were already copied per `flags`
    dest.set(&*scratch, DataFlags::SHALLOW)
}

fn cast_item(
    ctx: &ReflectionContext,
    item: &dyn Data,
    class: DataClass,
    flags: DataFlags,
) -> Option<Box<dyn Data>> {
    let mut target = ctx.registry().create_data(class)?;
    cast_value(ctx, item, &mut *target, flags).then_some(target)
}

fn cast_array(
    ctx: &ReflectionContext,
    src: &dyn ArrayContainer,
    dest: &mut dyn ArrayContainer,
    flags: DataFlags,
) -> bool {
    let class = dest.item_class();
    dest.clear();
    (0..src.len()).all(|index| {
        src.item(index)
            .and_then(|item| cast_item(ctx, &*item, class, flags))
            .is_some_and(|target| dest.push_item(&*target))
    })
}

fn cast_set(
    ctx: &ReflectionContext,
    src: &dyn SetContainer,
    dest: &mut dyn SetContainer,
    flags: DataFlags,
) -> bool {
    let class = dest.item_class();
    dest.clear();
    src.items().iter().all(|item| {
        cast_item(ctx, &**item, class, flags).is_some_and(|target| dest.add_item(&*target))
    })
}

fn cast_map(
    ctx: &ReflectionContext,
    src: &dyn MapContainer,
    dest: &mut dyn MapContainer,
    flags: DataFlags,
) -> bool {
    let (key_class, value_class) = (dest.key_class(), dest.value_class());
    dest.clear();
    src.items().iter().all(|(key, value)| {
        let key = cast_item(ctx, &**key, key_class, flags);
        let value = cast_item(ctx, &**value, value_class, flags);
        match (key, value) {
            (Some(key), Some(value)) => dest.set_item(&*key, &*value),
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{create_with, TypedData};

    fn cast<S: Scalar, D: Scalar>(value: S) -> Option<D> {
        let table = CastTable::with_builtin();
        let src = SimpleData::with_value(value);
        let mut dest = SimpleData::<D>::default();
        let cast = table.get(DataClass::Scalar(S::KIND), DataClass::Scalar(D::KIND))?;
        cast(&src, &mut dest).then(|| dest.get().clone())
    }

    #[test]
    fn test_table_size() {
        // 10 numeric kinds, every ordered pair of distinct kinds, plus 4 bridges
        assert_eq!(CastTable::with_builtin().len(), 10 * 9 + 4);
    }

    #[test]
    fn test_integer_casts_saturate() {
        assert_eq!(cast::<i32, u8>(-1), Some(0));
        assert_eq!(cast::<i32, u8>(300), Some(255));
        assert_eq!(cast::<u64, i64>(u64::MAX), Some(i64::MAX));
        assert_eq!(cast::<i64, i16>(-40_000), Some(i16::MIN));
        assert_eq!(cast::<u16, i32>(65_535), Some(65_535));
    }

    #[test]
    fn test_float_casts() {
        assert_eq!(cast::<f32, i32>(3.9), Some(3));
        assert_eq!(cast::<f64, u32>(-1.5), Some(0));
        assert_eq!(cast::<f32, u8>(f32::NAN), Some(0));
        assert_eq!(cast::<f64, i8>(1e9), Some(i8::MAX));
        assert_eq!(cast::<i32, f64>(-7), Some(-7.0));
        assert_eq!(cast::<f64, f32>(0.5), Some(0.5));
    }

    #[test]
    fn test_bridges() {
        assert_eq!(cast::<u64, Tuid>(0xABCD), Some(Tuid(0xABCD)));
        assert_eq!(cast::<Tuid, u64>(Tuid(9)), Some(9));
        assert_eq!(cast::<Tuid, Guid>(Tuid(5)), Some(Guid(5)));
        assert_eq!(
            cast::<Guid, Tuid>(Guid((7u128 << 64) | 3)),
            Some(Tuid(3))
        );
        assert_eq!(cast::<u32, Tuid>(1), None);
    }

    #[test]
    fn test_cast_fn_rejects_wrong_classes() {
        let table = CastTable::with_builtin();
        let cast = table
            .get(
                DataClass::Scalar(ScalarKind::Int32),
                DataClass::Scalar(ScalarKind::UInt8),
            )
            .unwrap();
        let src = create_with(1u64);
        let mut dest = SimpleData::<u8>::default();
        assert!(!cast(&*src, &mut dest));
        assert_eq!(*dest.value(), 0);
    }

    #[test]
    fn test_supported_container_casts() {
        use ScalarKind::*;
        let table = CastTable::with_builtin();
        assert!(cast_supported(&table, DataClass::DynArray(Int32), DataClass::DynArray(Float32)));
        assert!(cast_supported(&table, DataClass::Set(UInt8), DataClass::SortedSet(UInt64)));
        assert!(cast_supported(
            &table,
            DataClass::Map(UInt32, String),
            DataClass::SortedMap(Int64, String)
        ));
        assert!(!cast_supported(&table, DataClass::DynArray(String), DataClass::DynArray(Int32)));
        assert!(!cast_supported(&table, DataClass::DynArray(Int32), DataClass::Set(Int32)));
    }
}
