//! Cast table and typed value access

mod common;

use std::collections::{HashMap, HashSet};

use common::{context, material, TrackedObject};
use helium_reflect::data::{create_with, Data, DataClass, DataFlags, ScalarKind};
use helium_reflect::types::{Guid, Tuid};
use helium_reflect::{object_ptr, ptr_eq, ObjectPtr, Reflect, SortedMap, SortedSet};

const NUMERIC: [ScalarKind; 10] = [
    ScalarKind::UInt8,
    ScalarKind::Int8,
    ScalarKind::UInt16,
    ScalarKind::Int16,
    ScalarKind::UInt32,
    ScalarKind::Int32,
    ScalarKind::UInt64,
    ScalarKind::Int64,
    ScalarKind::Float32,
    ScalarKind::Float64,
];

#[test]
fn test_numeric_casts_are_symmetric() {
    let ctx = context();
    for a in NUMERIC {
        for b in NUMERIC {
            let (a, b) = (DataClass::Scalar(a), DataClass::Scalar(b));
            assert!(ctx.cast_supported(a, b), "{} -> {}", a, b);
            assert!(ctx.cast_supported(b, a), "{} -> {}", b, a);
        }
    }
    assert!(!ctx.cast_supported(
        DataClass::Scalar(ScalarKind::String),
        DataClass::Scalar(ScalarKind::Int32)
    ));
}

#[test]
fn test_saturating_policy() {
    let ctx = context();

    let minus_one = create_with(-1i32);
    assert_eq!(ctx.get_value::<u8>(&*minus_one), Some(0));
    let big = create_with(70_000i64);
    assert_eq!(ctx.get_value::<i16>(&*big), Some(i16::MAX));
    let float = create_with(-3.9f64);
    assert_eq!(ctx.get_value::<i32>(&*float), Some(-3));
    let nan = create_with(f32::NAN);
    assert_eq!(ctx.get_value::<u64>(&*nan), Some(0));

    // Lossless round trip for representable values
    let value = create_with(123_456i32);
    let wide = ctx.get_value::<u64>(&*value).unwrap();
    let back = create_with(wide);
    assert_eq!(ctx.get_value::<i32>(&*back), Some(123_456));
}

#[test]
fn test_id_bridges() {
    let ctx = context();

    let raw = create_with(0x1234u64);
    let tuid = ctx.get_value::<Tuid>(&*raw).unwrap();
    assert_eq!(tuid, Tuid::new(0x1234));

    let tuid = create_with(tuid);
    let guid = ctx.get_value::<Guid>(&*tuid).unwrap();
    assert_eq!(guid, Guid::from_tuid(Tuid::new(0x1234)));

    let guid = create_with(guid);
    assert_eq!(ctx.get_value::<Tuid>(&*guid), Some(Tuid::new(0x1234)));
    assert_eq!(ctx.get_value::<u64>(&*guid), None);
}

#[test]
fn test_container_casts() {
    let ctx = context();

    let src = create_with(vec![-5i32, 10, 300]);
    let mut dest = create_with(Vec::<u8>::new());
    assert!(ctx.cast_value(&*src, &mut *dest, DataFlags::empty()));
    assert_eq!(ctx.get_value::<Vec<u8>>(&*dest), Some(vec![0, 10, 255]));

    let src = create_with(HashSet::from([1u16, 2, 3]));
    let sorted = ctx.get_value::<SortedSet<u64>>(&*src).unwrap();
    assert_eq!(sorted.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

    let src = create_with(HashMap::from([(1u32, 1.5f64), (2, -8.0)]));
    let map = ctx.get_value::<SortedMap<u8, i16>>(&*src).unwrap();
    assert_eq!(
        map.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(),
        vec![(1, 1), (2, -8)]
    );
}

#[test]
fn test_failed_container_cast_leaves_destination() {
    let ctx = context();

    let src = create_with(vec!["1".to_string(), "x".to_string()]);
    let mut dest = create_with(vec![7u32]);
    assert!(!ctx.cast_value(&*src, &mut *dest, DataFlags::empty()));
    assert_eq!(ctx.get_value::<Vec<u32>>(&*dest), Some(vec![7]));

    let src = create_with(HashMap::from([("a".to_string(), 1i32)]));
    let mut dest = create_with(HashMap::from([(9u32, 9i32)]));
    assert!(!ctx.cast_value(&*src, &mut *dest, DataFlags::empty()));
    assert_eq!(
        ctx.get_value::<HashMap<u32, i32>>(&*dest),
        Some(HashMap::from([(9, 9)]))
    );

    // Different container families never convert
    let src = create_with(vec![1u32]);
    let mut dest = create_with(HashSet::<u32>::new());
    assert!(!ctx.cast_value(&*src, &mut *dest, DataFlags::empty()));
}

/// Accepts only decimal text
fn parse_u32(src: &dyn Data, dest: &mut dyn Data) -> bool {
    let text = src.to_text();
    text.parse::<u32>().is_ok() && dest.from_text(&text)
}

#[test]
fn test_late_item_failure_leaves_destination() {
    let mut ctx = context();
    let (string, uint) = (
        DataClass::Scalar(ScalarKind::String),
        DataClass::Scalar(ScalarKind::UInt32),
    );
    ctx.casts_mut().register(string, uint, parse_u32);
    assert!(ctx.cast_supported(
        DataClass::DynArray(ScalarKind::String),
        DataClass::DynArray(ScalarKind::UInt32)
    ));

    // The first items convert, the last does not
    let src = create_with(vec!["1".to_string(), "2".to_string(), "x".to_string()]);
    let mut dest = create_with(vec![7u32]);
    assert!(!ctx.cast_value(&*src, &mut *dest, DataFlags::empty()));
    assert_eq!(ctx.get_value::<Vec<u32>>(&*dest), Some(vec![7]));

    let src = create_with(HashSet::from(["1".to_string(), "2".to_string(), "x".to_string()]));
    let mut dest = create_with(HashSet::from([7u32]));
    assert!(!ctx.cast_value(&*src, &mut *dest, DataFlags::empty()));
    assert_eq!(ctx.get_value::<HashSet<u32>>(&*dest), Some(HashSet::from([7])));

    let src = create_with(HashMap::from([
        ("1".to_string(), 1i32),
        ("2".to_string(), 2),
        ("x".to_string(), 3),
    ]));
    let mut kept = SortedMap::<u32, i32>::new();
    kept.insert(9, 9);
    let mut dest = create_with(kept);
    assert!(!ctx.cast_value(&*src, &mut *dest, DataFlags::empty()));
    let kept = ctx.get_value::<SortedMap<u32, i32>>(&*dest).unwrap();
    assert_eq!(kept.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(), vec![(9, 9)]);

    let src = create_with(vec!["4".to_string(), "5".to_string()]);
    let mut dest = create_with(vec![7u32]);
    assert!(ctx.cast_value(&*src, &mut *dest, DataFlags::empty()));
    assert_eq!(ctx.get_value::<Vec<u32>>(&*dest), Some(vec![4, 5]));
}

#[test]
fn test_object_map_keys_convert() {
    let ctx = context();
    let shared = material("keyed.png");
    let src = create_with(HashMap::from([(3u32, Some(shared.clone())), (1, None)]));
    assert!(ctx.cast_supported(
        DataClass::ObjectMap(ScalarKind::UInt32),
        DataClass::ObjectSortedMap(ScalarKind::UInt64)
    ));

    let mut dest = create_with(SortedMap::<u64, Option<ObjectPtr>>::new());
    assert!(ctx.cast_value(&*src, &mut *dest, DataFlags::SHALLOW));
    let shallow = ctx
        .get_value::<SortedMap<u64, Option<ObjectPtr>>>(&*dest)
        .unwrap();
    assert_eq!(shallow.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![1, 3]);
    assert!(shallow.get(&1).unwrap().is_none());
    assert!(ptr_eq(shallow.get(&3).unwrap().as_ref().unwrap(), &shared));

    let mut deep = create_with(SortedMap::<u64, Option<ObjectPtr>>::new());
    assert!(ctx.cast_value(&*src, &mut *deep, DataFlags::empty()));
    let deep = ctx
        .get_value::<SortedMap<u64, Option<ObjectPtr>>>(&*deep)
        .unwrap();
    let copied = deep.get(&3).unwrap().as_ref().unwrap();
    assert!(!ptr_eq(copied, &shared));
    assert!(copied.read().equals(&*shared.read()));

    // Object references never become scalars
    let mut scalars = create_with(HashMap::<u32, u32>::new());
    assert!(!ctx.cast_value(&*src, &mut *scalars, DataFlags::empty()));
}

#[test]
fn test_set_value_converts() {
    let ctx = context();
    let mut data = create_with(0u8);
    assert!(ctx.set_value(&mut *data, 1000i32));
    assert_eq!(ctx.get_value::<u8>(&*data), Some(255));
    assert!(!ctx.set_value(&mut *data, "text".to_string()));
    assert_eq!(ctx.get_value::<u8>(&*data), Some(255));
}

#[test]
fn test_field_values_notify() {
    let ctx = context();
    let object = object_ptr(TrackedObject::default());
    let field = TrackedObject::composite().find_field("value").unwrap();

    let mut guard = object.write();
    assert!(ctx.set_field_value(&mut *guard, field, 12.7f32));
    assert_eq!(ctx.get_field_value::<i32>(&*guard, field), Some(12));
    assert_eq!(ctx.get_field_value::<f64>(&*guard, field), Some(12.0));

    let tracked = guard.downcast_ref::<TrackedObject>().unwrap();
    assert_eq!(tracked.events, vec!["changed value"]);
}
