//! Property tests comparing the sorted containers against std

use std::collections::{BTreeMap, BTreeSet};

use helium_reflect::{SortedMap, SortedSet};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(u16),
    Remove(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u16..512).prop_map(Op::Insert),
        2 => (0u16..512).prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_set_matches_btreeset(ops in prop::collection::vec(op_strategy(), 0..400)) {
        let mut set = SortedSet::<u16>::new();
        let mut model = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(key) => prop_assert_eq!(set.insert(key), model.insert(key)),
                Op::Remove(key) => prop_assert_eq!(set.remove(&key), model.remove(&key)),
            }
            prop_assert!(set.verify());
        }

        prop_assert_eq!(set.len(), model.len());
        prop_assert!(set.iter().copied().eq(model.iter().copied()));
        prop_assert_eq!(set.first(), model.first());
        prop_assert_eq!(set.last(), model.last());
    }

    #[test]
    fn prop_map_matches_btreemap(
        entries in prop::collection::vec((0u8..64, any::<i32>()), 0..200),
        removals in prop::collection::vec(0u8..64, 0..64),
    ) {
        let mut map = SortedMap::<u8, i32>::new();
        let mut model = BTreeMap::new();

        for (key, value) in entries {
            prop_assert_eq!(map.insert(key, value), model.insert(key, value));
        }
        for key in removals {
            prop_assert_eq!(map.remove(&key), model.remove(&key));
        }

        prop_assert!(map.verify());
        prop_assert!(map.iter().eq(model.iter()));
        prop_assert!(map.iter().rev().eq(model.iter().rev()));
    }

    #[test]
    fn prop_clear_and_reuse(keys in prop::collection::vec(any::<u32>(), 1..100)) {
        let mut set = SortedSet::<u32>::new();
        for &key in &keys {
            set.insert(key);
        }
        set.clear();
        prop_assert!(set.is_empty());

        for &key in keys.iter().rev() {
            set.insert(key);
        }
        set.trim();
        prop_assert!(set.verify());
        prop_assert!(keys.iter().all(|key| set.contains(key)));
    }
}
