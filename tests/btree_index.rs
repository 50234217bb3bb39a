//! Integration tests for the composite-key primary index.

use std::collections::BTreeMap;

use fleetdb::index::BTreeValue;
use fleetdb::{BTree, CompositeKey, EntityKind, Error};
use proptest::prelude::*;
use tempfile::tempdir;

fn trip_key(id: u64) -> CompositeKey {
    CompositeKey::new(EntityKind::Trip, id, id, 0)
}

fn value(id: u64) -> BTreeValue {
    BTreeValue::new(4096 + id * 1024, 1024)
}

/// A thousand sequential trips: point lookup, an inclusive range and a
/// balanced tree of bounded height.
#[test]
fn test_thousand_sequential_trips() {
    let dir = tempdir().unwrap();
    let tree = BTree::create(dir.path().join("primary.idx"), 256).unwrap();

    for id in 1..=1000 {
        tree.insert(trip_key(id), value(id)).unwrap();
    }

    assert_eq!(tree.search(&trip_key(500)).unwrap(), Some(value(500)));
    assert_eq!(tree.search(&trip_key(1001)).unwrap(), None);

    let range = tree.range_query(&trip_key(100), &trip_key(200)).unwrap();
    assert_eq!(range.len(), 101);
    let ids: Vec<u64> = range.iter().map(|(k, _)| k.id).collect();
    assert_eq!(ids, (100..=200).collect::<Vec<_>>());

    // sequential keys always split the same way; ceil(log5 1000) = 5 bounds the height
    let shape = tree.verify().unwrap();
    assert_eq!(shape.entries, 1000);
    assert_eq!(shape.leaf_depth, shape.height);
    assert_eq!(tree.height(), 3);
    assert_eq!(shape.height, 3);
    assert_eq!(shape.leaf_count, 249);
    assert_eq!(shape.root_fanout, 9);
}

#[test]
fn test_entity_range_skips_other_kinds() {
    let dir = tempdir().unwrap();
    let tree = BTree::create(dir.path().join("primary.idx"), 32).unwrap();

    for id in 1..=50 {
        tree.insert(CompositeKey::new(EntityKind::Vehicle, id, 0, 0), value(id))
            .unwrap();
        tree.insert(CompositeKey::new(EntityKind::Trip, id, 10, 0), value(id))
            .unwrap();
        tree.insert(CompositeKey::new(EntityKind::Trip, id, 20, 0), value(id + 1))
            .unwrap();
    }

    let entries = tree
        .range_query(
            &CompositeKey::entity_start(EntityKind::Trip, 7),
            &CompositeKey::entity_end(EntityKind::Trip, 7),
        )
        .unwrap();
    let stamps: Vec<u64> = entries.iter().map(|(k, _)| k.timestamp).collect();
    assert_eq!(stamps, vec![10, 20]);
    assert!(entries.iter().all(|(k, _)| k.kind == EntityKind::Trip as u8));
}

#[test]
fn test_reopen_after_many_splits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("primary.idx");
    {
        let tree = BTree::create(&path, 8).unwrap();
        for id in (1..=400).rev() {
            tree.insert(trip_key(id), value(id)).unwrap();
        }
    }

    let tree = BTree::open(&path, 8).unwrap();
    assert_eq!(tree.total_records(), 400);
    assert_eq!(tree.search(&trip_key(1)).unwrap(), Some(value(1)));
    let all = tree.scan_all().unwrap();
    assert!(all.windows(2).all(|w| w[0].0 < w[1].0));
    tree.verify().unwrap();
}

#[test]
fn test_flipped_byte_is_detected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("primary.idx");
    {
        let tree = BTree::create(&path, 8).unwrap();
        for id in 1..=100 {
            tree.insert(trip_key(id), value(id)).unwrap();
        }
    }

    let mut bytes = std::fs::read(&path).unwrap();
    // inside the second node page, past its header
    bytes[2 * 4096 + 64] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();

    let result = BTree::open(&path, 8).and_then(|tree| tree.verify());
    assert!(matches!(result, Err(Error::CorruptFile(_))));
}

fn key_strategy() -> impl Strategy<Value = CompositeKey> {
    (1u8..=7, 0u64..40, 0u64..6, 0u32..3).prop_map(|(kind, id, ts, seq)| CompositeKey {
        kind,
        id,
        timestamp: ts,
        sequence: seq,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_matches_ordered_model(
        keys in prop::collection::vec(key_strategy(), 1..300),
        bounds in (key_strategy(), key_strategy()),
    ) {
        let dir = tempdir().unwrap();
        let tree = BTree::create(dir.path().join("p.idx"), 16).unwrap();
        let mut model: BTreeMap<CompositeKey, Vec<u64>> = BTreeMap::new();

        for (i, key) in keys.iter().enumerate() {
            let v = BTreeValue::new(i as u64, 1024);
            tree.insert(*key, v).unwrap();
            model.entry(*key).or_default().push(i as u64);
            // round-trip right after the insert
            let found = tree.search(key).unwrap().map(|v| v.offset);
            prop_assert_eq!(found, model[key].first().copied());
        }

        let (a, b) = bounds;
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let got: Vec<CompositeKey> = tree
            .range_query(&low, &high)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        let expected: Vec<CompositeKey> = model
            .range(low..=high)
            .flat_map(|(k, vs)| std::iter::repeat(*k).take(vs.len()))
            .collect();
        prop_assert_eq!(got, expected);

        let shape = tree.verify().unwrap();
        prop_assert_eq!(shape.entries, keys.len() as u64);
        prop_assert_eq!(shape.leaf_depth, shape.height);
    }
}
