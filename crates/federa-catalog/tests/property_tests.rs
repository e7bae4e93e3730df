//! Property-based tests for reconciliation invariants.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated partition sets.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use tokio_test::block_on;

use federa_catalog::layout::hive::{HiveLayout, PartitionInfo};
use federa_catalog::layout::LayoutRegistry;
use federa_catalog::partition::{partition_map, PartitionMap, UdbPartition};
use federa_catalog::reconciler::{diff_table, reconcile};
use federa_catalog::schema::{FieldSchema, Schema, SchemaError};
use federa_catalog::statistics::LongStats;
use federa_catalog::{CatalogStore, MemoryCatalogStore};
use federa_core::TableId;
use federa_test_utils::{long_stats, TestUdbTable};

/// Partition content: spec value mapped to a location variant and a null count.
fn arb_side() -> impl Strategy<Value = BTreeMap<u8, (u8, u8)>> {
    prop::collection::btree_map(any::<u8>(), (0u8..3, 0u8..3), 0..40)
}

fn build(side: &BTreeMap<u8, (u8, u8)>) -> PartitionMap {
    partition_map(side.iter().map(|(value, (location, nulls))| {
        let spec = format!("col1={value}");
        let info = PartitionInfo::new("db", "t", &spec)
            .with_location(format!("hdfs://nn/t/{spec}/v{location}"));
        let stats = long_stats(LongStats {
            num_nulls: u64::from(*nulls),
            ..LongStats::default()
        });
        UdbPartition::new(spec, HiveLayout::encode(&info).unwrap(), stats).unwrap()
    }))
    .unwrap()
}

fn keys(map: &PartitionMap) -> BTreeSet<String> {
    map.keys().cloned().collect()
}

proptest! {
    #[test]
    fn reconciling_identical_sides_is_empty(side in arb_side()) {
        let map = build(&side);
        let changes = reconcile(&map, &map.clone());
        prop_assert!(changes.is_empty());
        prop_assert_eq!(changes.unchanged.len(), map.len());
    }

    #[test]
    fn empty_previous_adds_all(side in arb_side()) {
        let current = build(&side);
        let changes = reconcile(&PartitionMap::new(), &current);
        let added: BTreeSet<String> = changes.added_specs().into_iter().map(String::from).collect();
        prop_assert_eq!(added, keys(&current));
        prop_assert!(changes.removed.is_empty());
    }

    #[test]
    fn empty_current_removes_all(side in arb_side()) {
        let previous = build(&side);
        let changes = reconcile(&previous, &PartitionMap::new());
        let removed: BTreeSet<String> = changes.removed.iter().cloned().collect();
        prop_assert_eq!(removed, keys(&previous));
        prop_assert!(changes.added.is_empty());
    }

    #[test]
    fn classes_partition_the_union_of_specs(previous in arb_side(), current in arb_side()) {
        let previous_map = build(&previous);
        let current_map = build(&current);
        let changes = reconcile(&previous_map, &current_map);

        let mut seen = BTreeSet::new();
        for spec in changes
            .added_specs()
            .into_iter()
            .chain(changes.updated_specs())
            .chain(changes.removed.iter().map(String::as_str))
            .chain(changes.unchanged.iter().map(String::as_str))
        {
            prop_assert!(seen.insert(spec.to_string()), "{} classified twice", spec);
        }
        let union: BTreeSet<String> = keys(&previous_map).union(&keys(&current_map)).cloned().collect();
        prop_assert_eq!(seen, union);

        for spec in &changes.unchanged {
            prop_assert_eq!(previous.get(&parse(spec)), current.get(&parse(spec)));
        }
        for spec in changes.updated_specs() {
            prop_assert_ne!(previous.get(&parse(spec)), current.get(&parse(spec)));
        }
    }

    #[test]
    fn applying_the_diff_reproduces_the_snapshot(previous in 0u32..20, current in 0u32..20) {
        block_on(async {
            let store = MemoryCatalogStore::new();
            let id = TableId::new("testdb", "t1").unwrap();

            let first = TestUdbTable::new("testdb", "t1", previous).build();
            store.apply_change_set(&id, None, diff_table(None, &first)).await.unwrap();

            let second = TestUdbTable::new("testdb", "t1", current)
                .with_partition_stats(
                    0,
                    long_stats(LongStats {
                        num_nulls: 1,
                        ..LongStats::default()
                    }),
                )
                .build();
            let record = store.load_table(&id).await.unwrap().unwrap();
            let change = diff_table(Some(&record), &second);
            if !change.is_noop() {
                store.apply_change_set(&id, Some(record.version), change).await.unwrap();
            }

            let after = store.load_table(&id).await.unwrap().unwrap();
            assert_eq!(&after.partitions, second.partitions());
            assert_eq!(&after.definition, second.definition());
        });
    }

    #[test]
    fn spec_is_a_pure_function_of_layout_bytes(name in "[a-z]{1,8}=[0-9]{1,4}") {
        let registry = LayoutRegistry::with_builtin();
        let layout = HiveLayout::encode(&PartitionInfo::new("db", "t", &name)).unwrap();
        let copy = federa_catalog::Layout::new(layout.layout_type(), layout.raw_data().clone());
        prop_assert_eq!(layout.spec(&registry).unwrap(), name.clone());
        prop_assert_eq!(copy.spec(&registry).unwrap(), name);
    }

    #[test]
    fn schemas_reject_shared_ids_and_names(id in 1u32..1000, name in "[a-z]{1,10}") {
        let shared_id = Schema::new(vec![
            FieldSchema::new(id, format!("{name}_a"), "int"),
            FieldSchema::new(id, format!("{name}_b"), "int"),
        ]);
        prop_assert!(
            matches!(shared_id, Err(SchemaError::DuplicateId { .. })),
            "expected a duplicate id error"
        );

        let shared_name = Schema::new(vec![
            FieldSchema::new(id, name.clone(), "int"),
            FieldSchema::new(id + 1, name, "string"),
        ]);
        prop_assert!(
            matches!(shared_name, Err(SchemaError::DuplicateName { .. })),
            "expected a duplicate name error"
        );
    }
}

fn parse(spec: &str) -> u8 {
    spec.trim_start_matches("col1=").parse().unwrap()
}
