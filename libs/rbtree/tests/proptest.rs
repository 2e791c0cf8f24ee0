mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;
use rbtree::Root;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

use crate::common::{Pool, assert_sizes, erase, erase_sized, find, insert, insert_sized, keys, select};

#[derive(Debug, Clone, Copy)]
enum Op {
    Insert(usize),
    Erase(usize),
}

fn ops(len: impl Into<proptest::collection::SizeRange>) -> impl Strategy<Value = Vec<Op>> {
    // a small key space so erasures regularly hit present keys
    proptest::collection::vec(
        prop_oneof![
            3 => (0..128usize).prop_map(Op::Insert),
            2 => (0..128usize).prop_map(Op::Erase),
        ],
        len,
    )
}

proptest! {
    #[test]
    fn matches_btreeset(ops in ops(1..500)) {
        let _trace = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .set_default();

        let mut pool = Pool::default();
        let mut root = Root::new();
        let mut model = BTreeSet::new();

        for op in ops {
            tracing::debug!(?op, "applying");
            match op {
                Op::Insert(key) => {
                    if model.insert(key) {
                        insert(&mut root, pool.alloc(key));
                    }
                }
                Op::Erase(key) => {
                    if model.remove(&key) {
                        let node = erase(&mut root, key);
                        prop_assert!(!common::links(node).is_linked());
                    }
                }
            }

            prop_assert_eq!(root.validate().map(|_| ()), Ok(()));
            prop_assert_eq!(keys(&root), model.iter().copied().collect::<Vec<_>>());
        }

        let mut rev: Vec<_> = root.iter().rev().map(|entry| entry.key).collect();
        rev.reverse();
        prop_assert_eq!(rev, keys(&root));
    }

    #[test]
    fn augmented_matches_btreeset(ops in ops(1..500)) {
        let mut pool = Pool::default();
        let mut root = Root::new();
        let mut model = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(key) => {
                    if model.insert(key) {
                        insert_sized(&mut root, pool.alloc(key));
                    }
                }
                Op::Erase(key) => {
                    if model.remove(&key) {
                        erase_sized(&mut root, key);
                    }
                }
            }

            root.assert_valid();
            assert_sizes(&root);
        }

        for (index, key) in model.iter().enumerate() {
            prop_assert_eq!(select(&root, index).map(common::key), Some(*key));
        }
        prop_assert!(select(&root, model.len()).is_none());
        for key in 0..128 {
            prop_assert_eq!(find(&root, key).is_some(), model.contains(&key));
        }
    }

    #[test]
    fn drain_yields_every_node(keys_in in proptest::collection::btree_set(0..10_000usize, 0..300)) {
        let mut pool = Pool::default();
        let mut root = Root::new();
        for &key in &keys_in {
            insert(&mut root, pool.alloc(key));
        }

        let mut drained: Vec<_> = root
            .drain()
            .map(|node| {
                assert!(!common::links(node).is_linked());
                common::key(node)
            })
            .collect();
        drained.sort_unstable();

        prop_assert!(root.is_empty());
        prop_assert_eq!(drained, keys_in.into_iter().collect::<Vec<_>>());
    }
}
