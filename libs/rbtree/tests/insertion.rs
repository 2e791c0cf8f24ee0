mod common;

use rand::seq::SliceRandom;
use rbtree::{Color, Root};

use crate::common::{Pool, insert, keys, shape};

#[test]
fn sequential_inserts_build_canonical_tree() {
    let mut pool = Pool::default();
    let mut root = Root::new();

    for key in 1..=7 {
        insert(&mut root, pool.alloc(key));
        let black_height = root.validate().unwrap();
        assert!(black_height >= 1, "non-empty tree must have a black root");
    }

    //        2
    //       / \
    //      1   4
    //         / \
    //        3   6
    //           / \
    //          5   7
    assert_eq!(
        shape(&root),
        [
            (2, Color::Black),
            (1, Color::Black),
            (4, Color::Red),
            (3, Color::Black),
            (6, Color::Black),
            (5, Color::Red),
            (7, Color::Red),
        ]
    );
    assert_eq!(root.validate(), Ok(2));
    assert_eq!(keys(&root), (1..=7).collect::<Vec<_>>());
}

#[test]
fn descending_inserts_mirror_ascending() {
    let mut pool = Pool::default();
    let mut root = Root::new();

    for key in (1..=7).rev() {
        insert(&mut root, pool.alloc(key));
        root.assert_valid();
    }

    assert_eq!(
        shape(&root),
        [
            (6, Color::Black),
            (4, Color::Red),
            (2, Color::Black),
            (1, Color::Red),
            (3, Color::Red),
            (5, Color::Black),
            (7, Color::Black),
        ]
    );
}

#[test]
fn inner_grandchild_is_rotated_twice() {
    let mut pool = Pool::default();
    let mut root = Root::new();

    // 3 -> 1 -> 2 hits the inner-grandchild case
    for key in [3, 1, 2] {
        insert(&mut root, pool.alloc(key));
    }

    assert_eq!(
        shape(&root),
        [(2, Color::Black), (1, Color::Red), (3, Color::Red)]
    );
    root.assert_valid();
}

#[test]
fn random_inserts() {
    let mut pool = Pool::default();
    let mut root = Root::new();

    let mut nums = (0..500).collect::<Vec<_>>();
    nums.shuffle(&mut rand::rng());

    for &key in &nums {
        insert(&mut root, pool.alloc(key));
        root.assert_valid();
    }

    assert_eq!(keys(&root), (0..500).collect::<Vec<_>>());

    // a red-black tree with n nodes has a black-height of at most log2(n + 1)
    let black_height = root.validate().unwrap();
    assert!(black_height <= 9, "black-height {black_height} too large");
}
