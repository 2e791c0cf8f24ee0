use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::pin::Pin;
use std::ptr::NonNull;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::seq::SliceRandom;
use rbtree::{Augment, Callbacks, Compute, Link, Links, NoAugment, Root, Side};

struct Entry {
    value: usize,
    size: Cell<usize>,
    links: Links<Self>,
}
rbtree::linked!(Entry, links);

impl Entry {
    pub fn new(value: usize) -> Self {
        Self {
            value,
            size: Cell::new(1),
            links: Links::new(),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

struct SubtreeSize;

fn size(link: Link<Entry>) -> usize {
    link.map_or(0, |node| unsafe { node.as_ref() }.size.get())
}

impl Compute<Entry> for SubtreeSize {
    unsafe fn compute(node: NonNull<Entry>) -> bool {
        let entry = unsafe { node.as_ref() };
        let size = 1 + size(entry.links.left()) + size(entry.links.right());
        entry.size.replace(size) != size
    }

    unsafe fn copy(old: NonNull<Entry>, new: NonNull<Entry>) {
        unsafe { new.as_ref().size.set(old.as_ref().size.get()) };
    }
}

fn insert<A: Augment<Entry>>(root: &mut Root<Entry>, node: NonNull<Entry>) {
    let value = unsafe { node.as_ref() }.value;
    let mut parent = None;
    let mut side = Side::Left;
    let mut curr = root.node();

    while let Some(c) = curr {
        let entry = unsafe { c.as_ref() };
        // only read back by the augmented variant
        entry.size.set(entry.size.get() + 1);
        parent = Some(c);
        side = match value.cmp(&entry.value) {
            Ordering::Less => Side::Left,
            _ => Side::Right,
        };
        curr = entry.links.child(side);
    }

    unsafe {
        root.link_node(node, parent, side);
        root.insert_augmented::<A>(node);
    }
}

fn rbtree<A: Augment<Entry>>(inserts: &[usize], deletes: &[usize]) {
    // indexed by value
    let entries: Vec<Pin<Box<Entry>>> = (0..inserts.len())
        .map(|i| Box::pin(Entry::new(i)))
        .collect();
    let mut root: Root<Entry> = Root::new();

    for i in inserts {
        insert::<A>(&mut root, NonNull::from(&*entries[*i]));
    }

    for i in deletes {
        unsafe { root.erase_augmented::<A>(NonNull::from(&*entries[*i])) };
    }
}

fn bench_inserts_deletes(c: &mut Criterion) {
    let mut rng = rand::rng();

    let mut nums = (0..700).collect::<Vec<_>>();
    nums.shuffle(&mut rng);
    let inserts = nums.clone();
    nums.shuffle(&mut rng);
    let deletes = nums;

    c.bench_function("Insertions & Deletions", |b| {
        b.iter(|| rbtree::<NoAugment>(&inserts, &deletes))
    });
    c.bench_function("Augmented Insertions & Deletions", |b| {
        b.iter(|| rbtree::<Callbacks<SubtreeSize>>(&inserts, &deletes))
    });
}

criterion_group!(benches, bench_inserts_deletes);
criterion_main!(benches);
