#![allow(unused, reason = "not used by all tests")]

use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::pin::Pin;
use std::ptr::NonNull;

use rbtree::{Callbacks, Color, Compute, Link, Linked, Links, Root, Side};

/// A record indexed by `key`, caching the size of the subtree it roots.
pub struct Entry {
    pub key: usize,
    pub size: Cell<usize>,
    pub links: Links<Self>,
}
rbtree::linked!(Entry, links);

impl Entry {
    pub fn new(key: usize) -> Self {
        Self {
            key,
            size: Cell::new(0),
            links: Links::new(),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("size", &self.size.get())
            .finish_non_exhaustive()
    }
}

/// Keeps records pinned at a stable address for as long as a test needs them.
#[derive(Default)]
pub struct Pool {
    entries: Vec<Pin<Box<Entry>>>,
}

impl Pool {
    pub fn alloc(&mut self, key: usize) -> NonNull<Entry> {
        let entry = Box::pin(Entry::new(key));
        let ptr = NonNull::from(&*entry);
        self.entries.push(entry);
        ptr
    }
}

pub fn key(node: NonNull<Entry>) -> usize {
    unsafe { node.as_ref().key }
}

pub fn links<'a>(node: NonNull<Entry>) -> &'a Links<Entry> {
    unsafe { Entry::links(node).as_ref() }
}

pub fn find(root: &Root<Entry>, key: usize) -> Link<Entry> {
    let mut curr = root.node();
    while let Some(node) = curr {
        curr = match key.cmp(&self::key(node)) {
            Ordering::Equal => return Some(node),
            Ordering::Less => links(node).left(),
            Ordering::Greater => links(node).right(),
        };
    }
    None
}

/// Finds the slot `key` belongs into. `visit` is called for every node passed on the way down.
fn descend(
    root: &Root<Entry>,
    key: usize,
    mut visit: impl FnMut(NonNull<Entry>),
) -> (Link<Entry>, Side) {
    let mut parent = None;
    let mut side = Side::Left;
    let mut curr = root.node();

    while let Some(node) = curr {
        visit(node);
        parent = Some(node);
        side = match key.cmp(&self::key(node)) {
            Ordering::Less => Side::Left,
            Ordering::Greater => Side::Right,
            Ordering::Equal => panic!("key {key} already inserted"),
        };
        curr = links(node).child(side);
    }

    (parent, side)
}

pub fn insert(root: &mut Root<Entry>, node: NonNull<Entry>) {
    let (parent, side) = descend(root, key(node), |_| {});
    unsafe {
        root.link_node(node, parent, side);
        root.insert_color(node);
    }
}

pub fn erase(root: &mut Root<Entry>, key: usize) -> NonNull<Entry> {
    let node = find(root, key).unwrap_or_else(|| panic!("key {key} not in tree"));
    unsafe { root.erase(node) };
    node
}

/// Subtree size aggregate.
pub struct SubtreeSize;

pub type SizeCallbacks = Callbacks<SubtreeSize>;

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

pub fn insert_sized(root: &mut Root<Entry>, node: NonNull<Entry>) {
    // every node passed on the way down gains one descendant
    let (parent, side) = descend(root, key(node), |ancestor| {
        let size = unsafe { &ancestor.as_ref().size };
        size.set(size.get() + 1);
    });
    unsafe {
        node.as_ref().size.set(1);
        root.link_node(node, parent, side);
        root.insert_augmented::<SizeCallbacks>(node);
    }
}

pub fn erase_sized(root: &mut Root<Entry>, key: usize) -> NonNull<Entry> {
    let node = find(root, key).unwrap_or_else(|| panic!("key {key} not in tree"));
    unsafe { root.erase_augmented::<SizeCallbacks>(node) };
    node
}

/// Asserts every cached subtree size matches the actual subtree.
pub fn assert_sizes(root: &Root<Entry>) {
    for entry in root.postorder() {
        let expected = 1 + size(entry.links.left()) + size(entry.links.right());
        assert_eq!(entry.size.get(), expected, "stale subtree size in {entry:?}");
    }
}

/// Returns the `index`-th smallest entry using the cached subtree sizes.
pub fn select(root: &Root<Entry>, mut index: usize) -> Link<Entry> {
    let mut curr = root.node();
    while let Some(node) = curr {
        let left = links(node).left();
        let left_size = size(left);
        match index.cmp(&left_size) {
            Ordering::Less => curr = left,
            Ordering::Equal => return Some(node),
            Ordering::Greater => {
                index -= left_size + 1;
                curr = links(node).right();
            }
        }
    }
    None
}

pub fn keys(root: &Root<Entry>) -> Vec<usize> {
    root.iter().map(|entry| entry.key).collect()
}

/// The tree in preorder, as `(key, color)` pairs.
pub fn shape(root: &Root<Entry>) -> Vec<(usize, Color)> {
    fn walk(node: Link<Entry>, out: &mut Vec<(usize, Color)>) {
        if let Some(node) = node {
            out.push((key(node), links(node).color()));
            walk(links(node).left(), out);
            walk(links(node).right(), out);
        }
    }

    let mut out = Vec::new();
    walk(root.node(), &mut out);
    out
}
