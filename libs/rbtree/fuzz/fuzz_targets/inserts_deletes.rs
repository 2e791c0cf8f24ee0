#![no_main]

use std::cmp::Ordering;
use std::fmt;
use std::pin::Pin;
use std::ptr::NonNull;

use libfuzzer_sys::fuzz_target;
use rbtree::{Links, Root, Side};

struct TestEntry {
    value: u16,
    links: Links<Self>,
}
rbtree::linked!(TestEntry, links);

impl fmt::Debug for TestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestEntry")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

fn find(root: &Root<TestEntry>, value: u16) -> (Option<NonNull<TestEntry>>, Option<NonNull<TestEntry>>, Side) {
    let mut parent = None;
    let mut side = Side::Left;
    let mut curr = root.node();

    while let Some(node) = curr {
        let entry = unsafe { node.as_ref() };
        side = match value.cmp(&entry.value) {
            Ordering::Equal => return (Some(node), parent, side),
            Ordering::Less => Side::Left,
            Ordering::Greater => Side::Right,
        };
        parent = Some(node);
        curr = entry.links.child(side);
    }

    (None, parent, side)
}

fuzz_target!(|inserts_removals: (Vec<u16>, Vec<u16>)| {
    let mut entries: Vec<Pin<Box<TestEntry>>> = Vec::new();
    let mut root = Root::new();

    for value in inserts_removals.0 {
        let (None, parent, side) = find(&root, value) else {
            continue;
        };
        let entry = Box::pin(TestEntry {
            value,
            links: Links::new(),
        });
        let node = NonNull::from(&*entry);
        entries.push(entry);

        unsafe {
            root.link_node(node, parent, side);
            root.insert_color(node);
        }
        root.assert_valid();
    }

    for value in inserts_removals.1 {
        if let (Some(node), _, _) = find(&root, value) {
            unsafe { root.erase(node) };
            root.assert_valid();
        }
    }

    // the records must not be freed while still linked
    root.drain().for_each(drop);
});
