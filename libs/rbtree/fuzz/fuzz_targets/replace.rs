#![no_main]

use std::cmp::Ordering;
use std::pin::Pin;
use std::ptr::NonNull;

use libfuzzer_sys::fuzz_target;
use rbtree::{Links, Root, Side};

#[derive(Debug)]
struct TestEntry {
    value: u8,
    links: Links<Self>,
}
rbtree::linked!(TestEntry, links);

fn new_entry(value: u8) -> Pin<Box<TestEntry>> {
    Box::pin(TestEntry {
        value,
        links: Links::new(),
    })
}

fuzz_target!(|input: (Vec<u8>, Vec<(u8, bool)>)| {
    let mut entries: Vec<Pin<Box<TestEntry>>> = Vec::new();
    let mut root = Root::new();

    for value in input.0 {
        let mut parent = None;
        let mut side = Side::Left;
        let mut curr = root.node();
        let mut duplicate = false;

        while let Some(node) = curr {
            let entry: &TestEntry = unsafe { node.as_ref() };
            side = match value.cmp(&entry.value) {
                Ordering::Equal => {
                    duplicate = true;
                    break;
                }
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };
            parent = Some(node);
            curr = entry.links.child(side);
        }
        if duplicate {
            continue;
        }

        let entry = new_entry(value);
        let node = NonNull::from(&*entry);
        entries.push(entry);
        unsafe {
            root.link_node(node, parent, side);
            root.insert_color(node);
        }
        root.assert_valid();
    }

    let before: Vec<u8> = root.iter().map(|entry| entry.value).collect();

    for (index, rcu) in input.1 {
        let Some(victim) = root.iter().nth(usize::from(index) % before.len().max(1)) else {
            break;
        };
        let victim = NonNull::from(victim);
        let replacement = new_entry(unsafe { victim.as_ref() }.value);
        let new = NonNull::from(&*replacement);
        entries.push(replacement);

        unsafe {
            if rcu {
                root.replace_node_rcu(victim, new);
                victim.as_ref().links.clear();
            } else {
                root.replace_node(victim, new);
            }
        }
        root.assert_valid();
    }

    let after: Vec<u8> = root.iter().map(|entry| entry.value).collect();
    assert_eq!(before, after);

    root.drain().for_each(drop);
});
