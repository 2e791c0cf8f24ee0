use crate::links::links;
use crate::{Link, Linked};
use core::ptr::NonNull;

pub(crate) unsafe fn find_minimum<T: Linked>(mut curr: NonNull<T>) -> NonNull<T> {
    // Safety: ensured by caller
    while let Some(left) = unsafe { links(curr) }.left() {
        curr = left;
    }

    curr
}

pub(crate) unsafe fn find_maximum<T: Linked>(mut curr: NonNull<T>) -> NonNull<T> {
    // Safety: ensured by caller
    while let Some(right) = unsafe { links(curr) }.right() {
        curr = right;
    }

    curr
}

/// Returns the in-order successor of `node`, or `None` if `node` is the last node of its tree.
///
/// Calling this on an empty node returns `None`.
///
/// # Safety
///
/// `node` must be a live node. If it is linked, the tree it is linked into must not be structurally
/// modified for the duration of the call, except through [`Root::replace_node_rcu`].
///
/// [`Root::replace_node_rcu`]: crate::Root::replace_node_rcu
pub unsafe fn next<T: Linked>(node: NonNull<T>) -> Link<T> {
    // Safety: ensured by caller
    unsafe {
        let node_links = links(node);
        if !node_links.is_linked() {
            return None;
        }

        // If we have a right-hand child, go down and then left as far as we can.
        if let Some(right) = node_links.right() {
            return Some(find_minimum(right));
        }

        // No right-hand children. Everything down and left is smaller than us, so any next node
        // must be in the direction of our parent. Climb while we are a right child; the first
        // parent we reach from its left side is the successor.
        let mut node = node;
        let mut parent = node_links.parent();
        while let Some(p) = parent {
            if links(p).right() != Some(node) {
                break;
            }
            node = p;
            parent = links(p).parent();
        }

        parent
    }
}

/// Returns the in-order predecessor of `node`, or `None` if `node` is the first node of its tree.
///
/// Calling this on an empty node returns `None`.
///
/// # Safety
///
/// Same as [`next`].
pub unsafe fn prev<T: Linked>(node: NonNull<T>) -> Link<T> {
    // Safety: ensured by caller
    unsafe {
        let node_links = links(node);
        if !node_links.is_linked() {
            return None;
        }

        if let Some(left) = node_links.left() {
            return Some(find_maximum(left));
        }

        let mut node = node;
        let mut parent = node_links.parent();
        while let Some(p) = parent {
            if links(p).left() != Some(node) {
                break;
            }
            node = p;
            parent = links(p).parent();
        }

        parent
    }
}

/// Descends from `node` preferring left children, then right ones, until a leaf is reached.
pub(crate) unsafe fn left_deepest<T: Linked>(mut node: NonNull<T>) -> NonNull<T> {
    loop {
        // Safety: ensured by caller
        let node_links = unsafe { links(node) };
        if let Some(left) = node_links.left() {
            node = left;
        } else if let Some(right) = node_links.right() {
            node = right;
        } else {
            return node;
        }
    }
}

/// Returns the node visited after `node` in a postorder walk, which visits every node after both of
/// its children.
///
/// Only `node`'s parent link and the parent's child links are read, `node`'s children are not, so the
/// walk keeps working when the caller disposes of nodes once they have been visited.
///
/// # Safety
///
/// `node` must be a live, linked node and its parent (if any) must still be live and linked. The tree
/// must not be rebalanced during the walk.
pub unsafe fn next_postorder<T: Linked>(node: NonNull<T>) -> Link<T> {
    // Safety: ensured by caller
    unsafe {
        let parent = links(node).parent()?;
        let parent_links = links(parent);

        if parent_links.left() == Some(node) {
            // we are the parent's left child, the right subtree comes next
            if let Some(right) = parent_links.right() {
                return Some(left_deepest(right));
            }
        }

        // we are the parent's right child (or its only one), the parent comes next
        Some(parent)
    }
}
