//! # An intrusive, augmentable red-black tree.
//!
//! Red-black trees are *self-balancing binary search trees* that guarantee O(log n) insertion and
//! removal with at most three rotations per operation. This implementation is *intrusive*: the
//! links between nodes are stored _within_ the caller's records, the tree never allocates, never
//! frees and never owns the memory of the records it indexes.
//!
//! The tree also never compares keys. Searching and choosing the place of a new node is up to the
//! caller, who walks down from [`Root::node`] with its own ordering, links the node as a leaf with
//! [`Root::link_node`] and then lets [`Root::insert_color`] restore the balance. This keeps the
//! balancing engine free of any assumption about what is being indexed (address ranges, timers,
//! intervals...) and lets callers keep derived per-subtree data up to date through the
//! [`Augment`] callbacks.
//!
//! ## concurrency
//!
//! The tree does no locking. Structural mutations (insertion, erasure, replacement) must be
//! serialized by the caller, which the `&mut self` receivers enforce for everything except
//! [`Root::replace_node_rcu`]. That one operation is safe to run while lock-free readers walk the
//! tree with [`Root::first`], [`next`] and friends: the replacement is fully initialized before it
//! is published with a release store.
//!
//! Reclaiming a node a reader may still hold (after [`Root::erase`], [`Root::detach`] or
//! [`Root::replace_node_rcu`]) is **not** handled here; the caller must defer freeing it until no
//! reader can observe it, e.g. with an epoch or grace-period scheme.
//!
//! ## features
//!
//! | Feature | Default | Explanation                                                                          |
//! |:--------|:--------|:-------------------------------------------------------------------------------------|
//! | `dot`   | `false` | Enables the `Root::dot` method, which renders the tree in [graphviz format]          |
//!
//! The renderer is always compiled into the crate's own unit tests, so `cargo test` covers it
//! without enabling the feature.
//!
//! [graphviz format]: https://graphviz.org/doc/info/lang.html

#![cfg_attr(not(test), no_std)]

mod augment;
#[cfg(any(test, feature = "dot"))]
mod dot;
mod iter;
mod links;
mod loom;
mod rebalance;
mod traverse;

use crate::links::links;
use crate::loom::loom_const_fn;
use crate::loom::sync::atomic::{AtomicPtr, Ordering};
use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use core::{error, fmt};

pub use augment::{Augment, Callbacks, Compute, NoAugment};
#[cfg(any(test, feature = "dot"))]
pub use dot::Dot;
pub use iter::{Drain, Iter, Postorder};
pub use links::{Color, Links, Side};
pub use traverse::{next, next_postorder, prev};

/// Trait implemented by types which can be members of an [intrusive red-black tree][Root].
///
/// In order to be part of a tree, a type must contain a [`Links`] value that stores the pointers
/// to other nodes in the tree. This trait tells the tree where to find it, the typed replacement of
/// recovering a record from its embedded node by subtracting a field offset. The [`linked!`]
/// macro implements it for a named field.
///
/// # Safety
///
/// This is unsafe to implement because it's the implementation's responsibility to ensure that
/// types implementing this trait are valid intrusive collection nodes. In particular:
///
/// - Implementors **must** stay pinned in memory while they are linked into a tree: a linked record
///   may not be deallocated or moved to a different memory location.
/// - The type implementing this trait **must not** implement [`Unpin`].
/// - [`Linked::links`] must return a pointer to a `Links` field of the very record it was given,
///   without creating an intermediate reference (see below).
///
/// Failure to uphold these invariants will result in corruption of the intrusive data structure,
/// including dangling pointers.
///
/// # Implementing `Linked::links`
///
/// Borrowing the field through `&mut target.as_mut().links` creates a temporary reference from the
/// raw pointer which Stacked Borrows rejects. Compute the field address instead:
///
/// ```
/// use core::mem::offset_of;
/// use core::ptr::NonNull;
/// use rbtree::{Linked, Links};
///
/// struct Entry {
///     links: Links<Self>,
///     data: usize,
/// }
///
/// unsafe impl Linked for Entry {
///     unsafe fn links(target: NonNull<Self>) -> NonNull<Links<Self>> {
///         // Safety: `links` is a field of `Entry`, so the offset stays within the allocation
///         unsafe { target.byte_add(offset_of!(Self, links)).cast() }
///     }
/// }
/// ```
pub unsafe trait Linked: Sized {
    /// Return the links of the node pointed to by `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a valid instance of `Self`.
    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<Self>>;
}

/// Implements [`Linked`] for a record type by naming its [`Links`] field.
///
/// ```
/// struct Timer {
///     deadline: u64,
///     node: rbtree::Links<Timer>,
/// }
///
/// rbtree::linked!(Timer, node);
/// ```
#[macro_export]
macro_rules! linked {
    ($ty:ty, $field:ident) => {
        // Safety: the field is a `Links<Self>` of the record the pointer points to
        unsafe impl $crate::Linked for $ty {
            #[inline]
            unsafe fn links(
                ptr: ::core::ptr::NonNull<Self>,
            ) -> ::core::ptr::NonNull<$crate::Links<Self>> {
                // Safety: `$field` lies within the record `ptr` points to
                unsafe {
                    ptr.byte_add(::core::mem::offset_of!($ty, $field))
                        .cast::<$crate::Links<Self>>()
                }
            }
        }
    };
}

/// A possibly absent node.
pub type Link<T> = Option<NonNull<T>>;

/// The root of an intrusive red-black tree.
///
/// An empty root is a valid tree. The root itself holds a single pointer and may be moved freely,
/// the nodes only point to each other.
pub struct Root<T: Linked> {
    node: AtomicPtr<T>,
    _marker: PhantomData<T>,
}

impl<T: Linked> Default for Root<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Linked> fmt::Debug for Root<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("node", &self.node()).finish()
    }
}

impl<T: Linked> Root<T> {
    loom_const_fn! {
        /// Creates a new, empty tree.
        #[must_use]
        pub const fn new() -> Self {
            Self {
                node: AtomicPtr::new(ptr::null_mut()),
                _marker: PhantomData,
            }
        }
    }

    /// Returns `true` if the tree contains no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.node().is_none()
    }

    /// Returns the topmost node of the tree, the starting point of every search.
    #[inline]
    pub fn node(&self) -> Link<T> {
        NonNull::new(self.node.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_node(&self, node: Link<T>) {
        self.node
            .store(node.map_or(ptr::null_mut(), NonNull::as_ptr), Ordering::Relaxed);
    }

    /// Returns the first (leftmost) node of the tree.
    pub fn first(&self) -> Link<T> {
        // Safety: every node reachable from the root is live
        self.node().map(|root| unsafe { traverse::find_minimum(root) })
    }

    /// Returns the last (rightmost) node of the tree.
    pub fn last(&self) -> Link<T> {
        // Safety: every node reachable from the root is live
        self.node().map(|root| unsafe { traverse::find_maximum(root) })
    }

    /// Returns the first node of a postorder walk, continue with [`next_postorder`].
    pub fn first_postorder(&self) -> Link<T> {
        // Safety: every node reachable from the root is live
        self.node().map(|root| unsafe { traverse::left_deepest(root) })
    }

    /// Gets an iterator over the entries of the tree, in ascending order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            head: self.first(),
            tail: self.last(),
            _tree: self,
        }
    }

    /// Gets an iterator over the entries of the tree in postorder, children before their parent.
    pub fn postorder(&self) -> Postorder<'_, T> {
        Postorder {
            next: self.first_postorder(),
            _tree: self,
        }
    }

    /// Detaches every node from the tree, leaving it empty.
    ///
    /// The returned iterator yields the nodes in postorder, each one already back in the empty
    /// state, so the caller may dispose of the backing records as they come out.
    pub fn drain(&mut self) -> Drain<'_, T> {
        let next = self.first_postorder();
        self.set_node(None);
        tracing::trace!(first = ?next, "draining tree");

        Drain {
            next,
            _marker: PhantomData,
        }
    }

    /// Links `node` into the tree as a red leaf, in the `side` slot of `parent`, or as the root if
    /// `parent` is `None`.
    ///
    /// This only places the node, call [`Root::insert_color`] (or [`Root::insert_augmented`])
    /// afterwards to rebalance the tree.
    ///
    /// # Safety
    ///
    /// - `node` must be live, pinned and empty.
    /// - `parent` must be a node of this tree whose `side` slot is free, and placing `node` there
    ///   must respect the order of the tree. `parent` may only be `None` if the tree is empty.
    pub unsafe fn link_node(&mut self, node: NonNull<T>, parent: Link<T>, side: Side) {
        // Safety: ensured by caller
        unsafe {
            let node_links = links(node);
            debug_assert!(!node_links.is_linked(), "node {node:?} is already linked");

            node_links.set_left(None);
            node_links.set_right(None);
            node_links.set_parent_color(parent, Color::Red);

            if let Some(parent) = parent {
                let parent_links = links(parent);
                debug_assert!(
                    parent_links.child(side).is_none(),
                    "{side} slot of {parent:?} is occupied"
                );
                parent_links.set_child(side, Some(node));
            } else {
                debug_assert!(self.is_empty(), "tree already has a root");
                self.set_node(Some(node));
            }
        }
    }

    /// Rebalances the tree after `node` was linked with [`Root::link_node`].
    ///
    /// # Safety
    ///
    /// `node` must have just been linked into this tree as a red leaf.
    pub unsafe fn insert_color(&mut self, node: NonNull<T>) {
        // Safety: ensured by caller
        unsafe { self.insert_fixup::<NoAugment>(node) }
    }

    /// Rebalances an augmented tree after `node` was linked with [`Root::link_node`].
    ///
    /// The caller must have updated the aggregates along the path from the root down to `node`
    /// (including `node` itself) beforehand, e.g. by calling [`Augment::propagate`] on `node`;
    /// rotations are then reported through [`Augment::rotate`].
    ///
    /// # Safety
    ///
    /// `node` must have just been linked into this tree as a red leaf.
    pub unsafe fn insert_augmented<A: Augment<T>>(&mut self, node: NonNull<T>) {
        // Safety: ensured by caller
        unsafe { self.insert_fixup::<A>(node) }
    }

    /// Removes `node` from the tree and rebalances it.
    ///
    /// `node` is back in the empty state afterwards and may be linked again. Its memory is not
    /// touched otherwise. A lock-free reader standing on `node` sees an empty node and its walk
    /// ends there; use [`Root::detach`] if such readers must be able to continue.
    ///
    /// # Safety
    ///
    /// `node` must be linked into this tree.
    pub unsafe fn erase(&mut self, node: NonNull<T>) {
        // Safety: ensured by caller
        unsafe { self.erase_augmented::<NoAugment>(node) }
    }

    /// Removes `node` from an augmented tree and rebalances it, keeping the aggregates up to date.
    ///
    /// # Safety
    ///
    /// `node` must be linked into this tree.
    pub unsafe fn erase_augmented<A: Augment<T>>(&mut self, node: NonNull<T>) {
        // Safety: ensured by caller
        unsafe {
            self.detach_augmented::<A>(node);
            links(node).clear();
        }
    }

    /// Removes `node` from the tree and rebalances it, but leaves `node`'s own links as they were.
    ///
    /// No node of the tree points to `node` anymore, but `node` still points into the tree, so a
    /// lock-free reader standing on it can continue its walk from there. That walk may revisit or
    /// miss nodes the rebalancing moved, it still reaches the end of the tree. Freeing `node` must be
    /// deferred until no reader can observe it anymore, and it has to be
    /// [`clear`](Links::clear)ed before it is linked again.
    ///
    /// # Safety
    ///
    /// `node` must be linked into this tree.
    pub unsafe fn detach(&mut self, node: NonNull<T>) {
        // Safety: ensured by caller
        unsafe { self.detach_augmented::<NoAugment>(node) }
    }

    /// Like [`Root::detach`], keeping the aggregates of an augmented tree up to date.
    ///
    /// # Safety
    ///
    /// `node` must be linked into this tree.
    pub unsafe fn detach_augmented<A: Augment<T>>(&mut self, node: NonNull<T>) {
        // Safety: ensured by caller
        unsafe {
            debug_assert!(links(node).is_linked(), "node {node:?} is not linked");

            if let Some(rebalance) = self.erase_node::<A>(node) {
                tracing::trace!(?node, ?rebalance, "erase created a black-height deficiency");
                self.erase_fixup::<A>(rebalance);
            }
        }
    }

    /// Puts `new` into the exact position of `victim`, without any rebalancing.
    ///
    /// `new` must compare equal to `victim` in the caller's ordering (or at least sort between
    /// `victim`'s neighbours). `victim` is back in the empty state afterwards. Aggregates of an
    /// augmented tree are not touched, the caller carries them over if needed.
    ///
    /// # Safety
    ///
    /// `victim` must be linked into this tree, `new` must be live, pinned and empty.
    pub unsafe fn replace_node(&mut self, victim: NonNull<T>, new: NonNull<T>) {
        // Safety: ensured by caller
        unsafe {
            let victim_links = links(victim);
            let new_links = links(new);
            debug_assert!(victim_links.is_linked(), "victim {victim:?} is not linked");
            debug_assert!(!new_links.is_linked(), "replacement {new:?} is already linked");

            let parent = victim_links.parent();

            // copy the pointers and color from the victim to the replacement
            new_links.copy_from(victim_links);

            // and point the surrounding nodes to the replacement
            if let Some(left) = victim_links.left() {
                links(left).set_parent(Some(new));
            }
            if let Some(right) = victim_links.right() {
                links(right).set_parent(Some(new));
            }
            self.change_child(victim, Some(new), parent);

            victim_links.clear();
        }
    }

    /// Puts `new` into the exact position of `victim` while lock-free readers may be walking the
    /// tree.
    ///
    /// `new` is fully initialized and its children are pointed at it before the single release
    /// store that makes it reachable from `victim`'s parent (or the root). A reader using the
    /// acquire loads of [`Links`] therefore sees either `victim` or a completely built `new`.
    ///
    /// Unlike [`Root::replace_node`] this leaves `victim`'s links untouched: a reader standing on
    /// `victim` can finish its walk through it. Once no reader can observe `victim` anymore the
    /// caller may [`clear`](Links::clear) and reuse or free it.
    ///
    /// # Safety
    ///
    /// - `victim` must be linked into this tree, `new` must be live, pinned and empty.
    /// - No other mutation of the tree may run concurrently.
    /// - `victim` must not be freed until all concurrent readers are done with it.
    pub unsafe fn replace_node_rcu(&self, victim: NonNull<T>, new: NonNull<T>) {
        // Safety: ensured by caller
        unsafe {
            let victim_links = links(victim);
            let new_links = links(new);
            debug_assert!(victim_links.is_linked(), "victim {victim:?} is not linked");
            debug_assert!(!new_links.is_linked(), "replacement {new:?} is already linked");

            let parent = victim_links.parent();

            new_links.copy_from(victim_links);

            if let Some(left) = victim_links.left() {
                links(left).publish_parent(new);
            }
            if let Some(right) = victim_links.right() {
                links(right).publish_parent(new);
            }

            // Publish the replacement last, all of its own fields are visible to anyone who can
            // reach it through this store.
            if let Some(parent) = parent {
                let parent_links = links(parent);
                let side = if parent_links.left() == Some(victim) {
                    Side::Left
                } else {
                    Side::Right
                };
                parent_links.publish_child(side, new);
            } else {
                self.node.store(new.as_ptr(), Ordering::Release);
            }

            tracing::trace!(?victim, ?new, "published replacement node");
        }
    }

    /// Checks the red-black invariants of the whole tree, returning its black-height.
    ///
    /// The order of the nodes is not checked since the tree does not know how to compare them.
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] found.
    pub fn validate(&self) -> Result<usize, Violation> {
        let Some(root) = self.node() else {
            return Ok(0);
        };

        // Safety: every node reachable from the root is live
        let root_links = unsafe { links(root) };
        if !root_links.is_linked() {
            return Err(Violation::EmptyNode);
        }
        if root_links.parent().is_some() {
            return Err(Violation::RootHasParent);
        }
        if root_links.is_red() {
            return Err(Violation::RedRoot);
        }

        // Safety: every node reachable from the root is live
        unsafe { Self::validate_inner(root) }
    }

    unsafe fn validate_inner(node: NonNull<T>) -> Result<usize, Violation> {
        // Safety: ensured by caller
        let node_links = unsafe { links(node) };

        let mut heights = [0; 2];
        for (height, side) in heights.iter_mut().zip([Side::Left, Side::Right]) {
            *height = match node_links.child(side) {
                None => 0,
                Some(child) => {
                    // Safety: ensured by caller
                    let child_links = unsafe { links(child) };
                    if !child_links.is_linked() {
                        return Err(Violation::EmptyNode);
                    }
                    if child_links.parent() != Some(node) {
                        return Err(Violation::BrokenParentLink);
                    }
                    if node_links.is_red() && child_links.is_red() {
                        return Err(Violation::ConsecutiveRed);
                    }
                    // Safety: ensured by caller
                    unsafe { Self::validate_inner(child)? }
                }
            };
        }

        let [left, right] = heights;
        if left != right {
            return Err(Violation::BlackHeight { left, right });
        }

        Ok(left + usize::from(node_links.is_black()))
    }

    /// Asserts as many of the tree's invariants as possible.
    ///
    /// # Panics
    ///
    /// Panics if any node is malformed or [`Root::validate`] finds a violation.
    #[track_caller]
    pub fn assert_valid(&self) {
        let mut curr = self.first_postorder();
        while let Some(node) = curr {
            // Safety: every node reachable from the root is live
            unsafe {
                links(node).assert_valid();
                curr = next_postorder(node);
            }
        }

        if let Err(violation) = self.validate() {
            panic!("red-black tree invariant violated: {violation}; tree={self:?}");
        }
    }

    /// Returns a value that renders the tree in graphviz format.
    #[cfg(any(test, feature = "dot"))]
    pub fn dot(&self) -> Dot<'_, T> {
        Dot { tree: self }
    }
}

/// A broken red-black tree invariant, as reported by [`Root::validate`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The root node is red.
    RedRoot,
    /// The root node has a parent.
    RootHasParent,
    /// A red node has a red child.
    ConsecutiveRed,
    /// The paths through a node's children pass through different numbers of black nodes.
    BlackHeight { left: usize, right: usize },
    /// A child does not point back to its parent.
    BrokenParentLink,
    /// An empty node is reachable from the root.
    EmptyNode,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::RedRoot => write!(f, "root is red"),
            Violation::RootHasParent => write!(f, "root has a parent"),
            Violation::ConsecutiveRed => write!(f, "red node has a red child"),
            Violation::BlackHeight { left, right } => {
                write!(f, "black-height mismatch (left {left}, right {right})")
            }
            Violation::BrokenParentLink => write!(f, "child does not point back to its parent"),
            Violation::EmptyNode => write!(f, "empty node reachable from the root"),
        }
    }
}

impl error::Error for Violation {}
