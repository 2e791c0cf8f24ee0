use crate::loom::loom_const_fn;
use crate::loom::sync::atomic::{AtomicPtr, AtomicU8, Ordering};
use crate::{Link, Linked};
use core::marker::PhantomPinned;
use core::ptr::{self, NonNull};
use core::fmt;

/// The color of a linked node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Red = 1,
    Black = 2,
}

/// Which child slot of a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

impl Side {
    #[must_use]
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// State byte of a node that is not part of any tree.
const EMPTY: u8 = 0;

/// Links to other nodes in a [`Root`](crate::Root).
///
/// In order to be part of a tree, a type must contain an instance of this type and must implement the
/// [`Linked`] trait. A freshly created `Links` is *empty*: it is not part of any tree. Linking it
/// (see [`Root::link_node`](crate::Root::link_node)) gives it a parent, a color and a place in the
/// tree; erasing it returns it to the empty state.
///
/// All fields are atomics so that lock-free readers walking the tree concurrently with
/// [`Root::replace_node_rcu`](crate::Root::replace_node_rcu) never race with the writer. Loads are
/// `Acquire`, ordinary writer stores are `Relaxed` and only the publication of a replacement node
/// uses `Release` stores.
pub struct Links<T> {
    parent: AtomicPtr<T>,
    left: AtomicPtr<T>,
    right: AtomicPtr<T>,
    state: AtomicU8,
    /// Links must always be `!Unpin`, in order to ensure that they never receive LLVM `noalias`
    /// annotations; see also <https://github.com/rust-lang/rust/issues/63818>.
    _unpin: PhantomPinned,
}

impl<T> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("Links");
        f.field("self", &format_args!("{self:p}"));

        if self.is_linked() {
            f.field("color", &self.color())
                .field("parent", &self.parent())
                .field("left", &self.left())
                .field("right", &self.right());
        } else {
            f.field("color", &format_args!("<empty>"));
        }

        f.finish_non_exhaustive()
    }
}

impl<T> Links<T> {
    loom_const_fn! {
        /// Returns new, empty links.
        #[must_use]
        pub const fn new() -> Self {
            Self {
                parent: AtomicPtr::new(ptr::null_mut()),
                left: AtomicPtr::new(ptr::null_mut()),
                right: AtomicPtr::new(ptr::null_mut()),
                state: AtomicU8::new(EMPTY),
                _unpin: PhantomPinned,
            }
        }
    }

    /// Returns `true` if this node is currently linked into a tree.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.state.load(Ordering::Acquire) != EMPTY
    }

    /// Returns the color of this node.
    ///
    /// # Panics
    ///
    /// Panics if the node is empty.
    #[inline]
    #[track_caller]
    pub fn color(&self) -> Color {
        match self.state.load(Ordering::Acquire) {
            1 => Color::Red,
            2 => Color::Black,
            _ => panic!("empty node has no color"),
        }
    }

    #[inline]
    pub(crate) fn is_red(&self) -> bool {
        self.state.load(Ordering::Acquire) == Color::Red as u8
    }

    #[inline]
    pub(crate) fn is_black(&self) -> bool {
        self.state.load(Ordering::Acquire) == Color::Black as u8
    }

    #[inline]
    pub fn parent(&self) -> Link<T> {
        NonNull::new(self.parent.load(Ordering::Acquire))
    }

    #[inline]
    pub fn left(&self) -> Link<T> {
        NonNull::new(self.left.load(Ordering::Acquire))
    }

    #[inline]
    pub fn right(&self) -> Link<T> {
        NonNull::new(self.right.load(Ordering::Acquire))
    }

    #[inline]
    pub fn child(&self, side: Side) -> Link<T> {
        match side {
            Side::Left => self.left(),
            Side::Right => self.right(),
        }
    }

    /// Returns this node to the empty state.
    ///
    /// # Safety
    ///
    /// Calling this on a node that is still reachable from a tree **will corrupt the tree**, leaving
    /// pointers to the cleared node around.
    pub unsafe fn clear(&self) {
        self.parent.store(ptr::null_mut(), Ordering::Relaxed);
        self.left.store(ptr::null_mut(), Ordering::Relaxed);
        self.right.store(ptr::null_mut(), Ordering::Relaxed);
        self.state.store(EMPTY, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn set_parent(&self, parent: Link<T>) {
        self.parent.store(into_raw(parent), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn set_color(&self, color: Color) {
        self.state.store(color as u8, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn set_parent_color(&self, parent: Link<T>, color: Color) {
        self.set_parent(parent);
        self.set_color(color);
    }

    #[inline]
    pub(crate) fn set_left(&self, left: Link<T>) {
        self.left.store(into_raw(left), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn set_right(&self, right: Link<T>) {
        self.right.store(into_raw(right), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn set_child(&self, side: Side, child: Link<T>) {
        match side {
            Side::Left => self.set_left(child),
            Side::Right => self.set_right(child),
        }
    }

    /// Copies parent, children and color of `other` into `self`.
    pub(crate) fn copy_from(&self, other: &Self) {
        self.set_parent(other.parent());
        self.set_left(other.left());
        self.set_right(other.right());
        self.state
            .store(other.state.load(Ordering::Acquire), Ordering::Relaxed);
    }

    /// Points this node's parent link at `parent` with release ordering, making every prior write to
    /// `parent` visible to a reader that climbs through this node.
    #[inline]
    pub(crate) fn publish_parent(&self, parent: NonNull<T>) {
        self.parent.store(parent.as_ptr(), Ordering::Release);
    }

    /// Stores `child` into the `side` slot with release ordering.
    #[inline]
    pub(crate) fn publish_child(&self, side: Side, child: NonNull<T>) {
        match side {
            Side::Left => self.left.store(child.as_ptr(), Ordering::Release),
            Side::Right => self.right.store(child.as_ptr(), Ordering::Release),
        }
    }

    /// Asserts as many invariants about this particular node as possible.
    ///
    /// # Panics
    ///
    /// Panics if the node is empty or links to itself, or if two of its links are the same node.
    #[track_caller]
    pub fn assert_valid(&self)
    where
        T: Linked,
    {
        let this = NonNull::from(self);
        // Safety: `links` only computes a field address, it does not dereference.
        let links_of = |node: NonNull<T>| unsafe { T::links(node) };

        assert!(self.is_linked(), "linked position holds an empty node; node={self:#?}");

        for (name, link) in [
            ("parent", self.parent()),
            ("left child", self.left()),
            ("right child", self.right()),
        ] {
            if let Some(link) = link {
                assert_ne!(links_of(link), this, "node's {name} cannot be itself; node={self:#?}");
            }
        }

        if let (Some(left), Some(right)) = (self.left(), self.right()) {
            assert_ne!(left, right, "node's left and right children cannot be the same; node={self:#?}");
        }
        if let Some(parent) = self.parent() {
            assert_ne!(
                Some(parent),
                self.left(),
                "node's parent and left child cannot be the same; node={self:#?}"
            );
            assert_ne!(
                Some(parent),
                self.right(),
                "node's parent and right child cannot be the same; node={self:#?}"
            );
        }
    }
}

#[inline]
fn into_raw<T>(link: Link<T>) -> *mut T {
    link.map_or(ptr::null_mut(), NonNull::as_ptr)
}

/// Returns the links of `node`.
///
/// # Safety
///
/// `node` must point to a live `T`.
#[inline]
pub(crate) unsafe fn links<'a, T: Linked>(node: NonNull<T>) -> &'a Links<T> {
    // Safety: ensured by caller, `Linked::links` returns a pointer into the same allocation.
    unsafe { T::links(node).as_ref() }
}

/// Returns `true` if `link` is a present, red node. Absent children count as black.
///
/// # Safety
///
/// `link` must be `None` or point to a live `T`.
#[inline]
pub(crate) unsafe fn is_red<T: Linked>(link: Link<T>) -> bool {
    // Safety: ensured by caller
    link.is_some_and(|node| unsafe { links(node) }.is_red())
}
