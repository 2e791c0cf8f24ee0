use crate::links::links;
use crate::{Link, Linked};
use core::marker::PhantomData;
use core::ptr::NonNull;

/// Callbacks that keep a per-subtree aggregate cached in each node up to date.
///
/// The tree has no idea what the aggregate means (a subtree size, the maximum interval end, ...),
/// it only tells the implementation *where* the subtree membership changed. All three callbacks
/// run during a mutation, with the tree in a transient state: children links are final for the
/// nodes passed in, but ancestors may still be waiting for their own update.
///
/// The implementation is picked at compile time, [`NoAugment`] compiles away completely.
pub trait Augment<T: Linked> {
    /// Recomputes the aggregate of `node` from its children, then of its parent and so on, stopping
    /// before `stop` is reached (or at the root if `stop` is `None`).
    ///
    /// # Safety
    ///
    /// `node` and every ancestor walked must be live nodes of the tree being mutated.
    unsafe fn propagate(node: Link<T>, stop: Link<T>);

    /// `new` is taking over the position of `old` with an unchanged subtree; carry the aggregate over.
    ///
    /// # Safety
    ///
    /// Both pointers must be live nodes.
    unsafe fn copy(old: NonNull<T>, new: NonNull<T>);

    /// A rotation made `new` the root of the subtree that `old` used to root. `new` now covers exactly
    /// the nodes `old` covered, `old` covers a different set.
    ///
    /// # Safety
    ///
    /// Both pointers must be live nodes.
    unsafe fn rotate(old: NonNull<T>, new: NonNull<T>);
}

/// The augmentation of a plain, non-augmented tree.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoAugment;

impl<T: Linked> Augment<T> for NoAugment {
    #[inline(always)]
    unsafe fn propagate(_node: Link<T>, _stop: Link<T>) {}
    #[inline(always)]
    unsafe fn copy(_old: NonNull<T>, _new: NonNull<T>) {}
    #[inline(always)]
    unsafe fn rotate(_old: NonNull<T>, _new: NonNull<T>) {}
}

/// How to compute a node's aggregate from its children.
///
/// Implementing this is usually simpler than implementing [`Augment`] by hand, [`Callbacks`] derives
/// all three callbacks from it.
pub trait Compute<T: Linked> {
    /// Recomputes the aggregate stored in `node` from its own contribution and the aggregates stored
    /// in its children, returning `true` if the stored value changed.
    ///
    /// # Safety
    ///
    /// `node` and its children must be live.
    unsafe fn compute(node: NonNull<T>) -> bool;

    /// Overwrites the aggregate stored in `new` with the one stored in `old`.
    ///
    /// # Safety
    ///
    /// Both pointers must be live nodes.
    unsafe fn copy(old: NonNull<T>, new: NonNull<T>);
}

/// [`Augment`] callbacks derived from a [`Compute`] implementation.
pub struct Callbacks<C>(PhantomData<C>);

impl<T, C> Augment<T> for Callbacks<C>
where
    T: Linked,
    C: Compute<T>,
{
    unsafe fn propagate(mut node: Link<T>, stop: Link<T>) {
        while node != stop {
            let Some(curr) = node else { break };

            // Safety: ensured by caller
            unsafe {
                // an unchanged aggregate cannot change any ancestor either
                if !C::compute(curr) {
                    break;
                }
                node = links(curr).parent();
            }
        }
    }

    #[inline]
    unsafe fn copy(old: NonNull<T>, new: NonNull<T>) {
        // Safety: ensured by caller
        unsafe { C::copy(old, new) }
    }

    #[inline]
    unsafe fn rotate(old: NonNull<T>, new: NonNull<T>) {
        // Safety: ensured by caller
        unsafe {
            C::copy(old, new);
            C::compute(old);
        }
    }
}
