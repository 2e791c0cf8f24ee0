//! The balancing engine: rotations, insertion fixup and erasure with its fixup.
//!
//! Diagrams use lowercase for red nodes, uppercase for black ones and parentheses for nodes of
//! either color. `side` always names the side the fixup is looking at (the side the parent hangs
//! off the grandparent during insertion, the deficient side during erasure), every case is
//! written once and covers its mirror image.

use crate::augment::Augment;
use crate::links::{is_red, links};
use crate::{Color, Link, Linked, Root, Side};
use core::ptr::NonNull;

impl<T: Linked> Root<T> {
    /// Makes `parent` (or the root slot if `parent` is `None`) point to `new` where it pointed to
    /// `old` before.
    pub(crate) unsafe fn change_child(&self, old: NonNull<T>, new: Link<T>, parent: Link<T>) {
        if let Some(parent) = parent {
            // Safety: ensured by caller
            let parent_links = unsafe { links(parent) };
            if parent_links.left() == Some(old) {
                parent_links.set_left(new);
            } else {
                debug_assert_eq!(parent_links.right(), Some(old), "parent must be parent of node");
                parent_links.set_right(new);
            }
        } else {
            self.set_node(new);
        }
    }

    /// Second half of every rotation: `new` takes over the parent and color of `old`, `old` becomes
    /// a `color` child of `new` and the slot that held `old` now holds `new`.
    unsafe fn rotate_set_parents(&self, old: NonNull<T>, new: NonNull<T>, color: Color) {
        // Safety: ensured by caller
        unsafe {
            let old_links = links(old);
            let parent = old_links.parent();

            links(new).set_parent_color(parent, old_links.color());
            old_links.set_parent_color(Some(new), color);
            self.change_child(old, Some(new), parent);
        }
    }

    /// Restores the red-black invariants after `node` was linked as a red leaf.
    pub(crate) unsafe fn insert_fixup<A: Augment<T>>(&mut self, mut node: NonNull<T>) {
        // Safety: ensured by caller
        unsafe {
            let mut parent = links(node).parent();

            // Loop invariant: node is red.
            loop {
                let Some(mut p) = parent else {
                    // The node is the root: either it is the first node, or we recursed at case 1
                    // all the way up.
                    links(node).set_parent_color(None, Color::Black);
                    break;
                };

                // A black parent means we are done. Otherwise two consecutive red nodes need
                // fixing, and since the root is black a red parent always has a parent itself.
                if links(p).is_black() {
                    break;
                }

                let Some(gparent) = links(p).parent() else {
                    unreachable!("red node {p:?} is the root");
                };
                let g_links = links(gparent);
                let side = if g_links.left() == Some(p) {
                    Side::Left
                } else {
                    Side::Right
                };

                let uncle = g_links.child(side.opposite());
                if let Some(uncle) = uncle.filter(|u| links(*u).is_red()) {
                    // Case 1 - the uncle is red (color flips).
                    //
                    //       G            g
                    //      / \          / \
                    //     p   u  -->   P   U
                    //    /            /
                    //   n            n
                    //
                    // g's parent might be red too, so continue at g.
                    links(uncle).set_parent_color(Some(gparent), Color::Black);
                    links(p).set_parent_color(Some(gparent), Color::Black);
                    node = gparent;
                    parent = links(node).parent();
                    links(node).set_parent_color(parent, Color::Red);
                    continue;
                }

                let mut tmp = links(p).child(side.opposite());
                if tmp == Some(node) {
                    // Case 2 - the uncle is black and node is the inner grandchild
                    // (rotate at parent, shown for side = left).
                    //
                    //      G             G
                    //     / \           / \
                    //    p   U  -->    n   U
                    //     \           /
                    //      n         p
                    //
                    // This still leaves two red nodes in a row, case 3 takes care of that.
                    tmp = links(node).child(side);
                    links(p).set_child(side.opposite(), tmp);
                    links(node).set_child(side, Some(p));
                    if let Some(tmp) = tmp {
                        links(tmp).set_parent_color(Some(p), Color::Black);
                    }
                    links(p).set_parent_color(Some(node), Color::Red);
                    A::rotate(p, node);
                    p = node;
                    tmp = links(node).child(side.opposite());
                }

                // Case 3 - the uncle is black and node is the outer grandchild
                // (rotate at grandparent, shown for side = left).
                //
                //        G           P
                //       / \         / \
                //      p   U  -->  n   g
                //     /                 \
                //    n                   U
                g_links.set_child(side, tmp);
                links(p).set_child(side.opposite(), Some(gparent));
                if let Some(tmp) = tmp {
                    links(tmp).set_parent_color(Some(gparent), Color::Black);
                }
                self.rotate_set_parents(gparent, p, Color::Red);
                A::rotate(gparent, p);
                break;
            }
        }
    }

    /// Unlinks `node` from the tree, returning the node from which the erase fixup has to start if
    /// a black-height deficiency was created.
    pub(crate) unsafe fn erase_node<A: Augment<T>>(&mut self, node: NonNull<T>) -> Link<T> {
        // Safety: ensured by caller
        unsafe {
            let node_links = links(node);
            let child = node_links.right();
            let left = node_links.left();

            let rebalance;
            let propagate_from;

            if let (Some(left), Some(child)) = (left, child) {
                let mut successor = child;
                let parent;
                let child2;

                if let Some(mut tmp) = links(child).left() {
                    // Case 3: node's successor is leftmost under node's right child subtree.
                    //
                    //    (n)          (s)
                    //    / \          / \
                    //  (x) (y)  ->  (x) (y)
                    //      /            /
                    //    (p)          (p)
                    //    /            /
                    //  (s)          (c)
                    //    \
                    //    (c)
                    let mut p;
                    loop {
                        p = successor;
                        successor = tmp;
                        match links(tmp).left() {
                            Some(next) => tmp = next,
                            None => break,
                        }
                    }
                    parent = p;
                    child2 = links(successor).right();
                    links(parent).set_left(child2);
                    links(successor).set_right(Some(child));
                    links(child).set_parent(Some(successor));

                    A::copy(node, successor);
                    A::propagate(Some(parent), Some(successor));
                } else {
                    // Case 2: node's successor is its right child.
                    //
                    //    (n)          (s)
                    //    / \          / \
                    //  (x) (s)  ->  (x) (c)
                    //        \
                    //        (c)
                    parent = successor;
                    child2 = links(successor).right();

                    A::copy(node, successor);
                }

                links(successor).set_left(Some(left));
                links(left).set_parent(Some(successor));

                let node_parent = node_links.parent();
                let node_color = node_links.color();
                self.change_child(node, Some(successor), node_parent);

                if let Some(child2) = child2 {
                    // the spliced-out successor had a single red child, recoloring it is enough
                    links(child2).set_parent_color(Some(parent), Color::Black);
                    rebalance = None;
                } else {
                    rebalance = links(successor).is_black().then_some(parent);
                }
                links(successor).set_parent_color(node_parent, node_color);
                propagate_from = Some(successor);
            } else {
                // Case 1: node has at most one child. A single child must be red and node black,
                // so the child takes over node's parent and color and no fixup is needed.
                let parent = node_links.parent();
                let color = node_links.color();
                let only = left.or(child);

                self.change_child(node, only, parent);
                if let Some(only) = only {
                    links(only).set_parent_color(parent, color);
                    rebalance = None;
                } else {
                    rebalance = if color == Color::Black { parent } else { None };
                }
                propagate_from = parent;
            }

            A::propagate(propagate_from, None);
            rebalance
        }
    }

    /// Restores the red-black invariants after erasing a black node left `parent` with a deficient
    /// (absent) child.
    pub(crate) unsafe fn erase_fixup<A: Augment<T>>(&mut self, mut parent: NonNull<T>) {
        // Safety: ensured by caller
        unsafe {
            let mut node: Link<T> = None;

            // Loop invariants:
            // - node is black (or None on the first iteration)
            // - node is not the root (parent is not None)
            // - all leaf paths through parent and node have one black node less than the other
            //   leaf paths
            loop {
                let p_links = links(parent);
                let side = if p_links.right() != node {
                    Side::Left
                } else {
                    Side::Right
                };
                let opposite = side.opposite();

                let Some(mut sibling) = p_links.child(opposite) else {
                    unreachable!("deficient node {node:?} has no sibling");
                };

                if links(sibling).is_red() {
                    // Case 1 - rotate at parent (shown for side = left).
                    //
                    //     P               S
                    //    / \             / \
                    //   N   s    -->    p   Sr
                    //      / \         / \
                    //     Sl  Sr      N   Sl
                    let Some(tmp1) = links(sibling).child(side) else {
                        unreachable!("red sibling {sibling:?} must have two black children");
                    };
                    p_links.set_child(opposite, Some(tmp1));
                    links(sibling).set_child(side, Some(parent));
                    links(tmp1).set_parent_color(Some(parent), Color::Black);
                    self.rotate_set_parents(parent, sibling, Color::Red);
                    A::rotate(parent, sibling);
                    sibling = tmp1;
                }

                let mut far = links(sibling).child(opposite);
                if !is_red(far) {
                    let near = links(sibling).child(side);
                    let Some(near) = near.filter(|n| links(*n).is_red()) else {
                        // Case 2 - sibling color flip (p could be either color here).
                        //
                        //    (p)           (p)
                        //    / \           / \
                        //   N   S    -->  N   s
                        //      / \           / \
                        //     Sl  Sr        Sl  Sr
                        //
                        // A red parent (always the case when coming from case 1) absorbs the
                        // deficiency by turning black, otherwise it moves up to p.
                        links(sibling).set_parent_color(Some(parent), Color::Red);
                        if p_links.is_red() {
                            p_links.set_color(Color::Black);
                        } else {
                            node = Some(parent);
                            if let Some(grandparent) = p_links.parent() {
                                parent = grandparent;
                                continue;
                            }
                        }
                        break;
                    };

                    // Case 3 - rotate at sibling (p could be either color here).
                    //
                    //   (p)           (p)
                    //   / \           / \
                    //  N   S    -->  N   sl
                    //     / \             \
                    //    sl  Sr            S
                    //                       \
                    //                        Sr
                    //
                    // p and sl may both be red now, case 4 fixes that by giving sl the color of p
                    // and making p black.
                    let tmp1 = links(near).child(opposite);
                    links(sibling).set_child(side, tmp1);
                    links(near).set_child(opposite, Some(sibling));
                    p_links.set_child(opposite, Some(near));
                    if let Some(tmp1) = tmp1 {
                        links(tmp1).set_parent_color(Some(sibling), Color::Black);
                    }
                    A::rotate(sibling, near);
                    far = Some(sibling);
                    sibling = near;
                }

                // Case 4 - rotate at parent + color flips (p and sl could be either color here;
                // afterwards s has p's color, p is black and sl keeps its color).
                //
                //      (p)             (s)
                //      / \             / \
                //     N   S     -->   P   Sr
                //        / \         / \
                //      (sl) sr      N  (sl)
                let Some(far) = far else {
                    unreachable!("sibling {sibling:?} lost its red far child");
                };
                let tmp2 = links(sibling).child(side);
                p_links.set_child(opposite, tmp2);
                links(sibling).set_child(side, Some(parent));
                links(far).set_parent_color(Some(sibling), Color::Black);
                if let Some(tmp2) = tmp2 {
                    links(tmp2).set_parent(Some(parent));
                }
                self.rotate_set_parents(parent, sibling, Color::Black);
                A::rotate(parent, sibling);
                break;
            }
        }
    }
}
