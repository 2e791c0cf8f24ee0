use crate::links::links;
use crate::{Color, Linked, Root, Side};
use core::fmt;
use core::ptr::NonNull;

/// Renders a [`Root`] in graphviz format, see [`Root::dot`].
pub struct Dot<'a, T>
where
    T: Linked,
{
    pub(crate) tree: &'a Root<T>,
}

impl<T> Dot<'_, T>
where
    T: Linked + fmt::Debug,
{
    #[allow(
        clippy::only_used_in_recursion,
        reason = "need to ensure tree is borrowed for the entire time we operate on it"
    )]
    fn node_fmt(&self, f: &mut fmt::Formatter, node: NonNull<T>) -> fmt::Result {
        // Safety: the tree is borrowed, so every node reachable from the root is live
        unsafe {
            let node_links = links(node);

            let id = node.as_ptr().addr();
            let color = match node_links.color() {
                Color::Red => "red",
                Color::Black => "black",
            };
            writeln!(
                f,
                r#"  {id} [label="{node:?}", color={color}, fontcolor={color}];"#,
                node = node.as_ref(),
            )?;

            if let Some(up) = node_links.parent() {
                writeln!(
                    f,
                    r#"  {id} -> {} [label="up", style=dotted];"#,
                    up.as_ptr().addr()
                )?;
            }

            for side in [Side::Left, Side::Right] {
                if let Some(child) = node_links.child(side) {
                    writeln!(
                        f,
                        r#"  {id} -> {} [label="{side}"];"#,
                        child.as_ptr().addr()
                    )?;
                    self.node_fmt(f, child)?;
                }
            }
        }

        Ok(())
    }
}

impl<T> fmt::Display for Dot<'_, T>
where
    T: Linked + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("digraph {\n")?;
        if let Some(root) = self.tree.node() {
            self.node_fmt(f, root)?;
        }
        f.write_str("}\n")
    }
}

impl<T> fmt::Debug for Dot<'_, T>
where
    T: Linked + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
