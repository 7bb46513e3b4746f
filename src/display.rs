use std::fmt::Write;

use colored::Colorize;

use crate::TimeTree;

/// Box-drawing rendition of the tree, one node per line in pre-order.
///
/// Labels are colored, ages ride along in parens. Mostly useful in tests
/// and debug logs; plotting goes through [`crate::LayoutEngine`].
impl std::fmt::Display for TimeTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("\n")?;

        let mut iter = self.iter().peekable();

        let mut root_children = false;

        let column_width = 2;

        loop {
            if let Some(node) = iter.next() {
                // Peek at the next node to see if there are siblings
                let has_siblings = if let Some(next_node) = iter.peek() {
                    node.depth() == next_node.depth()
                } else {
                    false
                };

                let has_children = !node.is_leaf();

                if node.depth() == 0 {
                    root_children = has_children
                }

                // The position of the first character of the payload from the previous row
                let pos = node.depth() * column_width;

                if node.depth() == 0 {
                    if has_children || has_siblings {
                        f.write_char('┏')?;
                    } else {
                        f.write_char('━')?;
                    }
                } else {
                    for i in 0..pos {
                        if i % column_width == 0 {
                            f.write_char('┃')?;
                        } else {
                            f.write_char(' ')?;
                        }
                    }

                    if has_children || has_siblings {
                        f.write_char('┣')?;
                    } else {
                        f.write_char('┗')?;
                    }
                }

                let name = match node.label() {
                    Some(label) => label.cyan(),
                    None => "·".dimmed(),
                };
                f.write_fmt(format_args!(
                    " {} {}",
                    name,
                    format!("({})", node.age()).yellow()
                ))?;

                f.write_char('\n')?;
            } else {
                // Finished node iteration
                if root_children {
                    f.write_str("┗")?;
                }
                return Ok(());
            }
        }
    }
}
