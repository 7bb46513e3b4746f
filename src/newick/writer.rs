use std::fmt::Write as _;

use crate::{node::Node, NodeId, TimeTree};

fn needs_quoting(label: &str) -> bool {
    label.is_empty() || !label.bytes().all(crate::newick::is_unquoted_byte)
}

fn push_label(out: &mut String, label: &str) {
    if !needs_quoting(label) {
        out.push_str(label);
    } else if label.contains('\'') {
        out.push('"');
        out.push_str(label);
        out.push('"');
    } else {
        out.push('\'');
        out.push_str(label);
        out.push('\'');
    }
}

enum Step {
    Enter { id: NodeId, first: bool },
    Close(NodeId),
}

impl TimeTree {
    /// Serializes the tree back to bracketed Newick text.
    ///
    /// The inverse of [`NewickParser`](crate::NewickParser): parsing the
    /// output with the same root age reproduces the topology, labels, and
    /// annotations, with ages matching within floating-point tolerance.
    /// Every non-root node gets an explicit `:length`; the root carries
    /// none. Labels using characters outside `[A-Za-z0-9_.-]` come out
    /// quoted, annotation values always double-quoted.
    ///
    /// Quoted text has no escape syntax, so the round trip requires that
    /// no label contains both `'` and `"` and that no annotation value
    /// contains `"`. Offending trees serialize to text the parser rejects.
    pub fn to_newick(&self) -> String {
        let mut out = String::with_capacity(self.len() * 16);
        let mut stack = vec![Step::Enter {
            id: self.root(),
            first: true,
        }];

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter { id, first } => {
                    if !first {
                        out.push(',');
                    }
                    let Some(node) = self.get(id) else { continue };
                    if node.is_leaf() {
                        self.write_node(&mut out, node);
                    } else {
                        out.push('(');
                        stack.push(Step::Close(id));
                        for (position, child) in node.children().iter().enumerate().rev() {
                            stack.push(Step::Enter {
                                id: *child,
                                first: position == 0,
                            });
                        }
                    }
                }
                Step::Close(id) => {
                    out.push(')');
                    if let Some(node) = self.get(id) {
                        self.write_node(&mut out, node);
                    }
                }
            }
        }

        out.push(';');
        out
    }

    fn write_node(&self, out: &mut String, node: &Node) {
        if let Some(label) = node.label() {
            push_label(out, label);
        }
        if !node.annotations().is_empty() {
            out.push_str("[&");
            for (position, (key, value)) in node.annotations().iter().enumerate() {
                if position > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{key}=\"{value}\"");
            }
            out.push(']');
        }
        if let Some(parent) = node.parent() {
            if let Some(parent_node) = self.get(parent) {
                let _ = write!(out, ":{}", parent_node.age() - node.age());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test::{find, sample_newick, sample_tree};
    use crate::tree::EPSILON;
    use crate::{NewickParser, TimeTree, TreeBuilder, TreeError};

    #[test]
    fn test_serialize_sample() {
        let tree = sample_tree();
        assert_eq!(tree.to_newick(), "(A:1,(B:1,C:2):1);");
    }

    #[test]
    fn test_round_trip_preserves_structure_and_ages() {
        let tree = NewickParser::new()
            .with_root_age(3.0)
            .parse(sample_newick())
            .unwrap();
        let back = NewickParser::new()
            .with_root_age(3.0)
            .parse(&tree.to_newick())
            .unwrap();

        assert_eq!(back.len(), tree.len());
        assert_eq!(back.fingerprint(), tree.fingerprint());
        for label in ["A", "B", "C"] {
            let original = tree.age(find(&tree, label)).unwrap();
            let reparsed = back.age(find(&back, label)).unwrap();
            assert!((original - reparsed).abs() < EPSILON);
        }
    }

    #[test]
    fn test_round_trip_uneven_lengths() {
        let tree = TreeBuilder::<TreeError>::new()
            .root(10.0, None, |root| {
                root.child(2.9, Some("slow"), |_| Ok(()))?;
                root.child(7.25, None, |inner| {
                    inner.child(0.125, Some("fast"), |_| Ok(()))?;
                    inner.child(7.25, Some("stuck"), |_| Ok(()))?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap()
            .done()
            .unwrap();

        let back = NewickParser::new()
            .with_root_age(10.0)
            .parse(&tree.to_newick())
            .unwrap();
        assert_eq!(back.num_leaves(), 3);
        for node in tree.iter() {
            if let Some(label) = node.label() {
                let reparsed = back.age(find(&back, label)).unwrap();
                assert!(
                    (node.age() - reparsed).abs() < EPSILON,
                    "{label}: {} vs {reparsed}",
                    node.age()
                );
            }
        }
    }

    #[test]
    fn test_labels_are_quoted_when_needed() {
        let mut tree = TimeTree::create_root(1.0, None).unwrap();
        tree.add_child(tree.root(), 0.0, Some("Homo sapiens")).unwrap();
        tree.add_child(tree.root(), 0.0, Some("plain_one")).unwrap();

        let text = tree.to_newick();
        assert_eq!(text, "('Homo sapiens':1,plain_one:1);");

        let back = NewickParser::new().with_root_age(1.0).parse(&text).unwrap();
        assert!(back.iter().any(|n| n.label() == Some("Homo sapiens")));
    }

    #[test]
    fn test_label_with_both_quote_kinds_has_no_writable_form() {
        let mut tree = sample_tree();
        tree.set_label(find(&tree, "A"), Some("a'b\"c")).unwrap();

        let err = NewickParser::new()
            .with_root_age(3.0)
            .parse(&tree.to_newick())
            .unwrap_err();
        assert!(matches!(err, TreeError::MalformedDescription { .. }));
    }

    #[test]
    fn test_annotations_round_trip() {
        let mut tree = TimeTree::create_root(2.0, Some("root")).unwrap();
        let a = tree.add_child(tree.root(), 1.0, Some("A")).unwrap();
        tree.annotate(a, "host", "bat").unwrap();
        tree.annotate(a, "rate", "0.3").unwrap();

        let text = tree.to_newick();
        assert_eq!(text, "(A[&host=\"bat\",rate=\"0.3\"]:1)root;");

        let back = NewickParser::new().with_root_age(2.0).parse(&text).unwrap();
        let a = find(&back, "A");
        assert_eq!(back.get(a).unwrap().annotation("host"), Some("bat"));
        assert_eq!(back.get(a).unwrap().annotation("rate"), Some("0.3"));
    }

    #[test]
    fn test_single_node_tree() {
        let tree = TimeTree::create_root(4.0, Some("only")).unwrap();
        assert_eq!(tree.to_newick(), "only;");

        let anonymous = TimeTree::create_root(4.0, None).unwrap();
        assert_eq!(anonymous.to_newick(), ";");
        let back = NewickParser::new().with_root_age(4.0).parse(";").unwrap();
        assert_eq!(back.len(), 1);
    }
}
