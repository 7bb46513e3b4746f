//! Parsing of bracketed Newick-style tree descriptions.
//!
//! Each node is written `(child,child,...)label[&key=value,...]:length`,
//! every part optional: the parenthesised child list is absent on leaves,
//! labels may be missing (anonymous nodes), the annotation block is rare,
//! and a missing `:length` falls back to a branch length of 1. Whitespace
//! between tokens is insignificant and square-bracket comments without the
//! `&` marker are skipped. A trailing `;` is consumed when present; any
//! other text after the outermost node is an error.
//!
//! Branch lengths are unsigned decimals, scientific notation accepted.
//! Ages propagate outward from the root: the root's age comes from the
//! parser configuration and every child sits at `parent age - length`.
//! The root's own `:length` suffix, if present, is read and dropped.

use tracing::debug;

use crate::{
    error::{TreeError, TreeResult},
    Age, NodeId, TimeTree,
};

mod writer;

/// Branch length assumed when a node carries no `:length` suffix.
pub(crate) const DEFAULT_BRANCH_LENGTH: f64 = 1.0;

/// How the parser anchors absolute ages onto the branch-length structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootAge {
    /// The root sits at the given age and children derive outward from it.
    Fixed(Age),
    /// The root age is derived from the deepest tip, so the youngest leaf
    /// sits exactly at age zero.
    LeafAnchored,
}

/// A configurable parser for bracketed tree descriptions.
///
/// The default anchors the root at age 0, which only admits zero-length
/// branches; real trees either supply the root age with
/// [`with_root_age`](NewickParser::with_root_age) or let the tips anchor
/// the clock with
/// [`with_leaf_anchored_ages`](NewickParser::with_leaf_anchored_ages).
///
/// # Examples
///
/// ```
/// use timetree::NewickParser;
///
/// let tree = NewickParser::new()
///     .with_root_age(3.0)
///     .parse("(A:1,(B:1,C:2):1):0;")?;
///
/// assert_eq!(tree.age(tree.root())?, 3.0);
/// assert_eq!(tree.num_leaves(), 3);
/// # Ok::<(), timetree::TreeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct NewickParser {
    root_age: RootAge,
}

impl Default for NewickParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NewickParser {
    pub fn new() -> Self {
        Self {
            root_age: RootAge::Fixed(0.0),
        }
    }

    /// Anchors the root at `age`.
    pub fn with_root_age(mut self, age: Age) -> Self {
        self.root_age = RootAge::Fixed(age);
        self
    }

    /// Derives the root age from the deepest tip instead of fixing it.
    pub fn with_leaf_anchored_ages(mut self) -> Self {
        self.root_age = RootAge::LeafAnchored;
        self
    }

    /// Parses `text` into a validated [`TimeTree`].
    ///
    /// Grammar violations fail with [`TreeError::MalformedDescription`]
    /// carrying the byte position; a branch length that would push a node
    /// below age zero fails with [`TreeError::InvalidAge`]. No partial
    /// tree escapes a failed parse.
    pub fn parse(&self, text: &str) -> TreeResult<TimeTree> {
        let mut cursor = Cursor::new(text);
        cursor.skip_insignificant()?;
        if cursor.at_end() {
            return Err(TreeError::malformed(0, "empty tree description"));
        }

        let mut nodes = Vec::new();
        let root = cursor.parse_node(&mut nodes)?;

        cursor.skip_insignificant()?;
        cursor.eat(b';');
        cursor.skip_insignificant()?;
        if !cursor.at_end() {
            return Err(TreeError::malformed(
                cursor.pos,
                format!("trailing input '{}'", cursor.context()),
            ));
        }

        debug!(count = nodes.len(), "parsed tree description");
        self.realize(&nodes, root)
    }

    /// Turns the raw parse into a tree by assigning absolute ages.
    fn realize(&self, nodes: &[RawNode], root: usize) -> TreeResult<TimeTree> {
        let root_age = match self.root_age {
            RootAge::Fixed(age) => age,
            RootAge::LeafAnchored => leaf_anchored_root_age(nodes, root),
        };
        if !root_age.is_finite() {
            return Err(TreeError::invalid_age(format!(
                "root age {root_age} is not finite"
            )));
        }
        if root_age < 0.0 {
            return Err(TreeError::invalid_age(format!(
                "root age {root_age} is negative"
            )));
        }

        let raw_root = &nodes[root];
        let mut tree = TimeTree::create_root(root_age, raw_root.label.as_deref())?;
        for (key, value) in &raw_root.annotations {
            tree.annotate(tree.root(), key, value)?;
        }

        let mut stack: Vec<(usize, NodeId)> = raw_root
            .children
            .iter()
            .rev()
            .map(|&child| (child, tree.root()))
            .collect();

        while let Some((raw_index, parent)) = stack.pop() {
            let raw = &nodes[raw_index];
            let parent_age = tree.get_checked(parent)?.age();
            let length = raw.length.unwrap_or(DEFAULT_BRANCH_LENGTH);
            let age = parent_age - length;
            if age < 0.0 {
                return Err(TreeError::invalid_age(format!(
                    "branch length {length} drops below age zero under a parent of age {parent_age}"
                )));
            }
            let id = tree.add_child(parent, age, raw.label.as_deref())?;
            for (key, value) in &raw.annotations {
                tree.annotate(id, key, value)?;
            }
            for &child in raw.children.iter().rev() {
                stack.push((child, id));
            }
        }

        tree.validate()?;
        Ok(tree)
    }
}

/// One node as read off the text, before ages exist. Children index into
/// the same scratch vector; a node always appears after its children.
struct RawNode {
    label: Option<String>,
    length: Option<f64>,
    annotations: Vec<(String, String)>,
    children: Vec<usize>,
}

/// Cumulative branch time of the deepest tip below `root`, which is the
/// root age that puts that tip at age zero.
fn leaf_anchored_root_age(nodes: &[RawNode], root: usize) -> Age {
    let mut max_depth: f64 = 0.0;
    let mut stack: Vec<(usize, f64)> = vec![(root, 0.0)];
    while let Some((index, depth)) = stack.pop() {
        let raw = &nodes[index];
        if raw.children.is_empty() && depth > max_depth {
            max_depth = depth;
        }
        for &child in &raw.children {
            let length = nodes[child].length.unwrap_or(DEFAULT_BRANCH_LENGTH);
            stack.push((child, depth + length));
        }
    }
    max_depth
}

fn is_unquoted_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'-')
}

struct Cursor<'s> {
    text: &'s str,
    bytes: &'s [u8],
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn new(text: &'s str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> TreeResult<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(TreeError::malformed(
                self.pos,
                format!("expected '{}', found '{}'", byte as char, self.context()),
            ))
        }
    }

    /// A short excerpt of what comes next, for error messages.
    fn context(&self) -> String {
        if self.at_end() {
            return "end of input".to_owned();
        }
        self.text[self.pos..].chars().take(12).collect()
    }

    /// Skips whitespace and square-bracket comments. A `[&` block is an
    /// annotation, not a comment, and is left in place.
    fn skip_insignificant(&mut self) -> TreeResult<()> {
        loop {
            while matches!(self.peek(), Some(byte) if byte.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.peek() == Some(b'[') && self.bytes.get(self.pos + 1) != Some(&b'&') {
                let open = self.pos;
                loop {
                    self.pos += 1;
                    match self.peek() {
                        Some(b']') => {
                            self.pos += 1;
                            break;
                        }
                        Some(_) => continue,
                        None => return Err(TreeError::malformed(open, "unclosed comment")),
                    }
                }
                continue;
            }
            return Ok(());
        }
    }

    /// Recursive descent over one node; recursion depth is bounded by the
    /// bracket nesting of the input.
    fn parse_node(&mut self, nodes: &mut Vec<RawNode>) -> TreeResult<usize> {
        let mut children = Vec::new();
        self.skip_insignificant()?;
        if self.eat(b'(') {
            loop {
                children.push(self.parse_node(nodes)?);
                self.skip_insignificant()?;
                if !self.eat(b',') {
                    break;
                }
            }
            self.skip_insignificant()?;
            self.expect(b')')?;
        }

        let label = self.parse_label()?;
        let annotations = self.parse_annotations()?;
        let length = self.parse_length()?;

        nodes.push(RawNode {
            label,
            length,
            annotations,
            children,
        });
        Ok(nodes.len() - 1)
    }

    fn parse_label(&mut self) -> TreeResult<Option<String>> {
        self.skip_insignificant()?;
        match self.peek() {
            Some(b'\'') | Some(b'"') => self.parse_quoted().map(Some),
            Some(byte) if is_unquoted_byte(byte) => Ok(Some(self.parse_unquoted())),
            _ => Ok(None),
        }
    }

    fn parse_unquoted(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(byte) if is_unquoted_byte(byte)) {
            self.pos += 1;
        }
        self.text[start..self.pos].to_owned()
    }

    fn parse_quoted(&mut self) -> TreeResult<String> {
        let open = self.pos;
        let quote = match self.peek() {
            Some(quote) => quote,
            None => return Err(TreeError::malformed(open, "expected quote")),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == quote {
                let label = self.text[start..self.pos].to_owned();
                self.pos += 1;
                return Ok(label);
            }
            self.pos += 1;
        }
        Err(TreeError::malformed(open, "unclosed quoted label"))
    }

    /// `[&key=value,...]` blocks. Keys and values are the same tokens as
    /// labels, so numeric values and quoted strings both work.
    fn parse_annotations(&mut self) -> TreeResult<Vec<(String, String)>> {
        self.skip_insignificant()?;
        let mut annotations = Vec::new();
        if !(self.peek() == Some(b'[') && self.bytes.get(self.pos + 1) == Some(&b'&')) {
            return Ok(annotations);
        }
        self.pos += 2;
        loop {
            let key = self.required_string("annotation key")?;
            self.skip_insignificant()?;
            self.expect(b'=')?;
            let value = self.required_string("annotation value")?;
            annotations.push((key, value));
            self.skip_insignificant()?;
            if self.eat(b',') {
                continue;
            }
            self.expect(b']')?;
            return Ok(annotations);
        }
    }

    fn required_string(&mut self, what: &str) -> TreeResult<String> {
        self.skip_insignificant()?;
        match self.peek() {
            Some(b'\'') | Some(b'"') => self.parse_quoted(),
            Some(byte) if is_unquoted_byte(byte) => Ok(self.parse_unquoted()),
            _ => Err(TreeError::malformed(
                self.pos,
                format!("expected {what}, found '{}'", self.context()),
            )),
        }
    }

    /// `:length` suffix. Lengths must be unsigned; a sign is only valid
    /// inside a scientific-notation exponent.
    fn parse_length(&mut self) -> TreeResult<Option<f64>> {
        self.skip_insignificant()?;
        if !self.eat(b':') {
            return Ok(None);
        }
        self.skip_insignificant()?;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            return Err(TreeError::malformed(
                self.pos,
                "branch lengths must be unsigned",
            ));
        }
        let start = self.pos;
        let mut prev = 0u8;
        while let Some(byte) = self.peek() {
            let take = match byte {
                b'0'..=b'9' | b'.' | b'e' | b'E' => true,
                b'+' | b'-' => matches!(prev, b'e' | b'E'),
                _ => false,
            };
            if !take {
                break;
            }
            prev = byte;
            self.pos += 1;
        }
        let token = &self.text[start..self.pos];
        if token.is_empty() {
            return Err(TreeError::malformed(start, "missing branch length after ':'"));
        }
        let length: f64 = token
            .parse()
            .map_err(|_| TreeError::malformed(start, format!("invalid branch length '{token}'")))?;
        if !length.is_finite() {
            return Err(TreeError::malformed(
                start,
                format!("branch length '{token}' is not finite"),
            ));
        }
        Ok(Some(length))
    }
}
