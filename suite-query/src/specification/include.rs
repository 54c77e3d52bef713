//! Relationship expansion paths
//!
//! Expansions are kept as a tree of path segments. Registering
//! `"category.subcategories.images"` inserts that chain; registering a prefix or
//! the same chain again changes nothing. The evaluator walks the tree
//! depth-first, so each nested expansion is applied right after its parent.

use std::fmt;

/// Full chain of segments from a root relationship to one node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpansionPath(Vec<String>);

impl ExpansionPath {
    /// Parse a dotted path; empty segments are dropped
    ///
    /// # Example
    ///
    /// ```rust
    /// use suite_query::specification::ExpansionPath;
    ///
    /// let path = ExpansionPath::parse("category..images.image");
    /// assert_eq!(path.segments(), ["category", "images", "image"]);
    /// assert_eq!(path.to_string(), "category.images.image");
    /// ```
    pub fn parse(dotted: &str) -> Self {
        Self(
            dotted
                .split('.')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Build from explicit segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The segments, root first
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether the path has no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The last segment
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }
}

impl fmt::Display for ExpansionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// One node of the include tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    segment: String,
    children: Vec<Include>,
}

impl Include {
    fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            children: Vec::new(),
        }
    }

    /// Relationship name at this level
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Nested expansions, in registration order
    pub fn children(&self) -> &[Include] {
        &self.children
    }
}

/// Ordered forest of expansion paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    roots: Vec<Include>,
}

impl IncludeTree {
    /// Insert a path, reusing any prefix already registered
    pub fn insert(&mut self, path: &ExpansionPath) {
        let mut level = &mut self.roots;
        for segment in path.segments() {
            let index = match level.iter().position(|node| node.segment == *segment) {
                Some(index) => index,
                None => {
                    level.push(Include::new(segment));
                    level.len() - 1
                }
            };
            level = &mut level[index].children;
        }
    }

    /// Root nodes, in registration order
    pub fn roots(&self) -> &[Include] {
        &self.roots
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Every node's full path in depth-first, registration order
    ///
    /// # Example
    ///
    /// ```rust
    /// use suite_query::specification::{ExpansionPath, IncludeTree};
    ///
    /// let mut tree = IncludeTree::default();
    /// tree.insert(&ExpansionPath::parse("category.images"));
    /// tree.insert(&ExpansionPath::parse("vouchers"));
    /// tree.insert(&ExpansionPath::parse("category.subcategories"));
    ///
    /// let walked: Vec<String> = tree.walk().iter().map(ToString::to_string).collect();
    /// assert_eq!(
    ///     walked,
    ///     ["category", "category.images", "category.subcategories", "vouchers"]
    /// );
    /// ```
    pub fn walk(&self) -> Vec<ExpansionPath> {
        let mut out = Vec::new();
        let root = ExpansionPath(Vec::new());
        for node in &self.roots {
            walk_node(node, &root, &mut out);
        }
        out
    }
}

fn walk_node(node: &Include, parent: &ExpansionPath, out: &mut Vec<ExpansionPath>) {
    let path = parent.child(&node.segment);
    out.push(path.clone());
    for child in &node.children {
        walk_node(child, &path, out);
    }
}
