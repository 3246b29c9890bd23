//! Sparse-include specifications.
//!
//! Callers select which associations a render traverses, either with a
//! wildcard (`*`, all declared associations of the current type) or with
//! ordered dotted paths (`comments.author,author`). The parsed tree is
//! built once per render request, read-only during the walk, and
//! discarded after.

use crate::error::{Error, Result};

static EMPTY: IncludeTree = IncludeTree::none();

/// Parsed include specification for one level of the association graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    wildcard: bool,
    nodes: Vec<IncludeNode>,
}

/// One explicitly selected association and its nested selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeNode {
    name: String,
    children: IncludeTree,
}

impl IncludeNode {
    /// The selected association's accessor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The nested selection below this association.
    pub fn children(&self) -> &IncludeTree {
        &self.children
    }
}

impl IncludeTree {
    /// A selection including no associations.
    pub const fn none() -> Self {
        Self {
            wildcard: false,
            nodes: Vec::new(),
        }
    }

    /// A selection including every declared association, one level deep.
    pub const fn all() -> Self {
        Self {
            wildcard: true,
            nodes: Vec::new(),
        }
    }

    /// Parse a caller-supplied include specification.
    ///
    /// Accepted forms: `*`, comma-separated dotted paths
    /// (`comments.author,author`), and `*` as a trailing path segment
    /// (`comments.*`). Paths sharing a prefix merge in first-seen order.
    /// An empty spec selects nothing.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut tree = IncludeTree::none();
        for path in spec.split(',') {
            let path = path.trim();
            if path.is_empty() {
                if spec.trim().is_empty() {
                    continue;
                }
                return Err(Error::invalid_include(spec, "empty path"));
            }
            let segments: Vec<&str> = path.split('.').collect();
            tree.insert_path(spec, &segments)?;
        }
        Ok(tree)
    }

    fn insert_path(&mut self, spec: &str, segments: &[&str]) -> Result<()> {
        let (segment, rest) = match segments.split_first() {
            Some(parts) => parts,
            None => return Ok(()),
        };
        if *segment == "*" {
            if !rest.is_empty() {
                return Err(Error::invalid_include(
                    spec,
                    "wildcard must be the last segment",
                ));
            }
            self.wildcard = true;
            return Ok(());
        }
        if segment.is_empty() {
            return Err(Error::invalid_include(spec, "empty segment"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(Error::invalid_include(
                spec,
                format!("invalid segment '{segment}'"),
            ));
        }
        let index = match self.nodes.iter().position(|n| n.name == *segment) {
            Some(index) => index,
            None => {
                self.nodes.push(IncludeNode {
                    name: segment.to_string(),
                    children: IncludeTree::none(),
                });
                self.nodes.len() - 1
            }
        };
        self.nodes[index].children.insert_path(spec, rest)
    }

    /// Check if the wildcard was selected at this level.
    pub fn includes_all(&self) -> bool {
        self.wildcard
    }

    /// Check if this selection includes no associations.
    pub fn is_empty(&self) -> bool {
        !self.wildcard && self.nodes.is_empty()
    }

    /// Explicitly selected associations, in first-seen order.
    pub fn nodes(&self) -> &[IncludeNode] {
        &self.nodes
    }

    /// The nested selection for an association, or `None` when the
    /// association is not included at this level.
    pub fn child(&self, name: &str) -> Option<&IncludeTree> {
        if let Some(node) = self.nodes.iter().find(|n| n.name == name) {
            return Some(&node.children);
        }
        self.wildcard.then_some(&EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wildcard() {
        let tree = IncludeTree::parse("*").unwrap();
        assert!(tree.includes_all());
        assert!(tree.child("anything").is_some());
    }

    #[test]
    fn test_parse_empty_selects_nothing() {
        let tree = IncludeTree::parse("").unwrap();
        assert!(tree.is_empty());
        assert!(tree.child("comments").is_none());
    }

    #[test]
    fn test_parse_dotted_paths_in_order() {
        let tree = IncludeTree::parse("comments.author,author").unwrap();
        let names: Vec<_> = tree.nodes().iter().map(|n| n.name()).collect();
        assert_eq!(names, ["comments", "author"]);
        let comments = tree.child("comments").unwrap();
        assert!(comments.child("author").is_some());
        assert!(tree.child("author").unwrap().is_empty());
    }

    #[test]
    fn test_parse_merges_shared_prefixes() {
        let tree = IncludeTree::parse("comments.author,comments.votes").unwrap();
        assert_eq!(tree.nodes().len(), 1);
        let comments = tree.child("comments").unwrap();
        let names: Vec<_> = comments.nodes().iter().map(|n| n.name()).collect();
        assert_eq!(names, ["author", "votes"]);
    }

    #[test]
    fn test_parse_nested_wildcard() {
        let tree = IncludeTree::parse("comments.*").unwrap();
        assert!(!tree.includes_all());
        assert!(tree.child("comments").unwrap().includes_all());
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert!(IncludeTree::parse("comments..author").is_err());
        assert!(IncludeTree::parse("comments,").is_err());
        assert!(IncludeTree::parse("*.comments").is_err());
        assert!(IncludeTree::parse("Comments").is_err());
    }
}
