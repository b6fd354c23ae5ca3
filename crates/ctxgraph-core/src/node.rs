//! Node types: identity and matching classification

use serde::{Deserialize, Serialize};

/// Stable index of a node inside one [`GraphStore`](crate::GraphStore) arena.
///
/// Ids are never reused; a removed node simply leaves a dead arena slot
/// behind. Edges refer to their endpoints through `NodeId`, never through
/// references, so relabeling and removal cannot invalidate edge records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// How a node participates in pattern matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A named fact node; matches only a node with the same label.
    Concrete,
    /// An anonymous pattern node (`?`, `?0`, ... or an empty label); binds to
    /// any world node without a counterpart label in the pattern.
    Unknown,
    /// A pattern node whose label is a regex matched against world labels.
    RegexPattern,
}

/// A node in the context graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub label: String,
    pub kind: NodeKind,
}

impl Node {
    /// Create a node, deriving its kind from the label: empty labels and
    /// labels starting with `?` are unknown, everything else is concrete.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let kind = if label.is_empty() || label.starts_with('?') {
            NodeKind::Unknown
        } else {
            NodeKind::Concrete
        };
        Self { label, kind }
    }

    pub fn is_unknown(&self) -> bool {
        self.kind == NodeKind::Unknown
    }

    pub fn is_regex(&self) -> bool {
        self.kind == NodeKind::RegexPattern
    }

    /// A labeled node is anything a pattern names explicitly, regex included.
    pub fn is_labeled(&self) -> bool {
        self.kind != NodeKind::Unknown
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_derivation() {
        assert_eq!(Node::new("server_1").kind, NodeKind::Concrete);
        assert_eq!(Node::new("?").kind, NodeKind::Unknown);
        assert_eq!(Node::new("?12").kind, NodeKind::Unknown);
        assert_eq!(Node::new("").kind, NodeKind::Unknown);
    }

    #[test]
    fn test_labeled_includes_regex() {
        let mut node = Node::new("serv.*");
        node.kind = NodeKind::RegexPattern;
        assert!(node.is_labeled());
        assert!(!Node::new("?").is_labeled());
    }
}
