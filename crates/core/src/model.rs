use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const SEPARATOR: char = '/';

/// Handle into the node arena. Stable for the lifetime of the node it
/// names; slots are recycled after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Dir,
}

/// Kind-specific payload: a directory owns its (sorted) child list, a
/// file owns its contents. A file having children is unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodePayload {
    File { contents: Vec<u8> },
    Dir { children: Vec<NodeId> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Back-reference only; ownership runs parent -> children.
    pub parent: Option<NodeId>,
    /// Full path from the tree root, `/`-separated, never empty.
    pub path: String,
    pub payload: NodePayload,
}

/// Result of a `stat` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stat {
    Directory,
    File { length: usize },
}

impl Node {
    pub(crate) fn new_dir(id: NodeId, path: String) -> Self {
        Node {
            id,
            parent: None,
            path,
            payload: NodePayload::Dir {
                children: Vec::new(),
            },
        }
    }

    pub(crate) fn new_file(id: NodeId, path: String, contents: Vec<u8>) -> Self {
        Node {
            id,
            parent: None,
            path,
            payload: NodePayload::File { contents },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.payload {
            NodePayload::File { .. } => NodeKind::File,
            NodePayload::Dir { .. } => NodeKind::Dir,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.payload, NodePayload::File { .. })
    }

    /// Child ids in sibling order; empty for a file.
    pub fn children(&self) -> &[NodeId] {
        match &self.payload {
            NodePayload::Dir { children } => children,
            NodePayload::File { .. } => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.payload {
            NodePayload::Dir { children } => Some(children),
            NodePayload::File { .. } => None,
        }
    }

    /// File contents, or `None` for a directory.
    pub fn contents(&self) -> Option<&[u8]> {
        match &self.payload {
            NodePayload::File { contents } => Some(contents),
            NodePayload::Dir { .. } => None,
        }
    }

    /// Swaps in new contents and hands back the old buffer. `None` for
    /// a directory.
    pub(crate) fn replace_contents(&mut self, new: Vec<u8>) -> Option<Vec<u8>> {
        match &mut self.payload {
            NodePayload::File { contents } => Some(std::mem::replace(contents, new)),
            NodePayload::Dir { .. } => None,
        }
    }

    /// Final path segment.
    pub fn local_name(&self) -> &str {
        self.path
            .rsplit(SEPARATOR)
            .next()
            .unwrap_or(self.path.as_str())
    }

    pub fn sibling_cmp(&self, other: &Node) -> Ordering {
        sibling_order(self.kind(), &self.path, other.kind(), &other.path)
    }
}

/// Total order for children of one directory: any file sorts before
/// any directory, same-kind nodes compare by path.
pub fn sibling_order(a_kind: NodeKind, a_path: &str, b_kind: NodeKind, b_path: &str) -> Ordering {
    match (a_kind, b_kind) {
        (NodeKind::File, NodeKind::Dir) => Ordering::Less,
        (NodeKind::Dir, NodeKind::File) => Ordering::Greater,
        _ => a_path.cmp(b_path),
    }
}

/// `parent/name`, or just `name` when there is no parent.
pub fn build_path(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(base) => {
            let mut path = String::with_capacity(base.len() + 1 + name.len());
            path.push_str(base);
            path.push(SEPARATOR);
            path.push_str(name);
            path
        }
        None => name.to_string(),
    }
}

/// True when `path` continues below `prefix`, i.e. starts with
/// `prefix` followed immediately by a separator. Equality is not an
/// extension, and `"ab"` does not extend `"a"`.
pub fn path_extends(prefix: &str, path: &str) -> bool {
    path.len() > prefix.len()
        && path.starts_with(prefix)
        && path.as_bytes()[prefix.len()] == SEPARATOR as u8
}

/// The local name of `child` under `parent`, if `child` is exactly one
/// non-empty segment below it.
pub fn local_name_under<'a>(parent: &str, child: &'a str) -> Option<&'a str> {
    if !path_extends(parent, child) {
        return None;
    }
    let rest = &child[parent.len() + 1..];
    (!rest.is_empty() && !rest.contains(SEPARATOR)).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn build_path_with_and_without_parent() {
        assert_eq!(build_path(None, "a"), "a");
        assert_eq!(build_path(Some("a"), "b"), "a/b");
        assert_eq!(build_path(Some("a/b"), "c"), "a/b/c");
    }

    #[rstest]
    #[case(NodeKind::File, "a/z", NodeKind::Dir, "a/b", Ordering::Less)]
    #[case(NodeKind::Dir, "a/b", NodeKind::File, "a/z", Ordering::Greater)]
    #[case(NodeKind::Dir, "a/b", NodeKind::Dir, "a/c", Ordering::Less)]
    #[case(NodeKind::File, "a/c", NodeKind::File, "a/b", Ordering::Greater)]
    #[case(NodeKind::File, "a/b", NodeKind::File, "a/b", Ordering::Equal)]
    fn sibling_order_files_first_then_lexicographic(
        #[case] a_kind: NodeKind,
        #[case] a_path: &str,
        #[case] b_kind: NodeKind,
        #[case] b_path: &str,
        #[case] expected: Ordering,
    ) {
        assert_eq!(sibling_order(a_kind, a_path, b_kind, b_path), expected);
    }

    #[rstest]
    #[case("a", "a/b", Some("b"))]
    #[case("a", "a/b/c", None)] // grandchild
    #[case("a", "ab", None)] // not separator-terminated
    #[case("a", "a", None)] // equality is not a child relation
    #[case("a/b", "a/b/c", Some("c"))]
    fn direct_child_names(#[case] parent: &str, #[case] child: &str, #[case] expected: Option<&str>) {
        assert_eq!(local_name_under(parent, child), expected);
    }

    #[test]
    fn local_name_of_root_and_nested() {
        let root = Node::new_dir(NodeId(0), "a".into());
        let nested = Node::new_file(NodeId(1), "a/b/c".into(), Vec::new());
        assert_eq!(root.local_name(), "a");
        assert_eq!(nested.local_name(), "c");
    }

    #[test]
    fn file_payload_accessors() {
        let mut f = Node::new_file(NodeId(0), "a".into(), b"one".to_vec());
        assert_eq!(f.kind(), NodeKind::File);
        assert_eq!(f.contents(), Some(&b"one"[..]));
        assert!(f.children().is_empty());
        let old = f.replace_contents(b"two".to_vec());
        assert_eq!(old.as_deref(), Some(&b"one"[..]));
        assert_eq!(f.contents(), Some(&b"two"[..]));

        let mut d = Node::new_dir(NodeId(1), "d".into());
        assert_eq!(d.kind(), NodeKind::Dir);
        assert_eq!(d.contents(), None);
        assert_eq!(d.replace_contents(Vec::new()), None);
    }
}
