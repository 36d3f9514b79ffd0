//! Read-only structural validator. Invoked in debug builds around
//! every mutating tree operation, and directly by the test suite. It
//! reports which invariant broke and never repairs anything.

use std::cmp::Ordering;

use thiserror::Error;
use tracing::error;

use crate::model::{local_name_under, NodeId, SEPARATOR};
use crate::tree::FileTree;

/// A broken structural invariant. Unlike `TreeError`, this signals a
/// defect in the tree itself, not a caller mistake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("node {0:?} is missing from the arena")]
    MissingNode(NodeId),
    #[error("node {0:?} has an empty path")]
    EmptyPath(NodeId),
    #[error("parent {parent} is not one separator-terminated segment above {child}")]
    NotADirectChild { parent: String, child: String },
    #[error("rootless node {path} has a separator in its path")]
    SeparatorInRootPath { path: String },
    #[error("children of {parent} are not in strictly increasing sibling order")]
    ChildrenOutOfOrder { parent: String },
    #[error("child {child} stores a parent other than {parent}")]
    WrongParentBackref { parent: String, child: String },
    #[error("uninitialized tree has count {count}")]
    UninitializedCount { count: usize },
    #[error("uninitialized tree still has a root")]
    UninitializedRoot,
    #[error("tree reports {reported} nodes but {counted} are reachable")]
    CountMismatch { reported: usize, counted: usize },
}

fn fail(violation: InvariantViolation) -> InvariantViolation {
    error!(target: "fstree::checker", "{violation}");
    violation
}

/// Validates one node in isolation: its path is non-empty, its parent
/// (if any) sits exactly one segment above it, and a rootless node's
/// path holds no separator.
pub fn node_is_valid(tree: &FileTree, id: NodeId) -> Result<(), InvariantViolation> {
    let node = tree
        .node(id)
        .ok_or_else(|| fail(InvariantViolation::MissingNode(id)))?;
    if node.path.is_empty() {
        return Err(fail(InvariantViolation::EmptyPath(id)));
    }
    match node.parent {
        Some(pid) => {
            let parent = tree
                .node(pid)
                .ok_or_else(|| fail(InvariantViolation::MissingNode(pid)))?;
            // Rejects both non-children and grandchildren.
            if local_name_under(&parent.path, &node.path).is_none() {
                return Err(fail(InvariantViolation::NotADirectChild {
                    parent: parent.path.clone(),
                    child: node.path.clone(),
                }));
            }
        }
        None => {
            if node.path.contains(SEPARATOR) {
                return Err(fail(InvariantViolation::SeparatorInRootPath {
                    path: node.path.clone(),
                }));
            }
        }
    }
    Ok(())
}

/// Pre-order recursive check of the subtree rooted at `id`: every node
/// valid, children strictly increasing under the sibling ordering,
/// every back-reference pointing at the actual parent. Returns the
/// number of nodes visited.
pub fn tree_check(tree: &FileTree, id: NodeId) -> Result<usize, InvariantViolation> {
    node_is_valid(tree, id)?;
    let node = tree
        .node(id)
        .ok_or_else(|| fail(InvariantViolation::MissingNode(id)))?;
    let mut visited = 1;
    let mut previous: Option<NodeId> = None;
    for &child_id in node.children() {
        let child = tree
            .node(child_id)
            .ok_or_else(|| fail(InvariantViolation::MissingNode(child_id)))?;
        if let Some(prev_id) = previous {
            let prev = tree
                .node(prev_id)
                .ok_or_else(|| fail(InvariantViolation::MissingNode(prev_id)))?;
            if prev.sibling_cmp(child) != Ordering::Less {
                return Err(fail(InvariantViolation::ChildrenOutOfOrder {
                    parent: node.path.clone(),
                }));
            }
        }
        if child.parent != Some(id) {
            return Err(fail(InvariantViolation::WrongParentBackref {
                parent: node.path.clone(),
                child: child.path.clone(),
            }));
        }
        visited += tree_check(tree, child_id)?;
        previous = Some(child_id);
    }
    Ok(visited)
}

/// Top-level invariant: an uninitialized tree is empty, an initialized
/// tree is structurally valid and its live counter matches the number
/// of reachable nodes.
pub fn tree_is_valid(tree: &FileTree) -> Result<(), InvariantViolation> {
    if !tree.is_initialized() {
        if tree.count() != 0 {
            return Err(fail(InvariantViolation::UninitializedCount {
                count: tree.count(),
            }));
        }
        if tree.root().is_some() {
            return Err(fail(InvariantViolation::UninitializedRoot));
        }
        return Ok(());
    }
    let counted = match tree.root() {
        Some(root) => tree_check(tree, root)?,
        None => 0,
    };
    if counted != tree.count() {
        return Err(fail(InvariantViolation::CountMismatch {
            reported: tree.count(),
            counted,
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodePayload;

    fn sample_tree() -> FileTree {
        let mut tree = FileTree::new();
        tree.init().unwrap();
        tree.insert_dir("a/b").unwrap();
        tree.insert_file("a/f", b"x".to_vec()).unwrap();
        tree
    }

    #[test]
    fn a_well_formed_tree_passes() {
        let tree = sample_tree();
        assert_eq!(tree_is_valid(&tree), Ok(()));
        assert_eq!(tree_check(&tree, tree.root().unwrap()), Ok(3));
    }

    #[test]
    fn an_empty_initialized_tree_passes() {
        let mut tree = FileTree::new();
        tree.init().unwrap();
        assert_eq!(tree_is_valid(&tree), Ok(()));
    }

    #[test]
    fn uninitialized_tree_must_be_empty() {
        let tree = FileTree::new();
        assert_eq!(tree_is_valid(&tree), Ok(()));

        let mut corrupted = FileTree::new();
        corrupted.count = 1;
        assert_eq!(
            tree_is_valid(&corrupted),
            Err(InvariantViolation::UninitializedCount { count: 1 })
        );
    }

    #[test]
    fn detects_count_drift() {
        let mut tree = sample_tree();
        tree.count = 7;
        assert_eq!(
            tree_is_valid(&tree),
            Err(InvariantViolation::CountMismatch {
                reported: 7,
                counted: 3
            })
        );
    }

    #[test]
    fn detects_empty_path() {
        let mut tree = sample_tree();
        let root = tree.root().unwrap();
        tree.arena[root].path.clear();
        assert_eq!(
            node_is_valid(&tree, root),
            Err(InvariantViolation::EmptyPath(root))
        );
    }

    #[test]
    fn detects_grandchild_masquerading_as_child() {
        let mut tree = sample_tree();
        let root = tree.root().unwrap();
        let b = *tree.arena[root]
            .children()
            .iter()
            .find(|&&c| !tree.arena[c].is_file())
            .unwrap();
        tree.arena[b].path = "a/b/c".into();
        assert!(matches!(
            tree_is_valid(&tree),
            Err(InvariantViolation::NotADirectChild { .. })
        ));
    }

    #[test]
    fn detects_rootless_node_with_separator() {
        let mut tree = FileTree::new();
        tree.init().unwrap();
        tree.insert_dir("a").unwrap();
        let root = tree.root().unwrap();
        tree.arena[root].path = "a/b".into();
        assert_eq!(
            tree_is_valid(&tree),
            Err(InvariantViolation::SeparatorInRootPath {
                path: "a/b".into()
            })
        );
    }

    #[test]
    fn detects_misordered_children() {
        let mut tree = sample_tree();
        let root = tree.root().unwrap();
        if let NodePayload::Dir { children } = &mut tree.arena[root].payload {
            children.reverse(); // dir now precedes file
        }
        assert_eq!(
            tree_is_valid(&tree),
            Err(InvariantViolation::ChildrenOutOfOrder { parent: "a".into() })
        );
    }

    #[test]
    fn detects_wrong_parent_backref() {
        let mut tree = sample_tree();
        let root = tree.root().unwrap();
        let child = tree.arena[root].children()[0];
        tree.arena[child].parent = Some(child);
        assert!(matches!(
            tree_is_valid(&tree),
            Err(InvariantViolation::WrongParentBackref { .. })
        ));
    }

    #[test]
    fn detects_dangling_child_id() {
        let mut tree = sample_tree();
        let root = tree.root().unwrap();
        if let NodePayload::Dir { children } = &mut tree.arena[root].payload {
            children.push(NodeId(999));
        }
        assert_eq!(
            tree_is_valid(&tree),
            Err(InvariantViolation::MissingNode(NodeId(999)))
        );
    }
}
