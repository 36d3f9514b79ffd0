use tracing::debug;

use crate::arena::NodeArena;
use crate::checker;
use crate::error::TreeError;
use crate::model::{build_path, local_name_under, path_extends, Node, NodeId, Stat, SEPARATOR};

/// The hierarchical namespace: an explicit context object holding the
/// root handle, the live-node counter, and the arena all nodes live
/// in. One logical owner drives all calls; there is no internal
/// locking.
#[derive(Debug, Default)]
pub struct FileTree {
    pub(crate) initialized: bool,
    pub(crate) root: Option<NodeId>,
    pub(crate) count: usize,
    pub(crate) arena: NodeArena,
}

impl FileTree {
    /// A fresh, uninitialized tree. Every data operation fails until
    /// `init` is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of live nodes reachable from the root.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    /// Transitions to the initialized-empty state.
    pub fn init(&mut self) -> Result<(), TreeError> {
        self.check_debug();
        if self.initialized {
            return Err(TreeError::AlreadyInitialized);
        }
        self.initialized = true;
        self.root = None;
        self.count = 0;
        self.check_debug();
        Ok(())
    }

    /// Destroys every node and returns to the uninitialized state.
    pub fn destroy(&mut self) -> Result<(), TreeError> {
        self.check_debug();
        self.require_init()?;
        if let Some(root) = self.root.take() {
            self.count -= self.destroy_subtree(root);
        }
        self.initialized = false;
        debug!(remaining = self.count, "tree destroyed");
        self.check_debug();
        Ok(())
    }

    /// Inserts a directory at `path`, synthesizing any missing
    /// ancestors as directories.
    pub fn insert_dir(&mut self, path: &str) -> Result<(), TreeError> {
        self.check_debug();
        self.require_init()?;
        let anchor = self.traverse(path);
        let result = self.insert_rest(path, anchor, None);
        self.check_debug();
        result
    }

    /// Inserts a file at `path` with the given contents, synthesizing
    /// any missing ancestors as directories.
    pub fn insert_file(&mut self, path: &str, contents: Vec<u8>) -> Result<(), TreeError> {
        self.check_debug();
        self.require_init()?;
        let anchor = self.traverse(path);
        let result = self.insert_rest(path, anchor, Some(contents));
        self.check_debug();
        result
    }

    /// True when `path` denotes an existing directory. Uninitialized
    /// trees contain nothing.
    pub fn contains_dir(&self, path: &str) -> bool {
        self.initialized
            && self
                .find_exact(path)
                .is_some_and(|id| !self.arena[id].is_file())
    }

    /// True when `path` denotes an existing file.
    pub fn contains_file(&self, path: &str) -> bool {
        self.initialized
            && self
                .find_exact(path)
                .is_some_and(|id| self.arena[id].is_file())
    }

    /// Removes the directory at `path` and its whole subtree.
    pub fn remove_dir(&mut self, path: &str) -> Result<(), TreeError> {
        self.check_debug();
        self.require_init()?;
        let result = match self.find_exact(path) {
            None => Err(TreeError::NoSuchPath),
            Some(id) if self.arena[id].is_file() => Err(TreeError::NotADirectory),
            Some(id) => self.remove_at(id),
        };
        self.check_debug();
        result
    }

    /// Removes the file at `path`.
    pub fn remove_file(&mut self, path: &str) -> Result<(), TreeError> {
        self.check_debug();
        self.require_init()?;
        let result = match self.find_exact(path) {
            None => Err(TreeError::NoSuchPath),
            Some(id) if !self.arena[id].is_file() => Err(TreeError::NotAFile),
            Some(id) => self.remove_at(id),
        };
        self.check_debug();
        result
    }

    /// Contents of the file at `path`, or `None` if `path` does not
    /// denote an existing file.
    pub fn file_contents(&self, path: &str) -> Option<&[u8]> {
        if !self.initialized {
            return None;
        }
        let id = self.find_exact(path)?;
        self.arena[id].contents()
    }

    /// Swaps the contents of the file at `path`, returning the
    /// previous buffer, or `None` if `path` does not denote an
    /// existing file.
    pub fn replace_file_contents(&mut self, path: &str, new: Vec<u8>) -> Option<Vec<u8>> {
        self.check_debug();
        if !self.initialized {
            return None;
        }
        let id = self.find_exact(path)?;
        let previous = self.arena[id].replace_contents(new);
        self.check_debug();
        previous
    }

    /// Reports whether `path` denotes a file or directory, and a
    /// file's length.
    pub fn stat(&self, path: &str) -> Result<Stat, TreeError> {
        self.require_init()?;
        let id = self.find_exact(path).ok_or(TreeError::NoSuchPath)?;
        Ok(match self.arena[id].contents() {
            Some(contents) => Stat::File {
                length: contents.len(),
            },
            None => Stat::Directory,
        })
    }

    /// Deterministic listing of every node's path in pre-order, one
    /// per line, each line newline-terminated.
    pub fn listing(&self) -> Result<String, TreeError> {
        self.require_init()?;
        let mut out = String::new();
        self.for_each(|node| {
            out.push_str(&node.path);
            out.push('\n');
        });
        Ok(out)
    }

    /// Visits every node in pre-order: parent first, then children in
    /// sibling order.
    pub fn for_each(&self, mut visit: impl FnMut(&Node)) {
        if let Some(root) = self.root {
            self.pre_order(root, &mut visit);
        }
    }

    fn pre_order(&self, id: NodeId, visit: &mut dyn FnMut(&Node)) {
        let node = &self.arena[id];
        visit(node);
        for &child in node.children() {
            self.pre_order(child, visit);
        }
    }

    fn require_init(&self) -> Result<(), TreeError> {
        if self.initialized {
            Ok(())
        } else {
            Err(TreeError::NotInitialized)
        }
    }

    fn check_debug(&self) {
        debug_assert!(checker::tree_is_valid(self).is_ok());
    }

    /// Longest-prefix walk: the deepest node whose path is `path` or a
    /// separator-terminated prefix of it. `None` when the tree is
    /// empty or the root matches no prefix.
    fn traverse(&self, path: &str) -> Option<NodeId> {
        self.traverse_from(path, self.root?)
    }

    fn traverse_from(&self, path: &str, curr: NodeId) -> Option<NodeId> {
        let node = &self.arena[curr];
        if node.path == path {
            return Some(curr);
        }
        if !path_extends(&node.path, path) {
            return None;
        }
        // A file is the deepest reachable node even if the path goes on.
        if node.is_file() {
            return Some(curr);
        }
        for &child in node.children() {
            if let Some(found) = self.traverse_from(path, child) {
                return Some(found);
            }
        }
        Some(curr)
    }

    /// Exact-match lookup.
    fn find_exact(&self, path: &str) -> Option<NodeId> {
        let id = self.traverse(path)?;
        (self.arena[id].path == path).then_some(id)
    }

    /// Synthesizes the part of `path` below `anchor` (the traverse
    /// result) as a chain of new nodes and links it in. The existing
    /// tree is only touched by the final link, so any failure tears
    /// down the chain and leaves the tree unchanged.
    fn insert_rest(
        &mut self,
        path: &str,
        anchor: Option<NodeId>,
        file_contents: Option<Vec<u8>>,
    ) -> Result<(), TreeError> {
        let rest = match anchor {
            None => {
                if self.root.is_some() {
                    return Err(TreeError::ConflictingPath);
                }
                path
            }
            Some(id) => {
                let node = &self.arena[id];
                if node.path == path {
                    return Err(TreeError::AlreadyInTree);
                }
                if node.is_file() {
                    return Err(TreeError::NotADirectory);
                }
                &path[node.path.len() + 1..]
            }
        };

        let is_file_target = file_contents.is_some();
        let mut contents = file_contents;
        let mut parent_path: Option<String> =
            anchor.map(|id| self.arena[id].path.clone());
        let mut head: Option<NodeId> = None;
        let mut tail: Option<NodeId> = None;
        let mut created = 0usize;

        // Separator runs collapse; empty segments never become nodes.
        let mut segments = rest.split(SEPARATOR).filter(|s| !s.is_empty()).peekable();
        while let Some(name) = segments.next() {
            let last = segments.peek().is_none();
            let node_path = build_path(parent_path.as_deref(), name);
            let alloc = if last && is_file_target {
                let data = contents.take().unwrap_or_default();
                self.arena
                    .try_insert(|id| Node::new_file(id, node_path.clone(), data))
            } else {
                self.arena
                    .try_insert(|id| Node::new_dir(id, node_path.clone()))
            };
            let id = match alloc {
                Ok(id) => id,
                Err(err) => {
                    self.teardown_chain(head);
                    return Err(err);
                }
            };
            created += 1;
            if let Some(parent) = tail {
                if let Err(err) = self.link_child(parent, id) {
                    self.arena.remove(id);
                    self.teardown_chain(head);
                    return Err(err);
                }
            }
            if head.is_none() {
                head = Some(id);
            }
            tail = Some(id);
            parent_path = Some(node_path);
        }

        let Some(head) = head else {
            // Nothing left to create once empty segments are dropped.
            return Ok(());
        };

        match anchor {
            None => {
                self.root = Some(head);
                self.count += created;
            }
            Some(parent) => {
                if self.link_child(parent, head).is_err() {
                    self.teardown_chain(Some(head));
                    return Err(TreeError::ParentChild);
                }
                self.count += created;
            }
        }
        debug!(path, created, count = self.count, "inserted path chain");
        Ok(())
    }

    fn teardown_chain(&mut self, head: Option<NodeId>) {
        if let Some(head) = head {
            self.destroy_subtree(head);
        }
    }

    /// Validates the path relationship and inserts `child` into
    /// `parent`'s sorted child list, keeping the back-reference in
    /// lock-step.
    fn link_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let index = {
            let p = &self.arena[parent];
            if p.is_file() {
                return Err(TreeError::NotADirectory);
            }
            let c = &self.arena[child];
            local_name_under(&p.path, &c.path).ok_or(TreeError::ParentChild)?;
            // Paths must stay pairwise-distinct across both kinds.
            if p.children()
                .iter()
                .any(|&sibling| self.arena[sibling].path == c.path)
            {
                return Err(TreeError::AlreadyInTree);
            }
            match self.search_child(parent, child) {
                Ok(_) => return Err(TreeError::AlreadyInTree),
                Err(index) => index,
            }
        };
        {
            let kids = self.arena[parent]
                .children_mut()
                .ok_or(TreeError::NotADirectory)?;
            kids.try_reserve(1)?;
        }
        self.arena[child].parent = Some(parent);
        if let Some(kids) = self.arena[parent].children_mut() {
            kids.insert(index, child);
        }
        Ok(())
    }

    /// Removes `child` from `parent`'s child list without destroying
    /// it; ownership moves back to the caller.
    fn unlink_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let index = {
            let p = &self.arena[parent];
            if p.is_file() {
                return Err(TreeError::NotADirectory);
            }
            self.search_child(parent, child)
                .map_err(|_| TreeError::ParentChild)?
        };
        if let Some(kids) = self.arena[parent].children_mut() {
            kids.remove(index);
        }
        self.arena[child].parent = None;
        Ok(())
    }

    /// Binary search of `parent`'s children for `child`'s sort
    /// position under the sibling ordering rule.
    fn search_child(&self, parent: NodeId, child: NodeId) -> Result<usize, usize> {
        let target = &self.arena[child];
        self.arena[parent].children().binary_search_by(|&sibling| {
            self.arena[sibling].sibling_cmp(target)
        })
    }

    /// Post-order destruction; returns the number of nodes destroyed
    /// (self plus descendants).
    fn destroy_subtree(&mut self, id: NodeId) -> usize {
        let children: Vec<NodeId> = self.arena[id].children().to_vec();
        let mut destroyed = 0;
        for child in children {
            destroyed += self.destroy_subtree(child);
        }
        self.arena.remove(id);
        destroyed + 1
    }

    fn remove_at(&mut self, id: NodeId) -> Result<(), TreeError> {
        match self.arena[id].parent {
            None => {
                self.root = None;
            }
            Some(parent) => self.unlink_child(parent, id)?,
        }
        let destroyed = self.destroy_subtree(id);
        self.count -= destroyed;
        debug!(destroyed, count = self.count, "removed path");
        Ok(())
    }
}
