use std::ops::{Index, IndexMut};

use crate::error::TreeError;
use crate::model::{Node, NodeId};

/// Slot table holding every live node. Parent and child relations are
/// `NodeId` indices into this table, so there are no owning back
/// pointers and removing a subtree cannot leave dangling references
/// that free memory.
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
    live: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Allocates a slot and builds the node in place. A failed
    /// reservation is reported instead of aborting, so a half-built
    /// chain can be torn down by the caller.
    pub fn try_insert(
        &mut self,
        build: impl FnOnce(NodeId) -> Node,
    ) -> Result<NodeId, TreeError> {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(build(id));
            self.live += 1;
            return Ok(id);
        }
        self.slots.try_reserve(1)?;
        let id = NodeId(self.slots.len() as u64);
        self.slots.push(Some(build(id)));
        self.live += 1;
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index()).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index())
            .and_then(|slot| slot.as_mut())
    }

    /// Frees the slot and returns the node. Pure cleanup; the caller
    /// is responsible for having unlinked the node first.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.slots.get_mut(id.index())?.take()?;
        self.free.push(id);
        self.live -= 1;
        Some(node)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }
}

impl Index<NodeId> for NodeArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node id {id:?}"),
        }
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node id {id:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_recycles_slots() {
        let mut arena = NodeArena::new();
        let a = arena.try_insert(|id| Node::new_dir(id, "a".into())).unwrap();
        let b = arena
            .try_insert(|id| Node::new_file(id, "a/b".into(), Vec::new()))
            .unwrap();
        assert_eq!(arena.live(), 2);
        assert_eq!(arena[a].path, "a");
        assert_eq!(arena[b].path, "a/b");

        let removed = arena.remove(b).unwrap();
        assert_eq!(removed.path, "a/b");
        assert_eq!(arena.live(), 1);
        assert!(arena.get(b).is_none());

        // freed slot is reused
        let c = arena.try_insert(|id| Node::new_dir(id, "a/c".into())).unwrap();
        assert_eq!(c, b);
        assert_eq!(arena.live(), 2);
        assert_eq!(arena.iter().count(), 2);
    }

    #[test]
    fn double_remove_is_none() {
        let mut arena = NodeArena::new();
        let a = arena.try_insert(|id| Node::new_dir(id, "a".into())).unwrap();
        assert!(arena.remove(a).is_some());
        assert!(arena.remove(a).is_none());
        assert_eq!(arena.live(), 0);
    }
}
