//! Arena-backed ownership tree for tasks, screens, workspaces and windows.
//!
//! The hierarchy is Root -> Task -> Screen -> Workspace -> Window. Every node
//! owns an ordered list of children and remembers one "active" child; the
//! chain of active children from the root is the focus path. Parent links are
//! plain ids into the same arena, so there are no reference cycles.

use slotmap::{new_key_type, SlotMap};
use x11rb::protocol::xproto::Window;

use crate::types::{NodeSnapshot, TreeSnapshot};

new_key_type! {
    /// Unique identifier for a node in the task tree
    pub struct NodeId;
}

/// Discriminant used by the search operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Root,
    Task,
    Screen,
    Workspace,
    Window,
}

/// Per-kind payload of a node
#[derive(Debug, Clone)]
pub enum NodeData {
    Root,
    /// A named virtual desktop with one screen per monitor
    Task { name: String },
    /// The tiling surface bound to one physical monitor
    Screen,
    /// One selectable tiling surface; children are windows, master last
    Workspace { master_factor: f64 },
    /// A foreign X11 window
    Window(Window),
}

impl NodeData {
    pub fn kind(&self) -> Kind {
        match self {
            NodeData::Root => Kind::Root,
            NodeData::Task { .. } => Kind::Task,
            NodeData::Screen => Kind::Screen,
            NodeData::Workspace { .. } => Kind::Workspace,
            NodeData::Window(_) => Kind::Window,
        }
    }
}

/// A node in the task tree
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    children: Vec<NodeId>,
    /// Index into `children`; 0 while there are no children
    active: usize,
    parent: Option<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            children: Vec::new(),
            active: 0,
            parent: None,
        }
    }

    #[allow(dead_code)]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[allow(dead_code)]
    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_child(&self) -> Option<NodeId> {
        self.children.get(self.active).copied()
    }
}

/// The arena holding every node, plus the id of the root
#[derive(Debug)]
pub struct NodeTree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
}

impl NodeTree {
    /// Create a tree containing only the root
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeData::Root));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a detached node
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        self.nodes.insert(Node::new(data))
    }

    #[allow(dead_code)]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Number of live nodes in the arena, root included
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(id).expect("Node id must refer to a live node")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes.get_mut(id).expect("Node id must refer to a live node")
    }

    pub fn kind(&self, id: NodeId) -> Kind {
        self.node(id).data.kind()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    #[allow(dead_code)]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Append `child` under `parent`, optionally making it the active child
    pub fn append(&mut self, parent: NodeId, child: NodeId, set_active: bool) {
        debug_assert!(self.node(child).parent.is_none(), "appending an attached node");
        self.node_mut(child).parent = Some(parent);
        let p = self.node_mut(parent);
        p.children.push(child);
        if set_active {
            p.active = p.children.len() - 1;
        }
    }

    /// Detach `id` from its parent. The node itself stays in the arena.
    ///
    /// If `id` was the active child, the parent's new active child is its
    /// last remaining child. Otherwise the previously active sibling stays
    /// active even though its index may have shifted.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let p = self.node_mut(parent);
        let active_child = p.children.get(p.active).copied();
        p.children.retain(|&c| c != id);
        p.active = match active_child {
            Some(active) if active != id => p
                .children
                .iter()
                .position(|&c| c == active)
                .unwrap_or(0),
            _ => p.children.len().saturating_sub(1),
        };
        self.node_mut(id).parent = None;
    }

    /// Detach `id` and free it together with its whole subtree
    pub fn destroy(&mut self, id: NodeId) {
        self.remove(id);
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(next) {
                pending.extend(node.children);
            }
        }
    }

    /// Position of `id` among its siblings (0 for the root)
    pub fn index(&self, id: NodeId) -> usize {
        match self.node(id).parent {
            Some(parent) => self
                .node(parent)
                .children
                .iter()
                .position(|&c| c == id)
                .expect("Child must be listed by its parent"),
            None => 0,
        }
    }

    /// The `index`-th child of `id`'s parent
    pub fn sibling_by_index(&self, id: NodeId, index: usize) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        self.node(parent).children.get(index).copied()
    }

    /// The sibling `offset` positions away, wrapping in both directions.
    /// A node without a parent is its own only sibling.
    pub fn sibling_by_offset(&self, id: NodeId, offset: isize) -> NodeId {
        let Some(parent) = self.node(id).parent else {
            return id;
        };
        let siblings = &self.node(parent).children;
        let i = (self.index(id) as isize + offset).rem_euclid(siblings.len() as isize);
        siblings[i as usize]
    }

    /// Make `id` the focus target of every ancestor.
    ///
    /// With `promote`, `id` is first moved to the end of its sibling list,
    /// which is the most-recently-used position.
    pub fn activate(&mut self, id: NodeId, promote: bool) {
        if promote {
            if let Some(parent) = self.node(id).parent {
                self.remove(id);
                self.append(parent, id, false);
            }
        }
        let mut node = id;
        while let Some(parent) = self.node(node).parent {
            let index = self.index(node);
            self.node_mut(parent).active = index;
            node = parent;
        }
    }

    /// Follow active children from `from` until a node of `kind` is reached
    pub fn search_active(&self, from: NodeId, kind: Kind) -> Option<NodeId> {
        let mut node = from;
        loop {
            if self.kind(node) == kind {
                return Some(node);
            }
            node = self.node(node).active_child()?;
        }
    }

    /// Every node of `kind` below (and including) `from`, in pre-order
    pub fn search_all(&self, from: NodeId, kind: Kind) -> Vec<NodeId> {
        let mut matches = Vec::new();
        self.collect(from, kind, &mut matches);
        matches
    }

    fn collect(&self, node: NodeId, kind: Kind, matches: &mut Vec<NodeId>) {
        if self.kind(node) == kind {
            matches.push(node);
        }
        for &child in &self.node(node).children {
            self.collect(child, kind, matches);
        }
    }

    /// True iff `id` is the last child of its parent
    pub fn is_highest_index(&self, id: NodeId) -> bool {
        match self.node(id).parent {
            Some(parent) => self.node(parent).children.last() == Some(&id),
            None => false,
        }
    }

    pub fn task_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Task { name } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn window(&self, id: NodeId) -> Option<Window> {
        match self.node(id).data {
            NodeData::Window(window) => Some(window),
            _ => None,
        }
    }

    pub fn master_factor(&self, id: NodeId) -> Option<f64> {
        match self.node(id).data {
            NodeData::Workspace { master_factor } => Some(master_factor),
            _ => None,
        }
    }

    pub fn set_master_factor(&mut self, id: NodeId, factor: f64) {
        if let NodeData::Workspace { master_factor } = &mut self.node_mut(id).data {
            *master_factor = factor;
        }
    }

    /// Serializable picture of the whole tree
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            root: self.snapshot_node(self.root),
        }
    }

    fn snapshot_node(&self, id: NodeId) -> NodeSnapshot {
        let node = self.node(id);
        let children = || node.children.iter().map(|&c| self.snapshot_node(c)).collect();
        let active = node.active;
        match &node.data {
            NodeData::Root => NodeSnapshot::Root {
                active,
                children: children(),
            },
            NodeData::Task { name } => NodeSnapshot::Task {
                name: name.clone(),
                active,
                children: children(),
            },
            NodeData::Screen => NodeSnapshot::Screen {
                active,
                children: children(),
            },
            NodeData::Workspace { master_factor } => NodeSnapshot::Workspace {
                master_factor: *master_factor,
                active,
                children: children(),
            },
            NodeData::Window(window) => NodeSnapshot::Window { id: *window },
        }
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}
