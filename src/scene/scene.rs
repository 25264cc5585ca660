use slotmap::{SlotMap, SparseSecondaryMap};

use crate::scene::NodeKey;
use crate::scene::drawable::Drawable;
use crate::scene::node::Node;
use crate::scene::transform_system;

/// 场景图结构
///
/// Nodes live in a slotmap arena; drawables are a component map keyed by
/// node. Only roots are listed explicitly, every other node is reached
/// through its parent.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeKey, Node>,
    drawables: SparseSecondaryMap<NodeKey, Drawable>,
    root_nodes: Vec<NodeKey>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // 节点管理
    // ========================================================================

    /// Inserts a root node.
    pub fn add_node(&mut self, node: Node) -> NodeKey {
        let key = self.nodes.insert(Node {
            parent: None,
            children: Vec::new(),
            ..node
        });
        self.root_nodes.push(key);
        key
    }

    /// Inserts a root node carrying `drawable`.
    pub fn add_drawable(&mut self, drawable: Drawable) -> NodeKey {
        let key = self.add_node(Node::new());
        self.drawables.insert(key, drawable);
        key
    }

    /// Inserts `drawable` as a child of `parent`.
    pub fn add_drawable_to_parent(&mut self, drawable: Drawable, parent: NodeKey) -> NodeKey {
        let key = self.add_drawable(drawable);
        self.attach(key, parent);
        key
    }

    /// 核心逻辑：建立父子关系 (Attach)
    ///
    /// Moves `child` (with its subtree) under `parent`. Attaching a node to
    /// itself or to one of its descendants is refused.
    pub fn attach(&mut self, child: NodeKey, parent: NodeKey) {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            log::error!("Node not found during attach!");
            return;
        }
        if self.is_ancestor(child, parent) {
            log::warn!("Cannot attach node to its own descendant!");
            return;
        }

        self.unlink(child);
        self.nodes[parent].children.push(child);

        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.transform.mark_dirty(); // 强制标记脏，确保矩阵更新
    }

    /// Makes `child` a root again, keeping its subtree.
    pub fn detach(&mut self, child: NodeKey) {
        if self.nodes.get(child).and_then(|n| n.parent).is_none() {
            return;
        }
        self.unlink(child);
        self.root_nodes.push(child);

        let node = &mut self.nodes[child];
        node.parent = None;
        node.transform.mark_dirty();
    }

    /// Removes `key`, its whole subtree and their drawables.
    pub fn remove_node(&mut self, key: NodeKey) {
        if !self.nodes.contains_key(key) {
            return;
        }
        self.unlink(key);

        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.remove(k) {
                stack.extend(node.children);
            }
            self.drawables.remove(k);
        }
    }

    /// Removes `key` from its parent's child list, or from the root list.
    fn unlink(&mut self, key: NodeKey) {
        match self.nodes.get(key).and_then(|n| n.parent) {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(parent)
                    && let Some(i) = p.children.iter().position(|&x| x == key)
                {
                    p.children.remove(i);
                }
            }
            None => {
                if let Some(i) = self.root_nodes.iter().position(|&x| x == key) {
                    self.root_nodes.remove(i);
                }
            }
        }
    }

    fn is_ancestor(&self, ancestor: NodeKey, mut key: NodeKey) -> bool {
        while let Some(parent) = self.nodes.get(key).and_then(|n| n.parent) {
            if parent == ancestor {
                return true;
            }
            key = parent;
        }
        false
    }

    // ========================================================================
    // 查询
    // ========================================================================

    #[must_use]
    pub fn get_node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// 获取可变引用 (用于修改 TRS)
    pub fn get_node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    #[must_use]
    pub fn drawable(&self, key: NodeKey) -> Option<&Drawable> {
        self.drawables.get(key)
    }

    pub fn drawable_mut(&mut self, key: NodeKey) -> Option<&mut Drawable> {
        self.drawables.get_mut(key)
    }

    /// Node and drawable borrowed together.
    pub fn drawable_bundle_mut(&mut self, key: NodeKey) -> Option<(&Node, &mut Drawable)> {
        let node = self.nodes.get(key)?;
        let drawable = self.drawables.get_mut(key)?;
        Some((node, drawable))
    }

    #[inline]
    #[must_use]
    pub fn root_nodes(&self) -> &[NodeKey] {
        &self.root_nodes
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    // ========================================================================
    // 遍历与更新
    // ========================================================================

    /// 更新整个场景的世界矩阵
    pub fn update_matrix_world(&mut self) {
        transform_system::update_hierarchy(&mut self.nodes, &self.root_nodes);
    }

    /// Depth-first pre-order visit of every node.
    pub fn traverse(&self, visitor: impl FnMut(NodeKey, &Node)) {
        transform_system::traverse_depth_first(&self.nodes, &self.root_nodes, visitor);
    }

    /// Like [`traverse`](Self::traverse), but skips invisible nodes and their
    /// subtrees.
    pub fn traverse_visible(&self, mut visitor: impl FnMut(NodeKey, &Node)) {
        let mut stack: Vec<NodeKey> = self.root_nodes.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            visitor(key, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }
}
