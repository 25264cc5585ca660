//! 变换系统 (Transform System)
//!
//! 负责场景图的矩阵层级更新，与 Scene 解耦以避免借用冲突：
//! 只借用 nodes SlotMap 和根节点列表。

use glam::Mat4;
use slotmap::SlotMap;

use crate::scene::NodeKey;
use crate::scene::node::Node;

/// 更新整个场景层级的世界矩阵
///
/// Depth-first, parent before child: `world = parent.world × local`, or
/// `local` for roots. A node whose local matrix and ancestors are unchanged
/// keeps its cached world matrix.
///
/// 使用显式栈替代递归调用，避免深层级场景的栈溢出。
pub fn update_hierarchy(nodes: &mut SlotMap<NodeKey, Node>, roots: &[NodeKey]) {
    // 工作栈：(节点句柄, 父世界矩阵, 父是否变化)
    let mut stack: Vec<(NodeKey, Mat4, bool)> = Vec::with_capacity(64);

    for &root in roots.iter().rev() {
        stack.push((root, Mat4::IDENTITY, false));
    }

    while let Some((key, parent_world, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(key) else {
            continue;
        };

        let local_changed = node.transform.update_local_matrix();
        let world_changed = local_changed || parent_changed;

        if world_changed {
            let world = if node.parent.is_some() {
                parent_world * node.transform.local_matrix
            } else {
                node.transform.local_matrix
            };
            node.transform.set_world_matrix(world);
        }

        let world = node.transform.world_matrix;
        // 逆序入栈以保持子节点处理顺序
        for &child in node.children.iter().rev() {
            stack.push((child, world, world_changed));
        }
    }
}

/// Depth-first pre-order walk from `roots`, children in insertion order.
pub fn traverse_depth_first(
    nodes: &SlotMap<NodeKey, Node>,
    roots: &[NodeKey],
    mut visitor: impl FnMut(NodeKey, &Node),
) {
    let mut stack: Vec<NodeKey> = roots.iter().rev().copied().collect();
    while let Some(key) = stack.pop() {
        let Some(node) = nodes.get(key) else {
            continue;
        };
        visitor(key, node);
        stack.extend(node.children.iter().rev().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_hierarchy_update() {
        let mut nodes: SlotMap<NodeKey, Node> = SlotMap::with_key();

        let mut parent = Node::new();
        parent.transform.position = Vec3::new(1.0, 0.0, 0.0);
        let parent_key = nodes.insert(parent);

        let mut child = Node::new();
        child.transform.position = Vec3::new(0.0, 1.0, 0.0);
        child.parent = Some(parent_key);
        let child_key = nodes.insert(child);

        nodes[parent_key].children.push(child_key);

        update_hierarchy(&mut nodes, &[parent_key]);

        let pos = nodes[child_key].transform.world_position();
        assert!((pos.x - 1.0).abs() < 1e-5);
        assert!((pos.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn traversal_is_pre_order() {
        let mut nodes: SlotMap<NodeKey, Node> = SlotMap::with_key();
        let a = nodes.insert(Node::with_name("a"));
        let b = nodes.insert(Node::with_name("b"));
        let c = nodes.insert(Node::with_name("c"));
        let d = nodes.insert(Node::with_name("d"));
        nodes[a].children = vec![b, d];
        nodes[b].children = vec![c];

        let mut order = Vec::new();
        traverse_depth_first(&nodes, &[a], |_, n| order.push(n.name.clone().unwrap_or_default()));
        assert_eq!(order, ["a", "b", "c", "d"]);
    }
}
