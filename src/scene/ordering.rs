//! Draw ordering
//!
//! Opaque drawables are drawn in traversal order, transparent ones after them
//! from farthest to nearest.

use glam::Vec3;

use crate::scene::NodeKey;
use crate::scene::scene::Scene;

#[derive(Debug, Clone, Copy)]
struct SortedDrawable {
    key: NodeKey,
    distance: f32,
}

/// Reusable per-frame draw list.
#[derive(Debug, Default)]
pub struct RenderOrder {
    opaque: Vec<NodeKey>,
    transparent: Vec<SortedDrawable>,
}

impl RenderOrder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies visible drawables in one depth-first pass and sorts the
    /// transparent ones back-to-front by distance from `camera_position` to
    /// their world position.
    ///
    /// World matrices must be current.
    pub fn prepare(&mut self, scene: &Scene, camera_position: Vec3) {
        self.opaque.clear();
        self.transparent.clear();

        scene.traverse_visible(|key, node| {
            let Some(drawable) = scene.drawable(key) else {
                return;
            };
            if drawable.is_transparent() {
                let distance = node.transform.world_position().distance(camera_position);
                self.transparent.push(SortedDrawable { key, distance });
            } else {
                self.opaque.push(key);
            }
        });

        // 稳定排序：距离相同时保持遍历顺序
        self.transparent
            .sort_by(|a, b| b.distance.total_cmp(&a.distance));
    }

    /// Opaque keys, then transparent keys back-to-front.
    pub fn ordered(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.opaque
            .iter()
            .copied()
            .chain(self.transparent.iter().map(|d| d.key))
    }

    #[inline]
    #[must_use]
    pub fn opaque(&self) -> &[NodeKey] {
        &self.opaque
    }

    #[must_use]
    pub fn transparent(&self) -> Vec<NodeKey> {
        self.transparent.iter().map(|d| d.key).collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
