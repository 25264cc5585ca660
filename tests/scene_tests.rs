//! Scene graph and draw ordering tests
//!
//! Tests for:
//! - Node insertion, attach/detach, recursive removal
//! - Depth-first traversal order
//! - Opaque/transparent classification and back-to-front sorting

use glam::Vec3;
use prism::renderer::pipeline::{Material, MaterialHandle};
use prism::resources::Geometry;
use prism::scene::{Drawable, Node, NodeKey, RenderOrder, Scene};

// ============================================================================
// Helper
// ============================================================================

fn drawable(material: &MaterialHandle) -> Drawable {
    Drawable::new(Geometry::new_box(1.0, 1.0, 1.0), MaterialHandle::clone(material))
}

fn add_at(scene: &mut Scene, material: &MaterialHandle, position: Vec3) -> NodeKey {
    let key = scene.add_drawable(drawable(material));
    scene.get_node_mut(key).unwrap().transform.position = position;
    key
}

fn names(scene: &Scene) -> Vec<String> {
    let mut out = Vec::new();
    scene.traverse(|_, node| out.push(node.name.clone().unwrap_or_default()));
    out
}

// ============================================================================
// Scene operations
// ============================================================================

#[test]
fn attach_moves_node_under_parent() {
    let mut scene = Scene::new();
    let a = scene.add_node(Node::with_name("a"));
    let b = scene.add_node(Node::with_name("b"));

    scene.attach(b, a);

    assert_eq!(scene.root_nodes(), &[a]);
    assert_eq!(scene.get_node(a).unwrap().children(), &[b]);
    assert_eq!(scene.get_node(b).unwrap().parent(), Some(a));
}

#[test]
fn attach_refuses_cycles() {
    let mut scene = Scene::new();
    let a = scene.add_node(Node::with_name("a"));
    let b = scene.add_node(Node::with_name("b"));
    scene.attach(b, a);

    scene.attach(a, b);
    scene.attach(a, a);

    assert_eq!(scene.root_nodes(), &[a]);
    assert_eq!(scene.get_node(a).unwrap().parent(), None);
}

#[test]
fn reattach_moves_between_parents() {
    let mut scene = Scene::new();
    let p1 = scene.add_node(Node::with_name("p1"));
    let p2 = scene.add_node(Node::with_name("p2"));
    let c = scene.add_node(Node::with_name("c"));

    scene.attach(c, p1);
    scene.attach(c, p2);

    assert!(scene.get_node(p1).unwrap().children().is_empty());
    assert_eq!(scene.get_node(p2).unwrap().children(), &[c]);
}

#[test]
fn remove_node_is_recursive() {
    let material = Material::opaque("").into_handle();
    let mut scene = Scene::new();
    let root = scene.add_node(Node::with_name("root"));
    let mid = scene.add_drawable(drawable(&material));
    let leaf = scene.add_drawable(drawable(&material));
    let other = scene.add_node(Node::with_name("other"));
    scene.attach(mid, root);
    scene.attach(leaf, mid);

    scene.remove_node(mid);

    assert!(scene.get_node(mid).is_none());
    assert!(scene.get_node(leaf).is_none());
    assert!(scene.drawable(leaf).is_none());
    assert_eq!(scene.drawable_count(), 0);
    assert_eq!(scene.node_count(), 2);
    assert!(scene.get_node(root).unwrap().children().is_empty());
    assert!(scene.get_node(other).is_some());
}

#[test]
fn traverse_is_depth_first_pre_order() {
    let mut scene = Scene::new();
    let a = scene.add_node(Node::with_name("a"));
    let b = scene.add_node(Node::with_name("b"));
    let c = scene.add_node(Node::with_name("c"));
    let d = scene.add_node(Node::with_name("d"));
    let e = scene.add_node(Node::with_name("e"));
    scene.attach(b, a);
    scene.attach(c, b);
    scene.attach(d, a);

    assert_eq!(names(&scene), ["a", "b", "c", "d", "e"]);
    let _ = e;
}

// ============================================================================
// Render order
// ============================================================================

#[test]
fn transparent_drawables_sort_back_to_front() {
    let glass = Material::transparent("").into_handle();
    let mut scene = Scene::new();

    let near = add_at(&mut scene, &glass, Vec3::new(0.0, 0.0, 1.0));
    let far = add_at(&mut scene, &glass, Vec3::new(0.0, 0.0, 5.0));
    let mid = add_at(&mut scene, &glass, Vec3::new(0.0, 0.0, 3.0));
    scene.update_matrix_world();

    let mut order = RenderOrder::new();
    order.prepare(&scene, Vec3::ZERO);

    assert_eq!(order.transparent(), vec![far, mid, near]);

    let distances: Vec<f32> = order
        .ordered()
        .map(|k| scene.get_node(k).unwrap().transform.world_position().length())
        .collect();
    assert_eq!(distances, vec![5.0, 3.0, 1.0]);
}

#[test]
fn opaque_drawables_come_first_in_traversal_order() {
    let solid = Material::opaque("").into_handle();
    let glass = Material::transparent("").into_handle();
    let mut scene = Scene::new();

    let t1 = add_at(&mut scene, &glass, Vec3::new(0.0, 0.0, 2.0));
    let o1 = add_at(&mut scene, &solid, Vec3::new(0.0, 0.0, 9.0));
    let o2 = add_at(&mut scene, &solid, Vec3::new(0.0, 0.0, 1.0));
    scene.update_matrix_world();

    let mut order = RenderOrder::new();
    order.prepare(&scene, Vec3::ZERO);

    assert_eq!(order.ordered().collect::<Vec<_>>(), vec![o1, o2, t1]);
}

#[test]
fn sort_uses_world_position() {
    let glass = Material::transparent("").into_handle();
    let mut scene = Scene::new();

    let parent = scene.add_node(Node::new());
    scene.get_node_mut(parent).unwrap().transform.position = Vec3::new(0.0, 0.0, 10.0);
    let child = add_at(&mut scene, &glass, Vec3::new(0.0, 0.0, 1.0));
    scene.attach(child, parent);
    let root_level = add_at(&mut scene, &glass, Vec3::new(0.0, 0.0, 4.0));
    scene.update_matrix_world();

    let mut order = RenderOrder::new();
    order.prepare(&scene, Vec3::ZERO);

    // child sits at z = 11 in world space
    assert_eq!(order.transparent(), vec![child, root_level]);
}

#[test]
fn invisible_subtrees_are_skipped() {
    let solid = Material::opaque("").into_handle();
    let mut scene = Scene::new();

    let hidden_parent = scene.add_node(Node::new());
    let hidden_child = add_at(&mut scene, &solid, Vec3::ZERO);
    scene.attach(hidden_child, hidden_parent);
    scene.get_node_mut(hidden_parent).unwrap().visible = false;
    let shown = add_at(&mut scene, &solid, Vec3::ZERO);
    scene.update_matrix_world();

    let mut order = RenderOrder::new();
    order.prepare(&scene, Vec3::ZERO);

    assert_eq!(order.ordered().collect::<Vec<_>>(), vec![shown]);
}

#[test]
fn instance_count_defaults_to_one() {
    let solid = Material::opaque("").into_handle();
    assert_eq!(drawable(&solid).instance_count, 1);
    assert_eq!(drawable(&solid).with_instances(64).instance_count, 64);
}
