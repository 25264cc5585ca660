//! Procedural geometry builders.
//!
//! All builders emit the interleaved [`Vertex`](crate::resources::Vertex)
//! layout with counter-clockwise front faces.

pub mod box_shape;
pub mod plane;
pub mod sphere;

pub use box_shape::create_box;
pub use plane::{PlaneOptions, create_plane};
pub use sphere::{SphereOptions, create_sphere};
