use crate::resources::geometry::{Geometry, Vertex};

pub struct PlaneOptions {
    pub width: f32,
    pub height: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl Default for PlaneOptions {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            width_segments: 1,
            height_segments: 1,
        }
    }
}

/// Subdivided plane in XY facing +Z.
#[must_use]
pub fn create_plane(options: &PlaneOptions) -> Geometry {
    let grid_x = options.width_segments.max(1);
    let grid_y = options.height_segments.max(1);
    let grid_x1 = grid_x + 1;

    let segment_width = options.width / grid_x as f32;
    let segment_height = options.height / grid_y as f32;

    let mut vertices = Vec::with_capacity((grid_x1 * (grid_y + 1)) as usize);
    for iy in 0..=grid_y {
        // 从上往下，v 与 y 同向
        let y = options.height * 0.5 - iy as f32 * segment_height;
        for ix in 0..=grid_x {
            let x = ix as f32 * segment_width - options.width * 0.5;
            vertices.push(Vertex::new(
                [x, y, 0.0],
                [0.0, 0.0, 1.0],
                [ix as f32 / grid_x as f32, iy as f32 / grid_y as f32],
            ));
        }
    }

    let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = ix + grid_x1 * iy;
            let b = ix + grid_x1 * (iy + 1);
            let c = ix + 1 + grid_x1 * (iy + 1);
            let d = ix + 1 + grid_x1 * iy;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    Geometry::new(vertices, indices).with_label("Plane")
}
