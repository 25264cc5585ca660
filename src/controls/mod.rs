//! 相机交互控制
//!
//! [`Input`] collects winit window events between frames and
//! [`OrbitControls`] turns them into an orbiting [`Camera`](crate::Camera).

pub mod input;
pub mod orbit;

pub use input::Input;
pub use orbit::OrbitControls;
