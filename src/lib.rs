//! Mesh ingestion, BVH construction and GPU packing for a compute-shader
//! path tracer.
//!
//! ```no_run
//! use scene_bvh::{GpuScene, Scene};
//!
//! let mut scene = Scene::load("assets/cube.obj")?;
//! scene.build_bvh();
//! let packed = scene.pack()?;
//! if let Some((device, _queue)) = scene_bvh::gpu::headless_device() {
//!     let mut gpu = GpuScene::new();
//!     gpu.upload(&device, &packed)?;
//! }
//! # Ok::<(), scene_bvh::Error>(())
//! ```

pub mod error;
pub mod geometry;
pub mod gpu;
pub mod scene;
pub use error::{Error, Result};
pub use geometry::{Aabb, Mesh, Vertex};
pub use gpu::{GpuScene, PackedScene};
pub use scene::bvh::{BuildOptions, Node, NodeKind, Tree};
pub use scene::{Material, Scene, Triangle};
