mod aabb;
mod gltf_loader;
mod mesh;
mod obj_loader;
mod vertex;
pub use aabb::Aabb;
pub use mesh::Mesh;
pub use vertex::Vertex;
