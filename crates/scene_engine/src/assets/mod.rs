//! Asset conversion
//!
//! glTF documents are parsed by the `gltf` crate and converted into scene
//! content by [`gltf_loader`].

pub mod gltf_loader;
pub mod vertex;

pub use gltf_loader::{load_gltf, load_gltf_slice, LoadReport};
pub use vertex::Vertex;
