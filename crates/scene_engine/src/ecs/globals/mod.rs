//! Scene-wide components
//!
//! A fresh scene always carries a [`MaterialBuffer`], a [`GeometryStore`] and
//! a [`TextureStore`]. The [`DrawDirector`] is added by whoever builds the
//! scene content.

pub mod draw_director;
pub mod geometry_store;
pub mod material_buffer;
pub mod texture_store;

pub use draw_director::{DrawDirector, DrawOp, InstanceTransform};
pub use geometry_store::{GeometryBufferSet, GeometryStore, Mesh, Primitive};
pub use material_buffer::{AlphaMode, Material, MaterialBuffer, MaterialBufferObject, DEFAULT_ALPHA_CUTOFF};
pub use texture_store::{SamplerDesc, Texture, TextureStore};
