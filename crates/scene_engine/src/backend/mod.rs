//! # Backend Module
//!
//! Graphics API specific code. The scene graph talks to the GPU only through
//! the types re-exported from [`vulkan`].

pub mod vulkan;
