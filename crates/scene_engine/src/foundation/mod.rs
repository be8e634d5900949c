//! Foundation module - Core utilities and types
//!
//! - Math types and operations
//! - Arena handles
//! - Frame timing
//! - Logging utilities

pub mod collections;
pub mod logging;
pub mod math;
pub mod time;
