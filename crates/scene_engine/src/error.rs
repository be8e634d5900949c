//! Error types shared across the scene engine
//!
//! Structural problems in loaded assets are not errors: they are logged and the
//! offending element is skipped. Everything that reaches [`SceneError`] aborts the
//! operation that produced it.

use ash::vk;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced by scene, resource and asset operations
#[derive(Error, Debug)]
pub enum SceneError {
    /// Raw Vulkan API failure
    #[error("Vulkan API error: {0:?}")]
    Api(#[from] vk::Result),

    /// The allocator could not satisfy a request
    #[error("Allocation of {size} bytes for '{name}' failed: {reason}")]
    AllocationFailed {
        /// Debug name of the resource being allocated
        name: String,
        /// Requested size in bytes
        size: u64,
        /// Allocator supplied reason
        reason: String,
    },

    /// A resource handle was used before `create` or after `destroy`
    #[error("Resource '{0}' used without a live allocation")]
    ResourceMissing(String),

    /// An asset could not be parsed or imported at all
    #[error("Failed to load asset '{path}': {message}")]
    AssetLoad {
        /// Path (or a description of the in-memory source)
        path: String,
        /// Importer message
        message: String,
    },

    /// Operation not valid in the current state
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of what went wrong
        reason: String,
    },

    /// Configuration could not be loaded or saved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SceneError {
    /// Shorthand for [`SceneError::InvalidOperation`]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidOperation { reason: reason.into() }
    }
}

/// Result type used throughout the crate
pub type SceneResult<T> = Result<T, SceneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = SceneError::AllocationFailed {
            name: "transforms".to_string(),
            size: 256,
            reason: "budget exhausted".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("transforms"));
        assert!(text.contains("256"));

        let api: SceneError = vk::Result::ERROR_OUT_OF_DEVICE_MEMORY.into();
        assert!(matches!(api, SceneError::Api(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)));
    }
}
