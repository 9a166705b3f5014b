//! Error Types
//!
//! This module defines the error types used throughout the engine core.
//!
//! # Overview
//!
//! The main error type [`CanopyError`] covers three families of failure:
//! - Scene contract violations (a drawn node without a material, an
//!   unresolvable material or program, a dangling handle). These describe a
//!   corrupted scene and the application layer treats them as fatal.
//! - Backend failures reported by a [`RenderBackend`](crate::renderer::backend::RenderBackend).
//! - Configuration loading errors.
//!
//! Degenerate geometry (empty bounds, zero-size frustums) is never an error;
//! it propagates as empty results.
//!
//! # Usage
//!
//! ```rust,ignore
//! use canopy::errors::{CanopyError, Result};
//!
//! fn draw_frame() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the engine core.
#[derive(Error, Debug)]
pub enum CanopyError {
    // ========================================================================
    // Scene Contract Violations
    // ========================================================================
    /// The material system could not resolve a material name.
    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    /// The material system could not resolve a program name.
    #[error("Program not found: {0}")]
    ProgramNotFound(String),

    /// A node reached the render plan without a bound material.
    #[error("Node '{node}' is drawable but has no material")]
    MissingMaterial {
        /// Name of the offending node
        node: String,
    },

    /// A node reached the backend without a mesh.
    #[error("Node '{node}' was submitted for drawing without a mesh")]
    MissingMesh {
        /// Name of the offending node
        node: String,
    },

    /// A node handle does not refer to a live node.
    #[error("Node handle is stale or was never allocated")]
    NodeNotFound,

    /// A camera key does not refer to a camera of this scene.
    #[error("Camera key is stale or belongs to another scene")]
    CameraNotFound,

    /// The child already has a parent; it must be removed first.
    #[error("Node '{child}' is already attached to '{parent}'")]
    NodeAlreadyAttached {
        /// Name of the child being attached
        child: String,
        /// Name of its current parent
        parent: String,
    },

    /// Attaching would make a node its own ancestor.
    #[error("Attaching '{child}' under '{parent}' would create a cycle")]
    CyclicAttach {
        /// Name of the child being attached
        child: String,
        /// Name of the requested parent
        parent: String,
    },

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// The graphics backend failed to create a resource or execute a plan.
    #[error("Backend error: {0}")]
    Backend(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings JSON could not be parsed.
    #[error("Settings parse error: {0}")]
    Settings(#[from] serde_json::Error),

    /// Settings file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CanopyError {
    /// Returns `true` for errors that indicate a corrupted scene description.
    ///
    /// The application loop stops on these instead of skipping the frame.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::MaterialNotFound(_)
                | Self::ProgramNotFound(_)
                | Self::MissingMaterial { .. }
                | Self::MissingMesh { .. }
                | Self::NodeNotFound
                | Self::CameraNotFound
                | Self::NodeAlreadyAttached { .. }
                | Self::CyclicAttach { .. }
        )
    }
}

/// Alias for `Result<T, CanopyError>`.
pub type Result<T> = std::result::Result<T, CanopyError>;
